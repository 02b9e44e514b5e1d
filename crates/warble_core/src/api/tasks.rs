//! Task management endpoints.

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{DeletedTask, Task, TaskCreate, TaskList, TaskUpdate};

/// Typed client for `/tasks`.
#[derive(Clone)]
pub struct TasksClient {
    client: ApiClient,
}

impl TasksClient {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// List the user's tasks along with the backend's summary counts.
    pub async fn list(&self) -> Result<TaskList> {
        self.client.get("/tasks").await
    }

    pub async fn get(&self, id: &str) -> Result<Task> {
        self.client.get(&format!("/tasks/{id}")).await
    }

    pub async fn create(&self, task: &TaskCreate) -> Result<Task> {
        self.client.post("/tasks", task).await
    }

    pub async fn update(&self, id: &str, update: &TaskUpdate) -> Result<Task> {
        self.client.put(&format!("/tasks/{id}"), update).await
    }

    /// Flip a task between pending and completed.
    pub async fn toggle(&self, id: &str) -> Result<Task> {
        self.client.put_empty(&format!("/tasks/{id}/toggle")).await
    }

    pub async fn delete(&self, id: &str) -> Result<DeletedTask> {
        self.client.delete(&format!("/tasks/{id}")).await
    }
}
