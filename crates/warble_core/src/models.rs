//! Wire models for the warble backend.
//!
//! Request and response bodies exchanged with the HTTP API. The persisted
//! credential types ([`TokenPair`](warble_auth::TokenPair) and
//! [`User`](warble_auth::User)) live in `warble-auth`; everything here is
//! transient.

use serde::{Deserialize, Serialize};

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A task as returned by the backend.
///
/// `status` and `priority` are open strings on the wire ("pending",
/// "completed", "low", "medium", "high", ...); the backend treats them as
/// free-form, so the client does too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    pub priority: String,
    pub status: String,
    pub user_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Where the task came from ("manual", "calendar", ...).
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub calendar_event_id: Option<String>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    pub fn is_pending(&self) -> bool {
        self.status == "pending"
    }
}

/// Body for creating a task. `None` fields are omitted from the request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TaskCreate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Body for a partial task update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Response from `GET /tasks`: the task list plus the backend's summary
/// counts.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    /// Whether calendar events were folded into this listing.
    #[serde(default)]
    pub calendar_imported: bool,
    pub total_count: i64,
    pub pending_count: i64,
    pub completed_count: i64,
}

/// Response from `DELETE /tasks/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletedTask {
    pub message: String,
}

/// Response from the transcription endpoint.
///
/// The backend reports transcription failures in-band, inside a successful
/// response: exactly one of `text` or `error` is populated.
#[derive(Debug, Clone, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
