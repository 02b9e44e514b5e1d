//! Warble Core - Session Management and Authenticated API Access
//!
//! This crate provides the session manager, the authenticated request
//! executor, and the typed resource clients for the warble backend.
//!
//! The layering mirrors the request path: a resource client
//! ([`api::TasksClient`], [`api::WhisperClient`]) calls through
//! [`ApiClient`], which attaches the stored access token and, on a 401,
//! asks the [`SessionManager`] for its single-flight refresh before
//! retrying exactly once. The session manager is the only writer of the
//! credential store (`warble-auth`); everything else reads.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod session;

pub use client::{ApiClient, FilePart};
pub use config::WarbleConfig;
pub use error::{CoreError, Result};
pub use session::{SessionManager, SessionState};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{TasksClient, WhisperClient};
    pub use crate::client::{ApiClient, FilePart};
    pub use crate::config::WarbleConfig;
    pub use crate::error::{CoreError, Result};
    pub use crate::models::{
        Credentials, Registration, Task, TaskCreate, TaskList, TaskUpdate,
    };
    pub use crate::session::{SessionManager, SessionState};
    pub use warble_auth::{AuthDb, TokenPair, User};
}

pub fn warble_reqwest_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("warble/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30)) // generous enough for transcription uploads
        .connect_timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap() // panics for the same reasons Client::new() would: https://docs.rs/reqwest/latest/reqwest/struct.Client.html#panics
}
