//! Shared helper functions for CLI commands
//!
//! This module consolidates the stack wiring every command repeats: open
//! auth.db from the configured data directory, build a [`SessionManager`]
//! on top of it, and hand out API clients.
//!
//! ## Common Helpers
//!
//! - `open_auth_db()` - Opens the credential store from config
//! - `get_session()` - Builds the session manager for the configured backend
//! - `get_api_client()` / `get_tasks_client()` / `get_whisper_client()` -
//!   Clients layered on that session
//! - `describe_api_error()` - Maps API-layer failures to user-facing errors

use miette::Result;
use std::sync::Arc;
use warble_core::api::{TasksClient, WhisperClient};
use warble_core::prelude::AuthDb;
use warble_core::{ApiClient, CoreError, SessionManager, WarbleConfig};

// =============================================================================
// Stack Construction
// =============================================================================

/// Open auth.db from the config's data directory.
///
/// This is the canonical way CLI commands get at stored credentials. The
/// database (and its parent directory) is created on first use.
pub async fn open_auth_db(config: &WarbleConfig) -> Result<AuthDb> {
    AuthDb::open(config.database.auth_db())
        .await
        .map_err(|e| miette::miette!("Failed to open auth database: {}", e))
}

/// Build the session manager for the configured backend.
///
/// All commands that talk to the API go through this so they share the same
/// base URL resolution (config plus `WARBLE_BASE_URL`) and token store.
pub async fn get_session(config: &WarbleConfig) -> Result<Arc<SessionManager>> {
    let db = open_auth_db(config).await?;
    let session = SessionManager::new(config.server.effective_base_url(), db)?;
    Ok(Arc::new(session))
}

/// Build an API client with automatic refresh-and-retry on expiry.
pub async fn get_api_client(config: &WarbleConfig) -> Result<ApiClient> {
    Ok(ApiClient::new(get_session(config).await?))
}

/// Tasks client wired to the configured backend.
pub async fn get_tasks_client(config: &WarbleConfig) -> Result<TasksClient> {
    Ok(TasksClient::new(get_api_client(config).await?))
}

/// Transcription client wired to the configured backend.
pub async fn get_whisper_client(config: &WarbleConfig) -> Result<WhisperClient> {
    Ok(WhisperClient::new(get_api_client(config).await?))
}

// =============================================================================
// Error Presentation
// =============================================================================

/// Translate API-layer failures into CLI-friendly errors.
///
/// A `SessionExpired` here means the refresh path already gave up, so the
/// only fix is logging in again; say that plainly instead of dumping the
/// whole cause chain. Everything else keeps its diagnostic as-is.
pub fn describe_api_error(err: CoreError) -> miette::Report {
    match &err {
        CoreError::SessionExpired { .. } => miette::miette!(
            help = "run `warble auth login <username>` to start a new session",
            "Session expired, please log in again"
        ),
        CoreError::InvalidCredentials { status, message } => miette::miette!(
            help = "check the username and password, or create an account with `warble auth register`",
            "Login rejected ({}): {}",
            status,
            message
        ),
        CoreError::Network(_) => miette::miette!(
            help = "this is usually transient, retry in a moment; check that the backend is running and reachable (see `warble config show`)",
            "Could not reach the backend: {}",
            err
        ),
        _ => miette::Report::new(err),
    }
}
