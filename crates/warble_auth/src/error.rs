//! Error types for warble-auth.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for auth storage operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur while reading or writing stored credentials.
#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    /// Database error from sqlx.
    #[error("Database error: {0}")]
    #[diagnostic(code(warble_auth::database))]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    #[diagnostic(code(warble_auth::migration))]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO error.
    #[error("IO error: {0}")]
    #[diagnostic(code(warble_auth::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(warble_auth::serde))]
    Serde(#[from] serde_json::Error),
}
