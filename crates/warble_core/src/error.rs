use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration-specific errors
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(String),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Login rejected ({status}): {message}")]
    #[diagnostic(
        code(warble_core::invalid_credentials),
        help("Check the username and password and try again")
    )]
    InvalidCredentials { status: u16, message: String },

    #[error("No refresh token available")]
    #[diagnostic(
        code(warble_core::no_refresh_token),
        help("Log in to obtain a new token pair")
    )]
    NoRefreshToken,

    #[error("Token refresh failed: {reason}")]
    #[diagnostic(
        code(warble_core::refresh_failed),
        help("Stored credentials have been cleared; log in again")
    )]
    RefreshFailed { status: Option<u16>, reason: String },

    #[error("Session expired")]
    #[diagnostic(
        code(warble_core::session_expired),
        help("Log in again to continue")
    )]
    SessionExpired {
        #[source]
        cause: Box<CoreError>,
    },

    #[error("Network error: {0}")]
    #[diagnostic(
        code(warble_core::network_error),
        help("Check connectivity to the backend and retry")
    )]
    Network(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    #[diagnostic(code(warble_core::api_error))]
    Api { status: u16, body: String },

    #[error("Failed to decode response into {expected}:\n {details}")]
    #[diagnostic(
        code(warble_core::decode_error),
        help("The backend may be running a different version than this client")
    )]
    Decode {
        expected: &'static str,
        details: String,
    },

    #[error("Serialization error")]
    #[diagnostic(
        code(warble_core::serialization_error),
        help("Failed to serialize/deserialize {data_type}")
    )]
    Serialization {
        data_type: String,
        #[source]
        cause: serde_json::Error,
    },

    #[error("Transcription failed: {message}")]
    #[diagnostic(
        code(warble_core::transcription_failed),
        help("The backend could not transcribe the uploaded audio")
    )]
    Transcription { message: String },

    #[error("Credential store error: {0}")]
    #[diagnostic(
        code(warble_core::store_error),
        help("Check the auth database file and its permissions")
    )]
    Store(#[from] warble_auth::AuthError),

    #[error("Configuration error for field '{field}'")]
    #[diagnostic(
        code(warble_core::configuration_error),
        help("Check configuration file at {config_path}\nExpected: {expected}")
    )]
    ConfigurationError {
        config_path: String,
        field: String,
        expected: String,
        #[source]
        cause: ConfigError,
    },

    #[error("Invalid base URL: {url}")]
    #[diagnostic(
        code(warble_core::invalid_base_url),
        help("Set [server] base_url in warble.toml (or WARBLE_BASE_URL) to an absolute http(s) URL")
    )]
    InvalidBaseUrl { url: String, details: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;

// Helper functions for creating common errors with context
impl CoreError {
    pub fn session_expired(cause: CoreError) -> Self {
        Self::SessionExpired {
            cause: Box::new(cause),
        }
    }

    pub fn serialization(data_type: impl Into<String>, cause: serde_json::Error) -> Self {
        Self::Serialization {
            data_type: data_type.into(),
            cause,
        }
    }

    /// Whether this error means the caller must re-authenticate.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired { .. }
                | Self::NoRefreshToken
                | Self::RefreshFailed { .. }
                | Self::InvalidCredentials { .. }
        )
    }
}
