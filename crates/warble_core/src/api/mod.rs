//! Typed clients for the backend's resource endpoints.
//!
//! Thin wrappers over [`ApiClient`](crate::client::ApiClient). None of them
//! carry auth or retry logic of their own; that contract lives entirely in
//! the client they wrap.

mod tasks;
mod whisper;

pub use tasks::TasksClient;
pub use whisper::WhisperClient;
