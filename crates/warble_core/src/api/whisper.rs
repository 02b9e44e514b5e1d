//! Audio transcription endpoint.

use crate::client::{ApiClient, FilePart};
use crate::error::{CoreError, Result};
use crate::models::Transcription;

/// Typed client for `/whisper/transcribe`.
#[derive(Clone)]
pub struct WhisperClient {
    client: ApiClient,
}

impl WhisperClient {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Upload an audio file and return its transcript.
    ///
    /// The backend reports transcription failures in-band, inside a
    /// successful response body; those surface as
    /// [`CoreError::Transcription`] instead of being handed back as text.
    pub async fn transcribe(&self, file_name: &str, mime: &str, bytes: Vec<u8>) -> Result<String> {
        let file = FilePart::new("file", file_name, mime, bytes);
        let transcription: Transcription =
            self.client.post_multipart("/whisper/transcribe", file).await?;

        if let Some(error) = transcription.error {
            return Err(CoreError::Transcription { message: error });
        }
        transcription.text.ok_or_else(|| CoreError::Transcription {
            message: "backend returned neither text nor error".to_string(),
        })
    }
}
