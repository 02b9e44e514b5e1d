//! Audio transcription command.

use miette::Result;
use owo_colors::OwoColorize;
use std::path::Path;
use warble_core::WarbleConfig;

use crate::helpers::{describe_api_error, get_whisper_client};
use crate::output::Output;

/// Upload an audio file and print the transcript.
pub async fn run(file: &Path, config: &WarbleConfig) -> Result<()> {
    let output = Output::new();

    output.section(&format!(
        "Transcribe: {}",
        file.display().to_string().bright_cyan()
    ));

    let bytes = tokio::fs::read(file)
        .await
        .map_err(|e| miette::miette!("Failed to read {}: {}", file.display(), e))?;

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio")
        .to_string();

    let mime = guess_mime(file);
    if mime == "application/octet-stream" {
        output.warning("Unrecognized audio extension; uploading as raw bytes");
    }

    let whisper = get_whisper_client(config).await?;

    output.status(&format!("Uploading {} bytes...", bytes.len()));

    let text = whisper
        .transcribe(&file_name, mime, bytes)
        .await
        .map_err(describe_api_error)?;

    output.print("");
    output.success("Transcription complete");
    output.print("");
    output.print(&text);

    Ok(())
}

/// Guess an audio MIME type from the file extension.
///
/// Only needs to be close enough for the multipart header; the backend
/// inspects the content itself.
fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/m4a",
        Some("aac") => "audio/aac",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}
