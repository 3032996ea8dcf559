use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{OpenVttError, Result};
use crate::media::MediaCommand;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub segments: Vec<TranscriptionSegment>,
    pub language: String,
}

// Structs for parsing whisper JSON output (shared by openai-whisper and mlx-whisper)
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
}

/// Parse a whisper JSON result
pub fn parse_whisper_json(json: &str, fallback_language: &str) -> Result<Transcription> {
    let output: WhisperOutput = serde_json::from_str(json)
        .map_err(|e| OpenVttError::Transcription(format!("Failed to parse transcription JSON: {}", e)))?;

    let segments = output
        .segments
        .into_iter()
        .map(|seg| TranscriptionSegment {
            start: seg.start,
            end: seg.end,
            text: seg.text.trim().to_string(),
        })
        .collect();

    Ok(Transcription {
        segments,
        language: output
            .language
            .unwrap_or_else(|| fallback_language.to_string()),
    })
}

/// Run a whisper-style CLI that writes `<output_dir>/<media stem>.json`
pub async fn run_whisper_cli(
    command: MediaCommand,
    media_path: &Path,
    output_dir: &Path,
    language: &str,
) -> Result<Transcription> {
    let output = command.run().await?;

    if !output.success {
        return Err(OpenVttError::Transcription(format!(
            "{} failed: {}",
            command.description,
            output.stderr.trim()
        )));
    }

    let stem = media_path
        .file_stem()
        .ok_or_else(|| OpenVttError::Transcription("Invalid media filename".to_string()))?;
    let json_file = output_dir.join(format!("{}.json", stem.to_string_lossy()));
    debug!("Reading transcription output from {}", json_file.display());

    let json_content = tokio::fs::read_to_string(&json_file).await.map_err(|e| {
        OpenVttError::Transcription(format!("Failed to read transcription output: {}", e))
    })?;

    parse_whisper_json(&json_content, language)
}
