// OpenAI Whisper command-line implementation

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::{common::run_whisper_cli, Transcriber, Transcription};
use crate::error::{OpenVttError, Result};
use crate::media::MediaCommand;

const BINARY: &str = "whisper";

/// OpenAI Whisper implementation
pub struct OpenAIWhisperTranscriber {
    model: String,
    timeout: Duration,
}

impl OpenAIWhisperTranscriber {
    pub fn new(model: String, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    fn command(&self, media_path: &Path, output_dir: &Path, language: &str) -> MediaCommand {
        MediaCommand::new(BINARY, "OpenAI Whisper transcription")
            .path(media_path)
            .arg("--model").arg(&self.model)
            .arg("--language").arg(language)
            .arg("--output_format").arg("json")
            .arg("--output_dir").path(output_dir)
            .timeout(self.timeout)
    }
}

#[async_trait]
impl Transcriber for OpenAIWhisperTranscriber {
    fn name(&self) -> &'static str {
        "openai-whisper"
    }

    async fn is_available(&self) -> bool {
        MediaCommand::new(BINARY, "OpenAI Whisper availability")
            .arg("--help")
            .timeout(Duration::from_secs(30))
            .execute()
            .await
            .is_ok()
    }

    async fn transcribe(&self, media_path: &Path, language: &str) -> Result<Transcription> {
        info!("Transcribing with openai-whisper ({}), language: {}", self.model, language);

        // Create temporary output directory for whisper results
        let temp_dir = tempfile::tempdir()
            .map_err(|e| OpenVttError::Transcription(format!("Failed to create temp directory: {}", e)))?;

        let command = self.command(media_path, temp_dir.path(), language);
        run_whisper_cli(command, media_path, temp_dir.path(), language).await
    }
}
