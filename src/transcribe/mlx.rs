// mlx-whisper implementation, Metal-accelerated on Apple Silicon

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::{common::run_whisper_cli, Transcriber, Transcription};
use crate::error::{OpenVttError, Result};
use crate::media::MediaCommand;

const BINARY: &str = "mlx_whisper";

pub struct MlxWhisperTranscriber {
    model: String,
    timeout: Duration,
}

impl MlxWhisperTranscriber {
    pub fn new(model: String, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    fn command(&self, media_path: &Path, output_dir: &Path, language: &str) -> MediaCommand {
        MediaCommand::new(BINARY, "mlx-whisper transcription")
            .path(media_path)
            .arg("--model").arg(&self.model)
            .arg("--language").arg(language)
            .arg("--output-format").arg("json")
            .arg("--output-dir").path(output_dir)
            .timeout(self.timeout)
    }
}

#[async_trait]
impl Transcriber for MlxWhisperTranscriber {
    fn name(&self) -> &'static str {
        "mlx-whisper"
    }

    async fn is_available(&self) -> bool {
        MediaCommand::new(BINARY, "mlx-whisper availability")
            .arg("--help")
            .timeout(Duration::from_secs(30))
            .execute()
            .await
            .is_ok()
    }

    async fn transcribe(&self, media_path: &Path, language: &str) -> Result<Transcription> {
        info!("Transcribing with mlx-whisper ({}), language: {}", self.model, language);

        let temp_dir = tempfile::tempdir()
            .map_err(|e| OpenVttError::Transcription(format!("Failed to create temp directory: {}", e)))?;

        let command = self.command(media_path, temp_dir.path(), language);
        run_whisper_cli(command, media_path, temp_dir.path(), language).await
    }
}
