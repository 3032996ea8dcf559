use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{file_size_mb, MediaCommand, MediaCommandBuilder, MediaToolkit, ProbeResult};
use crate::config::{DownsampleTarget, MediaConfig};
use crate::error::{OpenVttError, Result};

/// ffmpeg/ffprobe implementation of the media toolkit
pub struct FfmpegToolkit {
    command_builder: MediaCommandBuilder,
}

impl FfmpegToolkit {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(
            config.ffmpeg_path,
            config.ffprobe_path,
            Duration::from_secs(config.timeout_secs),
        );

        Self { command_builder }
    }

    async fn first_line_of(command: MediaCommand) -> Result<String> {
        let output = command.execute().await?;
        let first_line = output.stdout.lines().next().unwrap_or("found");
        Ok(first_line.chars().take(60).collect())
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, video_path: &Path) -> Result<ProbeResult> {
        info!("Checking video: {}", video_path.display());

        let output = self
            .command_builder
            .probe(video_path)
            .execute()
            .await
            .map_err(|e| OpenVttError::Probe(format!("ffprobe failed: {}", e)))?;

        let result = ProbeResult::parse(&output.stdout, file_size_mb(video_path)?)?;

        info!(
            "Duration: {:.1}s, Size: {:.1}MB, Audio: {}, Subtitles: {}",
            result.duration, result.size_mb, result.has_audio, result.has_subtitles
        );
        Ok(result)
    }

    async fn extract_subtitles(&self, video_path: &Path, output_path: &Path) -> Result<()> {
        info!("Extracting embedded subtitles to {}", output_path.display());

        let output = self
            .command_builder
            .extract_subtitles(video_path, output_path)
            .run()
            .await?;

        if !output.success {
            return Err(OpenVttError::Media(format!(
                "Subtitle extraction failed: {}",
                output.stderr.trim()
            )));
        }

        let written = std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(OpenVttError::Media(
                "Subtitle extraction produced no output".to_string(),
            ));
        }

        debug!("Extracted {} bytes of subtitles", written);
        Ok(())
    }

    async fn downsample(
        &self,
        video_path: &Path,
        output_path: &Path,
        target: &DownsampleTarget,
    ) -> Result<()> {
        let dimensions = target.dimensions().ok_or_else(|| {
            OpenVttError::Config(format!(
                "Invalid resolution '{}' for preset {}",
                target.resolution, target.label
            ))
        })?;

        self.command_builder
            .downsample(video_path, output_path, target, dimensions)
            .execute()
            .await?;

        Ok(())
    }

    async fn ffmpeg_version(&self) -> Result<String> {
        Self::first_line_of(self.command_builder.ffmpeg_version()).await
    }

    async fn ffprobe_version(&self) -> Result<String> {
        Self::first_line_of(self.command_builder.ffprobe_version()).await
    }
}
