// Media processing over external tools
//
// - Commands: external command builder and execution with timeouts
// - Probe: metadata model parsed from the probe tool's JSON
// - Processor: ffmpeg/ffprobe implementation of MediaToolkit

pub mod commands;
pub mod probe;
pub mod processor;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::path::Path;

pub use commands::*;
pub use probe::*;
pub use processor::*;

use crate::config::{DownsampleTarget, MediaConfig};
use crate::error::Result;

/// Media inspection and transcoding operations used by the pipeline
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Inspect duration, size and stream presence
    async fn probe(&self, video_path: &Path) -> Result<ProbeResult>;

    /// Remux the first embedded subtitle stream into a WebVTT file
    async fn extract_subtitles(&self, video_path: &Path, output_path: &Path) -> Result<()>;

    /// Re-encode at the target's frame rate and resolution
    async fn downsample(
        &self,
        video_path: &Path,
        output_path: &Path,
        target: &DownsampleTarget,
    ) -> Result<()>;

    /// First line of `ffmpeg -version`
    async fn ffmpeg_version(&self) -> Result<String>;

    /// First line of `ffprobe -version`
    async fn ffprobe_version(&self) -> Result<String>;
}

/// Factory for creating media toolkit instances
pub struct MediaToolkitFactory;

impl MediaToolkitFactory {
    /// Create the default toolkit (ffmpeg/ffprobe based)
    pub fn create(config: MediaConfig) -> Box<dyn MediaToolkit> {
        Box::new(FfmpegToolkit::new(config))
    }
}
