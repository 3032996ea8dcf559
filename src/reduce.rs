use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::DownsampleTarget;
use crate::error::{OpenVttError, Result};
use crate::media::{file_size_mb, MediaToolkit};

/// Shrinks a video under an upload ceiling by walking a preset ladder
pub struct VideoReducer<'a> {
    media: &'a dyn MediaToolkit,
    targets: &'a [DownsampleTarget],
    max_size_mb: f64,
}

impl<'a> VideoReducer<'a> {
    pub fn new(media: &'a dyn MediaToolkit, targets: &'a [DownsampleTarget], max_size_mb: f64) -> Self {
        Self {
            media,
            targets,
            max_size_mb,
        }
    }

    /// Return a path to a video no larger than the ceiling.
    ///
    /// The original path is returned untouched when it already fits. Otherwise
    /// presets are tried strictly in order and the first output under the
    /// ceiling wins.
    pub async fn reduce(&self, video_path: &Path, output_path: &Path) -> Result<PathBuf> {
        let size_mb = file_size_mb(video_path)?;

        if size_mb <= self.max_size_mb {
            info!("Video is {:.1}MB - no downsampling needed", size_mb);
            return Ok(video_path.to_path_buf());
        }

        info!(
            "Video is {:.1}MB - downsampling to fit under {}MB",
            size_mb, self.max_size_mb
        );

        for target in self.targets {
            info!("Trying {}...", target.label);

            if let Err(e) = self.media.downsample(video_path, output_path, target).await {
                warn!("Downsampling failed for {}: {}", target.label, e);
                continue;
            }

            let new_size = match file_size_mb(output_path) {
                Ok(size) => size,
                Err(e) => {
                    warn!("No output for {}: {}", target.label, e);
                    continue;
                }
            };

            if new_size <= self.max_size_mb {
                info!("Downsampled to {:.1}MB ({})", new_size, target.label);
                return Ok(output_path.to_path_buf());
            }

            warn!("Still {:.1}MB - trying lower quality", new_size);
        }

        error!("Could not downsample video under size limit");
        Err(OpenVttError::SizeLimit {
            limit_mb: self.max_size_mb,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaToolkit;

    const MB: usize = 1024 * 1024;

    fn targets() -> Vec<DownsampleTarget> {
        vec![
            DownsampleTarget::new(10.0, "1920x1080", "10fps 1080p"),
            DownsampleTarget::new(5.0, "1280x720", "5fps 720p"),
            DownsampleTarget::new(1.0, "854x480", "1fps 480p"),
        ]
    }

    fn write_file(path: &Path, bytes: usize) {
        std::fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[tokio::test]
    async fn test_small_video_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("small.mp4");
        write_file(&input, MB / 2);

        let media = MockMediaToolkit::new();
        let targets = targets();
        let reducer = VideoReducer::new(&media, &targets, 1.0);

        let result = reducer.reduce(&input, &dir.path().join("out.mp4")).await.unwrap();
        assert_eq!(result, input);
    }

    #[tokio::test]
    async fn test_stops_at_first_preset_under_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("big.mp4");
        let output = dir.path().join("out.mp4");
        write_file(&input, 3 * MB);

        let mut media = MockMediaToolkit::new();
        media
            .expect_downsample()
            .times(2)
            .returning(|_, out, target| {
                let bytes = if target.label == "10fps 1080p" { 2 * MB } else { MB / 2 };
                std::fs::write(out, vec![0u8; bytes]).unwrap();
                Ok(())
            });

        let targets = targets();
        let reducer = VideoReducer::new(&media, &targets, 1.0);

        let result = reducer.reduce(&input, &output).await.unwrap();
        assert_eq!(result, output);
    }

    #[tokio::test]
    async fn test_transcoder_failure_moves_to_next_preset() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("big.mp4");
        let output = dir.path().join("out.mp4");
        write_file(&input, 3 * MB);

        let mut media = MockMediaToolkit::new();
        media
            .expect_downsample()
            .times(2)
            .returning(|_, out, target| {
                if target.label == "10fps 1080p" {
                    return Err(OpenVttError::Media("encoder crashed".to_string()));
                }
                std::fs::write(out, vec![0u8; MB / 4]).unwrap();
                Ok(())
            });

        let targets = targets();
        let reducer = VideoReducer::new(&media, &targets, 1.0);

        assert_eq!(reducer.reduce(&input, &output).await.unwrap(), output);
    }

    #[tokio::test]
    async fn test_fails_when_no_preset_fits() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("big.mp4");
        write_file(&input, 3 * MB);

        let mut media = MockMediaToolkit::new();
        media
            .expect_downsample()
            .times(3)
            .returning(|_, out, _| {
                std::fs::write(out, vec![0u8; 2 * MB]).unwrap();
                Ok(())
            });

        let targets = targets();
        let reducer = VideoReducer::new(&media, &targets, 1.0);

        let result = reducer.reduce(&input, &dir.path().join("out.mp4")).await;
        assert!(matches!(result, Err(OpenVttError::SizeLimit { .. })));
    }

    #[tokio::test]
    async fn test_empty_preset_list_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("big.mp4");
        write_file(&input, 3 * MB);

        let media = MockMediaToolkit::new();
        let reducer = VideoReducer::new(&media, &[], 1.0);

        assert!(reducer.reduce(&input, &dir.path().join("out.mp4")).await.is_err());
    }
}
