use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::DownsampleTarget;
use crate::error::{OpenVttError, Result};

/// Long transcodes are expected; one hour by default
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Captured result of an external command that ran to completion
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// External command representation (ffmpeg, ffprobe, whisper engines)
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    pub timeout: Duration,
}

impl MediaCommand {
    /// Create a new command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").path(path)
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.path(path)
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Select an input stream
    pub fn map<S: Into<String>>(self, spec: S) -> Self {
        self.arg("-map").arg(spec)
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Set subtitle codec
    pub fn subtitle_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:s").arg(codec)
    }

    pub fn audio_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-b:a").arg(bitrate)
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Run the command and capture its output regardless of exit status.
    ///
    /// Only a missing executable, a spawn failure or a timeout is an error here.
    pub async fn run(&self) -> Result<CommandOutput> {
        debug!("Executing external command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(OpenVttError::CommandTimeout(format!(
                    "{} exceeded {}s",
                    self.description,
                    self.timeout.as_secs()
                )))
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OpenVttError::CommandNotFound(self.binary_path.clone()))
            }
            Ok(Err(e)) => {
                return Err(OpenVttError::Media(format!(
                    "Failed to execute {}: {}",
                    self.binary_path, e
                )))
            }
            Ok(Ok(output)) => output,
        };

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run the command, treating a non-zero exit as failure
    pub async fn execute(&self) -> Result<CommandOutput> {
        let output = self.run().await?;

        if !output.success {
            return Err(OpenVttError::Media(format!(
                "{} failed: {}",
                self.description,
                output.stderr.trim()
            )));
        }

        Ok(output)
    }
}

/// Builder for the ffmpeg/ffprobe invocations the pipeline needs
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
}

impl MediaCommandBuilder {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        ffmpeg_path: S1,
        ffprobe_path: S2,
        timeout: Duration,
    ) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    /// Build structured metadata dump command
    pub fn probe<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Media probe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .path(video_path)
            .timeout(self.timeout)
    }

    /// Build command remuxing the first subtitle stream as WebVTT
    pub fn extract_subtitles<P: AsRef<Path>>(&self, video_path: P, output_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Subtitle extraction")
            .overwrite()
            .input(video_path)
            .map("0:s:0")
            .subtitle_codec("webvtt")
            .output(output_path)
            .timeout(self.timeout)
    }

    /// Build a re-encode at the target's frame rate, fit within its resolution
    pub fn downsample<P: AsRef<Path>>(
        &self,
        video_path: P,
        output_path: P,
        target: &DownsampleTarget,
        (width, height): (u32, u32),
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, format!("Downsample to {}", target.label))
            .overwrite()
            .input(video_path)
            .video_filter(format!(
                "fps={},scale={}:{}:force_original_aspect_ratio=decrease",
                target.fps, width, height
            ))
            .video_codec("libx264")
            .args(["-crf", "28", "-preset", "fast"])
            .audio_codec("aac")
            .audio_bitrate("128k")
            .output(output_path)
            .timeout(self.timeout)
    }

    /// Build version check command for ffmpeg
    pub fn ffmpeg_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "ffmpeg version check").arg("-version")
    }

    /// Build version check command for ffprobe
    pub fn ffprobe_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "ffprobe version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> MediaCommandBuilder {
        MediaCommandBuilder::new("ffmpeg", "ffprobe", DEFAULT_TIMEOUT)
    }

    #[test]
    fn test_probe_command() {
        let cmd = builder().probe("clip.mp4");
        assert_eq!(cmd.binary_path, "ffprobe");
        assert_eq!(
            cmd.args,
            vec!["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams", "clip.mp4"]
        );
    }

    #[test]
    fn test_extract_subtitles_command() {
        let cmd = builder().extract_subtitles("in.mkv", "out.vtt");
        assert_eq!(
            cmd.args,
            vec!["-y", "-i", "in.mkv", "-map", "0:s:0", "-c:s", "webvtt", "out.vtt"]
        );
    }

    #[test]
    fn test_downsample_command() {
        let target = DownsampleTarget::new(5.0, "1280x720", "5fps 720p");
        let cmd = builder().downsample("in.mp4", "out.mp4", &target, (1280, 720));

        assert_eq!(cmd.description, "Downsample to 5fps 720p");
        assert_eq!(
            cmd.args,
            vec![
                "-y", "-i", "in.mp4",
                "-vf", "fps=5,scale=1280:720:force_original_aspect_ratio=decrease",
                "-c:v", "libx264", "-crf", "28", "-preset", "fast",
                "-c:a", "aac", "-b:a", "128k",
                "out.mp4",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let result = MediaCommand::new("open-vtt-no-such-binary", "Missing").run().await;
        assert!(matches!(result, Err(OpenVttError::CommandNotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit() {
        let cmd = MediaCommand::new("false", "Always fails");

        let output = cmd.run().await.unwrap();
        assert!(!output.success);
        assert!(matches!(cmd.execute().await, Err(OpenVttError::Media(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let result = MediaCommand::new("sleep", "Slow command")
            .arg("5")
            .timeout(Duration::from_millis(100))
            .run()
            .await;

        assert!(matches!(result, Err(OpenVttError::CommandTimeout(_))));
    }
}
