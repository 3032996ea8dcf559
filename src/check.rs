use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::credentials::resolve_api_key;
use crate::media::MediaToolkit;
use crate::transcribe::Transcriber;

/// Outcome of the dependency health check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    /// First line of `ffmpeg -version`, when found
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
    /// Name of the transcription engine that would be used
    pub transcriber: Option<&'static str>,
    pub api_key: bool,
    pub prompt: Option<PathBuf>,
    pub platform: String,
}

impl CheckReport {
    /// ffmpeg, ffprobe and some transcription engine are required; the rest only warns
    pub fn all_ok(&self) -> bool {
        self.ffmpeg.is_some() && self.ffprobe.is_some() && self.transcriber.is_some()
    }
}

/// `os arch`, with Apple Silicon called out
pub fn platform_description() -> String {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    if os == "macos" && arch == "aarch64" {
        format!("{} {} (Apple Silicon - Metal acceleration available)", os, arch)
    } else {
        format!("{} {}", os, arch)
    }
}

/// Probe every dependency and log one line per item
pub async fn run_check(
    config: &Config,
    app_dir: &Path,
    media: &dyn MediaToolkit,
    transcriber: Option<&dyn Transcriber>,
) -> CheckReport {
    info!("System Check");

    let ffmpeg = match media.ffmpeg_version().await {
        Ok(version) => {
            info!("ffmpeg: {}", version);
            Some(version)
        }
        Err(e) => {
            error!("ffmpeg: not found ({})", e);
            None
        }
    };

    let ffprobe = match media.ffprobe_version().await {
        Ok(version) => {
            info!("ffprobe: {}", version);
            Some(version)
        }
        Err(e) => {
            error!("ffprobe: not found ({})", e);
            None
        }
    };

    let transcriber = transcriber.map(|t| t.name());
    match transcriber {
        Some("mlx-whisper") => info!("mlx-whisper: available (Apple Silicon optimized)"),
        Some(name) => warn!("{}: available, but mlx-whisper is faster on Apple Silicon", name),
        None => error!("whisper: not installed (pip install mlx-whisper or openai-whisper)"),
    }

    let api_key = resolve_api_key(app_dir).is_some();
    if api_key {
        info!("GEMINI_API_KEY: configured");
    } else {
        warn!("GEMINI_API_KEY: not configured (required for --convert)");
    }

    let prompt = config.files.resolve_prompt(app_dir);
    match &prompt {
        Some(path) => info!("Prompt template: {}", path.display()),
        None => warn!("Prompt template: {} not found (required for --convert)", config.files.prompt),
    }

    let platform = platform_description();
    info!("Hardware: {}", platform);

    let report = CheckReport {
        ffmpeg,
        ffprobe,
        transcriber,
        api_key,
        prompt,
        platform,
    };

    if report.all_ok() {
        info!("All dependencies satisfied!");
    } else {
        warn!("Some dependencies missing - see above");
    }

    report
}
