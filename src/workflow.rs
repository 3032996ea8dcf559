use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{error, info};
use uuid::Uuid;

use crate::acquire::SubtitleAcquirer;
use crate::config::Config;
use crate::credentials::resolve_api_key;
use crate::enhance::{GeminiClient, GenerativeClient, SubtitleEnhancer};
use crate::error::{OpenVttError, Result};
use crate::media::{MediaToolkit, MediaToolkitFactory};
use crate::reduce::VideoReducer;
use crate::subtitle::parse_vtt;
use crate::transcribe::{Transcriber, TranscriberFactory};

/// Paths produced by one conversion run
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub session_id: String,
    /// Baseline subtitles, left on disk
    pub subtitles_path: PathBuf,
    /// Reduced video, when one was produced
    pub downsampled_path: Option<PathBuf>,
    pub log_path: PathBuf,
    pub vtt_path: PathBuf,
}

/// Short random token namespacing one run's intermediate files
pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// `<dir>/<base>.<ext>`, or `<base>-N.<ext>` with the first unused N.
/// An explicit path is returned as given.
pub fn unique_output_path(base: &str, extension: &str, dir: &Path, specified: Option<&Path>) -> PathBuf {
    if let Some(path) = specified {
        return path.to_path_buf();
    }

    let mut candidate = dir.join(format!("{}.{}", base, extension));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}-{}.{}", base, counter, extension));
        counter += 1;
    }

    candidate
}

/// Use the path as given when it exists, else look for it in the media directory
pub fn resolve_input(input: &Path, media_dir: &Path) -> Result<PathBuf> {
    if input.exists() {
        return Ok(input.to_path_buf());
    }

    let candidate = media_dir.join(input);
    if candidate.exists() {
        return Ok(candidate);
    }

    Err(OpenVttError::FileNotFound(format!(
        "{} (searched in . and {})",
        input.display(),
        media_dir.display()
    )))
}

/// Conversion pipeline: probe, acquire baseline subtitles, reduce, enhance
pub struct Workflow {
    config: Config,
    app_dir: PathBuf,
    media: Box<dyn MediaToolkit>,
    transcriber: Option<Box<dyn Transcriber>>,
    client: Box<dyn GenerativeClient>,
}

impl Workflow {
    pub fn new(
        config: Config,
        app_dir: PathBuf,
        media: Box<dyn MediaToolkit>,
        transcriber: Option<Box<dyn Transcriber>>,
        client: Box<dyn GenerativeClient>,
    ) -> Self {
        Self {
            config,
            app_dir,
            media,
            transcriber,
            client,
        }
    }

    /// Wire up the real tools: ffmpeg, the first available whisper engine and Gemini
    pub async fn from_config(config: Config, app_dir: PathBuf) -> Result<Self> {
        let api_key = resolve_api_key(&app_dir).ok_or(OpenVttError::MissingApiKey)?;
        let client = GeminiClient::new(api_key, &config.gemini)?;

        let timeout = Duration::from_secs(config.media.timeout_secs);
        let transcriber = TranscriberFactory::detect(&config.transcription, timeout).await;
        let media = MediaToolkitFactory::create(config.media.clone());

        Ok(Self::new(config, app_dir, media, transcriber, Box::new(client)))
    }

    pub fn media_dir(&self) -> PathBuf {
        self.config.files.resolve_media_dir(&self.app_dir)
    }

    /// Convert one video into an enhanced WebVTT file
    pub async fn convert(&self, input: &Path, output_vtt: Option<&Path>) -> Result<ConversionReport> {
        let video_path = resolve_input(input, &self.media_dir())?;

        let session_id = new_session_id();
        let base_name = video_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| OpenVttError::FileNotFound(video_path.display().to_string()))?
            .to_string();
        let work_dir = video_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        info!("Session: {}", session_id);
        info!("Input: {}", video_path.display());
        info!("Working Directory: {}", work_dir.display());

        let prompt_path = self
            .config
            .files
            .resolve_prompt(&self.app_dir)
            .ok_or_else(|| {
                OpenVttError::FileNotFound(format!("Prompt file not found: {}", self.config.files.prompt))
            })?;

        let probe = self.media.probe(&video_path).await?;

        let subtitles_path = work_dir.join(format!("{}-subtitles-{}.vtt", base_name, session_id));
        let acquirer = SubtitleAcquirer::new(
            self.media.as_ref(),
            self.transcriber.as_deref(),
            &self.config.transcription.language,
        );
        acquirer.acquire(&video_path, &probe, &subtitles_path).await?;

        let downsampled_path = work_dir.join(format!("{}-downsampled-{}.mp4", base_name, session_id));
        let reducer = VideoReducer::new(
            self.media.as_ref(),
            &self.config.video.downsample_targets,
            self.config.video.max_size_mb,
        );
        let final_video = reducer.reduce(&video_path, &downsampled_path).await?;

        let enhancer = SubtitleEnhancer::new(self.client.as_ref(), &self.config.gemini);
        let result = enhancer
            .enhance(&prompt_path, &subtitles_path, &final_video)
            .await?;

        let log_path = unique_output_path(&base_name, "log", &work_dir, None);
        fs::write(&log_path, &result.raw).await?;
        info!("Full response saved to: {}", log_path.display());

        let cues = parse_vtt(&result.vtt)
            .and_then(|cues| {
                if cues.is_empty() {
                    Err(OpenVttError::InvalidSubtitle("document has no cues".to_string()))
                } else {
                    Ok(cues)
                }
            })
            .map_err(|e| {
                error!("Model response did not contain a valid WebVTT document: {}", e);
                error!("Inspect the full response in {}", log_path.display());
                e
            })?;

        let vtt_path = unique_output_path(&base_name, "vtt", &work_dir, output_vtt);
        fs::write(&vtt_path, &result.vtt).await?;
        info!("Enhanced VTT saved to: {} ({} cues)", vtt_path.display(), cues.len());

        let report = ConversionReport {
            session_id,
            subtitles_path,
            downsampled_path: (final_video != video_path).then_some(downsampled_path),
            log_path,
            vtt_path,
        };
        log_summary(&report);

        Ok(report)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn log_summary(report: &ConversionReport) {
    info!("Conversion complete! (session {})", report.session_id);
    info!("Temp files: {}", file_name(&report.subtitles_path));
    if let Some(downsampled) = &report.downsampled_path {
        info!("           {}", file_name(downsampled));
    }
    info!("Log: {}", report.log_path.display());
    info!("VTT: {}", report.vtt_path.display());
    info!("Run with --serve to test in player");
}
