// Subtitle enhancement through a multimodal generative model
//
// - Gemini: REST client for file upload, state lookup and generation
// - Cost: token and dollar estimates for log lines
//
// The enhancer owns the call sequence: upload, wait for processing, allow for
// propagation, generate, then pull the WebVTT document out of the response.

pub mod cost;
pub mod gemini;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{error, info, warn};

pub use gemini::GeminiClient;

use crate::config::GeminiConfig;
use crate::error::{OpenVttError, Result};
use crate::media::file_size_mb;
use crate::subtitle::extract_vtt;

/// Placeholder in the prompt template replaced by the reasoning-effort label
pub const THINKING_PLACEHOLDER: &str = "{{THINKING_LEVEL}}";

/// Grounding source that maps to the search tool
pub const GOOGLE_SEARCH_SOURCE: &str = "google_search";

/// Processing state of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Handle to a video uploaded to the model service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub state: FileState,
}

/// Token accounting reported with a generation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub usage: Option<UsageMetadata>,
}

/// Per-call generation settings
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// Attach the search tool to the request
    pub google_search: bool,
}

impl GenerationOptions {
    pub fn from_config(config: &GeminiConfig) -> Self {
        let grounding = &config.grounding;
        let google_search = grounding.enabled && grounding.source == GOOGLE_SEARCH_SOURCE;
        if grounding.enabled && !google_search {
            warn!("Unsupported grounding source '{}', grounding disabled", grounding.source);
        }

        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            google_search,
        }
    }
}

/// Full model response and the WebVTT document extracted from it
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementResult {
    pub raw: String,
    pub vtt: String,
}

/// Remote generative model operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Upload a local file; the returned handle may still be processing
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile>;

    /// Fetch the current state of an uploaded file
    async fn get_file(&self, name: &str) -> Result<RemoteFile>;

    /// Generate text from an uploaded file and a prompt
    async fn generate(
        &self,
        file: &RemoteFile,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation>;
}

/// Video MIME type from the file extension
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        _ => "video/mp4",
    }
}

/// Substitute the thinking label into the template
pub fn apply_thinking_level(template: &str, thinking: &str) -> String {
    template.replace(THINKING_PLACEHOLDER, &thinking.to_uppercase())
}

/// Template, baseline subtitles and the attachment note, in that order
pub fn build_prompt(template: &str, subtitles: &str) -> String {
    format!(
        "{template}\n\n---\n\n## Baseline VTT Input\n\n```vtt\n{subtitles}\n```\n\n---\n\n## Video File\n\nThe video file is attached. Please analyze it and generate the enhanced VTT.\n"
    )
}

pub struct SubtitleEnhancer<'a> {
    client: &'a dyn GenerativeClient,
    config: &'a GeminiConfig,
}

impl<'a> SubtitleEnhancer<'a> {
    pub fn new(client: &'a dyn GenerativeClient, config: &'a GeminiConfig) -> Self {
        Self { client, config }
    }

    /// Run one enhancement call for the baseline subtitles and the video
    pub async fn enhance(
        &self,
        prompt_path: &Path,
        subtitles_path: &Path,
        video_path: &Path,
    ) -> Result<EnhancementResult> {
        info!("Calling Gemini ({})...", self.config.model);

        let template = fs::read_to_string(prompt_path).await?;
        let template = apply_thinking_level(&template, &self.config.thinking);
        let subtitles = fs::read_to_string(subtitles_path).await?;

        let estimated = cost::estimate_input_tokens(&template, &subtitles, file_size_mb(video_path)?);
        info!("Estimated input: ~{} tokens", cost::group_thousands(estimated));

        let prompt = build_prompt(&template, &subtitles);

        info!("Uploading video to Gemini...");
        let uploaded = self.client.upload(video_path, mime_for_path(video_path)).await?;
        let file = self.wait_until_ready(uploaded).await?;
        info!("Video uploaded and processed");

        info!("Generating enhanced VTT...");
        let options = GenerationOptions::from_config(self.config);
        let generation = self.generate_with_retry(&file, &prompt, &options).await?;

        if let Some(usage) = generation.usage {
            let dollars = cost::estimate_cost(
                &self.config.model,
                usage.prompt_token_count,
                usage.candidates_token_count,
            );
            info!(
                "Actual usage: {} input, {} output tokens (${:.4})",
                cost::group_thousands(usage.prompt_token_count),
                cost::group_thousands(usage.candidates_token_count),
                dollars
            );
        }

        let vtt = extract_vtt(&generation.text);
        Ok(EnhancementResult {
            raw: generation.text,
            vtt,
        })
    }

    /// Poll the file state until it leaves processing
    pub async fn wait_until_ready(&self, mut file: RemoteFile) -> Result<RemoteFile> {
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Waiting for video processing...");

        while file.state == FileState::Processing {
            spinner.tick();
            tokio::time::sleep(interval).await;
            file = self.client.get_file(&file.name).await?;
        }
        spinner.finish_and_clear();

        if file.state == FileState::Failed {
            error!("Video processing failed");
            return Err(OpenVttError::RemoteProcessingFailed(file.name));
        }

        Ok(file)
    }

    async fn generate_with_retry(
        &self,
        file: &RemoteFile,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation> {
        let mut delay = Duration::from_secs(self.config.propagation_delay_secs);
        let mut retries_left = self.config.propagation_retries;

        loop {
            info!("Waiting {}s for file propagation...", delay.as_secs());
            tokio::time::sleep(delay).await;

            match self.client.generate(file, prompt, options).await {
                Err(OpenVttError::RemoteNotFound(detail)) => {
                    error!("Gemini returned 404 NOT_FOUND.");
                    error!("  Model: {}", options.model);
                    error!("  File URI: {}", file.uri);

                    if retries_left == 0 {
                        error!("The model name is invalid or the file never became available.");
                        return Err(OpenVttError::RemoteNotFound(detail));
                    }
                    retries_left -= 1;
                    delay = next_delay(delay);
                    warn!("Retrying generation, {} attempts left", retries_left + 1);
                }
                result => return result,
            }
        }
    }
}

/// Double a propagation delay, saturating at the largest `Duration`
fn next_delay(delay: Duration) -> Duration {
    delay.saturating_mul(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TEMPLATE: &str = "Enhance these subtitles. Thinking: {{THINKING_LEVEL}}";

    fn fast_config() -> GeminiConfig {
        let mut config = crate::config::Config::default().gemini;
        config.poll_interval_secs = 0;
        config.propagation_delay_secs = 0;
        config.propagation_retries = 2;
        config
    }

    fn remote(state: FileState) -> RemoteFile {
        RemoteFile {
            name: "files/abc123".to_string(),
            uri: "https://example.invalid/files/abc123".to_string(),
            mime_type: "video/mp4".to_string(),
            state,
        }
    }

    fn generation(text: &str) -> Generation {
        Generation {
            text: text.to_string(),
            usage: Some(UsageMetadata {
                prompt_token_count: 12000,
                candidates_token_count: 800,
            }),
        }
    }

    struct Inputs {
        _dir: tempfile::TempDir,
        prompt: PathBuf,
        subtitles: PathBuf,
        video: PathBuf,
    }

    fn inputs() -> Inputs {
        let dir = tempfile::tempdir().unwrap();
        let prompt = dir.path().join("prompt.md");
        let subtitles = dir.path().join("subs.vtt");
        let video = dir.path().join("clip.mov");
        std::fs::write(&prompt, TEMPLATE).unwrap();
        std::fs::write(&subtitles, "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nHi\n").unwrap();
        std::fs::write(&video, vec![0u8; 2048]).unwrap();

        Inputs {
            _dir: dir,
            prompt,
            subtitles,
            video,
        }
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.mp4")), "video/mp4");
        assert_eq!(mime_for_path(Path::new("a.MOV")), "video/quicktime");
        assert_eq!(mime_for_path(Path::new("a.mkv")), "video/x-matroska");
        assert_eq!(mime_for_path(Path::new("a.webm")), "video/webm");
        assert_eq!(mime_for_path(Path::new("a.avi")), "video/x-msvideo");
        assert_eq!(mime_for_path(Path::new("a")), "video/mp4");
    }

    #[test]
    fn test_build_prompt_layout() {
        let prompt = build_prompt("TEMPLATE", "WEBVTT\n");
        assert_eq!(
            prompt,
            "TEMPLATE\n\n---\n\n## Baseline VTT Input\n\n```vtt\nWEBVTT\n\n```\n\n---\n\n## Video File\n\nThe video file is attached. Please analyze it and generate the enhanced VTT.\n"
        );
    }

    #[test]
    fn test_thinking_level_is_upper_cased() {
        assert_eq!(apply_thinking_level(TEMPLATE, "high"), "Enhance these subtitles. Thinking: HIGH");
        assert_eq!(apply_thinking_level("no marker", "low"), "no marker");
    }

    #[test]
    fn test_generation_options_grounding() {
        let mut config = fast_config();
        assert!(GenerationOptions::from_config(&config).google_search);

        config.grounding.source = "vertex_search".to_string();
        assert!(!GenerationOptions::from_config(&config).google_search);

        config.grounding.source = GOOGLE_SEARCH_SOURCE.to_string();
        config.grounding.enabled = false;
        assert!(!GenerationOptions::from_config(&config).google_search);
    }

    #[test]
    fn test_unknown_file_state() {
        let file: RemoteFile =
            serde_json::from_str(r#"{"name":"files/x","state":"STATE_UNSPECIFIED"}"#).unwrap();
        assert_eq!(file.state, FileState::Unknown);

        let file: RemoteFile = serde_json::from_str(r#"{"name":"files/x","state":"ACTIVE"}"#).unwrap();
        assert_eq!(file.state, FileState::Active);
    }

    #[test]
    fn test_next_delay_doubles() {
        assert_eq!(next_delay(Duration::from_secs(5)), Duration::from_secs(10));
        assert_eq!(next_delay(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_next_delay_saturates_instead_of_overflowing() {
        assert_eq!(next_delay(Duration::MAX), Duration::MAX);
        assert_eq!(next_delay(Duration::from_secs(u64::MAX)), Duration::MAX);
    }

    #[tokio::test]
    async fn test_enhance_happy_path() {
        let inputs = inputs();
        let config = fast_config();

        let mut client = MockGenerativeClient::new();
        client
            .expect_upload()
            .withf(|_, mime| mime == "video/quicktime")
            .times(1)
            .returning(|_, _| Ok(remote(FileState::Processing)));

        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        client.expect_get_file().times(2).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(remote(FileState::Processing))
            } else {
                Ok(remote(FileState::Active))
            }
        });

        client
            .expect_generate()
            .withf(|file, prompt, options| {
                file.state == FileState::Active
                    && prompt.starts_with("Enhance these subtitles. Thinking: HIGH")
                    && prompt.contains("```vtt\nWEBVTT")
                    && options.google_search
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(generation("Pass 1 log\n```vtt\nWEBVTT\n\n00:00:00.000 --> 00:00:01.000\n[Hi]\n```\n"))
            });

        let enhancer = SubtitleEnhancer::new(&client, &config);
        let result = enhancer
            .enhance(&inputs.prompt, &inputs.subtitles, &inputs.video)
            .await
            .unwrap();

        assert!(result.raw.starts_with("Pass 1 log"));
        assert_eq!(result.vtt, "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n[Hi]");
    }

    #[tokio::test]
    async fn test_processing_failure_stops_before_generation() {
        let inputs = inputs();
        let config = fast_config();

        let mut client = MockGenerativeClient::new();
        client
            .expect_upload()
            .returning(|_, _| Ok(remote(FileState::Processing)));
        client
            .expect_get_file()
            .returning(|_| Ok(remote(FileState::Failed)));
        client.expect_generate().never();

        let enhancer = SubtitleEnhancer::new(&client, &config);
        let result = enhancer
            .enhance(&inputs.prompt, &inputs.subtitles, &inputs.video)
            .await;

        assert!(matches!(result, Err(OpenVttError::RemoteProcessingFailed(_))));
    }

    #[tokio::test]
    async fn test_not_found_is_retried() {
        let inputs = inputs();
        let config = fast_config();

        let mut client = MockGenerativeClient::new();
        client
            .expect_upload()
            .returning(|_, _| Ok(remote(FileState::Active)));
        client.expect_get_file().never();

        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        client.expect_generate().times(2).returning(move |_, _, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(OpenVttError::RemoteNotFound("files/abc123".to_string()))
            } else {
                Ok(generation("WEBVTT\n\n00:01.000 --> 00:02.000\nLate"))
            }
        });

        let enhancer = SubtitleEnhancer::new(&client, &config);
        let result = enhancer
            .enhance(&inputs.prompt, &inputs.subtitles, &inputs.video)
            .await
            .unwrap();

        assert_eq!(result.vtt, "WEBVTT\n\n00:01.000 --> 00:02.000\nLate");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_gives_up_after_retries() {
        let inputs = inputs();
        let config = fast_config();

        let mut client = MockGenerativeClient::new();
        client
            .expect_upload()
            .returning(|_, _| Ok(remote(FileState::Active)));
        client
            .expect_generate()
            .times(3)
            .returning(|_, _, _| Err(OpenVttError::RemoteNotFound("files/abc123".to_string())));

        let enhancer = SubtitleEnhancer::new(&client, &config);
        let result = enhancer
            .enhance(&inputs.prompt, &inputs.subtitles, &inputs.video)
            .await;

        assert!(matches!(result, Err(OpenVttError::RemoteNotFound(_))));
    }

    #[tokio::test]
    async fn test_other_generation_errors_are_not_retried() {
        let inputs = inputs();
        let config = fast_config();

        let mut client = MockGenerativeClient::new();
        client
            .expect_upload()
            .returning(|_, _| Ok(remote(FileState::Active)));
        client
            .expect_generate()
            .times(1)
            .returning(|_, _, _| Err(OpenVttError::Enhancement("quota exceeded".to_string())));

        let enhancer = SubtitleEnhancer::new(&client, &config);
        let result = enhancer
            .enhance(&inputs.prompt, &inputs.subtitles, &inputs.video)
            .await;

        assert!(matches!(result, Err(OpenVttError::Enhancement(_))));
    }
}
