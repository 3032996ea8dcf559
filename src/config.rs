use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{OpenVttError, Result};

/// Default override file looked up in the application directory
pub const CONFIG_FILE: &str = "config.json";

fn default_language() -> String {
    "en".to_string()
}

fn default_mlx_model() -> String {
    "mlx-community/whisper-large-v3-turbo".to_string()
}

fn default_whisper_model() -> String {
    "base".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub video: VideoConfig,
    pub transcription: TranscriptionConfig,
    pub files: FilesConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model identifier used for generation
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// Reasoning-effort label substituted into the prompt template
    pub thinking: String,
    pub grounding: GroundingConfig,
    /// Base URL of the Generative Language API
    pub endpoint: String,
    /// Seconds between remote processing-state polls
    pub poll_interval_secs: u64,
    /// Initial wait after the upload is ready, doubled on each not-found retry
    pub propagation_delay_secs: u64,
    /// Extra generation attempts allowed when the uploaded file is not yet visible
    pub propagation_retries: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingConfig {
    pub enabled: bool,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Upload size ceiling in megabytes
    pub max_size_mb: f64,
    /// Presets tried in order, least aggressive first
    pub downsample_targets: Vec<DownsampleTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownsampleTarget {
    pub fps: f64,
    /// `WIDTHxHEIGHT`
    pub resolution: String,
    pub label: String,
}

impl DownsampleTarget {
    pub fn new(fps: f64, resolution: &str, label: &str) -> Self {
        Self {
            fps,
            resolution: resolution.to_string(),
            label: label.to_string(),
        }
    }

    /// Parse the resolution into `(width, height)`
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let (width, height) = self.resolution.trim().split_once(['x', 'X'])?;
        Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Whisper language code (en, de, fr, es, ...)
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_mlx_model")]
    pub mlx_model: String,
    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Prompt template path, absolute or relative to the application directory
    pub prompt: String,
    /// Player page served at `/`
    pub player: String,
    /// Media directory; detected next to the application when unset
    pub media_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Upper bound for a single external command, in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                model: "gemini-3-pro-preview".to_string(),
                temperature: 0.7,
                max_output_tokens: 65536,
                thinking: "high".to_string(),
                grounding: GroundingConfig {
                    enabled: true,
                    source: "google_search".to_string(),
                },
                endpoint: "https://generativelanguage.googleapis.com".to_string(),
                poll_interval_secs: 5,
                propagation_delay_secs: 5,
                propagation_retries: 3,
                request_timeout_secs: 600,
            },
            video: VideoConfig {
                max_size_mb: 400.0,
                downsample_targets: vec![
                    DownsampleTarget::new(10.0, "1920x1080", "10fps 1080p"),
                    DownsampleTarget::new(5.0, "1920x1080", "5fps 1080p"),
                    DownsampleTarget::new(5.0, "1280x720", "5fps 720p"),
                    DownsampleTarget::new(1.0, "854x480", "1fps 480p"),
                ],
            },
            transcription: TranscriptionConfig {
                language: default_language(),
                mlx_model: default_mlx_model(),
                whisper_model: default_whisper_model(),
            },
            files: FilesConfig {
                prompt: "prompts/gemini_vtt_prompt.md".to_string(),
                player: "player.html".to_string(),
                media_dir: None,
            },
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                timeout_secs: 3600,
            },
        }
    }
}

/// Merge `overlay` into `base` key by key.
///
/// Nested mappings are merged recursively; any other value (including lists)
/// replaces the base value wholesale.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value)
                    }
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

impl Config {
    /// Load defaults and apply the override file at `path` if it can be used.
    ///
    /// Missing, unreadable or malformed overrides are ignored and the
    /// defaults stand.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config override at {}, using defaults", path.display());
            return Self::default();
        }

        let merged = Self::read_override(path).and_then(Self::from_override);
        match merged {
            Ok(config) => {
                info!("Loaded configuration overrides from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse an override document; `.toml` files use TOML, everything else JSON
    pub fn read_override<P: AsRef<Path>>(path: P) -> Result<Value> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            Ok(toml::from_str::<Value>(&content)?)
        } else {
            Ok(serde_json::from_str::<Value>(&content)?)
        }
    }

    /// Apply an override document over the built-in defaults.
    ///
    /// Each leaf value is merged on its own; a value that does not fit its
    /// setting is logged by key and skipped while the rest still apply.
    pub fn from_override(overlay: Value) -> Result<Self> {
        if !overlay.is_object() {
            return Err(OpenVttError::Config(
                "top level of the override must be a mapping".to_string(),
            ));
        }

        let mut base = serde_json::to_value(Self::default())?;
        let mut leaves = Vec::new();
        collect_leaves(Vec::new(), overlay, &mut leaves);

        for (key, value) in leaves {
            let mut candidate = base.clone();
            deep_merge(&mut candidate, nest(&key, value));
            match serde_json::from_value::<Self>(candidate.clone()) {
                Ok(_) => base = candidate,
                Err(e) => warn!("Ignoring config value {}: {}", key.join("."), e),
            }
        }

        serde_json::from_value(base)
            .map_err(|e| OpenVttError::Config(format!("Invalid configuration value: {}", e)))
    }
}

impl FilesConfig {
    /// Media directory: configured, else `<app>/../media` when present, else `<app>/media`
    pub fn resolve_media_dir(&self, app_dir: &Path) -> PathBuf {
        if let Some(dir) = &self.media_dir {
            let dir = PathBuf::from(dir);
            return if dir.is_absolute() { dir } else { app_dir.join(dir) };
        }

        if let Some(parent) = app_dir.parent() {
            let candidate = parent.join("media");
            if candidate.exists() {
                return candidate;
            }
        }

        app_dir.join("media")
    }

    /// Prompt template as configured, falling back to the application directory
    pub fn resolve_prompt(&self, app_dir: &Path) -> Option<PathBuf> {
        resolve_existing(&self.prompt, app_dir)
    }

    pub fn resolve_player(&self, app_dir: &Path) -> Option<PathBuf> {
        resolve_existing(&self.player, app_dir)
    }
}

/// Flatten nested mappings into `(key path, value)` pairs; lists and scalars are leaves
fn collect_leaves(path: Vec<String>, value: Value, out: &mut Vec<(Vec<String>, Value)>) {
    match value {
        Value::Object(map) if !path.is_empty() && map.is_empty() => out.push((path, Value::Object(map))),
        Value::Object(map) => {
            for (key, child) in map {
                let mut child_path = path.clone();
                child_path.push(key);
                collect_leaves(child_path, child, out);
            }
        }
        other => out.push((path, other)),
    }
}

/// Rebuild a single leaf as a nested mapping rooted at the top level
fn nest(path: &[String], value: Value) -> Value {
    path.iter().rev().fold(value, |inner, key| {
        let mut map = serde_json::Map::new();
        map.insert(key.clone(), inner);
        Value::Object(map)
    })
}

fn resolve_existing(configured: &str, app_dir: &Path) -> Option<PathBuf> {
    let path = PathBuf::from(configured);
    if path.exists() {
        return Some(path);
    }

    let candidate = app_dir.join(configured);
    candidate.exists().then_some(candidate)
}
