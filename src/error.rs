use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenVttError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command timed out: {0}")]
    CommandTimeout(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("No whisper implementation available")]
    NoTranscriber,

    #[error("Enhancement error: {0}")]
    Enhancement(String),

    #[error("Remote resource not found: {0}")]
    RemoteNotFound(String),

    #[error("Remote processing failed: {0}")]
    RemoteProcessingFailed(String),

    #[error("Could not reduce video under {limit_mb}MB")]
    SizeLimit { limit_mb: f64 },

    #[error("Invalid subtitle document: {0}")]
    InvalidSubtitle(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GEMINI_API_KEY not configured")]
    MissingApiKey,

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, OpenVttError>;
