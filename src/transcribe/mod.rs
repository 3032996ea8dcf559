// Speech-to-text engines
//
// - Mlx: mlx-whisper CLI, accelerated on Apple Silicon
// - OpenAI: openai-whisper CLI, generic fallback
//
// Engines are probed once at startup; the first available one is used.

pub mod common;
pub mod mlx;
pub mod openai;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub use common::*;
use crate::config::TranscriptionConfig;
use crate::error::Result;

/// Main trait for transcription operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Engine name for logs and health checks
    fn name(&self) -> &'static str;

    /// Check whether the engine can be invoked
    async fn is_available(&self) -> bool;

    /// Transcribe the audio track of a media file
    async fn transcribe(&self, media_path: &Path, language: &str) -> Result<Transcription>;
}

/// Transcriber implementation type, in order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriberImplementation {
    Mlx,
    OpenAI,
}

impl TranscriberImplementation {
    pub const PREFERENCE: [Self; 2] = [Self::Mlx, Self::OpenAI];
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create a transcriber based on implementation type
    pub fn create_transcriber(
        implementation: TranscriberImplementation,
        config: &TranscriptionConfig,
        timeout: Duration,
    ) -> Box<dyn Transcriber> {
        match implementation {
            TranscriberImplementation::Mlx => {
                Box::new(mlx::MlxWhisperTranscriber::new(config.mlx_model.clone(), timeout))
            }
            TranscriberImplementation::OpenAI => {
                Box::new(openai::OpenAIWhisperTranscriber::new(config.whisper_model.clone(), timeout))
            }
        }
    }

    /// Probe engines in preference order and return the first available one
    pub async fn detect(config: &TranscriptionConfig, timeout: Duration) -> Option<Box<dyn Transcriber>> {
        for implementation in TranscriberImplementation::PREFERENCE {
            let transcriber = Self::create_transcriber(implementation, config, timeout);
            if transcriber.is_available().await {
                info!("Using {} for transcription", transcriber.name());
                return Some(transcriber);
            }
            debug!("{} is not available", transcriber.name());
        }

        None
    }
}
