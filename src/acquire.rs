use std::path::Path;
use tracing::{error, info, warn};

use crate::error::{OpenVttError, Result};
use crate::media::{MediaToolkit, ProbeResult};
use crate::subtitle::{generate_vtt, write_placeholder};
use crate::transcribe::Transcriber;

/// Where the baseline subtitle document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineSource {
    /// Media without audio, placeholder document written
    Placeholder,
    /// Embedded subtitle stream remuxed to WebVTT
    Extracted,
    /// Produced by the named transcription engine
    Transcribed(&'static str),
}

/// Obtains the baseline subtitle track for one video.
///
/// Decision order: silent media gets a placeholder; embedded subtitles are
/// extracted when present; otherwise, or if extraction fails, the audio is
/// transcribed.
pub struct SubtitleAcquirer<'a> {
    media: &'a dyn MediaToolkit,
    transcriber: Option<&'a dyn Transcriber>,
    language: &'a str,
}

impl<'a> SubtitleAcquirer<'a> {
    pub fn new(
        media: &'a dyn MediaToolkit,
        transcriber: Option<&'a dyn Transcriber>,
        language: &'a str,
    ) -> Self {
        Self {
            media,
            transcriber,
            language,
        }
    }

    pub async fn acquire(
        &self,
        video_path: &Path,
        probe: &ProbeResult,
        output_path: &Path,
    ) -> Result<BaselineSource> {
        if !probe.has_audio {
            info!("Silent movie detected - no audio to transcribe");
            write_placeholder(output_path).await?;
            return Ok(BaselineSource::Placeholder);
        }

        if probe.has_subtitles {
            match self.media.extract_subtitles(video_path, output_path).await {
                Ok(()) => {
                    info!("Extracted subtitles: {}", output_path.display());
                    return Ok(BaselineSource::Extracted);
                }
                Err(e) => warn!("No embedded subtitles found or extraction failed: {}", e),
            }
        }

        self.transcribe(video_path, output_path).await
    }

    async fn transcribe(&self, video_path: &Path, output_path: &Path) -> Result<BaselineSource> {
        let transcriber = self.transcriber.ok_or(OpenVttError::NoTranscriber)?;
        info!("Transcribing audio with {}, language: {}", transcriber.name(), self.language);

        let transcription = transcriber
            .transcribe(video_path, self.language)
            .await
            .map_err(|e| {
                error!("{} failed: {}", transcriber.name(), e);
                OpenVttError::Transcription(format!("{} failed: {}", transcriber.name(), e))
            })?;

        generate_vtt(&transcription, output_path).await?;
        info!("Transcribed: {}", output_path.display());

        Ok(BaselineSource::Transcribed(transcriber.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaToolkit;
    use crate::subtitle::SILENT_PLACEHOLDER;
    use crate::transcribe::{MockTranscriber, Transcription, TranscriptionSegment};

    fn probe(has_audio: bool, has_subtitles: bool) -> ProbeResult {
        ProbeResult {
            duration: 12.0,
            size_mb: 1.0,
            has_audio,
            has_subtitles,
            data: serde_json::Value::Null,
        }
    }

    fn sample_transcription() -> Transcription {
        Transcription {
            segments: vec![TranscriptionSegment {
                start: 0.0,
                end: 1.5,
                text: "Hello".to_string(),
            }],
            language: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn test_silent_video_gets_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("subs.vtt");
        let media = MockMediaToolkit::new();
        let transcriber = MockTranscriber::new();

        let acquirer = SubtitleAcquirer::new(&media, Some(&transcriber), "en");
        let source = acquirer
            .acquire(Path::new("silent.mp4"), &probe(false, true), &output)
            .await
            .unwrap();

        assert_eq!(source, BaselineSource::Placeholder);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), SILENT_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_embedded_subtitles_are_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("subs.vtt");

        let mut media = MockMediaToolkit::new();
        media
            .expect_extract_subtitles()
            .times(1)
            .returning(|_, out| {
                std::fs::write(out, "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nHi\n\n").unwrap();
                Ok(())
            });
        let transcriber = MockTranscriber::new();

        let acquirer = SubtitleAcquirer::new(&media, Some(&transcriber), "en");
        let source = acquirer
            .acquire(Path::new("movie.mkv"), &probe(true, true), &output)
            .await
            .unwrap();

        assert_eq!(source, BaselineSource::Extracted);
    }

    #[tokio::test]
    async fn test_failed_extraction_falls_back_to_transcription() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("subs.vtt");

        let mut media = MockMediaToolkit::new();
        media
            .expect_extract_subtitles()
            .times(1)
            .returning(|_, _| Err(OpenVttError::Media("no stream".to_string())));

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_name().return_const("mock-whisper");
        transcriber
            .expect_transcribe()
            .withf(|_, language| language == "de")
            .times(1)
            .returning(|_, _| Ok(sample_transcription()));

        let acquirer = SubtitleAcquirer::new(&media, Some(&transcriber), "de");
        let source = acquirer
            .acquire(Path::new("movie.mkv"), &probe(true, true), &output)
            .await
            .unwrap();

        assert_eq!(source, BaselineSource::Transcribed("mock-whisper"));
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "WEBVTT\n\n00:00:00.000 --> 00:00:01.500\nHello\n\n"
        );
    }

    #[tokio::test]
    async fn test_audio_without_subtitles_skips_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("subs.vtt");
        let media = MockMediaToolkit::new();

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_name().return_const("mock-whisper");
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_, _| Ok(sample_transcription()));

        let acquirer = SubtitleAcquirer::new(&media, Some(&transcriber), "en");
        let source = acquirer
            .acquire(Path::new("talk.mp4"), &probe(true, false), &output)
            .await
            .unwrap();

        assert_eq!(source, BaselineSource::Transcribed("mock-whisper"));
    }

    #[tokio::test]
    async fn test_no_engine_available() {
        let dir = tempfile::tempdir().unwrap();
        let media = MockMediaToolkit::new();

        let acquirer = SubtitleAcquirer::new(&media, None, "en");
        let result = acquirer
            .acquire(Path::new("talk.mp4"), &probe(true, false), &dir.path().join("subs.vtt"))
            .await;

        assert!(matches!(result, Err(OpenVttError::NoTranscriber)));
    }

    #[tokio::test]
    async fn test_engine_error_is_reported_as_transcription_failure() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("subs.vtt");
        let media = MockMediaToolkit::new();

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_name().return_const("mock-whisper");
        transcriber
            .expect_transcribe()
            .returning(|_, _| Err(OpenVttError::CommandTimeout("whisper".to_string())));

        let acquirer = SubtitleAcquirer::new(&media, Some(&transcriber), "en");
        let result = acquirer
            .acquire(Path::new("talk.mp4"), &probe(true, false), &output)
            .await;

        assert!(matches!(result, Err(OpenVttError::Transcription(_))));
        assert!(!output.exists());
    }
}
