use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::error::{OpenVttError, Result};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Metadata for one input video, created once per conversion
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Seconds
    pub duration: f64,
    /// Filesystem size in megabytes
    pub size_mb: f64,
    pub has_audio: bool,
    pub has_subtitles: bool,
    /// Full probe payload
    pub data: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    /// ffprobe reports numbers as strings
    #[serde(default)]
    duration: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
}

impl ProbeResult {
    /// Build from the probe tool's JSON output and the file's size on disk
    pub fn parse(json: &str, size_mb: f64) -> Result<Self> {
        let data: Value = serde_json::from_str(json)
            .map_err(|e| OpenVttError::Probe(format!("Failed to parse probe output: {}", e)))?;
        let output: ProbeOutput = serde_json::from_value(data.clone())
            .map_err(|e| OpenVttError::Probe(format!("Unexpected probe output: {}", e)))?;

        let duration = match &output.format.duration {
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            _ => 0.0,
        };

        let has_stream = |kind: &str| {
            output
                .streams
                .iter()
                .any(|s| s.codec_type.as_deref() == Some(kind))
        };

        Ok(Self {
            duration: duration.max(0.0),
            size_mb,
            has_audio: has_stream("audio"),
            has_subtitles: has_stream("subtitle"),
            data,
        })
    }
}

/// File size in megabytes
pub fn file_size_mb<P: AsRef<Path>>(path: P) -> Result<f64> {
    let metadata = std::fs::metadata(path)?;
    Ok(metadata.len() as f64 / BYTES_PER_MB)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            { "index": 0, "codec_type": "video", "codec_name": "h264" },
            { "index": 1, "codec_type": "audio", "codec_name": "aac" },
            { "index": 2, "codec_type": "subtitle", "codec_name": "mov_text" }
        ],
        "format": { "filename": "clip.mp4", "duration": "90.500000", "size": "1048576" }
    }"#;

    #[test]
    fn test_parse_full_probe() {
        let result = ProbeResult::parse(SAMPLE, 12.5).unwrap();

        assert_eq!(result.duration, 90.5);
        assert_eq!(result.size_mb, 12.5);
        assert!(result.has_audio);
        assert!(result.has_subtitles);
        assert_eq!(result.data["format"]["filename"], "clip.mp4");
    }

    #[test]
    fn test_parse_silent_video() {
        let json = r#"{ "streams": [ { "codec_type": "video" } ], "format": {} }"#;
        let result = ProbeResult::parse(json, 1.0).unwrap();

        assert_eq!(result.duration, 0.0);
        assert!(!result.has_audio);
        assert!(!result.has_subtitles);
    }

    #[test]
    fn test_parse_invalid_output() {
        assert!(matches!(
            ProbeResult::parse("not json", 1.0),
            Err(OpenVttError::Probe(_))
        ));
    }

    #[test]
    fn test_file_size_mb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.bin");
        std::fs::write(&path, vec![0u8; 1024 * 1024]).unwrap();

        let size = file_size_mb(&path).unwrap();
        assert!((size - 1.0).abs() < f64::EPSILON);
    }
}
