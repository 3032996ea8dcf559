use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{OpenVttError, Result};
use crate::transcribe::Transcription;

/// Header line (and extraction marker) of a WebVTT document
pub const VTT_HEADER: &str = "WEBVTT";

/// Baseline written for media without an audio stream
pub const SILENT_PLACEHOLDER: &str = "WEBVTT\n\nNOTE This video has no audio track (silent film).\n\n";

const CODE_FENCE: &str = "```";

/// A single timed caption
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Render a transcription as a WebVTT document
pub fn render_vtt(transcription: &Transcription) -> String {
    let mut vtt = format!("{}\n\n", VTT_HEADER);

    for segment in &transcription.segments {
        let text = segment.text.trim();
        if text.is_empty() {
            continue;
        }

        vtt.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_vtt_time(segment.start),
            format_vtt_time(segment.end.max(segment.start)),
            text
        ));
    }

    vtt
}

/// Generate WebVTT subtitle file from transcription
pub async fn generate_vtt<P: AsRef<Path>>(transcription: &Transcription, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating VTT file: {}", output_path.display());

    fs::write(output_path, render_vtt(transcription)).await?;

    info!("VTT file generated with {} segments", transcription.segments.len());
    Ok(())
}

/// Write the silent-media placeholder document
pub async fn write_placeholder<P: AsRef<Path>>(output_path: P) -> Result<()> {
    fs::write(output_path, SILENT_PLACEHOLDER).await?;
    Ok(())
}

/// Format time in seconds to WebVTT time format (HH:MM:SS.mmm), truncating milliseconds
pub fn format_vtt_time(seconds: f64) -> String {
    // absorb float representation error before truncating
    let total_milliseconds = (seconds.max(0.0) * 1000.0 + 1e-6) as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds
pub fn parse_vtt_time(timestamp: &str) -> Option<f64> {
    let parts: Vec<&str> = timestamp.trim().split(':').collect();
    let (hours, minutes, rest) = match parts.as_slice() {
        [h, m, rest] => (h.parse::<u64>().ok()?, *m, *rest),
        [m, rest] => (0, *m, *rest),
        _ => return None,
    };

    let (secs, millis) = rest.split_once('.')?;
    if minutes.len() != 2 || secs.len() != 2 || millis.len() != 3 {
        return None;
    }

    let minutes: u64 = minutes.parse().ok()?;
    let secs: u64 = secs.parse().ok()?;
    let millis: u64 = millis.parse().ok()?;
    if minutes >= 60 || secs >= 60 {
        return None;
    }

    let total_ms = ((hours * 60 + minutes) * 60 + secs) * 1000 + millis;
    Some(total_ms as f64 / 1000.0)
}

/// Parse and validate a WebVTT document, returning its cues
pub fn parse_vtt(document: &str) -> Result<Vec<Cue>> {
    let document = document.trim_start_matches('\u{feff}');
    let mut lines = document.lines();

    let header = lines.next().unwrap_or_default().trim_end();
    let has_header = header == VTT_HEADER
        || header.starts_with("WEBVTT ")
        || header.starts_with("WEBVTT\t");
    if !has_header {
        return Err(OpenVttError::InvalidSubtitle(
            "missing WEBVTT header".to_string(),
        ));
    }

    // header metadata runs until the first blank line
    let body: Vec<&str> = lines.skip_while(|l| !l.trim().is_empty()).collect();

    let mut cues = Vec::new();
    for block in body.split(|l| l.trim().is_empty()) {
        let Some(first) = block.first().map(|l| l.trim()) else {
            continue;
        };
        if first.starts_with("NOTE") || first == "STYLE" || first == "REGION" {
            continue;
        }

        let timing_index = block
            .iter()
            .position(|l| l.contains("-->"))
            .filter(|&i| i <= 1)
            .ok_or_else(|| {
                OpenVttError::InvalidSubtitle(format!("block without cue timing: '{}'", first))
            })?;

        let (start, end) = parse_timing(block[timing_index])?;
        let text = block[timing_index + 1..].join("\n").trim().to_string();
        if text.is_empty() {
            return Err(OpenVttError::InvalidSubtitle(format!(
                "empty cue at {}",
                block[timing_index].trim()
            )));
        }

        cues.push(Cue { start, end, text });
    }

    Ok(cues)
}

fn parse_timing(line: &str) -> Result<(f64, f64)> {
    let invalid = || OpenVttError::InvalidSubtitle(format!("bad cue timing: '{}'", line.trim()));

    let (start, rest) = line.split_once("-->").ok_or_else(invalid)?;
    // cue settings may follow the end timestamp
    let end = rest.split_whitespace().next().ok_or_else(invalid)?;

    let start = parse_vtt_time(start).ok_or_else(invalid)?;
    let end = parse_vtt_time(end).ok_or_else(invalid)?;
    if end < start {
        return Err(invalid());
    }

    Ok((start, end))
}

/// Pull the WebVTT document out of a free-form model response.
///
/// The span runs from the header marker to the next code fence, or to the end
/// of the text. A marker that starts a line wins over one mentioned inside
/// prose. Without a marker the whole response is returned unchanged.
pub fn extract_vtt(response: &str) -> String {
    let line_start = response
        .match_indices(VTT_HEADER)
        .map(|(i, _)| i)
        .find(|&i| i == 0 || response[..i].ends_with('\n'));
    let Some(start) = line_start.or_else(|| response.find(VTT_HEADER)) else {
        return response.to_string();
    };

    let rest = &response[start..];
    match rest.find(CODE_FENCE) {
        Some(end) => rest[..end].trim().to_string(),
        None => rest.trim().to_string(),
    }
}
