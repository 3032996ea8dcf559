use serde_json::json;
use std::path::Path;

use crate::config::{Config, CONFIG_FILE};
use crate::media::file_size_mb;
use crate::subtitle::{extract_vtt, format_vtt_time, parse_vtt, SILENT_PLACEHOLDER};
use crate::workflow::unique_output_path;

/// Pass/fail counts of a self-test run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SelfTestSummary {
    pub passed: usize,
    pub failed: usize,
}

impl SelfTestSummary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, condition: bool, name: &str, details: &str) {
        if condition {
            self.passed += 1;
            println!("  ✅ {}", name);
        } else {
            self.failed += 1;
            println!("  ❌ {}", name);
            if !details.is_empty() {
                println!("     {}", details);
            }
        }
    }
}

/// Run the built-in utility checks and print a summary
pub fn run_self_test(app_dir: &Path) -> SelfTestSummary {
    println!("\n🧪 open-vtt self test\n");
    println!("{}", "=".repeat(60));

    let mut summary = SelfTestSummary::default();

    println!("\n📋 Timestamp formatting:");
    for (seconds, expected) in [
        (0.0, "00:00:00.000"),
        (1.0, "00:00:01.000"),
        (1.5, "00:00:01.500"),
        (61.0, "00:01:01.000"),
        (3661.0, "01:01:01.000"),
        (90.123, "00:01:30.123"),
        (3600.0, "01:00:00.000"),
    ] {
        let actual = format_vtt_time(seconds);
        summary.record(
            actual == expected,
            &format!("format_vtt_time({})", seconds),
            &format!("Got: {}", actual),
        );
    }

    println!("\n📋 VTT extraction:");
    let fenced = "Here is the VTT:\n```\nWEBVTT\n\n00:00.000 --> 00:05.000\nHello\n```\nDone!";
    let extracted = extract_vtt(fenced);
    summary.record(extracted.starts_with("WEBVTT"), "Extracts VTT from a fenced block", "");
    summary.record(!extracted.contains("Done!"), "Excludes text after the fence", "");
    summary.record(parse_vtt(&extracted).is_ok(), "Extracted document parses", "");

    let plain = "WEBVTT\n\n00:00.000 --> 00:05.000\nPlain VTT";
    summary.record(extract_vtt(plain) == plain, "Handles plain VTT without a fence", "");

    let mentioned = "The WEBVTT output follows:\n```vtt\nWEBVTT\n\n00:00.000 --> 00:02.000\n[Piano]\n```";
    summary.record(
        extract_vtt(mentioned) == "WEBVTT\n\n00:00.000 --> 00:02.000\n[Piano]",
        "Skips a marker mentioned in prose",
        "",
    );

    let prose = "No VTT content here at all";
    summary.record(extract_vtt(prose) == prose, "Returns input unchanged without a marker", "");
    summary.record(parse_vtt(prose).is_err(), "Rejects prose as a subtitle document", "");
    summary.record(parse_vtt(SILENT_PLACEHOLDER).is_ok(), "Placeholder document parses", "");

    println!("\n📋 Configuration:");
    let defaults = Config::default();
    summary.record(!defaults.gemini.model.is_empty(), "Default model is set", "");
    summary.record(
        !defaults.video.downsample_targets.is_empty(),
        "Default presets are present",
        "",
    );
    summary.record(CONFIG_FILE.ends_with(".json"), "Config file is JSON", "");

    match Config::from_override(json!({ "gemini": { "temperature": 0.1 } })) {
        Ok(merged) => summary.record(
            merged.gemini.temperature == 0.1 && merged.gemini.model == defaults.gemini.model,
            "Leaf override keeps sibling defaults",
            "",
        ),
        Err(e) => summary.record(false, "Leaf override keeps sibling defaults", &e.to_string()),
    }

    println!("\n📋 Files:");
    summary.record(app_dir.exists(), "Application directory exists", "");

    match tempfile::tempdir() {
        Ok(dir) => {
            let sample = dir.path().join("one-megabyte.bin");
            let size = std::fs::write(&sample, vec![b'x'; 1024 * 1024])
                .map_err(Into::into)
                .and_then(|_| file_size_mb(&sample));
            match size {
                Ok(size) => summary.record(
                    (0.9..1.1).contains(&size),
                    "file_size_mb returns ~1.0 for a 1MB file",
                    &format!("Got: {}", size),
                ),
                Err(e) => summary.record(false, "file_size_mb returns ~1.0 for a 1MB file", &e.to_string()),
            }

            let taken = dir.path().join("clip.vtt");
            let next = std::fs::write(&taken, "")
                .map(|_| unique_output_path("clip", "vtt", dir.path(), None));
            summary.record(
                matches!(next, Ok(ref p) if *p == dir.path().join("clip-1.vtt")),
                "Output path avoids overwriting",
                "",
            );
        }
        Err(e) => summary.record(false, "Temporary directory available", &e.to_string()),
    }

    println!("\n{}", "=".repeat(60));
    println!("📊 Results: {} passed, {} failed", summary.passed, summary.failed);
    println!("{}", "=".repeat(60));
    if summary.success() {
        println!("✅ ALL TESTS PASSED!\n");
    } else {
        println!("❌ SOME TESTS FAILED\n");
    }

    summary
}
