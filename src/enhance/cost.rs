/// Rough token weight of one megabyte of uploaded video
const TOKENS_PER_VIDEO_MB: f64 = 1000.0;

const CHARS_PER_TOKEN: usize = 4;

/// Price per million tokens, input and output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    pub input: f64,
    pub output: f64,
}

/// Pricing tier picked by model name
pub fn rates_for(model: &str) -> Rates {
    let model = model.to_lowercase();

    if model.contains("flash") {
        Rates { input: 0.075, output: 0.30 }
    } else if model.contains('3') {
        Rates { input: 2.00, output: 12.00 }
    } else {
        Rates { input: 3.50, output: 10.50 }
    }
}

/// Dollar estimate for a call with the given token counts
pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let rates = rates_for(model);
    input_tokens as f64 / 1_000_000.0 * rates.input
        + output_tokens as f64 / 1_000_000.0 * rates.output
}

/// Estimate input tokens before the call from the text sizes and video size
pub fn estimate_input_tokens(prompt: &str, subtitles: &str, video_size_mb: f64) -> u64 {
    let prompt_tokens = prompt.chars().count() / CHARS_PER_TOKEN;
    let subtitle_tokens = subtitles.chars().count() / CHARS_PER_TOKEN;
    let video_tokens = (video_size_mb.max(0.0) * TOKENS_PER_VIDEO_MB) as u64;

    (prompt_tokens + subtitle_tokens) as u64 + video_tokens
}

/// Thousands-separated integer for log lines
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_by_model_family() {
        assert_eq!(rates_for("gemini-2.0-flash"), Rates { input: 0.075, output: 0.30 });
        assert_eq!(rates_for("gemini-3-pro-preview"), Rates { input: 2.00, output: 12.00 });
        assert_eq!(rates_for("gemini-1.5-pro"), Rates { input: 3.50, output: 10.50 });
    }

    #[test]
    fn test_flash_wins_over_version_digit() {
        assert_eq!(rates_for("Gemini-3-Flash").input, 0.075);
    }

    #[test]
    fn test_estimate_cost() {
        let cost = estimate_cost("gemini-3-pro-preview", 1_000_000, 500_000);
        assert!((cost - 8.0).abs() < 1e-9);

        assert_eq!(estimate_cost("gemini-1.5-pro", 0, 0), 0.0);
    }

    #[test]
    fn test_estimate_input_tokens() {
        let prompt = "x".repeat(400);
        let subtitles = "y".repeat(81);

        assert_eq!(estimate_input_tokens(&prompt, &subtitles, 2.5), 100 + 20 + 2500);
        assert_eq!(estimate_input_tokens("", "", 0.0), 0);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
