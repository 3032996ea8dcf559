use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const SECRETS_FILE: &str = "secrets.json";

/// Resolve the Gemini API key from the environment, then `secrets.json` in `app_dir`
pub fn resolve_api_key(app_dir: &Path) -> Option<String> {
    resolve_from(std::env::var(API_KEY_VAR).ok(), &app_dir.join(SECRETS_FILE))
}

fn resolve_from(env_value: Option<String>, secrets_path: &Path) -> Option<String> {
    if let Some(key) = env_value.filter(|k| !k.is_empty()) {
        info!("Using {} from environment", API_KEY_VAR);
        return Some(key);
    }

    if !secrets_path.exists() {
        return None;
    }

    let content = match std::fs::read_to_string(secrets_path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {}: {}", secrets_path.display(), e);
            return None;
        }
    };

    let secrets: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(_) => {
            warn!("{} is not valid JSON", secrets_path.display());
            return None;
        }
    };

    // Template files ship with YOUR_... placeholders
    let key = secrets[API_KEY_VAR]
        .as_str()
        .filter(|k| !k.is_empty() && !k.starts_with("YOUR_"))?;

    info!("Using {} from {}", API_KEY_VAR, SECRETS_FILE);
    Some(key.to_string())
}
