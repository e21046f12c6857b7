//! Env-driven configuration for the CLI process.

use std::env;

/// Logging knobs read once at startup.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        Self {
            quiet: env_bool("XEUSPACK_QUIET", false),
            log_level: env::var("XEUSPACK_LOG_LEVEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "xeuspack=info".to_string()),
            log_json: env_bool("XEUSPACK_LOG_JSON", false),
        }
    }
}

/// 1/true/yes are true; 0/false/no/off are false.
fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key).ok().as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}
