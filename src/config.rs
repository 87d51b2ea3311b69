//! Runtime configuration, read from the environment on startup.

use crate::sampling::DEFAULT_SAMPLE_THRESHOLD;

/// Candidate models tried in order when the preferred one is unavailable.
pub const DEFAULT_MODELS: &[&str] =
    &["gemini-2.5-flash", "gemini-2.0-flash-exp", "gemini-1.5-flash"];

/// Tunables for one analysis pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Ordered model fallback list.
    pub models: Vec<String>,
    /// Review count above which the set is sampled.
    pub sample_threshold: usize,
    /// Retries per model for transient failures.
    pub max_retries: u32,
    /// Per-attempt request timeout.
    pub request_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            sample_threshold: DEFAULT_SAMPLE_THRESHOLD,
            max_retries: 3,
            request_timeout_secs: 120,
        }
    }
}

impl AnalysisConfig {
    /// Build from environment variables, falling back to defaults:
    /// `SWOT_MODELS` (comma-separated), `SWOT_SAMPLE_THRESHOLD`,
    /// `SWOT_MAX_RETRIES`, `SWOT_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(models) = std::env::var("SWOT_MODELS") {
            let parsed: Vec<String> = models
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if !parsed.is_empty() {
                config.models = parsed;
            }
        }
        if let Some(v) = env_parse("SWOT_SAMPLE_THRESHOLD") {
            config.sample_threshold = v;
        }
        if let Some(v) = env_parse("SWOT_MAX_RETRIES") {
            config.max_retries = v;
        }
        if let Some(v) = env_parse("SWOT_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = v;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
