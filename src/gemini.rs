//! Gemini API client for the SWOT analysis call.
//!
//! One text-completion request per analysis. Transient failures (timeouts,
//! rate limits, 5xx) are retried with increasing backoff; model-not-found
//! and quota exhaustion advance to the next candidate in the fallback list.

use crate::config::AnalysisConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Seam between the pipeline and the external LLM service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send one prompt and return the raw response text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Gemini client with an ordered model fallback list.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    models: Vec<String>,
    max_retries: u32,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a client, reading the API key from the GEMINI_API_KEY env var.
    pub fn from_env(config: &AnalysisConfig) -> anyhow::Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, config))
    }

    pub fn new(api_key: String, config: &AnalysisConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            models: config.models.clone(),
            max_retries: config.max_retries,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// One attempt against one model.
    async fn try_once(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_BASE, model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.3 },
        };

        debug!("Sending request to Gemini: model={}", model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    LlmError::Transient {
                        status: None,
                        detail: e.to_string(),
                    }
                } else {
                    LlmError::Permanent {
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_http_error(model, status.as_u16(), detail));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| LlmError::Permanent {
            detail: format!("Failed to decode Gemini response: {}", e),
        })?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::Permanent {
                detail: "Gemini returned no candidates".to_string(),
            });
        }

        info!("Gemini response from {}: {} chars", model, text.len());
        Ok(text)
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        complete_with_fallback(&self.models, self.max_retries, |model| async move {
            self.try_once(&model, prompt).await
        })
        .await
    }
}

/// Drive single attempts through the retry/fallback policy: transient errors
/// retry on the same model with doubling backoff, an unavailable model
/// advances to the next candidate, a permanent error aborts. When every
/// candidate is exhausted the last error is surfaced.
async fn complete_with_fallback<F, Fut>(
    models: &[String],
    max_retries: u32,
    mut attempt: F,
) -> Result<String, LlmError>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Result<String, LlmError>>,
{
    let mut last_error = LlmError::Permanent {
        detail: "no candidate models configured".to_string(),
    };

    for model in models {
        for n in 0..=max_retries {
            match attempt(model.clone()).await {
                Ok(text) => return Ok(text),
                Err(e @ LlmError::Transient { .. }) if n < max_retries => {
                    let backoff = Duration::from_millis(500 * 2u64.pow(n));
                    warn!(
                        "Transient Gemini error on {} (attempt {}): {}. Retrying in {:?}",
                        model,
                        n + 1,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    last_error = e;
                }
                Err(e @ LlmError::ModelUnavailable { .. }) => {
                    warn!("{}. Trying next candidate model", e);
                    last_error = e;
                    break;
                }
                Err(e) => {
                    // Permanent, or transient with retries exhausted
                    if e.is_transient() {
                        warn!("Retries exhausted on {}: {}", model, e);
                        last_error = e;
                        break;
                    }
                    return Err(e);
                }
            }
        }
    }

    Err(last_error)
}

/// Map HTTP status codes onto the retry taxonomy. 404 means the model name
/// does not exist; 429 with a quota marker means this model's quota is gone
/// for good, while a plain 429 is a momentary rate limit.
fn classify_http_error(model: &str, status: u16, detail: String) -> LlmError {
    match status {
        404 => LlmError::ModelUnavailable {
            model: model.to_string(),
            detail,
        },
        429 if detail.to_lowercase().contains("quota") => LlmError::ModelUnavailable {
            model: model.to_string(),
            detail,
        },
        429 | 500..=599 => LlmError::Transient {
            status: Some(status),
            detail,
        },
        _ => LlmError::Permanent {
            detail: format!("Gemini API error ({}): {}", status, detail),
        },
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
