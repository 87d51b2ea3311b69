//! Error taxonomy for the review analysis pipeline.

use thiserror::Error;

/// Errors that abort a single analysis request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no review text column found in '{file}' (columns: {columns:?})")]
    ColumnNotFound { file: String, columns: Vec<String> },

    #[error("no usable reviews after cleaning")]
    EmptyInput,

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Parse(#[from] ResponseParseError),
}

/// LLM call failures. Transient errors are retried with backoff; an
/// unavailable model advances to the next candidate in the fallback list.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transient LLM error (status {status:?}): {detail}")]
    Transient { status: Option<u16>, detail: String },

    #[error("model unavailable: {model} ({detail})")]
    ModelUnavailable { model: String, detail: String },

    #[error("LLM call failed: {detail}")]
    Permanent { detail: String },
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Transient { .. })
    }
}

/// All parse strategies failed. Carries the raw model output for diagnosis.
#[derive(Debug, Error)]
#[error("could not parse LLM response as SWOT JSON ({} chars)", raw.len())]
pub struct ResponseParseError {
    pub raw: String,
}
