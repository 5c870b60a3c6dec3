//! Error types for LLM access.

use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("Missing prompt variable: {0}")]
    MissingVariable(String),

    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse LLM output: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
