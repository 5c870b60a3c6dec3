//! Error types for version control operations.

use thiserror::Error;

pub type VcsResult<T> = Result<T, VcsError>;

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected response: {0}")]
    Parse(String),
}

impl VcsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, VcsError::Http { status: 404, .. })
    }
}

impl From<reqwest::Error> for VcsError {
    fn from(e: reqwest::Error) -> Self {
        VcsError::Request(e.to_string())
    }
}
