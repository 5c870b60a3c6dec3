//! Error types for the learning crate.

use std::path::PathBuf;

use thiserror::Error;

pub type LearningResult<T> = Result<T, LearningError>;

#[derive(Error, Debug)]
pub enum LearningError {
    #[error("Feedback with ID {0} not found")]
    FeedbackNotFound(String),

    #[error("Rating must be between 0 and 5, got {0}")]
    InvalidRating(f64),

    #[error("Corrupt store {path}: {message}")]
    Store { path: PathBuf, message: String },

    #[error(transparent)]
    Llm(#[from] autodev_llm::LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
