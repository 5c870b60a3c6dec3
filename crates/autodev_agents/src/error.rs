//! Error types for the agents crate.

use thiserror::Error;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    /// A request shape the agent does not accept. The message lists the
    /// accepted shapes.
    #[error("Invalid input. Expected {0}")]
    InvalidInput(String),

    #[error("Agent execution failed: {agent} - {message}")]
    ExecutionFailed { agent: String, message: String },

    #[error("Unsafe output path: {0}")]
    UnsafePath(String),

    #[error(transparent)]
    Llm(#[from] autodev_llm::LlmError),

    #[error("Core error: {0}")]
    Core(#[from] autodev_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    pub fn invalid_input(expected: impl Into<String>) -> Self {
        Self::InvalidInput(expected.into())
    }

    pub fn execution_failed(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            agent: agent.into(),
            message: message.into(),
        }
    }

    /// True when the LLM could not be configured at all.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, AgentError::Llm(autodev_llm::LlmError::NotConfigured(_)))
    }
}
