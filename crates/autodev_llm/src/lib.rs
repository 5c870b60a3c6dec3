//! # autodev_llm
//!
//! Everything between an agent and a language model:
//!
//! - [`PromptTemplate`]: `{name}` placeholder rendering
//! - [`LlmAdapter`]: OpenAI and Anthropic HTTP clients with retries
//! - [`LlmClient`]: live model or dry-run synthesis, chosen from [`autodev_core::Settings`]
//! - [`StructuredChain`] / [`TextChain`]: prompt, model and parser in one call
//! - [`DryRunDefault`]: canned replies for offline runs

pub mod adapter;
pub mod chain;
pub mod client;
pub mod dry_run;
pub mod error;
pub mod prompt;
pub mod schema;

pub use adapter::{CompletionRequest, LanguageModel, LlmAdapter};
#[cfg(any(test, feature = "mock"))]
pub use adapter::MockLanguageModel;
pub use chain::{extract_json, StructuredChain, TextChain};
pub use client::{LlmClient, DRY_RUN_TEXT};
pub use dry_run::{DryRunDefault, DRY_RUN_CODE, DRY_RUN_ID};
pub use error::{LlmError, LlmResult};
pub use prompt::{vars, PromptTemplate, PromptVars};
pub use schema::{
    BugFixReply, CodeReply, DocumentationDraft, DocumentationReply, IssuesReply,
    RequirementsReply, TasksReply, TestsReply,
};
