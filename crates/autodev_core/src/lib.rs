//! # autodev_core
//!
//! Shared workflow state and orchestration primitives for autodev.
//!
//! # Architecture
//!
//! - **Models**: requirements, tasks, snippets, tests, issues and docs
//! - **State**: the [`WorkflowState`] threaded through every agent
//! - **Agent contract**: [`AgentHandler`] with typed requests and outcomes
//! - **Graph**: the fixed routing table and the [`DevelopmentWorkflow`] executor
//! - **Config**: layered [`Settings`] (defaults, YAML, `.env`, environment)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use autodev_core::{DevelopmentWorkflow, RunInput};
//!
//! let mut workflow = DevelopmentWorkflow::new("demo");
//! workflow.add_agent(Arc::new(planning));
//! workflow.add_agent(Arc::new(coding));
//!
//! let result = workflow.run(RunInput::new("Build a calculator")).await?;
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod state;

pub use agent::{AgentHandler, AgentOutcome, AgentPayload, AgentRequest, OutcomeStatus};
pub use config::{LlmProviderKind, Settings};
pub use error::{CoreError, CoreResult};
pub use graph::{route, DevelopmentWorkflow, Route, RunInput, RunResult, RunStatus};
pub use models::{
    generate_id, BugFix, CodeReview, CodeSnippet, DocType, Documentation, ExecutionPlan,
    Feedback, Issue, IssueStatus, PlanStep, Priority, Requirement, Severity, TaskStatus,
    TechnicalTask, TestCase, TestExecutionResult, TestFailure, TestStatus,
};
pub use state::{AgentKind, AgentState, AgentStatus, WorkflowState, WorkflowStatus};
