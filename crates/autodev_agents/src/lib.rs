//! # autodev_agents
//!
//! The LLM-backed agents of the autodev development workflow.
//!
//! ## Available Agents
//!
//! | Agent | Id | Operations |
//! |-------|----|------------|
//! | [`PlanningAgent`] | `planning_agent` | requirements, task breakdown, execution plans |
//! | [`CodingAgent`] | `coding_agent` | code generation, review, improvement |
//! | [`TestingAgent`] | `testing_agent` | test generation, execution, analysis |
//! | [`DebuggingAgent`] | `debugging_agent` | issue identification, fixes, verification |
//! | [`DocumentationAgent`] | `documentation_agent` | code, user and API documentation |
//!
//! All agents implement [`autodev_core::AgentHandler`]. [`create_development_workflow`]
//! wires them into the routing graph, and [`EnhancedDevelopmentWorkflow`] runs
//! the plan-then-implement flow.

pub mod base;
pub mod coding;
pub mod debugging;
pub mod documentation;
pub mod enhanced;
pub mod error;
pub mod executor;
pub mod output;
pub mod pipeline;
pub mod planning;
pub mod testing;

pub use base::AgentBase;
pub use coding::CodingAgent;
pub use debugging::DebuggingAgent;
pub use documentation::DocumentationAgent;
pub use enhanced::{
    EnhancedDevelopmentWorkflow, ImplementationReport, Phase, PlanningPhase, PlanningPhaseReport,
};
pub use error::{AgentError, AgentResult};
pub use executor::{file_extension, TestExecutor};
pub use output::{safe_join, write_file};
pub use pipeline::{create_development_workflow, default_prompts, process_requirements};
pub use planning::PlanningAgent;
pub use testing::TestingAgent;
