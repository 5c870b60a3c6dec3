//! CLI command definitions.
//!
//! Each subcommand maps to one way of driving the agents.

use clap::{Parser, Subcommand};

pub mod feedback;
pub mod plan;
pub mod run;
pub mod serve;

/// autodev - autonomous software development agents
#[derive(Parser)]
#[command(name = "autodev")]
#[command(version, about = "autodev - autonomous software development agents")]
#[command(long_about = r#"
autodev turns natural-language requirements into planned, coded, tested
and documented software using a team of LLM-backed agents.

COMMANDS:
  run       → Run the full agent workflow on a requirements description
  plan      → Create an execution plan, optionally implementing it
  serve     → Start the REST API
  feedback  → Submit feedback and apply what the agents learned

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - LLM not configured
  4 - Version control failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the development workflow on a requirements description
    Run(run::RunArgs),

    /// Plan (and optionally implement) a single requirement
    Plan(plan::PlanArgs),

    /// Serve the REST API
    Serve(serve::ServeArgs),

    /// Collect feedback and improve agent prompts
    Feedback(feedback::FeedbackArgs),
}
