//! autodev CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: LLM not configured
//! - 4: Version control failure

use std::process::ExitCode;

use autodev_core::{CoreError, Settings};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod report;
mod server;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const LLM_NOT_CONFIGURED: u8 = 3;
    pub const VCS_FAILURE: u8 = 4;
}

/// Errors the CLI raises itself, as opposed to those from the libraries.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            return ExitCode::from(ExitCodes::INVALID_ARGS);
        }
    };

    init_logging(&settings, cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, &settings).await,
        Commands::Plan(args) => commands::plan::execute(args, &settings).await,
        Commands::Serve(args) => commands::serve::execute(args, &settings).await,
        Commands::Feedback(args) => commands::feedback::execute(args, &settings).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn init_logging(settings: &Settings, verbose: bool) {
    let level = if verbose { "debug" } else { settings.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,autodev={}", level)));

    // A second initialization only happens in tests.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}

/// Pick the exit code from the first typed error in the chain.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<autodev_agents::AgentError>() {
            if err.is_not_configured() {
                return ExitCodes::LLM_NOT_CONFIGURED;
            }
        }
        if let Some(autodev_llm::LlmError::NotConfigured(_)) = cause.downcast_ref::<autodev_llm::LlmError>() {
            return ExitCodes::LLM_NOT_CONFIGURED;
        }
        if let Some(autodev_learning::LearningError::Llm(autodev_llm::LlmError::NotConfigured(_))) =
            cause.downcast_ref::<autodev_learning::LearningError>()
        {
            return ExitCodes::LLM_NOT_CONFIGURED;
        }
        if cause.downcast_ref::<autodev_vcs::VcsError>().is_some() {
            return ExitCodes::VCS_FAILURE;
        }
        if cause.downcast_ref::<CliError>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
        if let Some(CoreError::Config(_)) = cause.downcast_ref::<CoreError>() {
            return ExitCodes::INVALID_ARGS;
        }
        if let Some(autodev_learning::LearningError::InvalidRating(_) | autodev_learning::LearningError::FeedbackNotFound(_)) =
            cause.downcast_ref::<autodev_learning::LearningError>()
        {
            return ExitCodes::INVALID_ARGS;
        }
    }
    ExitCodes::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes() {
        let llm = anyhow::Error::new(autodev_agents::AgentError::Llm(
            autodev_llm::LlmError::NotConfigured("OPENAI_API_KEY is not set".to_string()),
        ))
        .context("Failed to build workflow");
        assert_eq!(categorize_error(&llm), ExitCodes::LLM_NOT_CONFIGURED);

        let vcs: Result<(), autodev_vcs::VcsError> = Err(autodev_vcs::VcsError::Config("missing".to_string()));
        let vcs = vcs.context("Failed to publish").unwrap_err();
        assert_eq!(categorize_error(&vcs), ExitCodes::VCS_FAILURE);

        let usage = anyhow::Error::new(CliError::InvalidArgument("empty".to_string()));
        assert_eq!(categorize_error(&usage), ExitCodes::INVALID_ARGS);

        assert_eq!(categorize_error(&anyhow::anyhow!("boom")), ExitCodes::GENERAL_ERROR);
    }
}
