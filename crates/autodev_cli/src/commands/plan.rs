//! Plan command - two-phase plan then implement.

use std::path::PathBuf;

use anyhow::{Context, Result};
use autodev_agents::EnhancedDevelopmentWorkflow;
use autodev_core::Settings;
use clap::Args;

use crate::CliError;

#[derive(Args)]
pub struct PlanArgs {
    /// The requirement to plan
    #[arg(short, long)]
    requirement: String,

    /// Extra context handed to the planner
    #[arg(long)]
    context: Option<String>,

    /// Implement the plan after printing it
    #[arg(long)]
    implement: bool,

    /// Where implemented files are written
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Workflow identifier
    #[arg(long, default_value = "plan")]
    workflow_id: String,

    /// Run without calling any LLM
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(args: PlanArgs, settings: &Settings) -> Result<()> {
    if args.requirement.trim().is_empty() {
        return Err(CliError::InvalidArgument("--requirement must not be empty".to_string()).into());
    }
    let settings = settings.with_dry_run(settings.dry_run || args.dry_run);

    let mut workflow = EnhancedDevelopmentWorkflow::from_settings(&args.workflow_id, &settings)
        .context("Failed to set up planning workflow")?;

    let report = workflow
        .execute_planning_phase(&args.requirement, args.context.as_deref())
        .await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.implement {
        let implementation = workflow
            .implement_current_plan(settings.dry_run, &args.output)
            .await
            .context("Implementation phase failed")?;

        println!();
        println!("🛠️  {}", implementation.execution_summary);
        for file in &implementation.files_generated {
            println!("   - {}", file);
        }
        println!("{}", serde_json::to_string_pretty(&implementation)?);
    }

    Ok(())
}
