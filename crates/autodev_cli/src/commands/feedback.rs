//! Feedback command - collect feedback and apply what agents learned.

use anyhow::{Context, Result};
use autodev_agents::default_prompts;
use autodev_core::{AgentKind, Settings};
use autodev_learning::{FeedbackSubmission, InteractiveLearningSystem};
use clap::{Args, Subcommand};

use crate::CliError;

#[derive(Args)]
pub struct FeedbackArgs {
    #[command(subcommand)]
    command: FeedbackCommand,

    /// Run without calling any LLM
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum FeedbackCommand {
    /// Record feedback about an agent output and derive learning from it
    Submit(SubmitArgs),

    /// List stored feedback, or the learning recorded for one agent
    List {
        /// Show learning records for this agent instead of raw feedback
        #[arg(long)]
        agent_id: Option<String>,
    },

    /// Rewrite an agent's prompts with its pending learning
    Apply {
        #[arg(long)]
        agent_id: String,

        /// planning, coding, testing, debugging or documentation
        #[arg(long)]
        agent_type: String,
    },
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long)]
    content: String,

    #[arg(long)]
    target_id: String,

    #[arg(long)]
    target_type: String,

    #[arg(long)]
    agent_id: String,

    #[arg(long)]
    agent_type: String,

    /// Rating from 0 to 5
    #[arg(long)]
    rating: Option<f64>,

    /// The output the feedback is about
    #[arg(long, default_value = "")]
    agent_output: String,
}

pub async fn execute(args: FeedbackArgs, settings: &Settings) -> Result<()> {
    let settings = settings.with_dry_run(settings.dry_run || args.dry_run);
    let system = InteractiveLearningSystem::from_settings(&settings)
        .context("Failed to open the learning system")?;

    match args.command {
        FeedbackCommand::Submit(submit) => {
            let outcome = system
                .collect_and_process_feedback(&FeedbackSubmission {
                    content: submit.content,
                    target_id: submit.target_id,
                    target_type: submit.target_type,
                    agent_id: submit.agent_id,
                    agent_type: submit.agent_type,
                    agent_output: submit.agent_output,
                    rating: submit.rating,
                })
                .await
                .context("Failed to process feedback")?;

            println!("📝 Stored feedback {}", outcome.feedback.id);
            println!(
                "🎓 Learning {} ({}), priority {:.2}",
                outcome.learning.id, outcome.learning.implementation_status, outcome.analysis.priority_score
            );
            for point in &outcome.learning.learning_points {
                println!("   - {}", point);
            }
        }
        FeedbackCommand::List { agent_id: Some(agent_id) } => {
            let records = system.manager().get_learning_for_agent(&agent_id)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        FeedbackCommand::List { agent_id: None } => {
            let feedback = system.manager().list_feedback()?;
            println!("{}", serde_json::to_string_pretty(&feedback)?);
        }
        FeedbackCommand::Apply { agent_id, agent_type } => {
            let kind: AgentKind = agent_type
                .parse()
                .map_err(|_| CliError::InvalidArgument(format!("unknown agent type {}", agent_type)))?;
            let improved = system
                .apply_learning_to_agent(&agent_id, kind.as_str(), &default_prompts(kind))
                .await
                .context("Failed to apply learning")?;
            println!("{}", serde_json::to_string_pretty(&improved)?);
        }
    }

    Ok(())
}
