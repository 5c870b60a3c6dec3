//! Run command - the full agent workflow.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use autodev_agents::{process_requirements, safe_join};
use autodev_core::{RunStatus, Settings, WorkflowState};
use autodev_vcs::{feature_branch_name, VcsKind, VersionControlManager};
use clap::{Args, ValueEnum};
use tracing::{info, warn};

use crate::report::write_report;
use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VcsChoice {
    Github,
    Gitlab,
    None,
}

impl VcsChoice {
    pub fn kind(self) -> Option<VcsKind> {
        match self {
            VcsChoice::Github => Some(VcsKind::GitHub),
            VcsChoice::Gitlab => Some(VcsKind::GitLab),
            VcsChoice::None => None,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// File holding the requirements description (prompted on stdin when omitted)
    #[arg(short, long)]
    requirements: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Workflow identifier, also used as the feature branch name
    #[arg(long, default_value = "default")]
    workflow_id: String,

    /// Publish the generated code to a version control provider
    #[arg(long, value_enum, default_value_t = VcsChoice::None)]
    vcs: VcsChoice,

    /// Run without calling any LLM or VCS service
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(args: RunArgs, settings: &Settings) -> Result<()> {
    let settings = settings.with_dry_run(settings.dry_run || args.dry_run);

    let description = match &args.requirements {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read requirements file {}", path.display()))?,
        None => read_requirements_from_stdin()?,
    };
    if description.trim().is_empty() {
        return Err(CliError::InvalidArgument("requirements description is empty".to_string()).into());
    }

    println!("🚀 Running workflow {}", args.workflow_id);
    if settings.dry_run {
        println!("   (dry run: no external calls)");
    }

    let result = process_requirements(&description, &args.workflow_id, &settings)
        .await
        .context("Workflow failed")?;

    if let Some(kind) = args.vcs.kind() {
        if settings.dry_run {
            warn!("Dry run: skipping {} publishing", kind);
        } else if result.status == RunStatus::Completed {
            let published = publish(kind, &settings, &args.workflow_id, &result.workflow_state).await?;
            println!("🌿 Committed {} files to {}", published.files, published.branch);
            println!("🔀 Created pull request: {}", published.pull_request_url);
        }
    }

    let files = write_report(&args.output, &args.workflow_id, &description, &result).await?;
    println!("📄 Results saved to {}", files.result.display());
    println!("💾 {} code files, {} documents", files.code.len(), files.docs.len());
    for skipped in &files.skipped {
        println!("   ⚠️  Skipped unsafe path {}", skipped);
    }

    match result.status {
        RunStatus::Completed => {
            println!("✅ Workflow completed");
            Ok(())
        }
        RunStatus::Error => anyhow::bail!(
            "Workflow ended with an error: {}",
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Read lines until an empty line or end of input.
fn read_requirements_from_stdin() -> Result<String> {
    println!("Enter your requirements (finish with an empty line):");
    let stdin = std::io::stdin();
    let mut lines = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read requirements from stdin")?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

/// Files to commit, keyed by their sanitized repository path.
pub fn files_to_commit(state: &WorkflowState) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for snippet in &state.code_snippets {
        let Some(path) = snippet.file_path.as_deref() else {
            continue;
        };
        match safe_join(std::path::Path::new(""), path) {
            Ok(clean) => {
                let key = clean.to_string_lossy().replace('\\', "/");
                files.insert(key, snippet.code.clone());
            }
            Err(_) => warn!("Not committing snippet {} with unsafe path {}", snippet.id, path),
        }
    }
    files
}

/// Branch, commit count and pull request link of a publish.
#[derive(Debug, Clone)]
pub struct Published {
    pub branch: String,
    pub files: usize,
    pub pull_request_url: String,
}

/// Push the generated code to a feature branch and open a pull request.
pub async fn publish(kind: VcsKind, settings: &Settings, workflow_id: &str, state: &WorkflowState) -> Result<Published> {
    let manager = VersionControlManager::new(kind, settings).context("Failed to set up version control")?;
    let branch = feature_branch_name(workflow_id);

    manager
        .create_feature_branch(workflow_id)
        .await
        .with_context(|| format!("Failed to create branch {}", branch))?;

    let files = files_to_commit(state);
    manager
        .commit_code_changes(&files, &format!("Implement feature: {}", workflow_id), &branch)
        .await
        .context("Failed to commit generated code")?;

    let pr = manager
        .create_pull_request(
            &format!("Feature: {}", workflow_id),
            &format!("Automated PR for feature: {}", workflow_id),
            &branch,
        )
        .await
        .context("Failed to open pull request")?;
    let pull_request_url = pr
        .get("html_url")
        .or_else(|| pr.get("web_url"))
        .and_then(|v| v.as_str())
        .unwrap_or("(no url returned)")
        .to_string();
    info!("Opened pull request for {} with {} files", branch, files.len());

    Ok(Published {
        branch,
        files: files.len(),
        pull_request_url,
    })
}
