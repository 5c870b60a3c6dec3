//! Writing a finished run to an output directory.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use autodev_agents::write_file;
use autodev_core::{RunResult, WorkflowState};
use tracing::{info, warn};

pub const RESULT_FILE: &str = "result.txt";
pub const CODE_DIR: &str = "code";
pub const DOCS_DIR: &str = "docs";

/// What [`write_report`] produced.
#[derive(Debug, Default)]
pub struct ReportFiles {
    pub result: PathBuf,
    pub code: Vec<PathBuf>,
    pub docs: Vec<PathBuf>,
    pub skipped: Vec<String>,
}

/// Plain-text summary of a run.
pub fn format_result(workflow_id: &str, requirements: &str, result: &RunResult) -> String {
    let state = &result.workflow_state;
    let mut out = String::new();

    let _ = writeln!(out, "Workflow ID: {}\n", workflow_id);
    let _ = writeln!(out, "Requirements:\n{}\n", requirements.trim_end());
    let _ = writeln!(out, "Results:");
    let _ = writeln!(out, "Status: {}", state.status);
    let _ = writeln!(out, "Current step: {}", state.current_step);
    if let Some(error) = &result.error {
        let _ = writeln!(out, "Error: {}", error);
    }

    write_state_sections(&mut out, state);
    out
}

fn write_state_sections(out: &mut String, state: &WorkflowState) {
    let _ = writeln!(out, "\nRequirements:");
    for req in &state.requirements {
        let _ = writeln!(out, "- {}: {}", req.id, req.description);
    }

    let _ = writeln!(out, "\nTechnical Tasks:");
    for task in &state.technical_tasks {
        let _ = writeln!(out, "- {}: {}", task.id, task.title);
    }

    let _ = writeln!(out, "\nCode Snippets:");
    for snippet in &state.code_snippets {
        let _ = writeln!(
            out,
            "- {}: {}",
            snippet.id,
            snippet.file_path.as_deref().unwrap_or("No file path")
        );
    }

    let _ = writeln!(out, "\nTest Cases:");
    for test in &state.test_cases {
        let _ = writeln!(out, "- {}: {} ({})", test.id, test.title, test.status);
    }

    let _ = writeln!(out, "\nIssues:");
    for issue in &state.issues {
        let _ = writeln!(out, "- {}: {} ({})", issue.id, issue.title, issue.status);
    }

    let _ = writeln!(out, "\nDocumentation:");
    for doc in &state.documentation {
        let _ = writeln!(out, "- {}: {} ({})", doc.id, doc.title, doc.doc_type);
    }
}

/// Write `result.txt`, every snippet with a file path, and every document.
///
/// Snippet paths that would escape `code/` are skipped with a warning.
pub async fn write_report(
    output_dir: &Path,
    workflow_id: &str,
    requirements: &str,
    result: &RunResult,
) -> Result<ReportFiles> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut files = ReportFiles {
        result: output_dir.join(RESULT_FILE),
        ..Default::default()
    };
    tokio::fs::write(&files.result, format_result(workflow_id, requirements, result))
        .await
        .with_context(|| format!("Failed to write {}", files.result.display()))?;

    let state = &result.workflow_state;
    let code_dir = output_dir.join(CODE_DIR);
    tokio::fs::create_dir_all(&code_dir).await?;
    for snippet in &state.code_snippets {
        let Some(file_path) = snippet.file_path.as_deref() else {
            continue;
        };
        match write_file(&code_dir, file_path, &snippet.code).await {
            Ok(path) => files.code.push(path),
            Err(autodev_agents::AgentError::UnsafePath(path)) => {
                warn!("Skipping snippet {} with unsafe path {}", snippet.id, path);
                files.skipped.push(path);
            }
            Err(e) => return Err(e).context(format!("Failed to write snippet {}", snippet.id)),
        }
    }

    let docs_dir = output_dir.join(DOCS_DIR);
    tokio::fs::create_dir_all(&docs_dir).await?;
    for doc in &state.documentation {
        let name = format!("{}_{}.md", doc.id, doc.doc_type);
        let content = format!("# {}\n\n{}", doc.title, doc.content);
        match write_file(&docs_dir, &name, &content).await {
            Ok(path) => files.docs.push(path),
            Err(autodev_agents::AgentError::UnsafePath(path)) => {
                warn!("Skipping document {} with unsafe name {}", doc.id, path);
                files.skipped.push(path);
            }
            Err(e) => return Err(e).context(format!("Failed to write document {}", doc.id)),
        }
    }

    info!(
        "Saved {} code files and {} documents to {}",
        files.code.len(),
        files.docs.len(),
        output_dir.display()
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodev_core::{
        CodeSnippet, DocType, Documentation, Issue, RunStatus, TestCase, WorkflowStatus,
    };

    fn sample_result() -> RunResult {
        let mut state = WorkflowState::new("wf-1");
        state.set_status(WorkflowStatus::Completed);
        state.set_step("documentation");
        state.code_snippets.push(CodeSnippet::new("CODE-1", "print(1)", "python").with_file_path("/src/app.py"));
        state.code_snippets.push(CodeSnippet::new("CODE-2", "bad", "python").with_file_path("../evil.py"));
        state.code_snippets.push(CodeSnippet::new("CODE-3", "x = 1", "python"));
        state.test_cases.push(TestCase::new("TEST-1", "adds", "assert True"));
        state.issues.push(Issue::new("ISSUE-1", "Off by one", "desc"));
        state.documentation.push(Documentation {
            id: "DOC-1".to_string(),
            title: "Guide".to_string(),
            content: "Use it.".to_string(),
            code_snippet_ids: vec![],
            doc_type: DocType::User,
        });

        RunResult {
            workflow_id: "wf-1".to_string(),
            status: RunStatus::Completed,
            error: None,
            current_agent_id: None,
            visited: vec![],
            outcomes: vec![],
            workflow_state: state,
        }
    }

    #[test]
    fn test_format_result_sections() {
        let text = format_result("wf-1", "Build an adder\n", &sample_result());
        assert!(text.starts_with("Workflow ID: wf-1\n\nRequirements:\nBuild an adder\n"));
        assert!(text.contains("Status: completed\nCurrent step: documentation\n"));
        assert!(text.contains("- CODE-1: /src/app.py\n"));
        assert!(text.contains("- CODE-3: No file path\n"));
        assert!(text.contains("- TEST-1: adds (pending)\n"));
        assert!(text.contains("- DOC-1: Guide (user)\n"));
        for section in ["Technical Tasks:", "Test Cases:", "Issues:", "Documentation:"] {
            assert!(text.contains(section));
        }
    }

    #[tokio::test]
    async fn test_write_report_sanitizes_paths() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_report(dir.path(), "wf-1", "Build an adder", &sample_result())
            .await
            .unwrap();

        assert_eq!(files.code, vec![dir.path().join("code/src/app.py")]);
        assert_eq!(files.skipped, vec!["../evil.py".to_string()]);
        assert!(!dir.path().join("evil.py").exists());

        let doc = std::fs::read_to_string(dir.path().join("docs/DOC-1_user.md")).unwrap();
        assert_eq!(doc, "# Guide\n\nUse it.");
        assert!(dir.path().join(RESULT_FILE).exists());
    }
}
