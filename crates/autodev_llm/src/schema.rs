//! JSON reply shapes requested from the model.

use autodev_core::{CodeSnippet, DocType, Issue, Requirement, TechnicalTask, TestCase};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsReply {
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksReply {
    #[serde(default)]
    pub tasks: Vec<TechnicalTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeReply {
    #[serde(default)]
    pub code_snippets: Vec<CodeSnippet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestsReply {
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuesReply {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugFixReply {
    pub fixed_code: String,
    #[serde(default)]
    pub changes_made: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
}

/// Documentation as returned by the model; the agent fills in whatever
/// the model left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub code_snippet_ids: Option<Vec<String>>,
    #[serde(default)]
    pub doc_type: Option<DocType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationReply {
    pub documentation: DocumentationDraft,
}
