//! Workflow and agent state shared across the graph.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::{
    CodeSnippet, Documentation, Issue, IssueStatus, Requirement, TechnicalTask, TestCase,
    TestStatus,
};

/// The five agent roles in the development graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Planning,
    Coding,
    Testing,
    Debugging,
    Documentation,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] = [
        AgentKind::Planning,
        AgentKind::Coding,
        AgentKind::Testing,
        AgentKind::Debugging,
        AgentKind::Documentation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Planning => "planning",
            AgentKind::Coding => "coding",
            AgentKind::Testing => "testing",
            AgentKind::Debugging => "debugging",
            AgentKind::Documentation => "documentation",
        }
    }

    /// Identifier used when an agent is created without an explicit id.
    pub fn default_id(&self) -> &'static str {
        match self {
            AgentKind::Planning => "planning_agent",
            AgentKind::Coding => "coding_agent",
            AgentKind::Testing => "testing_agent",
            AgentKind::Debugging => "debugging_agent",
            AgentKind::Documentation => "documentation_agent",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let normalized = normalized.trim_end_matches("_agent");
        AgentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| CoreError::InvalidState(format!("Unknown agent type: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Working,
    Error,
}

/// Observable state of a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub agent_id: String,
    pub agent_type: AgentKind,
    pub status: AgentStatus,
    pub last_step: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AgentState {
    pub fn new(agent_id: impl Into<String>, agent_type: AgentKind) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_type,
            status: AgentStatus::Idle,
            last_step: None,
            updated_at: Utc::now(),
        }
    }

    pub fn set_status(&mut self, status: AgentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn set_step(&mut self, step: impl Into<String>) {
        self.last_step = Some(step.into());
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    InProgress,
    Completed,
    Error,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// The single state object threaded through every agent of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub current_step: String,
    pub requirements: Vec<Requirement>,
    pub technical_tasks: Vec<TechnicalTask>,
    pub code_snippets: Vec<CodeSnippet>,
    pub test_cases: Vec<TestCase>,
    pub issues: Vec<Issue>,
    pub documentation: Vec<Documentation>,
    pub agent_states: BTreeMap<String, AgentState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: workflow_id.into(),
            status: WorkflowStatus::InProgress,
            current_step: "initialization".to_string(),
            requirements: Vec::new(),
            technical_tasks: Vec::new(),
            code_snippets: Vec::new(),
            test_cases: Vec::new(),
            issues: Vec::new(),
            documentation: Vec::new(),
            agent_states: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn set_step(&mut self, step: impl Into<String>) {
        self.current_step = step.into();
        self.touch();
    }

    pub fn set_status(&mut self, status: WorkflowStatus) {
        self.status = status;
        self.touch();
    }

    /// Update the status of the test case with `test_id`. Returns false when
    /// no such test exists.
    pub fn mark_test(&mut self, test_id: &str, passed: bool) -> bool {
        let status = if passed { TestStatus::Passed } else { TestStatus::Failed };
        let found = match self.test_cases.iter_mut().find(|t| t.id == test_id) {
            Some(test) => {
                test.status = status;
                true
            }
            None => false,
        };
        self.touch();
        found
    }

    pub fn mark_issue_fixed(&mut self, issue_id: &str) -> bool {
        let found = match self.issues.iter_mut().find(|i| i.id == issue_id) {
            Some(issue) => {
                issue.status = IssueStatus::Fixed;
                true
            }
            None => false,
        };
        self.touch();
        found
    }

    /// Mirror an agent's state into the workflow.
    pub fn record_agent(&mut self, agent: AgentState) {
        self.agent_states.insert(agent.agent_id.clone(), agent);
        self.touch();
    }

    pub fn find_snippet(&self, snippet_id: &str) -> Option<&CodeSnippet> {
        self.code_snippets.iter().find(|s| s.id == snippet_id)
    }

    /// Snippets that no test case references yet.
    pub fn untested_snippets(&self) -> Vec<CodeSnippet> {
        self.code_snippets
            .iter()
            .filter(|s| {
                !self
                    .test_cases
                    .iter()
                    .any(|t| t.code_snippet_ids.iter().any(|id| id == &s.id))
            })
            .cloned()
            .collect()
    }

    pub fn pending_tests(&self) -> Vec<TestCase> {
        self.test_cases
            .iter()
            .filter(|t| t.status == TestStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn failed_tests(&self) -> Vec<TestCase> {
        self.test_cases
            .iter()
            .filter(|t| t.status == TestStatus::Failed)
            .cloned()
            .collect()
    }

    /// Snippets that have no documentation entry yet.
    pub fn undocumented_snippets(&self) -> Vec<CodeSnippet> {
        self.code_snippets
            .iter()
            .filter(|s| {
                !self
                    .documentation
                    .iter()
                    .any(|d| d.code_snippet_ids.iter().any(|id| id == &s.id))
            })
            .cloned()
            .collect()
    }
}
