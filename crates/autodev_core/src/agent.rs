//! The contract every agent implements.
//!
//! Requests and outcomes are typed enums. An agent handles a subset of
//! [`AgentRequest`] variants and answers anything else with an
//! `Invalid input` error outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::graph::RunInput;
use crate::models::{
    BugFix, CodeReview, CodeSnippet, Documentation, Issue, Requirement, TechnicalTask, TestCase,
    TestExecutionResult, TestFailure,
};
use crate::state::{AgentKind, AgentState, WorkflowState};

/// An operation an agent is asked to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentRequest {
    AnalyzeDescription {
        description: String,
    },
    BreakDown {
        requirements: Vec<Requirement>,
    },
    GenerateCode {
        task: TechnicalTask,
        #[serde(default)]
        context: String,
    },
    GenerateCodeBatch {
        tasks: Vec<TechnicalTask>,
        #[serde(default)]
        context: String,
    },
    ReviewCode {
        code_snippet: CodeSnippet,
        #[serde(default)]
        task_description: String,
    },
    ImproveCode {
        code_snippet: CodeSnippet,
        review: CodeReview,
        #[serde(default)]
        task_description: String,
    },
    GenerateTests {
        code_snippet: CodeSnippet,
    },
    GenerateTestsBatch {
        code_snippets: Vec<CodeSnippet>,
    },
    ExecuteTest {
        test_case: TestCase,
        code_snippets: Vec<CodeSnippet>,
    },
    ExecuteTests {
        test_cases: Vec<TestCase>,
        code_snippets: Vec<CodeSnippet>,
    },
    AnalyzeTest {
        test_case: TestCase,
        result: TestExecutionResult,
    },
    IdentifyIssues {
        code_snippet: CodeSnippet,
        #[serde(default)]
        test_failures: Vec<TestFailure>,
        #[serde(default)]
        context: String,
    },
    FixBugs {
        code_snippet: CodeSnippet,
        issues: Vec<Issue>,
        #[serde(default)]
        test_failures: Vec<TestFailure>,
        #[serde(default)]
        context: String,
    },
    VerifyFix {
        original: CodeSnippet,
        fixed: CodeSnippet,
        issues: Vec<Issue>,
        #[serde(default)]
        changes_made: Vec<String>,
    },
    DocumentCode {
        code_snippet: CodeSnippet,
    },
    DocumentFeature {
        feature_name: String,
        feature_description: String,
        code_snippets: Vec<CodeSnippet>,
    },
    DocumentApi {
        code_snippet: CodeSnippet,
        #[serde(default)]
        api_description: String,
    },
}

impl AgentRequest {
    pub fn action(&self) -> &'static str {
        match self {
            AgentRequest::AnalyzeDescription { .. } => "analyze_description",
            AgentRequest::BreakDown { .. } => "break_down",
            AgentRequest::GenerateCode { .. } => "generate_code",
            AgentRequest::GenerateCodeBatch { .. } => "generate_code_batch",
            AgentRequest::ReviewCode { .. } => "review_code",
            AgentRequest::ImproveCode { .. } => "improve_code",
            AgentRequest::GenerateTests { .. } => "generate_tests",
            AgentRequest::GenerateTestsBatch { .. } => "generate_tests_batch",
            AgentRequest::ExecuteTest { .. } => "execute_test",
            AgentRequest::ExecuteTests { .. } => "execute_tests",
            AgentRequest::AnalyzeTest { .. } => "analyze_test",
            AgentRequest::IdentifyIssues { .. } => "identify_issues",
            AgentRequest::FixBugs { .. } => "fix_bugs",
            AgentRequest::VerifyFix { .. } => "verify_fix",
            AgentRequest::DocumentCode { .. } => "document_code",
            AgentRequest::DocumentFeature { .. } => "document_feature",
            AgentRequest::DocumentApi { .. } => "document_api",
        }
    }
}

/// Typed output of an agent operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AgentPayload {
    Requirements {
        requirements: Vec<Requirement>,
        tasks: Vec<TechnicalTask>,
    },
    Tasks(Vec<TechnicalTask>),
    CodeSnippets(Vec<CodeSnippet>),
    Review(CodeReview),
    ImprovedCode(CodeSnippet),
    TestCases(Vec<TestCase>),
    TestResult {
        result: TestExecutionResult,
        tests_passed: bool,
    },
    TestResults {
        results: Vec<TestExecutionResult>,
        tests_passed: bool,
    },
    TestAnalysis(String),
    Issues(Vec<Issue>),
    Fix(BugFix),
    Verification(String),
    Documentation(Documentation),
    Documents(Vec<Documentation>),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Completed,
    Error,
}

/// What an agent hands back to the caller or the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub agent_id: String,
    pub status: OutcomeStatus,
    pub payload: AgentPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentOutcome {
    pub fn completed(agent_id: impl Into<String>, payload: AgentPayload) -> Self {
        Self {
            agent_id: agent_id.into(),
            status: OutcomeStatus::Completed,
            payload,
            error: None,
        }
    }

    pub fn error(agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            status: OutcomeStatus::Error,
            payload: AgentPayload::Empty,
            error: Some(message.into()),
        }
    }

    /// Error outcome for a request shape the agent does not accept.
    pub fn invalid_input(agent_id: impl Into<String>, expected: &str) -> Self {
        Self::error(agent_id, format!("Invalid input. Expected {}", expected))
    }

    pub fn is_error(&self) -> bool {
        self.status == OutcomeStatus::Error
    }

    /// True when the payload reports at least one failed test.
    pub fn tests_failed(&self) -> bool {
        matches!(
            self.payload,
            AgentPayload::TestResult { tests_passed: false, .. }
                | AgentPayload::TestResults { tests_passed: false, .. }
        )
    }
}

/// An agent that can be registered in a [`crate::DevelopmentWorkflow`].
#[async_trait]
pub trait AgentHandler: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> AgentKind;

    /// Snapshot of the agent's current state.
    fn state(&self) -> AgentState;

    /// Handle an explicit request, updating `workflow` with the results.
    async fn process(&self, request: AgentRequest, workflow: &mut WorkflowState) -> AgentOutcome;

    /// Graph mode: derive the request from `workflow` (and the run input)
    /// and process it.
    async fn step(&self, input: &RunInput, workflow: &mut WorkflowState) -> AgentOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tests_failed() {
        let result = TestExecutionResult::failed("TEST-1", "", "boom");
        let outcome = AgentOutcome::completed(
            "testing_agent",
            AgentPayload::TestResults {
                results: vec![result],
                tests_passed: false,
            },
        );
        assert!(outcome.tests_failed());
        assert!(!outcome.is_error());

        let outcome = AgentOutcome::completed("coding_agent", AgentPayload::CodeSnippets(vec![]));
        assert!(!outcome.tests_failed());
    }

    #[test]
    fn test_invalid_input_message() {
        let outcome = AgentOutcome::invalid_input("planning_agent", "'description' or 'requirements'");
        assert!(outcome.is_error());
        assert!(outcome
            .error
            .as_deref()
            .unwrap()
            .starts_with("Invalid input. Expected"));
    }

    #[test]
    fn test_request_from_json() {
        let request: AgentRequest = serde_json::from_str(
            r#"{"action": "analyze_description", "description": "calculator"}"#,
        )
        .unwrap();
        assert_eq!(request.action(), "analyze_description");
    }
}
