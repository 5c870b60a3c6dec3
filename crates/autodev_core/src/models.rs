//! Domain models exchanged between agents.
//!
//! Every model tolerates partially-filled LLM replies: anything but the
//! essential text fields has a serde default, and agents fill in missing ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Generate a fallback identifier such as `REQ-1a2b3c4d`.
pub fn generate_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &hex[..8])
}

/// Priority of a requirement or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" | "critical" | "must" => Priority::High,
            "low" | "could" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A software requirement extracted from a natural-language description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default)]
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Requirement {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority: Priority::default(),
            tags: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Lifecycle of a technical task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

/// A technical task derived from one or more requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalTask {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub requirement_ids: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub estimated_effort: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl TechnicalTask {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            requirement_ids: Vec::new(),
            priority: Priority::default(),
            dependencies: Vec::new(),
            estimated_effort: None,
            status: TaskStatus::default(),
        }
    }
}

/// Accept either `"REQ-1"` or `["REQ-1", "REQ-2"]`.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(id)) => vec![id],
        Some(OneOrMany::Many(ids)) => ids,
        None => Vec::new(),
    })
}

/// A unit of generated source code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSnippet {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn default_language() -> String {
    "python".to_string()
}

impl CodeSnippet {
    pub fn new(id: impl Into<String>, code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task_id: None,
            title: None,
            code: code.into(),
            language: language.into(),
            file_path: None,
            description: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

/// Outcome recorded against a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    #[default]
    Pending,
    Passed,
    Failed,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TestStatus::Pending => "pending",
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// A generated test case for one or more snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code_snippet_ids: Vec<String>,
    #[serde(default)]
    pub test_code: String,
    #[serde(default, alias = "expected_output")]
    pub expected_result: String,
    #[serde(default)]
    pub status: TestStatus,
}

impl TestCase {
    pub fn new(id: impl Into<String>, title: impl Into<String>, test_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            code_snippet_ids: Vec::new(),
            test_code: test_code.into(),
            expected_result: String::new(),
            status: TestStatus::default(),
        }
    }

    pub fn for_snippet(mut self, snippet_id: impl Into<String>) -> Self {
        self.code_snippet_ids.push(snippet_id.into());
        self
    }
}

/// Result of running a single test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExecutionResult {
    pub test_id: String,
    pub passed: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl TestExecutionResult {
    pub fn passed(test_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            passed: true,
            output: output.into(),
            error_message: None,
        }
    }

    pub fn failed(test_id: impl Into<String>, output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            passed: false,
            output: output.into(),
            error_message: Some(error.into()),
        }
    }
}

/// A failed test paired with its execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFailure {
    pub test_case: TestCase,
    pub result: TestExecutionResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    #[default]
    Medium,
    Low,
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.trim().to_lowercase().as_str() {
            "high" | "critical" => Severity::High,
            "low" | "minor" => Severity::Low,
            _ => Severity::Medium,
        })
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    Open,
    Fixed,
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueStatus::Open => write!(f, "open"),
            IssueStatus::Fixed => write!(f, "fixed"),
        }
    }
}

/// A defect found while debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code_snippet_ids: Vec<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub status: IssueStatus,
}

impl Issue {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            code_snippet_ids: Vec::new(),
            severity: Severity::default(),
            status: IssueStatus::default(),
        }
    }
}

/// Kind of generated documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    #[default]
    Technical,
    User,
    Api,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Technical => "technical",
            DocType::User => "user",
            DocType::Api => "api",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Documentation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub code_snippet_ids: Vec<String>,
    #[serde(default)]
    pub doc_type: DocType,
}

/// A piece of user feedback about an agent output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub content: String,
    pub target_id: String,
    pub target_type: String,
    #[serde(default)]
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Result of a code review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeReview {
    pub review_passed: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// A fixed snippet together with what changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugFix {
    pub fixed_snippet: CodeSnippet,
    pub changes_made: Vec<String>,
    pub confidence: f64,
}

/// One step of an execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_number: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub dependencies: Vec<u32>,
    #[serde(default)]
    pub files_to_create: Vec<String>,
    #[serde(default)]
    pub files_to_modify: Vec<String>,
    #[serde(default)]
    pub key_functions: Vec<String>,
    #[serde(default = "default_complexity")]
    pub complexity_level: String,
}

fn default_complexity() -> String {
    "medium".to_string()
}

impl PlanStep {
    pub fn new(step_number: u32, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            step_number,
            title: title.into(),
            description: description.into(),
            estimated_time: String::new(),
            dependencies: Vec::new(),
            files_to_create: Vec::new(),
            files_to_modify: Vec::new(),
            key_functions: Vec::new(),
            complexity_level: default_complexity(),
        }
    }

    pub fn estimated(mut self, time: impl Into<String>) -> Self {
        self.estimated_time = time.into();
        self
    }

    pub fn depends_on(mut self, steps: &[u32]) -> Self {
        self.dependencies = steps.to_vec();
        self
    }

    pub fn creates(mut self, files: &[&str]) -> Self {
        self.files_to_create = files.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn modifies(mut self, files: &[&str]) -> Self {
        self.files_to_modify = files.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn functions(mut self, names: &[&str]) -> Self {
        self.key_functions = names.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn complexity(mut self, level: impl Into<String>) -> Self {
        self.complexity_level = level.into();
        self
    }

    /// Whether the step produces tests, by title or by a `test_` file.
    pub fn is_testing_step(&self) -> bool {
        self.title.to_lowercase().contains("test")
            || self.files_to_create.iter().any(|f| f.contains("test_"))
    }
}

/// Complete execution plan for one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    #[serde(default)]
    pub requirement: String,
    pub summary: String,
    #[serde(default)]
    pub total_estimated_time: String,
    #[serde(default)]
    pub architecture_overview: String,
    #[serde(default)]
    pub technology_stack: Vec<String>,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub risk_assessment: String,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default)]
    pub project_structure: Vec<String>,
    #[serde(default)]
    pub testing_strategy: String,
}
