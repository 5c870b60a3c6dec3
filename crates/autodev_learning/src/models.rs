//! Learning records and feedback analysis.

use autodev_core::Feedback;
use autodev_llm::{DryRunDefault, PromptVars};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationStatus {
    #[default]
    Pending,
    Implemented,
    Rejected,
}

impl std::fmt::Display for ImplementationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImplementationStatus::Pending => "pending",
            ImplementationStatus::Implemented => "implemented",
            ImplementationStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// Lessons derived from one piece of feedback about one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub id: String,
    pub feedback_id: String,
    pub agent_id: String,
    pub learning_points: Vec<String>,
    #[serde(default)]
    pub implementation_status: ImplementationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementArea {
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAnalysis {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub improvement_areas: Vec<ImprovementArea>,
    /// How urgent acting on the feedback is, from 0.0 to 1.0.
    #[serde(default)]
    pub priority_score: f64,
}

impl DryRunDefault for FeedbackAnalysis {
    fn dry_run(_vars: &PromptVars) -> Self {
        Self {
            strengths: vec!["Dry Run".to_string()],
            weaknesses: Vec::new(),
            improvement_areas: vec![ImprovementArea {
                area: "Dry Run".to_string(),
                suggestion: "Dry Run".to_string(),
            }],
            priority_score: 1.0,
        }
    }
}

/// Either a stored feedback id or the feedback itself.
#[derive(Debug, Clone)]
pub enum FeedbackRef<'a> {
    Record(&'a Feedback),
    Id(&'a str),
}

impl<'a> From<&'a Feedback> for FeedbackRef<'a> {
    fn from(feedback: &'a Feedback) -> Self {
        FeedbackRef::Record(feedback)
    }
}

impl<'a> From<&'a str> for FeedbackRef<'a> {
    fn from(id: &'a str) -> Self {
        FeedbackRef::Id(id)
    }
}

/// Everything produced by collecting and processing one piece of feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub feedback: Feedback,
    pub analysis: FeedbackAnalysis,
    pub learning: LearningRecord,
}

/// Feedback about one agent output, as submitted by a user.
#[derive(Debug, Clone, Default)]
pub struct FeedbackSubmission {
    pub content: String,
    pub target_id: String,
    pub target_type: String,
    pub agent_id: String,
    pub agent_type: String,
    pub agent_output: String,
    pub rating: Option<f64>,
}
