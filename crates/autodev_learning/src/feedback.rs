//! Feedback collection, analysis and learning records.

use std::path::{Path, PathBuf};

use autodev_core::{generate_id, Feedback};
use autodev_llm::{vars, LlmClient, PromptTemplate, StructuredChain, TextChain};
use chrono::Utc;
use tracing::{debug, info};

use crate::error::{LearningError, LearningResult};
use crate::models::{FeedbackAnalysis, FeedbackRef, ImplementationStatus, LearningRecord};
use crate::store::JsonStore;

pub const FEEDBACK_FILE: &str = "feedback.json";
pub const LEARNING_FILE: &str = "learning.json";

const MAX_RATING: f64 = 5.0;

const FEEDBACK_ANALYSIS_PROMPT: &str = r#"You are an expert in improving AI agents.
Analyse the user feedback below about an agent's output and identify what worked, what did not
and what should change.

Agent output:
{agent_output}

User feedback:
{feedback_content}

Provide:
1. Strengths of the agent's output
2. Weaknesses of the agent's output
3. Areas for improvement, each with a concrete suggestion
4. A priority score from 0.0 to 1.0 for how important acting on this feedback is

Stay objective and keep every point actionable.

Answer with JSON of the form
{{"strengths": [], "weaknesses": [], "improvement_areas": [{{"area": "...", "suggestion": "..."}}], "priority_score": 0.5}}"#;

const LEARNING_GENERATION_PROMPT: &str = r#"You are an expert in improving AI agents.
Turn the feedback analysis below into learning points the agent can apply.

Strengths: {strengths}
Weaknesses: {weaknesses}
Improvement areas:
{improvement_areas}
Priority score: {priority_score}

Agent type: {agent_type}

Write 3 to 5 specific learning points, one per line as a list item."#;

/// Stores feedback and the learning derived from it.
pub struct FeedbackManager {
    dir: PathBuf,
    feedback: JsonStore<Feedback>,
    learning: JsonStore<LearningRecord>,
    analysis_chain: StructuredChain<FeedbackAnalysis>,
    learning_chain: TextChain,
}

impl FeedbackManager {
    /// Open (or create) the feedback and learning files under `dir`.
    pub fn new(dir: impl Into<PathBuf>, client: LlmClient) -> LearningResult<Self> {
        let dir = dir.into();
        let feedback = JsonStore::open(dir.join(FEEDBACK_FILE))?;
        let learning = JsonStore::open(dir.join(LEARNING_FILE))?;
        debug!("Feedback data in {}", dir.display());

        Ok(Self {
            dir,
            feedback,
            learning,
            analysis_chain: StructuredChain::new(client.clone(), PromptTemplate::new(FEEDBACK_ANALYSIS_PROMPT)),
            learning_chain: TextChain::new(client, PromptTemplate::new(LEARNING_GENERATION_PROMPT)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn collect_feedback(
        &self,
        content: &str,
        target_id: &str,
        target_type: &str,
        rating: Option<f64>,
    ) -> LearningResult<Feedback> {
        if let Some(rating) = rating {
            if !(0.0..=MAX_RATING).contains(&rating) {
                return Err(LearningError::InvalidRating(rating));
            }
        }

        let feedback = Feedback {
            id: generate_id("FEEDBACK"),
            content: content.to_string(),
            target_id: target_id.to_string(),
            target_type: target_type.to_string(),
            rating,
            created_at: Utc::now(),
        };
        self.feedback.append(feedback.clone())?;
        info!("Collected feedback {} for {} {}", feedback.id, target_type, target_id);
        Ok(feedback)
    }

    pub async fn analyze_feedback(
        &self,
        feedback: FeedbackRef<'_>,
        agent_output: &str,
    ) -> LearningResult<FeedbackAnalysis> {
        let content = match feedback {
            FeedbackRef::Record(record) => record.content.clone(),
            FeedbackRef::Id(id) => self
                .get_feedback(id)?
                .ok_or_else(|| LearningError::FeedbackNotFound(id.to_string()))?
                .content,
        };

        let analysis = self
            .analysis_chain
            .invoke(&vars([
                ("agent_output", agent_output),
                ("feedback_content", content.as_str()),
            ]))
            .await?;
        Ok(analysis)
    }

    pub async fn generate_learning(
        &self,
        analysis: &FeedbackAnalysis,
        agent_id: &str,
        agent_type: &str,
        feedback_id: &str,
    ) -> LearningResult<LearningRecord> {
        self.generate_learning_with_status(analysis, agent_id, agent_type, feedback_id, ImplementationStatus::Pending)
            .await
    }

    /// Like [`generate_learning`](Self::generate_learning) with an explicit initial status.
    pub async fn generate_learning_with_status(
        &self,
        analysis: &FeedbackAnalysis,
        agent_id: &str,
        agent_type: &str,
        feedback_id: &str,
        status: ImplementationStatus,
    ) -> LearningResult<LearningRecord> {
        let improvement_areas = analysis
            .improvement_areas
            .iter()
            .map(|a| format!("- {}: {}", a.area, a.suggestion))
            .collect::<Vec<_>>()
            .join("\n");

        let reply = self
            .learning_chain
            .invoke(&vars([
                ("strengths", analysis.strengths.join(", ")),
                ("weaknesses", analysis.weaknesses.join(", ")),
                ("improvement_areas", improvement_areas),
                ("priority_score", analysis.priority_score.to_string()),
                ("agent_type", agent_type.to_string()),
            ]))
            .await?;

        let record = LearningRecord {
            id: generate_id("LEARNING"),
            feedback_id: feedback_id.to_string(),
            agent_id: agent_id.to_string(),
            learning_points: parse_learning_points(&reply),
            implementation_status: status,
            created_at: Utc::now(),
        };
        self.learning.append(record.clone())?;
        info!(
            "Recorded {} learning points for {} ({})",
            record.learning_points.len(),
            agent_id,
            record.implementation_status
        );
        Ok(record)
    }

    pub fn get_feedback(&self, id: &str) -> LearningResult<Option<Feedback>> {
        Ok(self.feedback.load()?.into_iter().find(|f| f.id == id))
    }

    pub fn list_feedback(&self) -> LearningResult<Vec<Feedback>> {
        self.feedback.load()
    }

    pub fn get_learning(&self, id: &str) -> LearningResult<Option<LearningRecord>> {
        Ok(self.learning.load()?.into_iter().find(|l| l.id == id))
    }

    pub fn list_learning(&self) -> LearningResult<Vec<LearningRecord>> {
        self.learning.load()
    }

    pub fn get_learning_for_agent(&self, agent_id: &str) -> LearningResult<Vec<LearningRecord>> {
        Ok(self
            .learning
            .load()?
            .into_iter()
            .filter(|l| l.agent_id == agent_id)
            .collect())
    }

    /// Returns false when no record has this id.
    pub fn update_learning_status(&self, id: &str, status: ImplementationStatus) -> LearningResult<bool> {
        self.learning.update(|records| {
            match records.iter_mut().find(|l| l.id == id) {
                Some(record) => {
                    record.implementation_status = status;
                    true
                }
                None => false,
            }
        })
    }
}

/// One point per non-empty line, skipping headings and list markers.
pub fn parse_learning_points(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_start_matches(['-', '*']).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(dir: &Path) -> FeedbackManager {
        FeedbackManager::new(dir, LlmClient::DryRun).unwrap()
    }

    #[test]
    fn test_parse_learning_points() {
        let text = "# Learning points\n\n- Validate inputs\n* Add tests\n   Use type hints  \n-\n";
        assert_eq!(
            parse_learning_points(text),
            vec!["Validate inputs", "Add tests", "Use type hints"]
        );
    }

    #[test]
    fn test_files_created() {
        let dir = tempfile::tempdir().unwrap();
        let _manager = manager(dir.path());
        assert!(dir.path().join(FEEDBACK_FILE).exists());
        assert!(dir.path().join(LEARNING_FILE).exists());
    }

    #[test]
    fn test_collect_feedback_persists() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let feedback = manager
            .collect_feedback("Needs error handling", "SNIPPET-1", "code_snippet", Some(3.5))
            .unwrap();

        assert!(feedback.id.starts_with("FEEDBACK-"));
        assert_eq!(feedback.id.len(), "FEEDBACK-".len() + 8);

        let reopened = FeedbackManager::new(dir.path(), LlmClient::DryRun).unwrap();
        let stored = reopened.get_feedback(&feedback.id).unwrap().unwrap();
        assert_eq!(stored, feedback);
        assert_eq!(reopened.list_feedback().unwrap().len(), 1);
    }

    #[test]
    fn test_rating_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        assert!(matches!(
            manager.collect_feedback("x", "t", "code", Some(7.0)),
            Err(LearningError::InvalidRating(r)) if r == 7.0
        ));
        assert!(manager.collect_feedback("x", "t", "code", Some(0.0)).is_ok());
        assert!(manager.collect_feedback("x", "t", "code", None).is_ok());
    }

    #[tokio::test]
    async fn test_analyze_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let err = manager
            .analyze_feedback(FeedbackRef::Id("FEEDBACK-missing"), "output")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Feedback with ID FEEDBACK-missing not found");
    }

    #[tokio::test]
    async fn test_dry_run_learning_and_status_update() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let feedback = manager.collect_feedback("Good", "S-1", "code", None).unwrap();

        let analysis = manager
            .analyze_feedback(FeedbackRef::from(feedback.id.as_str()), "def f(): pass")
            .await
            .unwrap();
        assert_eq!(analysis.priority_score, 1.0);

        let learning = manager
            .generate_learning(&analysis, "coding_agent", "coding", &feedback.id)
            .await
            .unwrap();
        assert!(learning.id.starts_with("LEARNING-"));
        assert_eq!(learning.implementation_status, ImplementationStatus::Pending);
        assert_eq!(learning.learning_points, vec!["DRY_RUN"]);

        assert!(manager
            .update_learning_status(&learning.id, ImplementationStatus::Implemented)
            .unwrap());
        assert!(!manager
            .update_learning_status("LEARNING-nope", ImplementationStatus::Implemented)
            .unwrap());

        let stored = manager.get_learning(&learning.id).unwrap().unwrap();
        assert_eq!(stored.implementation_status, ImplementationStatus::Implemented);
        assert_eq!(manager.get_learning_for_agent("coding_agent").unwrap().len(), 1);
        assert!(manager.get_learning_for_agent("testing_agent").unwrap().is_empty());
    }
}
