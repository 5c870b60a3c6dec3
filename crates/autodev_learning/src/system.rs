//! Feeds learning back into agent prompts.

use std::collections::BTreeMap;

use autodev_core::Settings;
use autodev_llm::{vars, LlmClient, PromptTemplate, TextChain};
use tracing::{debug, info};

use crate::error::LearningResult;
use crate::feedback::FeedbackManager;
use crate::models::{FeedbackOutcome, FeedbackRef, FeedbackSubmission, ImplementationStatus};

const PROMPT_IMPROVEMENT_PROMPT: &str = r#"You are an expert in prompt engineering.
Improve the prompt below using the learning points gathered from user feedback.

Original prompt:
{original_prompt}

Learning points:
{learning_points}

Keep the structure and purpose of the original prompt and address every learning point.
Return only the improved prompt text."#;

pub struct InteractiveLearningSystem {
    manager: FeedbackManager,
    client: LlmClient,
    improvement_chain: TextChain,
    threshold: f64,
}

impl InteractiveLearningSystem {
    /// `threshold` is the lowest analysis priority whose learning is kept pending.
    pub fn new(manager: FeedbackManager, client: LlmClient, threshold: f64) -> Self {
        Self {
            manager,
            improvement_chain: TextChain::new(client.clone(), PromptTemplate::new(PROMPT_IMPROVEMENT_PROMPT)),
            client,
            threshold,
        }
    }

    pub fn from_settings(settings: &Settings) -> LearningResult<Self> {
        let client = LlmClient::default_model(settings)?;
        let manager = FeedbackManager::new(settings.feedback_dir.clone(), client.clone())?;
        Ok(Self::new(manager, client, settings.feedback_threshold))
    }

    pub fn manager(&self) -> &FeedbackManager {
        &self.manager
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Store the feedback, analyse it and record what the agent should learn.
    ///
    /// Learning from low-priority feedback is still stored, but as rejected.
    pub async fn collect_and_process_feedback(
        &self,
        submission: &FeedbackSubmission,
    ) -> LearningResult<FeedbackOutcome> {
        let feedback = self.manager.collect_feedback(
            &submission.content,
            &submission.target_id,
            &submission.target_type,
            submission.rating,
        )?;

        let analysis = self
            .manager
            .analyze_feedback(FeedbackRef::Record(&feedback), &submission.agent_output)
            .await?;

        let status = if analysis.priority_score < self.threshold {
            info!(
                "Feedback {} priority {} is below threshold {}",
                feedback.id, analysis.priority_score, self.threshold
            );
            ImplementationStatus::Rejected
        } else {
            ImplementationStatus::Pending
        };

        let learning = self
            .manager
            .generate_learning_with_status(
                &analysis,
                &submission.agent_id,
                &submission.agent_type,
                &feedback.id,
                status,
            )
            .await?;

        Ok(FeedbackOutcome {
            feedback,
            analysis,
            learning,
        })
    }

    pub async fn improve_agent_prompt(&self, original: &str, points: &[String]) -> LearningResult<String> {
        if self.client.is_dry_run() {
            return Ok(original.to_string());
        }

        let learning_points = points
            .iter()
            .map(|p| format!("- {}", p))
            .collect::<Vec<_>>()
            .join("\n");

        let improved = self
            .improvement_chain
            .invoke(&vars([
                ("original_prompt", original),
                ("learning_points", learning_points.as_str()),
            ]))
            .await?;
        Ok(improved)
    }

    /// Rewrite `prompts` with every pending learning point for `agent_id`.
    ///
    /// The prompts come back unchanged when nothing is pending. Otherwise the
    /// records that were applied are marked implemented.
    pub async fn apply_learning_to_agent(
        &self,
        agent_id: &str,
        agent_type: &str,
        prompts: &BTreeMap<String, String>,
    ) -> LearningResult<BTreeMap<String, String>> {
        let pending: Vec<_> = self
            .manager
            .get_learning_for_agent(agent_id)?
            .into_iter()
            .filter(|l| l.implementation_status == ImplementationStatus::Pending)
            .collect();

        let points: Vec<String> = pending
            .iter()
            .flat_map(|l| l.learning_points.iter().cloned())
            .collect();

        if points.is_empty() {
            debug!("No pending learning for {}", agent_id);
            return Ok(prompts.clone());
        }

        let mut improved = BTreeMap::new();
        for (name, prompt) in prompts {
            improved.insert(name.clone(), self.improve_agent_prompt(prompt, &points).await?);
        }

        for record in &pending {
            self.manager
                .update_learning_status(&record.id, ImplementationStatus::Implemented)?;
        }
        info!(
            "Applied {} learning points to {} {} prompts",
            points.len(),
            improved.len(),
            agent_type
        );
        Ok(improved)
    }
}
