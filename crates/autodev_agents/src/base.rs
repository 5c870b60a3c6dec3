//! Shared plumbing for the concrete agents.

use std::collections::BTreeMap;

use autodev_core::{
    AgentKind, AgentOutcome, AgentPayload, AgentState, AgentStatus, WorkflowState,
};
use autodev_llm::{DryRunDefault, LlmClient, PromptTemplate, StructuredChain, TextChain};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::{AgentError, AgentResult};

/// Identity, LLM handle, prompt set and observable state of one agent.
pub struct AgentBase {
    id: String,
    kind: AgentKind,
    client: LlmClient,
    prompts: BTreeMap<String, String>,
    state: Mutex<AgentState>,
}

impl AgentBase {
    pub fn new(kind: AgentKind, client: LlmClient, prompts: &[(&str, &str)]) -> Self {
        let id = kind.default_id().to_string();
        Self {
            state: Mutex::new(AgentState::new(id.clone(), kind)),
            id,
            kind,
            client,
            prompts: prompts
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
        self.state.lock().agent_id = self.id.clone();
    }

    pub fn set_prompt(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.prompts.insert(name.into(), text.into());
    }

    pub fn prompts(&self) -> BTreeMap<String, String> {
        self.prompts.clone()
    }

    pub fn state(&self) -> AgentState {
        self.state.lock().clone()
    }

    fn template(&self, name: &str) -> AgentResult<PromptTemplate> {
        self.prompts
            .get(name)
            .map(PromptTemplate::new)
            .ok_or_else(|| {
                AgentError::execution_failed(&self.id, format!("No prompt named {}", name))
            })
    }

    pub fn structured<T>(&self, name: &str) -> AgentResult<StructuredChain<T>>
    where
        T: DeserializeOwned + DryRunDefault,
    {
        Ok(StructuredChain::new(self.client.clone(), self.template(name)?))
    }

    pub fn text(&self, name: &str) -> AgentResult<TextChain> {
        Ok(TextChain::new(self.client.clone(), self.template(name)?))
    }

    /// Mark the agent busy before handling a request.
    pub fn begin(&self, action: &str, workflow: &mut WorkflowState) {
        info!("{} handling {}", self.id, action);
        let snapshot = {
            let mut state = self.state.lock();
            state.set_status(AgentStatus::Working);
            state.clone()
        };
        workflow.record_agent(snapshot);
    }

    /// Turn the handler result into an outcome and settle the agent state.
    pub fn finish(
        &self,
        result: AgentResult<AgentPayload>,
        workflow: &mut WorkflowState,
    ) -> AgentOutcome {
        let (status, outcome) = match result {
            Ok(payload) => {
                info!("{} completed {}", self.id, workflow.current_step);
                (AgentStatus::Idle, AgentOutcome::completed(&self.id, payload))
            }
            Err(e) => {
                warn!("{} failed: {}", self.id, e);
                (AgentStatus::Error, AgentOutcome::error(&self.id, e.to_string()))
            }
        };

        let snapshot = {
            let mut state = self.state.lock();
            state.set_status(status);
            state.set_step(workflow.current_step.clone());
            state.clone()
        };
        workflow.record_agent(snapshot);
        outcome
    }
}
