//! Routing table and graph executor.
//!
//! The development graph is fixed:
//!
//! ```text
//! planning -> coding -> testing -> documentation -> END
//!                          ^   \
//!                          |    (failed tests, when enabled)
//!                          |      v
//!                          +-- debugging
//! ```
//!
//! Any error outcome ends the run. The debugging/testing loop is bounded by
//! `max_steps`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agent::{AgentHandler, AgentOutcome};
use crate::config::Settings;
use crate::error::{CoreError, CoreResult};
use crate::state::{AgentKind, WorkflowState, WorkflowStatus};

/// Next hop chosen by [`route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Agent(AgentKind),
    End,
}

/// Decide where to go after `current` produced `outcome`.
pub fn route(
    current: Option<AgentKind>,
    outcome: Option<&AgentOutcome>,
    entry: AgentKind,
    debug_on_failure: bool,
) -> Route {
    if outcome.is_some_and(|o| o.is_error()) {
        return Route::End;
    }

    match current {
        None => Route::Agent(entry),
        Some(AgentKind::Planning) => Route::Agent(AgentKind::Coding),
        Some(AgentKind::Coding) => Route::Agent(AgentKind::Testing),
        Some(AgentKind::Testing) => {
            if debug_on_failure && outcome.is_some_and(|o| o.tests_failed()) {
                Route::Agent(AgentKind::Debugging)
            } else {
                Route::Agent(AgentKind::Documentation)
            }
        }
        Some(AgentKind::Debugging) => Route::Agent(AgentKind::Testing),
        Some(AgentKind::Documentation) => Route::End,
    }
}

/// Input to a graph run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInput {
    pub description: String,
    #[serde(default)]
    pub start: Option<AgentKind>,
}

impl RunInput {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            start: None,
        }
    }

    pub fn starting_at(mut self, kind: AgentKind) -> Self {
        self.start = Some(kind);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Error,
}

/// Final report of a graph run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub workflow_id: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub current_agent_id: Option<String>,
    pub visited: Vec<AgentKind>,
    pub outcomes: Vec<AgentOutcome>,
    pub workflow_state: WorkflowState,
}

/// A set of agents wired by the fixed routing table.
pub struct DevelopmentWorkflow {
    workflow_id: String,
    agents: Vec<Arc<dyn AgentHandler>>,
    state: WorkflowState,
    max_steps: usize,
    debug_on_failure: bool,
}

impl DevelopmentWorkflow {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        let workflow_id = workflow_id.into();
        let defaults = Settings::default();
        Self {
            state: WorkflowState::new(workflow_id.clone()),
            workflow_id,
            agents: Vec::new(),
            max_steps: defaults.max_workflow_steps,
            debug_on_failure: defaults.debug_on_test_failure,
        }
    }

    /// Take step limit and debugging policy from settings.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.max_steps = settings.max_workflow_steps;
        self.debug_on_failure = settings.debug_on_test_failure;
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn debug_on_failure(mut self, enabled: bool) -> Self {
        self.debug_on_failure = enabled;
        self
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Register an agent. A second agent of the same kind replaces the first.
    pub fn add_agent(&mut self, agent: Arc<dyn AgentHandler>) {
        debug!("Registering agent: {} ({})", agent.id(), agent.kind());
        self.state.record_agent(agent.state());
        match self.agents.iter().position(|a| a.kind() == agent.kind()) {
            Some(index) => self.agents[index] = agent,
            None => self.agents.push(agent),
        }
    }

    fn agent(&self, kind: AgentKind) -> Option<Arc<dyn AgentHandler>> {
        self.agents.iter().find(|a| a.kind() == kind).cloned()
    }

    pub fn get_state(&self) -> &WorkflowState {
        &self.state
    }

    /// Run the graph until it reaches its end.
    pub async fn run(&mut self, input: RunInput) -> CoreResult<RunResult> {
        let entry = match input.start {
            Some(kind) => kind,
            None => self
                .agents
                .first()
                .map(|a| a.kind())
                .ok_or_else(|| CoreError::InvalidState("workflow has no agents".to_string()))?,
        };

        info!("Starting workflow {} at {}", self.workflow_id, entry);

        let mut visited = Vec::new();
        let mut outcomes: Vec<AgentOutcome> = Vec::new();
        let mut current: Option<AgentKind> = None;
        let mut current_agent_id = None;
        let mut run_error = None;

        loop {
            let next = route(current, outcomes.last(), entry, self.debug_on_failure);
            debug!("Route from {:?}: {:?}", current, next);

            let kind = match next {
                Route::End => break,
                Route::Agent(kind) => kind,
            };

            let Some(agent) = self.agent(kind) else {
                warn!("No agent registered for {}, ending run", kind);
                run_error = Some(format!("No agent registered for {}", kind));
                break;
            };

            if visited.len() >= self.max_steps {
                self.state.set_status(WorkflowStatus::Error);
                return Err(CoreError::StepLimit(self.max_steps));
            }

            info!("Executing agent: {}", agent.id());
            let outcome = agent.step(&input, &mut self.state).await;
            self.state.record_agent(agent.state());

            if let Some(message) = &outcome.error {
                warn!("Agent {} failed: {}", agent.id(), message);
                run_error = Some(message.clone());
            }

            visited.push(kind);
            current = Some(kind);
            current_agent_id = Some(agent.id().to_string());
            outcomes.push(outcome);
        }

        let status = if run_error.is_some() {
            self.state.set_status(WorkflowStatus::Error);
            RunStatus::Error
        } else {
            self.state.set_status(WorkflowStatus::Completed);
            RunStatus::Completed
        };

        info!(
            "Workflow {} finished with {:?} after {} steps",
            self.workflow_id,
            status,
            visited.len()
        );

        Ok(RunResult {
            workflow_id: self.workflow_id.clone(),
            status,
            error: run_error,
            current_agent_id,
            visited,
            outcomes,
            workflow_state: self.state.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentPayload;
    use crate::models::TestExecutionResult;

    fn test_outcome(passed: bool) -> AgentOutcome {
        AgentOutcome::completed(
            "testing_agent",
            AgentPayload::TestResults {
                results: vec![TestExecutionResult::passed("TEST-1", "")],
                tests_passed: passed,
            },
        )
    }

    #[test]
    fn test_linear_routes() {
        let ok = AgentOutcome::completed("x", AgentPayload::Empty);
        assert_eq!(
            route(None, None, AgentKind::Planning, false),
            Route::Agent(AgentKind::Planning)
        );
        assert_eq!(
            route(Some(AgentKind::Planning), Some(&ok), AgentKind::Planning, false),
            Route::Agent(AgentKind::Coding)
        );
        assert_eq!(
            route(Some(AgentKind::Coding), Some(&ok), AgentKind::Planning, false),
            Route::Agent(AgentKind::Testing)
        );
        assert_eq!(
            route(Some(AgentKind::Debugging), Some(&ok), AgentKind::Planning, false),
            Route::Agent(AgentKind::Testing)
        );
        assert_eq!(
            route(Some(AgentKind::Documentation), Some(&ok), AgentKind::Planning, false),
            Route::End
        );
    }

    #[test]
    fn test_testing_routes() {
        let failed = test_outcome(false);
        let passed = test_outcome(true);
        assert_eq!(
            route(Some(AgentKind::Testing), Some(&failed), AgentKind::Planning, false),
            Route::Agent(AgentKind::Documentation)
        );
        assert_eq!(
            route(Some(AgentKind::Testing), Some(&failed), AgentKind::Planning, true),
            Route::Agent(AgentKind::Debugging)
        );
        assert_eq!(
            route(Some(AgentKind::Testing), Some(&passed), AgentKind::Planning, true),
            Route::Agent(AgentKind::Documentation)
        );
    }

    #[test]
    fn test_error_ends() {
        let err = AgentOutcome::error("coding_agent", "boom");
        assert_eq!(
            route(Some(AgentKind::Coding), Some(&err), AgentKind::Planning, true),
            Route::End
        );
    }

    #[tokio::test]
    async fn test_run_without_agents() {
        let mut workflow = DevelopmentWorkflow::new("empty");
        let err = workflow.run(RunInput::new("anything")).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }
}
