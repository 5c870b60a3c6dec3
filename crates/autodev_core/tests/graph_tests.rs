//! Graph executor tests with scripted agents.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use autodev_core::{
    AgentHandler, AgentKind, AgentOutcome, AgentPayload, AgentRequest, AgentState, CoreError,
    DevelopmentWorkflow, RunInput, RunStatus, TestExecutionResult, WorkflowState, WorkflowStatus,
};

/// Agent that records a step name and fails tests for the first `failing_runs` calls.
struct ScriptedAgent {
    kind: AgentKind,
    calls: AtomicUsize,
    failing_runs: usize,
    error: bool,
}

impl ScriptedAgent {
    fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            calls: AtomicUsize::new(0),
            failing_runs: 0,
            error: false,
        }
    }

    fn failing(kind: AgentKind, failing_runs: usize) -> Self {
        Self {
            failing_runs,
            ..Self::new(kind)
        }
    }

    fn erroring(kind: AgentKind) -> Self {
        Self {
            error: true,
            ..Self::new(kind)
        }
    }
}

#[async_trait]
impl AgentHandler for ScriptedAgent {
    fn id(&self) -> &str {
        self.kind.default_id()
    }

    fn kind(&self) -> AgentKind {
        self.kind
    }

    fn state(&self) -> AgentState {
        AgentState::new(self.id(), self.kind)
    }

    async fn process(&self, _request: AgentRequest, _workflow: &mut WorkflowState) -> AgentOutcome {
        AgentOutcome::invalid_input(self.id(), "nothing")
    }

    async fn step(&self, _input: &RunInput, workflow: &mut WorkflowState) -> AgentOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        workflow.set_step(format!("{}_{}", self.kind, call));

        if self.error {
            return AgentOutcome::error(self.id(), "scripted failure");
        }

        if self.kind == AgentKind::Testing {
            let passed = call >= self.failing_runs;
            return AgentOutcome::completed(
                self.id(),
                AgentPayload::TestResults {
                    results: vec![TestExecutionResult::passed("TEST-1", "")],
                    tests_passed: passed,
                },
            );
        }

        AgentOutcome::completed(self.id(), AgentPayload::Empty)
    }
}

fn full_workflow(testing: ScriptedAgent) -> DevelopmentWorkflow {
    let mut workflow = DevelopmentWorkflow::new("wf-test");
    workflow.add_agent(Arc::new(ScriptedAgent::new(AgentKind::Planning)));
    workflow.add_agent(Arc::new(ScriptedAgent::new(AgentKind::Coding)));
    workflow.add_agent(Arc::new(testing));
    workflow.add_agent(Arc::new(ScriptedAgent::new(AgentKind::Debugging)));
    workflow.add_agent(Arc::new(ScriptedAgent::new(AgentKind::Documentation)));
    workflow
}

#[tokio::test]
async fn test_linear_run_completes() {
    let mut workflow = full_workflow(ScriptedAgent::new(AgentKind::Testing));
    assert_eq!(workflow.get_state().agent_states.len(), 5);

    let result = workflow.run(RunInput::new("calculator")).await.unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(
        result.visited,
        vec![
            AgentKind::Planning,
            AgentKind::Coding,
            AgentKind::Testing,
            AgentKind::Documentation
        ]
    );
    assert_eq!(result.current_agent_id.as_deref(), Some("documentation_agent"));
    assert_eq!(result.workflow_state.status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn test_failed_tests_skip_debugging_by_default() {
    let mut workflow = full_workflow(ScriptedAgent::failing(AgentKind::Testing, 1));
    let result = workflow.run(RunInput::new("x")).await.unwrap();
    assert!(!result.visited.contains(&AgentKind::Debugging));
}

#[tokio::test]
async fn test_debug_loop_until_tests_pass() {
    let mut workflow =
        full_workflow(ScriptedAgent::failing(AgentKind::Testing, 2)).debug_on_failure(true);
    let result = workflow.run(RunInput::new("x")).await.unwrap();

    assert_eq!(
        result.visited,
        vec![
            AgentKind::Planning,
            AgentKind::Coding,
            AgentKind::Testing,
            AgentKind::Debugging,
            AgentKind::Testing,
            AgentKind::Debugging,
            AgentKind::Testing,
            AgentKind::Documentation
        ]
    );
}

#[tokio::test]
async fn test_step_limit_bounds_loop() {
    let mut workflow = full_workflow(ScriptedAgent::failing(AgentKind::Testing, usize::MAX))
        .debug_on_failure(true)
        .max_steps(6);

    let err = workflow.run(RunInput::new("x")).await.unwrap_err();
    assert!(matches!(err, CoreError::StepLimit(6)));
    assert_eq!(workflow.get_state().status, WorkflowStatus::Error);
}

#[tokio::test]
async fn test_error_outcome_ends_run() {
    let mut workflow = DevelopmentWorkflow::new("wf-err");
    workflow.add_agent(Arc::new(ScriptedAgent::new(AgentKind::Planning)));
    workflow.add_agent(Arc::new(ScriptedAgent::erroring(AgentKind::Coding)));
    workflow.add_agent(Arc::new(ScriptedAgent::new(AgentKind::Testing)));

    let result = workflow.run(RunInput::new("x")).await.unwrap();
    assert_eq!(result.status, RunStatus::Error);
    assert_eq!(result.error.as_deref(), Some("scripted failure"));
    assert_eq!(result.visited, vec![AgentKind::Planning, AgentKind::Coding]);
    assert_eq!(result.workflow_state.status, WorkflowStatus::Error);
}

#[tokio::test]
async fn test_missing_agent_ends_with_error() {
    let mut workflow = DevelopmentWorkflow::new("wf-partial");
    workflow.add_agent(Arc::new(ScriptedAgent::new(AgentKind::Planning)));

    let result = workflow.run(RunInput::new("x")).await.unwrap();
    assert_eq!(result.status, RunStatus::Error);
    assert_eq!(result.visited, vec![AgentKind::Planning]);
}

#[tokio::test]
async fn test_explicit_start() {
    let mut workflow = full_workflow(ScriptedAgent::new(AgentKind::Testing));
    let result = workflow
        .run(RunInput::new("x").starting_at(AgentKind::Testing))
        .await
        .unwrap();
    assert_eq!(
        result.visited,
        vec![AgentKind::Testing, AgentKind::Documentation]
    );
}
