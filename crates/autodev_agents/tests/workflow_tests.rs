//! End-to-end runs of the agent graph in dry-run mode.

use std::sync::Arc;

use autodev_agents::{
    create_development_workflow, process_requirements, CodingAgent, DebuggingAgent,
    DocumentationAgent, PlanningAgent, TestingAgent,
};
use autodev_core::{
    AgentKind, AgentStatus, CoreError, DevelopmentWorkflow, DocType, RunInput, RunStatus, Settings,
    TestStatus, WorkflowStatus,
};
use autodev_llm::{LlmClient, MockLanguageModel};

fn dry_settings() -> Settings {
    Settings::default().with_dry_run(true)
}

#[tokio::test]
async fn test_dry_run_full_pipeline() {
    let result = process_requirements("Create a function to add two numbers", "e2e", &dry_settings())
        .await
        .unwrap();

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

    let state = &result.workflow_state;
    assert_eq!(state.status, WorkflowStatus::Completed);
    assert_eq!(state.requirements.len(), 1);
    assert_eq!(state.code_snippets[0].file_path.as_deref(), Some("main.py"));
    assert!(state.test_cases.iter().all(|t| t.status == TestStatus::Passed));
    assert!(state.documentation.iter().any(|d| d.doc_type == DocType::User));
    assert!(state
        .agent_states
        .values()
        .all(|a| a.status == AgentStatus::Idle));
}

#[tokio::test]
async fn test_live_without_key_fails_fast() {
    let err = create_development_workflow("no-key", &Settings::default()).err().unwrap();
    assert!(err.is_not_configured());
}

#[tokio::test]
async fn test_failing_tests_route_through_debugging() {
    // Generated tests reference a snippet that does not exist, so every live
    // execution fails and the debugging agent has nothing to fix. The step
    // limit ends the loop.
    let mut model = MockLanguageModel::new();
    model
        .expect_complete()
        .returning(|_| Ok(r#"{"test_cases": [{"title": "orphan", "code_snippet_ids": ["GONE"]}]}"#.to_string()));

    let mut workflow = DevelopmentWorkflow::new("debug-loop")
        .debug_on_failure(true)
        .max_steps(6);
    workflow.add_agent(Arc::new(PlanningAgent::new(LlmClient::DryRun)));
    workflow.add_agent(Arc::new(CodingAgent::new(LlmClient::DryRun)));
    workflow.add_agent(Arc::new(TestingAgent::new(LlmClient::live(Arc::new(model)))));
    workflow.add_agent(Arc::new(DebuggingAgent::new(LlmClient::DryRun)));
    workflow.add_agent(Arc::new(DocumentationAgent::new(LlmClient::DryRun)));

    let err = workflow.run(RunInput::new("adder")).await.unwrap_err();
    assert!(matches!(err, CoreError::StepLimit(6)));

    let state = workflow.get_state();
    assert_eq!(state.status, WorkflowStatus::Error);
    assert!(state.agent_states.contains_key("debugging_agent"));
    let failed = state
        .test_cases
        .iter()
        .filter(|t| t.status == TestStatus::Failed)
        .count();
    assert_eq!(failed, 2);
}
