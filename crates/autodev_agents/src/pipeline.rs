//! Wiring the five agents into a development workflow.

use std::collections::BTreeMap;
use std::sync::Arc;

use autodev_core::{AgentKind, DevelopmentWorkflow, RunInput, RunResult, Settings};
use autodev_llm::LlmClient;
use tracing::info;

use crate::coding::CodingAgent;
use crate::debugging::DebuggingAgent;
use crate::documentation::DocumentationAgent;
use crate::error::AgentResult;
use crate::planning::PlanningAgent;
use crate::testing::TestingAgent;

/// Build a workflow with planning, coding, testing, debugging and
/// documentation agents registered in that order.
pub fn create_development_workflow(workflow_id: &str, settings: &Settings) -> AgentResult<DevelopmentWorkflow> {
    let mut workflow = DevelopmentWorkflow::new(workflow_id).with_settings(settings);
    workflow.add_agent(Arc::new(PlanningAgent::from_settings(settings)?));
    workflow.add_agent(Arc::new(CodingAgent::from_settings(settings)?));
    workflow.add_agent(Arc::new(TestingAgent::from_settings(settings)?));
    workflow.add_agent(Arc::new(DebuggingAgent::from_settings(settings)?));
    workflow.add_agent(Arc::new(DocumentationAgent::from_settings(settings)?));
    Ok(workflow)
}

/// The built-in prompts of one agent kind, keyed by prompt name.
pub fn default_prompts(kind: AgentKind) -> BTreeMap<String, String> {
    let client = LlmClient::DryRun;
    match kind {
        AgentKind::Planning => PlanningAgent::new(client).prompts(),
        AgentKind::Coding => CodingAgent::new(client).prompts(),
        AgentKind::Testing => TestingAgent::new(client).prompts(),
        AgentKind::Debugging => DebuggingAgent::new(client).prompts(),
        AgentKind::Documentation => DocumentationAgent::new(client).prompts(),
    }
}

/// Run the whole graph on a natural-language description.
pub async fn process_requirements(description: &str, workflow_id: &str, settings: &Settings) -> AgentResult<RunResult> {
    info!("Processing requirements for workflow {}", workflow_id);
    let mut workflow = create_development_workflow(workflow_id, settings)?;
    let result = workflow.run(RunInput::new(description)).await?;
    info!("Workflow {} finished with status {:?}", workflow_id, result.status);
    Ok(result)
}
