//! Planning agent: requirements, technical tasks and execution plans.

use std::collections::BTreeMap;

use async_trait::async_trait;
use autodev_core::{
    generate_id, AgentHandler, AgentKind, AgentOutcome, AgentPayload, AgentRequest, AgentState,
    ExecutionPlan, PlanStep, Requirement, RunInput, Settings, TechnicalTask, WorkflowState,
};
use autodev_llm::{vars, LlmClient, RequirementsReply, TasksReply};
use tracing::{info, warn};

use crate::base::AgentBase;
use crate::error::{AgentError, AgentResult};

pub const REQUIREMENT_ANALYSIS: &str = "requirement_analysis";
pub const TASK_BREAKDOWN: &str = "task_breakdown";
pub const EXECUTION_PLAN: &str = "execution_plan";

const REQUIREMENT_ANALYSIS_PROMPT: &str = r#"You are an experienced software requirements analyst.
Read the description below and extract clear, specific, testable software requirements.

For every requirement:
1. Give it a unique id such as REQ-001
2. Describe it in one or two precise sentences
3. Rate its priority as high, medium or low
4. Tag it with relevant topics
5. List the ids of requirements it depends on, if any

Description:
{description}

Answer with JSON of the form
{{"requirements": [{{"id": "REQ-001", "description": "...", "priority": "high", "tags": [], "dependencies": []}}]}}"#;

const TASK_BREAKDOWN_PROMPT: &str = r#"You are a senior software architect and technical lead.
Break the requirements below into concrete technical tasks a developer can pick up.

For every task:
1. Give it a unique id such as TASK-001
2. Write a short descriptive title
3. Describe the technical approach in detail
4. Reference the requirement ids it fulfils
5. Rate its priority as high, medium or low
6. List the ids of tasks it depends on, if any

Requirements:
{requirements}

Answer with JSON of the form
{{"tasks": [{{"id": "TASK-001", "title": "...", "description": "...", "requirement_ids": ["REQ-001"], "priority": "medium", "dependencies": [], "estimated_effort": "2h"}}]}}"#;

const EXECUTION_PLAN_PROMPT: &str = r#"You are a senior software architect writing a detailed execution plan.

REQUIREMENT: {requirement}

CONTEXT: {context}

The plan must cover:
1. An architecture overview and the design patterns used
2. The recommended technology stack
3. Numbered implementation steps with realistic time estimates, the step numbers each one depends on, the files it creates or modifies, its key functions and a complexity of low, medium or high
4. Risks and how to mitigate them
5. Success criteria and the testing strategy

Favour maintainable solutions with proper tests.

Answer with JSON containing the fields requirement, summary, total_estimated_time,
architecture_overview, technology_stack, steps (each with step_number, title, description,
estimated_time, dependencies, files_to_create, files_to_modify, key_functions,
complexity_level), risk_assessment, success_criteria, project_structure and testing_strategy."#;

/// Turns natural-language descriptions into requirements, tasks and plans.
pub struct PlanningAgent {
    base: AgentBase,
}

impl PlanningAgent {
    pub fn new(client: LlmClient) -> Self {
        Self {
            base: AgentBase::new(
                AgentKind::Planning,
                client,
                &[
                    (REQUIREMENT_ANALYSIS, REQUIREMENT_ANALYSIS_PROMPT),
                    (TASK_BREAKDOWN, TASK_BREAKDOWN_PROMPT),
                    (EXECUTION_PLAN, EXECUTION_PLAN_PROMPT),
                ],
            ),
        }
    }

    pub fn from_settings(settings: &Settings) -> AgentResult<Self> {
        Ok(Self::new(LlmClient::for_agent(settings, AgentKind::Planning)?))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.base.set_id(id);
        self
    }

    pub fn with_prompt(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.base.set_prompt(name, text);
        self
    }

    pub fn prompts(&self) -> BTreeMap<String, String> {
        self.base.prompts()
    }

    pub async fn analyze_requirements(&self, description: &str) -> AgentResult<Vec<Requirement>> {
        let chain = self.base.structured::<RequirementsReply>(REQUIREMENT_ANALYSIS)?;
        let reply = chain.invoke(&vars([("description", description)])).await?;

        let requirements: Vec<Requirement> = reply
            .requirements
            .into_iter()
            .map(|mut req| {
                if req.id.is_empty() {
                    req.id = generate_id("REQ");
                }
                req
            })
            .collect();

        info!("Extracted {} requirements", requirements.len());
        Ok(requirements)
    }

    pub async fn break_down_tasks(&self, requirements: &[Requirement]) -> AgentResult<Vec<TechnicalTask>> {
        let chain = self.base.structured::<TasksReply>(TASK_BREAKDOWN)?;
        let reply = chain
            .invoke(&vars([("requirements", format_requirements(requirements))]))
            .await?;

        let tasks: Vec<TechnicalTask> = reply
            .tasks
            .into_iter()
            .map(|mut task| {
                if task.id.is_empty() {
                    task.id = generate_id("TASK");
                }
                task
            })
            .collect();

        info!("Broke {} requirements into {} tasks", requirements.len(), tasks.len());
        Ok(tasks)
    }

    /// Build an execution plan. Never fails: a model or parse error yields
    /// the minimal fallback plan.
    pub async fn create_execution_plan(&self, requirement: &str, context: Option<&str>) -> ExecutionPlan {
        let head: String = requirement.chars().take(100).collect();
        info!("Creating execution plan for requirement: {}...", head);

        let chain = match self.base.structured::<ExecutionPlan>(EXECUTION_PLAN) {
            Ok(chain) => chain,
            Err(e) => {
                warn!("Error creating execution plan: {}", e);
                return fallback_plan(requirement);
            }
        };

        let prompt_vars = vars([
            ("requirement", requirement),
            ("context", context.unwrap_or("{}")),
        ]);

        match chain.invoke(&prompt_vars).await {
            Ok(mut plan) => {
                if plan.requirement.is_empty() {
                    plan.requirement = requirement.to_string();
                }
                info!("Created execution plan with {} steps", plan.steps.len());
                plan
            }
            Err(e) => {
                warn!("Error creating execution plan: {}", e);
                fallback_plan(requirement)
            }
        }
    }

    async fn handle(&self, request: AgentRequest, workflow: &mut WorkflowState) -> AgentResult<AgentPayload> {
        match request {
            AgentRequest::AnalyzeDescription { description } => {
                let requirements = self.analyze_requirements(&description).await?;
                let tasks = self.break_down_tasks(&requirements).await?;
                workflow.requirements = requirements.clone();
                workflow.technical_tasks = tasks.clone();
                workflow.set_step("requirement_analysis");
                Ok(AgentPayload::Requirements { requirements, tasks })
            }
            AgentRequest::BreakDown { requirements } => {
                let tasks = self.break_down_tasks(&requirements).await?;
                workflow.technical_tasks = tasks.clone();
                workflow.set_step("task_breakdown");
                Ok(AgentPayload::Tasks(tasks))
            }
            _ => Err(AgentError::invalid_input("'description' or 'requirements'.")),
        }
    }
}

/// `ID/Description/Priority/Tags` blocks, one per requirement.
pub fn format_requirements(requirements: &[Requirement]) -> String {
    requirements
        .iter()
        .map(|req| {
            format!(
                "ID: {}\nDescription: {}\nPriority: {}\nTags: {}\n",
                req.id,
                req.description,
                req.priority,
                req.tags.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Two-step plan used when no better plan can be produced.
pub fn fallback_plan(requirement: &str) -> ExecutionPlan {
    ExecutionPlan {
        requirement: requirement.to_string(),
        summary: "Basic implementation approach (fallback mode)".to_string(),
        total_estimated_time: "2-4 hours".to_string(),
        architecture_overview: "Standard modular approach with separation of concerns".to_string(),
        technology_stack: vec!["Python".to_string(), "Standard Libraries".to_string()],
        steps: vec![
            PlanStep::new(
                1,
                "Analyze Requirements",
                "Break down the requirement into specific implementation tasks",
            )
            .estimated("30 minutes")
            .creates(&["analysis.md"])
            .complexity("low"),
            PlanStep::new(2, "Implement Core Functionality", "Write the main implementation code")
                .estimated("2 hours")
                .depends_on(&[1])
                .creates(&["main.py"])
                .functions(&["main", "process"])
                .complexity("medium"),
        ],
        risk_assessment: "Low risk - standard implementation pattern".to_string(),
        success_criteria: vec![
            "Code passes all tests".to_string(),
            "Requirements are fully implemented".to_string(),
        ],
        project_structure: vec!["main.py".to_string(), "README.md".to_string()],
        testing_strategy: "Unit testing with standard assertions".to_string(),
    }
}

#[async_trait]
impl AgentHandler for PlanningAgent {
    fn id(&self) -> &str {
        self.base.id()
    }

    fn kind(&self) -> AgentKind {
        self.base.kind()
    }

    fn state(&self) -> AgentState {
        self.base.state()
    }

    async fn process(&self, request: AgentRequest, workflow: &mut WorkflowState) -> AgentOutcome {
        self.base.begin(request.action(), workflow);
        let result = self.handle(request, workflow).await;
        self.base.finish(result, workflow)
    }

    async fn step(&self, input: &RunInput, workflow: &mut WorkflowState) -> AgentOutcome {
        let request = AgentRequest::AnalyzeDescription {
            description: input.description.clone(),
        };
        self.process(request, workflow).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use autodev_core::Priority;
    use autodev_llm::{LlmError, MockLanguageModel};

    #[tokio::test]
    async fn test_dry_run_analysis() {
        let agent = PlanningAgent::new(LlmClient::DryRun);
        let mut workflow = WorkflowState::new("wf");

        let outcome = agent
            .process(
                AgentRequest::AnalyzeDescription {
                    description: "Build a calculator".to_string(),
                },
                &mut workflow,
            )
            .await;

        assert!(!outcome.is_error());
        assert_eq!(workflow.current_step, "requirement_analysis");
        assert_eq!(workflow.requirements[0].id, "DRYRUN");
        assert_eq!(workflow.technical_tasks[0].requirement_ids, vec!["DRYRUN"]);
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let agent = PlanningAgent::new(LlmClient::DryRun);
        let mut workflow = WorkflowState::new("wf");
        let outcome = agent
            .process(
                AgentRequest::DocumentCode {
                    code_snippet: autodev_core::CodeSnippet::new("C", "x", "python"),
                },
                &mut workflow,
            )
            .await;
        assert_eq!(
            outcome.error.as_deref(),
            Some("Invalid input. Expected 'description' or 'requirements'.")
        );
        assert_eq!(workflow.agent_states["planning_agent"].status, autodev_core::AgentStatus::Error);
    }

    #[tokio::test]
    async fn test_live_ids_filled() {
        let mut model = MockLanguageModel::new();
        model.expect_complete().returning(|_| {
            Ok(r#"{"requirements": [{"description": "Login", "priority": "HIGH"}]}"#.to_string())
        });
        let agent = PlanningAgent::new(LlmClient::live(Arc::new(model)));

        let requirements = agent.analyze_requirements("users log in").await.unwrap();
        assert!(requirements[0].id.starts_with("REQ-"));
        assert_eq!(requirements[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_plan_falls_back_on_error() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .returning(|_| Err(LlmError::Request("offline".to_string())));
        let agent = PlanningAgent::new(LlmClient::live(Arc::new(model)));

        let plan = agent.create_execution_plan("todo app", None).await;
        assert_eq!(plan.summary, "Basic implementation approach (fallback mode)");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.requirement, "todo app");
    }

    #[tokio::test]
    async fn test_dry_run_plan() {
        let agent = PlanningAgent::new(LlmClient::DryRun);
        let plan = agent.create_execution_plan("todo app", None).await;
        assert_eq!(plan.steps.len(), 5);
        assert_eq!(plan.total_estimated_time, "3-5 hours");
    }

    #[test]
    fn test_format_requirements() {
        let reqs = vec![Requirement::new("REQ-1", "Login").with_tag("auth").with_tag("ui")];
        assert_eq!(
            format_requirements(&reqs),
            "ID: REQ-1\nDescription: Login\nPriority: medium\nTags: auth, ui\n"
        );
    }

    #[test]
    fn test_prompt_override() {
        let agent = PlanningAgent::new(LlmClient::DryRun).with_prompt(TASK_BREAKDOWN, "new {requirements}");
        assert_eq!(agent.prompts()[TASK_BREAKDOWN], "new {requirements}");
        assert_eq!(agent.prompts().len(), 3);
    }
}
