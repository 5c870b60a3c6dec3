//! Two-phase workflow: produce an execution plan, then implement it step
//! by step.
//!
//! In dry-run mode the implementation phase fabricates file contents from
//! the plan itself, so the whole flow can be exercised offline.

use std::collections::BTreeMap;
use std::path::Path;

use autodev_core::{
    CodeSnippet, ExecutionPlan, PlanStep, Settings, TechnicalTask, WorkflowState,
    WorkflowStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::coding::CodingAgent;
use crate::error::{AgentError, AgentResult};
use crate::executor::file_extension;
use crate::output::write_file;
use crate::planning::PlanningAgent;
use crate::testing::TestingAgent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initialized,
    Planning,
    Implementation,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Initialized => "initialized",
            Phase::Planning => "planning",
            Phase::Implementation => "implementation",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningPhase {
    pub phase: Phase,
    pub status: String,
    pub execution_plan: ExecutionPlan,
    pub ready_for_implementation: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningPhaseReport {
    pub workflow_id: String,
    pub requirement: String,
    pub planning_phase: PlanningPhase,
    pub overall_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplementationReport {
    pub phase: Phase,
    pub status: String,
    pub files_generated: Vec<String>,
    pub code_generated: BTreeMap<String, String>,
    pub tests_generated: BTreeMap<String, String>,
    pub documentation: String,
    pub execution_summary: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct StepArtifacts {
    files: Vec<String>,
    code: BTreeMap<String, String>,
    tests: BTreeMap<String, String>,
}

pub struct EnhancedDevelopmentWorkflow {
    workflow_id: String,
    planning: PlanningAgent,
    coding: CodingAgent,
    testing: TestingAgent,
    state: WorkflowState,
    phase: Phase,
    execution_plan: Option<ExecutionPlan>,
}

impl EnhancedDevelopmentWorkflow {
    pub fn new(
        workflow_id: impl Into<String>,
        planning: PlanningAgent,
        coding: CodingAgent,
        testing: TestingAgent,
    ) -> Self {
        let workflow_id = workflow_id.into();
        Self {
            state: WorkflowState::new(workflow_id.clone()),
            workflow_id,
            planning,
            coding,
            testing,
            phase: Phase::Initialized,
            execution_plan: None,
        }
    }

    pub fn from_settings(workflow_id: impl Into<String>, settings: &Settings) -> AgentResult<Self> {
        Ok(Self::new(
            workflow_id,
            PlanningAgent::from_settings(settings)?,
            CodingAgent::from_settings(settings)?,
            TestingAgent::from_settings(settings)?,
        ))
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn current_phase(&self) -> Phase {
        self.phase
    }

    pub fn get_execution_plan(&self) -> Option<&ExecutionPlan> {
        self.execution_plan.as_ref()
    }

    pub fn get_state(&self) -> &WorkflowState {
        &self.state
    }

    pub async fn execute_planning_phase(&mut self, requirement: &str, context: Option<&str>) -> PlanningPhaseReport {
        info!("Starting planning phase for workflow: {}", self.workflow_id);
        self.phase = Phase::Planning;
        self.state.set_step("planning");
        self.state.set_status(WorkflowStatus::InProgress);

        let plan = self.planning.create_execution_plan(requirement, context).await;
        self.execution_plan = Some(plan.clone());
        self.state.set_step("planning_complete");

        info!("Planning phase completed with {} steps", plan.steps.len());
        PlanningPhaseReport {
            workflow_id: self.workflow_id.clone(),
            requirement: requirement.to_string(),
            planning_phase: PlanningPhase {
                phase: Phase::Planning,
                status: "completed".to_string(),
                execution_plan: plan,
                ready_for_implementation: true,
                timestamp: Utc::now(),
            },
            overall_status: "planning_complete".to_string(),
        }
    }

    /// Implement every step of `plan`. A file that cannot be written is
    /// recorded as an `[ERROR]` entry in `files_generated`; the rest of its
    /// step and later steps still run.
    pub async fn execute_implementation_phase(
        &mut self,
        plan: &ExecutionPlan,
        dry_run: bool,
        output_dir: &Path,
    ) -> ImplementationReport {
        info!("Starting implementation phase for workflow: {}", self.workflow_id);
        self.phase = Phase::Implementation;
        self.state.set_step("implementation");
        self.state.set_status(WorkflowStatus::InProgress);

        let mut files_generated = Vec::new();
        let mut code_generated = BTreeMap::new();
        let mut tests_generated = BTreeMap::new();

        for step in &plan.steps {
            info!("Executing step {}: {}", step.step_number, step.title);
            let artifacts = self.execute_step(step, plan, dry_run, output_dir).await;
            files_generated.extend(artifacts.files);
            code_generated.extend(artifacts.code);
            tests_generated.extend(artifacts.tests);
        }

        let documentation = project_documentation(plan, &files_generated);
        self.state.set_step("implementation_complete");
        self.state.set_status(WorkflowStatus::Completed);
        info!("Implementation phase completed");

        ImplementationReport {
            phase: Phase::Implementation,
            status: "completed".to_string(),
            files_generated,
            code_generated,
            tests_generated,
            documentation,
            execution_summary: format!("Completed {} implementation steps successfully", plan.steps.len()),
            timestamp: Utc::now(),
        }
    }

    /// Run the implementation phase on the plan produced by the planning
    /// phase.
    pub async fn implement_current_plan(&mut self, dry_run: bool, output_dir: &Path) -> AgentResult<ImplementationReport> {
        let plan = self.execution_plan.clone().ok_or_else(|| {
            AgentError::execution_failed(&self.workflow_id, "No execution plan. Run the planning phase first")
        })?;
        Ok(self.execute_implementation_phase(&plan, dry_run, output_dir).await)
    }

    async fn execute_step(&mut self, step: &PlanStep, plan: &ExecutionPlan, dry_run: bool, output_dir: &Path) -> StepArtifacts {
        let mut artifacts = StepArtifacts::default();
        let mut snippets = Vec::new();

        for path in &step.files_to_create {
            if dry_run {
                artifacts.code.insert(path.clone(), mock_file_content(path, step, plan));
                artifacts.files.push(format!("[DRY RUN] {}", path));
                continue;
            }

            let (content, snippet) = self.generate_file(path, step, plan).await;
            if let Err(e) = write_file(output_dir, path, &content).await {
                warn!("Step {}: could not write {}: {}", step.step_number, path, e);
                artifacts.files.push(format!("[ERROR] {}: {}", path, e));
                continue;
            }
            artifacts.code.insert(path.clone(), content);
            artifacts.files.push(path.clone());
            if let Some(snippet) = snippet {
                self.state.code_snippets.push(snippet.clone());
                snippets.push(snippet);
            }
        }

        if step.is_testing_step() {
            let tests = if dry_run {
                mock_tests(step)
            } else {
                self.generate_tests(&snippets, output_dir).await
            };
            artifacts.tests.extend(tests);
        }

        artifacts
    }

    async fn generate_file(&mut self, path: &str, step: &PlanStep, plan: &ExecutionPlan) -> (String, Option<CodeSnippet>) {
        let task = TechnicalTask::new(
            format!("STEP-{}", step.step_number),
            step.title.clone(),
            format!(
                "{}\n\nFile to create: {}\nKey functions: {}",
                step.description,
                path,
                step.key_functions.join(", ")
            ),
        );
        let context = format!(
            "Plan: {}\nArchitecture: {}\nTechnology stack: {}",
            plan.summary,
            plan.architecture_overview,
            plan.technology_stack.join(", ")
        );

        match self.coding.generate_code(&task, &context).await {
            Ok(snippets) => match snippets.into_iter().next() {
                Some(mut snippet) => {
                    snippet.file_path = Some(path.to_string());
                    (snippet.code.clone(), Some(snippet))
                }
                None => (format!("# Error generating code for {}: no code returned", path), None),
            },
            Err(e) => {
                warn!("Error generating code for {}: {}", path, e);
                (format!("# Error generating code for {}: {}", path, e), None)
            }
        }
    }

    /// Tests for the code a step produced. A snippet whose tests cannot be
    /// generated is skipped with a warning.
    async fn generate_tests(&mut self, snippets: &[CodeSnippet], output_dir: &Path) -> BTreeMap<String, String> {
        let mut tests = BTreeMap::new();
        for snippet in snippets {
            let cases = match self.testing.generate_tests(snippet).await {
                Ok(cases) => cases,
                Err(e) => {
                    warn!("Error generating tests for {}: {}", snippet.id, e);
                    continue;
                }
            };
            for case in cases {
                let name = format!("tests/test_{}.{}", case.id, file_extension(&snippet.language));
                if let Err(e) = write_file(output_dir, &name, &case.test_code).await {
                    warn!("Could not write {}: {}", name, e);
                    continue;
                }
                tests.insert(name, case.test_code.clone());
                self.state.test_cases.push(case);
            }
        }
        tests
    }
}

fn bullets(items: &[String], code: bool) -> String {
    items
        .iter()
        .map(|item| if code { format!("- `{}`", item) } else { format!("- {}", item) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Placeholder content for a planned file, shaped by its extension.
pub fn mock_file_content(path: &str, step: &PlanStep, plan: &ExecutionPlan) -> String {
    if path.ends_with(".py") {
        let stubs: String = step
            .key_functions
            .iter()
            .map(|f| format!("def {f}():\n    \"\"\"Mock implementation of {f}\"\"\"\n    pass\n\n\n"))
            .collect();
        format!(
            "\"\"\"\n{title} - {path}\n\nGenerated as part of: {summary}\nStep: {desc}\n\nThis is a mock implementation for development/testing purposes.\n\"\"\"\n\n\n\
             def main():\n    \"\"\"Main function for {title}\"\"\"\n    print(\"Mock implementation of {title}\")\n\n\n\
             {stubs}if __name__ == \"__main__\":\n    main()\n",
            title = step.title,
            path = path,
            summary = plan.summary,
            desc = step.description,
            stubs = stubs,
        )
    } else if path.ends_with(".md") {
        format!(
            "# {}\n\n## Description\n{}\n\n## Implementation Details\n- Estimated time: {}\n- Complexity: {}\n\n\
             ## Key Functions\n{}\n\n## Files Created\n{}\n\n*This documentation was auto-generated from the execution plan.*\n",
            step.title,
            step.description,
            step.estimated_time,
            step.complexity_level,
            bullets(&step.key_functions, true),
            bullets(&step.files_to_create, true),
        )
    } else {
        format!(
            "# {}\n# Generated for: {}\n# Description: {}\n# Part of: {}\n",
            step.title, path, step.description, plan.summary
        )
    }
}

/// Pytest skeletons for every `test_` file a step creates.
pub fn mock_tests(step: &PlanStep) -> BTreeMap<String, String> {
    let class_name: String = step.title.split_whitespace().collect();
    let method_name = step.title.to_lowercase().replace(' ', "_");
    let methods: String = step
        .key_functions
        .iter()
        .map(|f| {
            format!(
                "\n    def test_{}(self):\n        \"\"\"Test {} function\"\"\"\n        assert True\n",
                f.to_lowercase(),
                f
            )
        })
        .collect();

    step.files_to_create
        .iter()
        .filter(|path| path.starts_with("test_") || path.contains("/test_"))
        .map(|path| {
            let content = format!(
                "\"\"\"\nTest file for {title}\nGenerated from execution plan step {number}\n\"\"\"\nimport pytest\n\n\n\
                 class Test{class}:\n    \"\"\"Test class for {title}\"\"\"\n\n\
                 \x20   def test_{method}(self):\n        \"\"\"Test {desc}\"\"\"\n        assert True\n{methods}",
                title = step.title,
                number = step.step_number,
                class = class_name,
                method = method_name,
                desc = step.description,
                methods = methods,
            );
            (path.clone(), content)
        })
        .collect()
}

/// Markdown overview of the plan and what the implementation produced.
pub fn project_documentation(plan: &ExecutionPlan, files_generated: &[String]) -> String {
    format!(
        "# {requirement}\n\n## Project Overview\n{summary}\n\n## Architecture\n{architecture}\n\n\
         ## Technology Stack\n{stack}\n\n## Implementation Summary\n\
         - **Total Steps Completed:** {steps}\n- **Files Generated:** {files}\n\
         - **Estimated Implementation Time:** {time}\n\n## Generated Files\n{file_list}\n\n\
         ## Testing Strategy\n{testing}\n\n## Success Criteria\n{criteria}\n\n\
         ## Risk Assessment\n{risks}\n\n---\n*This documentation was automatically generated by autodev.*\n",
        requirement = plan.requirement,
        summary = plan.summary,
        architecture = plan.architecture_overview,
        stack = bullets(&plan.technology_stack, false),
        steps = plan.steps.len(),
        files = files_generated.len(),
        time = plan.total_estimated_time,
        file_list = bullets(files_generated, true),
        testing = plan.testing_strategy,
        criteria = bullets(&plan.success_criteria, false),
        risks = plan.risk_assessment,
    )
}
