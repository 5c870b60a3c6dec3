//! Coding agent: code generation, review and improvement.

use std::collections::BTreeMap;

use async_trait::async_trait;
use autodev_core::{
    generate_id, AgentHandler, AgentKind, AgentOutcome, AgentPayload, AgentRequest, AgentState,
    CodeReview, CodeSnippet, RunInput, Settings, TechnicalTask, WorkflowState,
};
use autodev_llm::{vars, CodeReply, LlmClient};
use tracing::info;

use crate::base::AgentBase;
use crate::error::{AgentError, AgentResult};

pub const CODE_GENERATION: &str = "code_generation";
pub const CODE_REVIEW: &str = "code_review";
pub const CODE_IMPROVEMENT: &str = "code_improvement";

const CODE_GENERATION_PROMPT: &str = r#"You are an expert software engineer who writes clean, efficient, well documented code.
Implement the technical task below.

Task ID: {task_id}
Title: {title}
Description: {description}

Additional context:
{context}

Follow the best practices of the chosen language, handle errors properly, use meaningful
names and add comments where the logic is not obvious. Split the work into one snippet per file.

Answer with JSON of the form
{{"code_snippets": [{{"id": "CODE-001", "title": "...", "language": "python", "file_path": "main.py", "description": "...", "code": "...", "dependencies": []}}]}}"#;

const CODE_REVIEW_PROMPT: &str = r#"You are a meticulous code reviewer.
Review the {language} code below, written for this task: {task_description}

```{language}
{code}
```

Check correctness, error handling, readability, performance and security.

Answer with JSON of the form
{{"review_passed": true, "issues": ["..."], "suggestions": ["..."]}}"#;

const CODE_IMPROVEMENT_PROMPT: &str = r#"You are an expert software engineer improving existing code after a review.

Task: {task_description}

Original {language} code:
```{language}
{code}
```

Issues found:
{issues}

Suggestions:
{suggestions}

Rewrite the code so every issue is resolved and the suggestions are applied where sensible.

Answer with JSON of the form
{{"code_snippets": [{{"language": "{language}", "description": "...", "code": "..."}}]}}"#;

/// Writes and reviews code for technical tasks.
pub struct CodingAgent {
    base: AgentBase,
}

impl CodingAgent {
    pub fn new(client: LlmClient) -> Self {
        Self {
            base: AgentBase::new(
                AgentKind::Coding,
                client,
                &[
                    (CODE_GENERATION, CODE_GENERATION_PROMPT),
                    (CODE_REVIEW, CODE_REVIEW_PROMPT),
                    (CODE_IMPROVEMENT, CODE_IMPROVEMENT_PROMPT),
                ],
            ),
        }
    }

    pub fn from_settings(settings: &Settings) -> AgentResult<Self> {
        Ok(Self::new(LlmClient::for_agent(settings, AgentKind::Coding)?))
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

    pub async fn generate_code(&self, task: &TechnicalTask, context: &str) -> AgentResult<Vec<CodeSnippet>> {
        let chain = self.base.structured::<CodeReply>(CODE_GENERATION)?;
        let reply = chain
            .invoke(&vars([
                ("task_id", task.id.as_str()),
                ("title", task.title.as_str()),
                ("description", task.description.as_str()),
                ("context", context),
            ]))
            .await?;

        let snippets: Vec<CodeSnippet> = reply
            .code_snippets
            .into_iter()
            .map(|mut snippet| {
                if snippet.id.is_empty() {
                    snippet.id = generate_id("CODE");
                }
                snippet.task_id = Some(task.id.clone());
                snippet
            })
            .collect();

        info!("Generated {} code snippets for task {}", snippets.len(), task.id);
        Ok(snippets)
    }

    pub async fn review_code(&self, snippet: &CodeSnippet, task_description: &str) -> AgentResult<CodeReview> {
        let chain = self.base.structured::<CodeReview>(CODE_REVIEW)?;
        let review = chain
            .invoke(&vars([
                ("language", snippet.language.as_str()),
                ("code", snippet.code.as_str()),
                ("task_description", task_description),
            ]))
            .await?;

        info!(
            "Review of {} {} with {} issues",
            snippet.id,
            if review.review_passed { "passed" } else { "failed" },
            review.issues.len()
        );
        Ok(review)
    }

    pub async fn improve_code(
        &self,
        snippet: &CodeSnippet,
        review: &CodeReview,
        task_description: &str,
    ) -> AgentResult<CodeSnippet> {
        let chain = self.base.structured::<CodeReply>(CODE_IMPROVEMENT)?;
        let reply = chain
            .invoke(&vars([
                ("language", snippet.language.clone()),
                ("code", snippet.code.clone()),
                ("issues", bullet_list(&review.issues)),
                ("suggestions", bullet_list(&review.suggestions)),
                ("task_description", task_description.to_string()),
            ]))
            .await?;

        let rewritten = reply.code_snippets.into_iter().next().ok_or_else(|| {
            AgentError::execution_failed(self.base.id(), "Model returned no improved code")
        })?;

        let mut improved = snippet.clone();
        improved.id = format!("{}-improved", snippet.id);
        improved.code = rewritten.code;
        improved.description = format!("Improved version of {}", snippet.id);
        if rewritten.file_path.is_some() && improved.file_path.is_none() {
            improved.file_path = rewritten.file_path;
        }
        Ok(improved)
    }

    async fn handle(&self, request: AgentRequest, workflow: &mut WorkflowState) -> AgentResult<AgentPayload> {
        match request {
            AgentRequest::GenerateCode { task, context } => {
                let snippets = self.generate_code(&task, &context).await?;
                workflow.code_snippets.extend(snippets.iter().cloned());
                workflow.set_step("code_generation");
                Ok(AgentPayload::CodeSnippets(snippets))
            }
            AgentRequest::GenerateCodeBatch { tasks, context } => {
                let mut snippets = Vec::new();
                for task in &tasks {
                    snippets.extend(self.generate_code(task, &context).await?);
                }
                workflow.code_snippets.extend(snippets.iter().cloned());
                workflow.set_step("code_generation");
                Ok(AgentPayload::CodeSnippets(snippets))
            }
            AgentRequest::ReviewCode {
                code_snippet,
                task_description,
            } => {
                let review = self.review_code(&code_snippet, &task_description).await?;
                workflow.set_step("code_review");
                Ok(AgentPayload::Review(review))
            }
            AgentRequest::ImproveCode {
                code_snippet,
                review,
                task_description,
            } => {
                let improved = self.improve_code(&code_snippet, &review, &task_description).await?;
                workflow.code_snippets.push(improved.clone());
                workflow.set_step("code_improvement");
                Ok(AgentPayload::ImprovedCode(improved))
            }
            _ => Err(AgentError::invalid_input(
                "'task', 'tasks', or 'code_snippet' with appropriate action.",
            )),
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "None".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl AgentHandler for CodingAgent {
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

    async fn step(&self, _input: &RunInput, workflow: &mut WorkflowState) -> AgentOutcome {
        if workflow.technical_tasks.is_empty() {
            self.base.begin("generate_code_batch", workflow);
            let err = AgentError::execution_failed(self.base.id(), "No technical tasks to implement");
            return self.base.finish(Err(err), workflow);
        }

        let request = AgentRequest::GenerateCodeBatch {
            tasks: workflow.technical_tasks.clone(),
            context: String::new(),
        };
        self.process(request, workflow).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use autodev_llm::MockLanguageModel;

    fn task() -> TechnicalTask {
        TechnicalTask::new("TASK-1", "Adder", "Add two numbers")
    }

    #[tokio::test]
    async fn test_generate_sets_task_id() {
        let agent = CodingAgent::new(LlmClient::DryRun);
        let mut workflow = WorkflowState::new("wf");

        let outcome = agent
            .process(
                AgentRequest::GenerateCode {
                    task: task(),
                    context: String::new(),
                },
                &mut workflow,
            )
            .await;

        assert!(!outcome.is_error());
        assert_eq!(workflow.current_step, "code_generation");
        assert_eq!(workflow.code_snippets.len(), 1);
        assert_eq!(workflow.code_snippets[0].task_id.as_deref(), Some("TASK-1"));
    }

    #[tokio::test]
    async fn test_improve_code_naming() {
        let mut model = MockLanguageModel::new();
        model.expect_complete().returning(|req| {
            assert!(req.prompt.contains("- no docstring"));
            Ok(r#"{"code_snippets": [{"code": "def f():\n    \"\"\"Doc.\"\"\"\n"}]}"#.to_string())
        });
        let agent = CodingAgent::new(LlmClient::live(Arc::new(model)));
        let snippet = CodeSnippet::new("CODE-1", "def f(): pass", "python").with_file_path("f.py");
        let review = CodeReview {
            review_passed: false,
            issues: vec!["no docstring".to_string()],
            suggestions: vec![],
        };

        let mut workflow = WorkflowState::new("wf");
        let outcome = agent
            .process(
                AgentRequest::ImproveCode {
                    code_snippet: snippet,
                    review,
                    task_description: "f".to_string(),
                },
                &mut workflow,
            )
            .await;

        match outcome.payload {
            AgentPayload::ImprovedCode(improved) => {
                assert_eq!(improved.id, "CODE-1-improved");
                assert_eq!(improved.description, "Improved version of CODE-1");
                assert_eq!(improved.file_path.as_deref(), Some("f.py"));
            }
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(workflow.current_step, "code_improvement");
        assert_eq!(workflow.code_snippets.len(), 1);
    }

    #[tokio::test]
    async fn test_review_dry_run_passes() {
        let agent = CodingAgent::new(LlmClient::DryRun);
        let review = agent
            .review_code(&CodeSnippet::new("C", "x = 1", "python"), "assign")
            .await
            .unwrap();
        assert!(review.review_passed);
    }

    #[tokio::test]
    async fn test_step_without_tasks() {
        let agent = CodingAgent::new(LlmClient::DryRun);
        let mut workflow = WorkflowState::new("wf");
        let outcome = agent.step(&RunInput::new("x"), &mut workflow).await;
        assert!(outcome.is_error());
        assert!(outcome.error.unwrap().contains("No technical tasks"));
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let agent = CodingAgent::new(LlmClient::DryRun);
        let mut workflow = WorkflowState::new("wf");
        let outcome = agent
            .process(
                AgentRequest::AnalyzeDescription {
                    description: "x".to_string(),
                },
                &mut workflow,
            )
            .await;
        assert_eq!(
            outcome.error.as_deref(),
            Some("Invalid input. Expected 'task', 'tasks', or 'code_snippet' with appropriate action.")
        );
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(bullet_list(&[]), "None");
        assert_eq!(bullet_list(&["a".to_string(), "b".to_string()]), "- a\n- b");
    }
}
