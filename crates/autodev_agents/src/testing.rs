//! Testing agent: test generation, execution and result analysis.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use autodev_core::{
    generate_id, AgentHandler, AgentKind, AgentOutcome, AgentPayload, AgentRequest, AgentState,
    CodeSnippet, RunInput, Settings, TestCase, TestExecutionResult, WorkflowState,
};
use autodev_llm::{vars, LlmClient, TestsReply, DRY_RUN_TEXT};
use tracing::info;

use crate::base::AgentBase;
use crate::error::{AgentError, AgentResult};
use crate::executor::TestExecutor;

pub const TEST_GENERATION: &str = "test_generation";
pub const TEST_ANALYSIS: &str = "test_analysis";

const TEST_GENERATION_PROMPT: &str = r#"You are a software testing expert.
Write thorough tests for the {language} code below.

Code description: {description}

```{language}
{code}
```

Cover normal behaviour, edge cases and error handling. Use the standard test framework of
the language (pytest for Python, plain assertions with node for JavaScript). Each test must be
runnable on its own next to the code file.

Answer with JSON of the form
{{"test_cases": [{{"id": "TEST-001", "title": "...", "description": "...", "test_code": "...", "expected_result": "..."}}]}}"#;

const TEST_ANALYSIS_PROMPT: &str = r#"You are a software testing expert analysing a test run.

Test case:
{test_case}

Execution result:
{execution_result}

Explain whether the test passed and why. When it failed, identify the most likely root cause
and say whether the defect is in the code under test or in the test itself."#;

/// Generates tests for snippets and runs them.
pub struct TestingAgent {
    base: AgentBase,
    executor: TestExecutor,
}

impl TestingAgent {
    pub fn new(client: LlmClient) -> Self {
        Self {
            base: AgentBase::new(
                AgentKind::Testing,
                client,
                &[
                    (TEST_GENERATION, TEST_GENERATION_PROMPT),
                    (TEST_ANALYSIS, TEST_ANALYSIS_PROMPT),
                ],
            ),
            executor: TestExecutor::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> AgentResult<Self> {
        let client = LlmClient::for_agent(settings, AgentKind::Testing)?;
        Ok(Self::new(client).with_executor(TestExecutor::new(Duration::from_secs(
            settings.test_timeout_secs,
        ))))
    }

    pub fn with_executor(mut self, executor: TestExecutor) -> Self {
        self.executor = executor;
        self
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

    pub async fn generate_tests(&self, snippet: &CodeSnippet) -> AgentResult<Vec<TestCase>> {
        let chain = self.base.structured::<TestsReply>(TEST_GENERATION)?;
        let reply = chain
            .invoke(&vars([
                ("language", snippet.language.as_str()),
                ("code", snippet.code.as_str()),
                ("description", snippet.description.as_str()),
            ]))
            .await?;

        let tests: Vec<TestCase> = reply
            .test_cases
            .into_iter()
            .map(|mut test| {
                if test.id.is_empty() {
                    test.id = generate_id("TEST");
                }
                if test.code_snippet_ids.is_empty() {
                    test.code_snippet_ids = vec![snippet.id.clone()];
                }
                test
            })
            .collect();

        info!("Generated {} test cases for {}", tests.len(), snippet.id);
        Ok(tests)
    }

    pub async fn execute_test(&self, test: &TestCase, snippets: &[CodeSnippet]) -> TestExecutionResult {
        if self.base.client().is_dry_run() {
            return TestExecutionResult::passed(&test.id, DRY_RUN_TEXT);
        }
        let result = self.executor.execute(test, snippets).await;
        info!(
            "Test {} {}",
            test.id,
            if result.passed { "passed" } else { "failed" }
        );
        result
    }

    pub async fn analyze_test_results(&self, test: &TestCase, result: &TestExecutionResult) -> AgentResult<String> {
        let chain = self.base.text(TEST_ANALYSIS)?;
        let analysis = chain
            .invoke(&vars([
                ("test_case", format_test_case(test)),
                ("execution_result", format_result(result)),
            ]))
            .await?;
        Ok(analysis)
    }

    async fn run_tests(
        &self,
        tests: &[TestCase],
        snippets: &[CodeSnippet],
        workflow: &mut WorkflowState,
    ) -> Vec<TestExecutionResult> {
        let mut results = Vec::with_capacity(tests.len());
        for test in tests {
            let result = self.execute_test(test, snippets).await;
            workflow.mark_test(&test.id, result.passed);
            results.push(result);
        }
        results
    }

    async fn handle(&self, request: AgentRequest, workflow: &mut WorkflowState) -> AgentResult<AgentPayload> {
        match request {
            AgentRequest::GenerateTests { code_snippet } => {
                let tests = self.generate_tests(&code_snippet).await?;
                workflow.test_cases.extend(tests.iter().cloned());
                workflow.set_step("test_generation");
                Ok(AgentPayload::TestCases(tests))
            }
            AgentRequest::GenerateTestsBatch { code_snippets } => {
                let mut tests = Vec::new();
                for snippet in &code_snippets {
                    tests.extend(self.generate_tests(snippet).await?);
                }
                workflow.test_cases.extend(tests.iter().cloned());
                workflow.set_step("test_generation");
                Ok(AgentPayload::TestCases(tests))
            }
            AgentRequest::ExecuteTest {
                test_case,
                code_snippets,
            } => {
                let result = self.execute_test(&test_case, &code_snippets).await;
                workflow.mark_test(&test_case.id, result.passed);
                workflow.set_step("test_execution");
                let tests_passed = result.passed;
                Ok(AgentPayload::TestResult { result, tests_passed })
            }
            AgentRequest::ExecuteTests {
                test_cases,
                code_snippets,
            } => {
                let results = self.run_tests(&test_cases, &code_snippets, workflow).await;
                workflow.set_step("test_execution");
                let tests_passed = results.iter().all(|r| r.passed);
                Ok(AgentPayload::TestResults { results, tests_passed })
            }
            AgentRequest::AnalyzeTest { test_case, result } => {
                let analysis = self.analyze_test_results(&test_case, &result).await?;
                workflow.set_step("test_analysis");
                Ok(AgentPayload::TestAnalysis(analysis))
            }
            _ => Err(AgentError::invalid_input(
                "'code_snippet'/'code_snippets' with action 'generate_tests', \
                 'test_case'/'test_cases' with action 'execute_test'/'execute_tests', \
                 or 'test_case' and 'test_result' with action 'analyze'.",
            )),
        }
    }

    /// Graph mode: cover untested snippets, then run every pending test.
    async fn graph_step(&self, workflow: &mut WorkflowState) -> AgentResult<AgentPayload> {
        for snippet in workflow.untested_snippets() {
            let tests = self.generate_tests(&snippet).await?;
            workflow.test_cases.extend(tests);
        }

        let pending = workflow.pending_tests();
        let snippets = workflow.code_snippets.clone();
        let results = self.run_tests(&pending, &snippets, workflow).await;
        workflow.set_step("test_execution");

        let tests_passed = results.iter().all(|r| r.passed);
        info!(
            "Executed {} tests, {} failed",
            results.len(),
            results.iter().filter(|r| !r.passed).count()
        );
        Ok(AgentPayload::TestResults { results, tests_passed })
    }
}

fn format_test_case(test: &TestCase) -> String {
    format!(
        "ID: {}\nTitle: {}\nDescription: {}\nExpected Result: {}",
        test.id, test.title, test.description, test.expected_result
    )
}

fn format_result(result: &TestExecutionResult) -> String {
    format!(
        "Passed: {}\nOutput: {}\nError Message: {}",
        result.passed,
        result.output,
        result.error_message.as_deref().unwrap_or("None")
    )
}

#[async_trait]
impl AgentHandler for TestingAgent {
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
        self.base.begin("execute_tests", workflow);
        let result = self.graph_step(workflow).await;
        self.base.finish(result, workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use autodev_core::TestStatus;
    use autodev_llm::MockLanguageModel;

    #[tokio::test]
    async fn test_generate_defaults_snippet_ids() {
        let agent = TestingAgent::new(LlmClient::DryRun);
        let snippet = CodeSnippet::new("CODE-7", "x = 1", "python");
        let tests = agent.generate_tests(&snippet).await.unwrap();
        assert_eq!(tests[0].code_snippet_ids, vec!["CODE-7"]);
    }

    #[tokio::test]
    async fn test_dry_run_execution_passes() {
        let agent = TestingAgent::new(LlmClient::DryRun);
        let mut workflow = WorkflowState::new("wf");
        let test = TestCase::new("T1", "t", "assert False");
        workflow.test_cases.push(test.clone());

        let outcome = agent
            .process(
                AgentRequest::ExecuteTests {
                    test_cases: vec![test],
                    code_snippets: vec![],
                },
                &mut workflow,
            )
            .await;

        assert!(!outcome.tests_failed());
        assert_eq!(workflow.test_cases[0].status, TestStatus::Passed);
        assert_eq!(workflow.current_step, "test_execution");
    }

    #[tokio::test]
    async fn test_step_generates_then_runs() {
        let agent = TestingAgent::new(LlmClient::DryRun);
        let mut workflow = WorkflowState::new("wf");
        workflow.code_snippets.push(CodeSnippet::new("CODE-1", "x = 1", "python"));

        let outcome = agent.step(&RunInput::new("x"), &mut workflow).await;
        assert!(!outcome.is_error());
        assert_eq!(workflow.test_cases.len(), 1);
        assert_eq!(workflow.test_cases[0].status, TestStatus::Passed);

        // A second pass has nothing new to generate or run.
        let outcome = agent.step(&RunInput::new("x"), &mut workflow).await;
        match outcome.payload {
            AgentPayload::TestResults { results, tests_passed } => {
                assert!(results.is_empty());
                assert!(tests_passed);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_live_failure_reported() {
        let agent = TestingAgent::new(LlmClient::live(Arc::new(MockLanguageModel::new())));
        let mut workflow = WorkflowState::new("wf");
        let test = TestCase::new("T1", "t", "").for_snippet("nope");
        workflow.test_cases.push(test.clone());

        let outcome = agent
            .process(
                AgentRequest::ExecuteTest {
                    test_case: test,
                    code_snippets: vec![],
                },
                &mut workflow,
            )
            .await;
        assert!(outcome.tests_failed());
        assert_eq!(workflow.test_cases[0].status, TestStatus::Failed);
    }

    #[tokio::test]
    async fn test_analysis_prompt() {
        let mut model = MockLanguageModel::new();
        model.expect_complete().returning(|req| {
            assert!(req.prompt.contains("Error Message: boom"));
            assert!(req.prompt.contains("Expected Result: 3"));
            Ok("Division by zero in add()".to_string())
        });
        let agent = TestingAgent::new(LlmClient::live(Arc::new(model)));
        let mut test = TestCase::new("T1", "adds", "assert add(1, 2) == 3");
        test.expected_result = "3".to_string();
        let result = TestExecutionResult::failed("T1", "", "boom");

        let analysis = agent.analyze_test_results(&test, &result).await.unwrap();
        assert_eq!(analysis, "Division by zero in add()");
    }

    #[test]
    fn test_format_result_without_error() {
        let result = TestExecutionResult::passed("T1", "ok");
        assert_eq!(format_result(&result), "Passed: true\nOutput: ok\nError Message: None");
    }
}
