//! Debugging agent: issue identification, bug fixing and fix verification.

use std::collections::BTreeMap;

use async_trait::async_trait;
use autodev_core::{
    generate_id, AgentHandler, AgentKind, AgentOutcome, AgentPayload, AgentRequest, AgentState,
    BugFix, CodeSnippet, Issue, RunInput, Settings, TestExecutionResult, TestFailure,
    WorkflowState,
};
use autodev_llm::{vars, BugFixReply, IssuesReply, LlmClient};
use tracing::{debug, info};

use crate::base::AgentBase;
use crate::error::{AgentError, AgentResult};

pub const ISSUE_IDENTIFICATION: &str = "issue_identification";
pub const BUG_FIXING: &str = "bug_fixing";
pub const FIX_VERIFICATION: &str = "fix_verification";

const ISSUE_IDENTIFICATION_PROMPT: &str = r#"You are an expert debugger.
Find the defects in the {language} code below.

```{language}
{code}
```

Failing tests:
{test_failures}

Additional context:
{context}

For every issue give a short title, a precise description of the root cause and a severity of
low, medium or high.

Answer with JSON of the form
{{"issues": [{{"id": "ISSUE-001", "title": "...", "description": "...", "severity": "high"}}]}}"#;

const BUG_FIXING_PROMPT: &str = r#"You are an expert debugger fixing defects in {language} code.

```{language}
{code}
```

Issues to fix:
{issues}

Failing tests:
{test_failures}

Additional context:
{context}

Fix every listed issue while keeping the behaviour the tests expect. Change only what is needed.

Answer with JSON of the form
{{"fixed_code": "...", "changes_made": ["..."], "confidence": 0.9}}"#;

const FIX_VERIFICATION_PROMPT: &str = r#"You are reviewing a bug fix in {language} code.

Original code:
```{language}
{original_code}
```

Fixed code:
```{language}
{fixed_code}
```

Issues that were reported:
{issues}

Changes made:
{changes_made}

State whether each issue is resolved, whether the fix introduces new problems, and give an
overall verdict."#;

/// Diagnoses failing code and proposes fixes.
pub struct DebuggingAgent {
    base: AgentBase,
}

impl DebuggingAgent {
    pub fn new(client: LlmClient) -> Self {
        Self {
            base: AgentBase::new(
                AgentKind::Debugging,
                client,
                &[
                    (ISSUE_IDENTIFICATION, ISSUE_IDENTIFICATION_PROMPT),
                    (BUG_FIXING, BUG_FIXING_PROMPT),
                    (FIX_VERIFICATION, FIX_VERIFICATION_PROMPT),
                ],
            ),
        }
    }

    pub fn from_settings(settings: &Settings) -> AgentResult<Self> {
        Ok(Self::new(LlmClient::for_agent(settings, AgentKind::Debugging)?))
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

    pub async fn identify_issues(
        &self,
        snippet: &CodeSnippet,
        failures: &[TestFailure],
        context: &str,
    ) -> AgentResult<Vec<Issue>> {
        let chain = self.base.structured::<IssuesReply>(ISSUE_IDENTIFICATION)?;
        let reply = chain
            .invoke(&vars([
                ("language", snippet.language.clone()),
                ("code", snippet.code.clone()),
                ("test_failures", format_failures(failures)),
                ("context", context.to_string()),
            ]))
            .await?;

        let issues: Vec<Issue> = reply
            .issues
            .into_iter()
            .map(|mut issue| {
                if issue.id.is_empty() {
                    issue.id = generate_id("ISSUE");
                }
                if issue.code_snippet_ids.is_empty() {
                    issue.code_snippet_ids = vec![snippet.id.clone()];
                }
                issue
            })
            .collect();

        info!("Identified {} issues in {}", issues.len(), snippet.id);
        Ok(issues)
    }

    pub async fn fix_bugs(
        &self,
        snippet: &CodeSnippet,
        issues: &[Issue],
        failures: &[TestFailure],
        context: &str,
    ) -> AgentResult<BugFix> {
        let chain = self.base.structured::<BugFixReply>(BUG_FIXING)?;
        let reply = chain
            .invoke(&vars([
                ("language", snippet.language.clone()),
                ("code", snippet.code.clone()),
                ("issues", format_issues(issues)),
                ("test_failures", format_failures(failures)),
                ("context", context.to_string()),
            ]))
            .await?;

        let mut fixed = snippet.clone();
        fixed.id = format!("{}-fixed", snippet.id);
        fixed.description = format!("Fixed version of {}", snippet.id);
        if !reply.fixed_code.trim().is_empty() {
            fixed.code = reply.fixed_code;
        }

        info!("Fixed {} issues in {}", issues.len(), snippet.id);
        Ok(BugFix {
            fixed_snippet: fixed,
            changes_made: reply.changes_made,
            confidence: reply.confidence,
        })
    }

    pub async fn verify_fix(
        &self,
        original: &CodeSnippet,
        fixed: &CodeSnippet,
        issues: &[Issue],
        changes_made: &[String],
    ) -> AgentResult<String> {
        let chain = self.base.text(FIX_VERIFICATION)?;
        let changes = changes_made
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n");

        let verdict = chain
            .invoke(&vars([
                ("language", original.language.clone()),
                ("original_code", original.code.clone()),
                ("fixed_code", fixed.code.clone()),
                ("issues", format_issues(issues)),
                ("changes_made", changes),
            ]))
            .await?;
        Ok(verdict)
    }

    async fn handle(&self, request: AgentRequest, workflow: &mut WorkflowState) -> AgentResult<AgentPayload> {
        match request {
            AgentRequest::IdentifyIssues {
                code_snippet,
                test_failures,
                context,
            } => {
                let issues = self.identify_issues(&code_snippet, &test_failures, &context).await?;
                workflow.issues.extend(issues.iter().cloned());
                workflow.set_step("issue_identification");
                Ok(AgentPayload::Issues(issues))
            }
            AgentRequest::FixBugs {
                code_snippet,
                issues,
                test_failures,
                context,
            } if !issues.is_empty() => {
                let fix = self.fix_bugs(&code_snippet, &issues, &test_failures, &context).await?;
                self.record_fix(&fix, &issues, workflow);
                workflow.set_step("bug_fixing");
                Ok(AgentPayload::Fix(fix))
            }
            AgentRequest::VerifyFix {
                original,
                fixed,
                issues,
                changes_made,
            } if !issues.is_empty() => {
                let verdict = self.verify_fix(&original, &fixed, &issues, &changes_made).await?;
                workflow.set_step("fix_verification");
                Ok(AgentPayload::Verification(verdict))
            }
            _ => Err(AgentError::invalid_input(
                "'code_snippet' with action 'identify_issues', 'code_snippet' and 'issues' \
                 with action 'fix_bugs', or 'original_snippet', 'fixed_snippet' and 'issues' \
                 with action 'verify_fix'.",
            )),
        }
    }

    fn record_fix(&self, fix: &BugFix, issues: &[Issue], workflow: &mut WorkflowState) {
        workflow.code_snippets.push(fix.fixed_snippet.clone());
        for issue in issues {
            workflow.mark_issue_fixed(&issue.id);
        }
    }

    /// Graph mode: diagnose and fix each snippet behind a failed test.
    async fn graph_step(&self, workflow: &mut WorkflowState) -> AgentResult<AgentPayload> {
        let failed = workflow.failed_tests();

        let mut targets: Vec<(CodeSnippet, Vec<TestFailure>)> = Vec::new();
        for test in &failed {
            for snippet_id in &test.code_snippet_ids {
                let Some(snippet) = workflow.find_snippet(snippet_id) else {
                    continue;
                };
                let fixed_id = format!("{}-fixed", snippet.id);
                if workflow.find_snippet(&fixed_id).is_some() {
                    debug!("{} already has a fix, skipping", snippet.id);
                    continue;
                }

                let failure = TestFailure {
                    test_case: test.clone(),
                    result: TestExecutionResult::failed(&test.id, "", "Test reported as failed"),
                };
                match targets.iter_mut().find(|(s, _)| s.id == snippet.id) {
                    Some((_, failures)) => failures.push(failure),
                    None => targets.push((snippet.clone(), vec![failure])),
                }
            }
        }

        let mut found = Vec::new();
        for (snippet, failures) in &targets {
            let issues = self.identify_issues(snippet, failures, "").await?;
            workflow.issues.extend(issues.iter().cloned());
            if !issues.is_empty() {
                let fix = self.fix_bugs(snippet, &issues, failures, "").await?;
                self.record_fix(&fix, &issues, workflow);
            }
            found.extend(issues);
        }

        workflow.set_step("issue_identification");
        Ok(AgentPayload::Issues(found))
    }
}

/// `Test/Description/Expected/Actual/Error` blocks, one per failure.
pub fn format_failures(failures: &[TestFailure]) -> String {
    failures
        .iter()
        .map(|f| {
            format!(
                "Test: {}\nDescription: {}\nExpected: {}\nActual: {}\nError: {}\n\n",
                f.test_case.title,
                f.test_case.description,
                f.test_case.expected_result,
                f.result.output,
                f.result.error_message.as_deref().unwrap_or("")
            )
        })
        .collect()
}

/// `ID/Title/Description/Severity` blocks, one per issue.
pub fn format_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|i| {
            format!(
                "ID: {}\nTitle: {}\nDescription: {}\nSeverity: {}\n\n",
                i.id, i.title, i.description, i.severity
            )
        })
        .collect()
}

#[async_trait]
impl AgentHandler for DebuggingAgent {
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
        self.base.begin("identify_issues", workflow);
        let result = self.graph_step(workflow).await;
        self.base.finish(result, workflow)
    }
}
