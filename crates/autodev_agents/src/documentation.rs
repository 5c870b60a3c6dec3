//! Documentation agent: code, user and API documentation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use autodev_core::{
    generate_id, AgentHandler, AgentKind, AgentOutcome, AgentPayload, AgentRequest, AgentState,
    CodeSnippet, DocType, Documentation, RunInput, Settings, WorkflowState,
};
use autodev_llm::{vars, DocumentationDraft, DocumentationReply, LlmClient};
use tracing::info;

use crate::base::AgentBase;
use crate::error::{AgentError, AgentResult};

pub const CODE_DOCUMENTATION: &str = "code_documentation";
pub const USER_DOCUMENTATION: &str = "user_documentation";
pub const API_DOCUMENTATION: &str = "api_documentation";

const CODE_DOCUMENTATION_PROMPT: &str = r#"You are a technical writer documenting source code for other developers.

Description: {description}

```{language}
{code}
```

Cover the purpose of the code, its components and how they interact, parameters and return
values, usage examples and any limitations. Write the content in Markdown.

Answer with JSON of the form
{{"documentation": {{"title": "...", "content": "...", "doc_type": "technical"}}}}"#;

const USER_DOCUMENTATION_PROMPT: &str = r#"You are a technical writer producing end-user documentation.

Feature: {feature_name}
Description: {feature_description}

Implementation:
{code_snippets}

Explain what the feature does, how to install and use it step by step, common use cases and
troubleshooting tips. Avoid implementation jargon. Write the content in Markdown.

Answer with JSON of the form
{{"documentation": {{"title": "...", "content": "...", "doc_type": "user"}}}}"#;

const API_DOCUMENTATION_PROMPT: &str = r#"You are a technical writer producing API reference documentation.

API description: {description}

```{language}
{code}
```

Document every public function, class or endpoint with its parameters, return values, errors
and an example call. Write the content in Markdown.

Answer with JSON of the form
{{"documentation": {{"title": "...", "content": "...", "doc_type": "api"}}}}"#;

/// Writes Markdown documentation for generated code.
pub struct DocumentationAgent {
    base: AgentBase,
}

impl DocumentationAgent {
    pub fn new(client: LlmClient) -> Self {
        Self {
            base: AgentBase::new(
                AgentKind::Documentation,
                client,
                &[
                    (CODE_DOCUMENTATION, CODE_DOCUMENTATION_PROMPT),
                    (USER_DOCUMENTATION, USER_DOCUMENTATION_PROMPT),
                    (API_DOCUMENTATION, API_DOCUMENTATION_PROMPT),
                ],
            ),
        }
    }

    pub fn from_settings(settings: &Settings) -> AgentResult<Self> {
        Ok(Self::new(LlmClient::for_agent(settings, AgentKind::Documentation)?))
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

    pub async fn generate_code_documentation(&self, snippet: &CodeSnippet) -> AgentResult<Documentation> {
        let chain = self.base.structured::<DocumentationReply>(CODE_DOCUMENTATION)?;
        let reply = chain
            .invoke(&vars([
                ("language", snippet.language.as_str()),
                ("code", snippet.code.as_str()),
                ("description", snippet.description.as_str()),
            ]))
            .await?;

        let doc = complete_draft(reply.documentation, "DOC-CODE", DocType::Technical, &[snippet.id.clone()]);
        info!("Documented {} as {}", snippet.id, doc.id);
        Ok(doc)
    }

    pub async fn generate_user_documentation(
        &self,
        feature_name: &str,
        feature_description: &str,
        snippets: &[CodeSnippet],
    ) -> AgentResult<Documentation> {
        let chain = self.base.structured::<DocumentationReply>(USER_DOCUMENTATION)?;
        let reply = chain
            .invoke(&vars([
                ("feature_name", feature_name.to_string()),
                ("feature_description", feature_description.to_string()),
                ("code_snippets", format_snippets(snippets)),
            ]))
            .await?;

        let ids: Vec<String> = snippets.iter().map(|s| s.id.clone()).collect();
        let doc = complete_draft(reply.documentation, "DOC-USER", DocType::User, &ids);
        info!("Wrote user documentation {} for {}", doc.id, feature_name);
        Ok(doc)
    }

    pub async fn generate_api_documentation(
        &self,
        snippet: &CodeSnippet,
        api_description: &str,
    ) -> AgentResult<Documentation> {
        let chain = self.base.structured::<DocumentationReply>(API_DOCUMENTATION)?;
        let description = if api_description.is_empty() {
            snippet.description.as_str()
        } else {
            api_description
        };
        let reply = chain
            .invoke(&vars([
                ("language", snippet.language.as_str()),
                ("code", snippet.code.as_str()),
                ("description", description),
            ]))
            .await?;

        Ok(complete_draft(reply.documentation, "DOC-API", DocType::Api, &[snippet.id.clone()]))
    }

    async fn handle(&self, request: AgentRequest, workflow: &mut WorkflowState) -> AgentResult<AgentPayload> {
        match request {
            AgentRequest::DocumentCode { code_snippet } => {
                let doc = self.generate_code_documentation(&code_snippet).await?;
                workflow.documentation.push(doc.clone());
                workflow.set_step("code_documentation");
                Ok(AgentPayload::Documentation(doc))
            }
            AgentRequest::DocumentFeature {
                feature_name,
                feature_description,
                code_snippets,
            } => {
                let doc = self
                    .generate_user_documentation(&feature_name, &feature_description, &code_snippets)
                    .await?;
                workflow.documentation.push(doc.clone());
                workflow.set_step("user_documentation");
                Ok(AgentPayload::Documentation(doc))
            }
            AgentRequest::DocumentApi {
                code_snippet,
                api_description,
            } => {
                let doc = self.generate_api_documentation(&code_snippet, &api_description).await?;
                workflow.documentation.push(doc.clone());
                workflow.set_step("api_documentation");
                Ok(AgentPayload::Documentation(doc))
            }
            _ => Err(AgentError::invalid_input(
                "'code_snippet' with action 'document_code', 'feature_name', \
                 'feature_description' and 'code_snippets' with action 'document_feature', \
                 or 'code_snippet' with action 'document_api'.",
            )),
        }
    }

    /// Graph mode: document every undocumented snippet, then the feature
    /// as a whole.
    async fn graph_step(&self, input: &RunInput, workflow: &mut WorkflowState) -> AgentResult<AgentPayload> {
        let mut docs = Vec::new();

        for snippet in workflow.undocumented_snippets() {
            let doc = self.generate_code_documentation(&snippet).await?;
            workflow.documentation.push(doc.clone());
            docs.push(doc);
        }
        workflow.set_step("code_documentation");

        let has_user_doc = workflow.documentation.iter().any(|d| d.doc_type == DocType::User);
        if !workflow.code_snippets.is_empty() && !has_user_doc {
            let feature_name = workflow
                .technical_tasks
                .first()
                .map(|t| t.title.clone())
                .unwrap_or_else(|| "Generated feature".to_string());
            let snippets = workflow.code_snippets.clone();
            let doc = self
                .generate_user_documentation(&feature_name, &input.description, &snippets)
                .await?;
            workflow.documentation.push(doc.clone());
            workflow.set_step("user_documentation");
            docs.push(doc);
        }

        Ok(AgentPayload::Documents(docs))
    }
}

/// Fill in what the model left out of a documentation draft.
fn complete_draft(draft: DocumentationDraft, id_prefix: &str, doc_type: DocType, snippet_ids: &[String]) -> Documentation {
    Documentation {
        id: draft
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| generate_id(id_prefix)),
        title: draft.title,
        content: draft.content,
        code_snippet_ids: draft
            .code_snippet_ids
            .filter(|ids| !ids.is_empty())
            .unwrap_or_else(|| snippet_ids.to_vec()),
        doc_type: draft.doc_type.unwrap_or(doc_type),
    }
}

/// Snippets as `File/Description` headers followed by a fenced block.
fn format_snippets(snippets: &[CodeSnippet]) -> String {
    snippets
        .iter()
        .map(|s| {
            format!(
                "File: {}\nDescription: {}\n```{}\n{}\n```\n\n",
                s.file_path.as_deref().unwrap_or("Unknown"),
                s.description,
                s.language,
                s.code
            )
        })
        .collect()
}

#[async_trait]
impl AgentHandler for DocumentationAgent {
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
        self.base.begin("document_code", workflow);
        let result = self.graph_step(input, workflow).await;
        self.base.finish(result, workflow)
    }
}
