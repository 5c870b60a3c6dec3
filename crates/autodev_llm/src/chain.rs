//! Prompt → model → parser pipelines.

use std::marker::PhantomData;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::{LlmClient, DRY_RUN_TEXT};
use crate::dry_run::DryRunDefault;
use crate::error::{LlmError, LlmResult};
use crate::prompt::{PromptTemplate, PromptVars};

const JSON_INSTRUCTION: &str = "You are a precise assistant. Respond with a single valid JSON \
object only, without commentary. Use the field names requested in the prompt.";

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(.*?)```").ok())
        .as_ref()
}

/// Pull a JSON object out of a model reply.
///
/// Prefers a fenced code block, then the outermost `{ ... }` span.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(fence) = fence_pattern() {
        if let Some(body) = fence.captures(text).and_then(|c| c.get(1)) {
            let body = body.as_str().trim();
            if !body.is_empty() {
                return Some(body);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Chain that parses the reply into `T`.
pub struct StructuredChain<T> {
    template: PromptTemplate,
    client: LlmClient,
    _output: PhantomData<fn() -> T>,
}

impl<T> StructuredChain<T>
where
    T: DeserializeOwned + DryRunDefault,
{
    pub fn new(client: LlmClient, template: PromptTemplate) -> Self {
        Self {
            template,
            client,
            _output: PhantomData,
        }
    }

    pub async fn invoke(&self, vars: &PromptVars) -> LlmResult<T> {
        let prompt = self.template.render(vars)?;

        if self.client.is_dry_run() {
            debug!("Dry run: synthesizing {}", std::any::type_name::<T>());
            return Ok(T::dry_run(vars));
        }

        let reply = self.client.complete(Some(JSON_INSTRUCTION), &prompt).await?;
        let json = extract_json(&reply)
            .ok_or_else(|| LlmError::Parse("Reply contained no JSON object".to_string()))?;
        Ok(serde_json::from_str(json)?)
    }
}

/// Chain that returns the reply text.
pub struct TextChain {
    template: PromptTemplate,
    client: LlmClient,
}

impl TextChain {
    pub fn new(client: LlmClient, template: PromptTemplate) -> Self {
        Self { template, client }
    }

    pub async fn invoke(&self, vars: &PromptVars) -> LlmResult<String> {
        let prompt = self.template.render(vars)?;
        if self.client.is_dry_run() {
            return Ok(DRY_RUN_TEXT.to_string());
        }
        let reply = self.client.complete(None, &prompt).await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use autodev_core::CodeReview;

    use crate::adapter::MockLanguageModel;
    use crate::prompt::vars;
    use crate::schema::RequirementsReply;

    #[test]
    fn test_extract_json_fenced() {
        let reply = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        assert_eq!(extract_json(reply), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_json_bare() {
        let reply = "Sure! {\"review_passed\": true, \"nested\": {\"x\": 1}} done";
        assert_eq!(
            extract_json(reply),
            Some("{\"review_passed\": true, \"nested\": {\"x\": 1}}")
        );
        assert_eq!(extract_json("no json here"), None);
    }

    #[tokio::test]
    async fn test_structured_dry_run() {
        let chain: StructuredChain<RequirementsReply> =
            StructuredChain::new(LlmClient::DryRun, PromptTemplate::new("Analyze {description}"));
        let reply = chain.invoke(&vars([("description", "x")])).await.unwrap();
        assert_eq!(reply.requirements[0].id, "DRYRUN");
    }

    #[tokio::test]
    async fn test_structured_missing_variable_in_dry_run() {
        let chain: StructuredChain<RequirementsReply> =
            StructuredChain::new(LlmClient::DryRun, PromptTemplate::new("Analyze {description}"));
        let err = chain.invoke(&PromptVars::new()).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingVariable(_)));
    }

    #[tokio::test]
    async fn test_structured_live_parses() {
        let mut model = MockLanguageModel::new();
        model.expect_complete().returning(|req| {
            assert!(req.prompt.contains("print(1)"));
            Ok("```json\n{\"review_passed\": false, \"issues\": [\"slow\"], \"suggestions\": []}\n```".to_string())
        });

        let chain: StructuredChain<CodeReview> = StructuredChain::new(
            LlmClient::live(Arc::new(model)),
            PromptTemplate::new("Review {code}"),
        );
        let review = chain.invoke(&vars([("code", "print(1)")])).await.unwrap();
        assert!(!review.review_passed);
        assert_eq!(review.issues, vec!["slow"]);
    }

    #[tokio::test]
    async fn test_structured_live_bad_json() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .returning(|_| Ok("{ not json }".to_string()));

        let chain: StructuredChain<CodeReview> = StructuredChain::new(
            LlmClient::live(Arc::new(model)),
            PromptTemplate::new("Review"),
        );
        let err = chain.invoke(&PromptVars::new()).await.unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[tokio::test]
    async fn test_text_chain() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .returning(|_| Ok("  analysis text \n".to_string()));
        let chain = TextChain::new(LlmClient::live(Arc::new(model)), PromptTemplate::new("Go"));
        assert_eq!(chain.invoke(&PromptVars::new()).await.unwrap(), "analysis text");

        let chain = TextChain::new(LlmClient::DryRun, PromptTemplate::new("Go"));
        assert_eq!(chain.invoke(&PromptVars::new()).await.unwrap(), "DRY_RUN");
    }
}
