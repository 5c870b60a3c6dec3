//! Hosted LLM adapter.
//!
//! Talks to the OpenAI chat completions API or the Anthropic messages API,
//! with retries on transient failures.

use std::time::Duration;

use async_trait::async_trait;
use autodev_core::LlmProviderKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LlmError, LlmResult};

const MAX_RETRIES: u32 = 3;

/// A single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Anything that can turn a prompt into text.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> String;

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<String>;
}

/// HTTP adapter for OpenAI and Anthropic.
pub struct LlmAdapter {
    provider: LlmProviderKind,
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl LlmAdapter {
    pub fn new(provider: LlmProviderKind, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url = match provider {
            LlmProviderKind::OpenAI => "https://api.openai.com",
            LlmProviderKind::Anthropic => "https://api.anthropic.com",
        };
        Self {
            provider,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the adapter at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn provider(&self) -> LlmProviderKind {
        self.provider
    }

    fn endpoint(&self) -> String {
        match self.provider {
            LlmProviderKind::OpenAI => format!("{}/v1/chat/completions", self.base_url),
            LlmProviderKind::Anthropic => format!("{}/v1/messages", self.base_url),
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> reqwest::RequestBuilder {
        let url = self.endpoint();
        match self.provider {
            LlmProviderKind::OpenAI => {
                let mut messages = Vec::new();
                if let Some(system) = &request.system {
                    messages.push(ChatMessage {
                        role: "system".to_string(),
                        content: system.clone(),
                    });
                }
                messages.push(ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                });
                let body = OpenAIRequest {
                    model: self.model.clone(),
                    messages,
                    temperature: request.temperature,
                    max_tokens: request.max_tokens,
                };
                self.client
                    .post(url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .json(&body)
            }
            LlmProviderKind::Anthropic => {
                let body = AnthropicRequest {
                    model: self.model.clone(),
                    max_tokens: request.max_tokens,
                    temperature: request.temperature,
                    system: request.system.clone(),
                    messages: vec![ChatMessage {
                        role: "user".to_string(),
                        content: request.prompt.clone(),
                    }],
                };
                self.client
                    .post(url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&body)
            }
        }
    }

    async fn extract_content(&self, response: reqwest::Response) -> LlmResult<String> {
        match self.provider {
            LlmProviderKind::OpenAI => {
                let result: OpenAIResponse = response
                    .json()
                    .await
                    .map_err(|e| LlmError::Parse(format!("Failed to parse response: {}", e)))?;
                result
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| LlmError::Parse("No response from OpenAI".to_string()))
            }
            LlmProviderKind::Anthropic => {
                let result: AnthropicResponse = response
                    .json()
                    .await
                    .map_err(|e| LlmError::Parse(format!("Failed to parse response: {}", e)))?;
                result
                    .content
                    .into_iter()
                    .find_map(|c| c.text)
                    .ok_or_else(|| LlmError::Parse("No response from Anthropic".to_string()))
            }
        }
    }
}

#[async_trait]
impl LanguageModel for LlmAdapter {
    fn model_name(&self) -> String {
        self.model.clone()
    }

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<String> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 1s, then 2s
                let delay = Duration::from_secs(1 << (attempt - 1));
                tokio::time::sleep(delay).await;
            }

            debug!("Calling {} (attempt {}/{})", self.model, attempt + 1, MAX_RETRIES);

            let response = match self.build_request(request).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("Network error calling {}: {}", self.model, e);
                    last_error = Some(LlmError::Request(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                warn!("Transient API error {} (attempt {}/{})", status, attempt + 1, MAX_RETRIES);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            return self.extract_content(response).await;
        }

        Err(last_error.unwrap_or_else(|| LlmError::Request("Max retries exceeded".to_string())))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let openai = LlmAdapter::new(LlmProviderKind::OpenAI, "k", "gpt-4o");
        assert_eq!(openai.endpoint(), "https://api.openai.com/v1/chat/completions");

        let anthropic = LlmAdapter::new(LlmProviderKind::Anthropic, "k", "claude")
            .with_base_url("http://localhost:9999/");
        assert_eq!(anthropic.endpoint(), "http://localhost:9999/v1/messages");
        assert_eq!(anthropic.model_name(), "claude");
    }
}
