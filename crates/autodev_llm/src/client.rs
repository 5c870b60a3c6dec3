//! Selects between a live model and dry-run synthesis.

use std::sync::Arc;

use autodev_core::{AgentKind, Settings};
use tracing::debug;

use crate::adapter::{CompletionRequest, LanguageModel, LlmAdapter};
use crate::error::{LlmError, LlmResult};

/// Reply returned by text completions in dry-run mode.
pub const DRY_RUN_TEXT: &str = "DRY_RUN";

/// Handle used by agents and chains to reach an LLM.
#[derive(Clone)]
pub enum LlmClient {
    Live {
        model: Arc<dyn LanguageModel>,
        temperature: f32,
        max_tokens: u32,
    },
    DryRun,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmClient::Live { model, .. } => write!(f, "LlmClient::Live({})", model.model_name()),
            LlmClient::DryRun => write!(f, "LlmClient::DryRun"),
        }
    }
}

impl LlmClient {
    /// Wrap any model with the default sampling parameters.
    pub fn live(model: Arc<dyn LanguageModel>) -> Self {
        LlmClient::Live {
            model,
            temperature: 0.2,
            max_tokens: 4096,
        }
    }

    /// Client for an agent role, using that role's configured model.
    pub fn for_agent(settings: &Settings, kind: AgentKind) -> LlmResult<Self> {
        Self::with_model(settings, settings.model_for(kind))
    }

    pub fn default_model(settings: &Settings) -> LlmResult<Self> {
        Self::with_model(settings, &settings.default_model)
    }

    fn with_model(settings: &Settings, model: &str) -> LlmResult<Self> {
        if settings.dry_run {
            debug!("Dry run enabled, skipping LLM setup for {}", model);
            return Ok(LlmClient::DryRun);
        }

        let api_key = settings.api_key();
        if api_key.is_empty() {
            return Err(LlmError::NotConfigured(format!(
                "{} is not set. Provide it in .env or enable DRY_RUN to skip external calls.",
                settings.provider.key_var()
            )));
        }

        let adapter = LlmAdapter::new(settings.provider, api_key, model);
        Ok(LlmClient::Live {
            model: Arc::new(adapter),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, LlmClient::DryRun)
    }

    /// Send a prompt and return the raw reply text.
    pub async fn complete(&self, system: Option<&str>, prompt: &str) -> LlmResult<String> {
        match self {
            LlmClient::DryRun => Ok(DRY_RUN_TEXT.to_string()),
            LlmClient::Live {
                model,
                temperature,
                max_tokens,
            } => {
                let request = CompletionRequest {
                    system: system.map(str::to_string),
                    prompt: prompt.to_string(),
                    temperature: *temperature,
                    max_tokens: *max_tokens,
                };
                model.complete(&request).await
            }
        }
    }
}
