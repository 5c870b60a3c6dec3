//! Layered runtime settings.
//!
//! Values are resolved from built-in defaults, then an optional YAML file,
//! then `.env` and the process environment. Settings are passed explicitly to
//! whatever needs them.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::state::AgentKind;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "autodev.yaml";

/// Which hosted LLM API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    OpenAI,
    Anthropic,
}

impl LlmProviderKind {
    /// Environment variable holding this provider's API key.
    pub fn key_var(&self) -> &'static str {
        match self {
            LlmProviderKind::OpenAI => "OPENAI_API_KEY",
            LlmProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl FromStr for LlmProviderKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProviderKind::OpenAI),
            "anthropic" => Ok(LlmProviderKind::Anthropic),
            other => Err(CoreError::Config(format!("Unknown LLM provider: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub openai_api_key: String,
    pub anthropic_api_key: String,
    pub provider: LlmProviderKind,

    pub default_model: String,
    pub planning_model: String,
    pub code_model: String,
    pub testing_model: String,
    pub debugging_model: String,
    pub documentation_model: String,

    pub github_token: String,
    pub github_username: String,
    pub github_repo: String,
    pub gitlab_token: String,
    pub gitlab_project_id: String,

    pub log_level: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub dry_run: bool,

    /// Reserved. Loaded and validated from `AGENT_MEMORY_SIZE` so existing
    /// configuration keeps parsing, but no agent keeps a history window yet.
    pub agent_memory_size: usize,
    pub feedback_threshold: f64,

    pub max_workflow_steps: usize,
    pub debug_on_test_failure: bool,
    pub test_timeout_secs: u64,
    pub feedback_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let model = "gpt-4o".to_string();
        Self {
            openai_api_key: String::new(),
            anthropic_api_key: String::new(),
            provider: LlmProviderKind::OpenAI,
            default_model: model.clone(),
            planning_model: model.clone(),
            code_model: model.clone(),
            testing_model: model.clone(),
            debugging_model: model.clone(),
            documentation_model: model,
            github_token: String::new(),
            github_username: String::new(),
            github_repo: String::new(),
            gitlab_token: String::new(),
            gitlab_project_id: String::new(),
            log_level: "info".to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            dry_run: false,
            agent_memory_size: 10,
            feedback_threshold: 0.7,
            max_workflow_steps: 16,
            debug_on_test_failure: false,
            test_timeout_secs: 30,
            feedback_dir: PathBuf::from("./feedback_data"),
        }
    }
}

impl Settings {
    /// Load settings from every layer.
    ///
    /// The YAML file is `AUTODEV_CONFIG` if set, else `autodev.yaml` when it
    /// exists. A missing `.env` is not an error.
    pub fn load() -> CoreResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let config_path = std::env::var("AUTODEV_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                let default = PathBuf::from(CONFIG_FILE);
                default.exists().then_some(default)
            });

        let mut settings = match config_path {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: &Path) -> CoreResult<Self> {
        debug!("Reading settings from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML; fields left out keep their defaults.
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set_string = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };

        set_string(&mut self.openai_api_key, "OPENAI_API_KEY");
        set_string(&mut self.anthropic_api_key, "ANTHROPIC_API_KEY");
        set_string(&mut self.default_model, "DEFAULT_LLM_MODEL");
        set_string(&mut self.planning_model, "PLANNING_LLM_MODEL");
        set_string(&mut self.code_model, "CODE_LLM_MODEL");
        set_string(&mut self.testing_model, "TESTING_LLM_MODEL");
        set_string(&mut self.debugging_model, "DEBUGGING_LLM_MODEL");
        set_string(&mut self.documentation_model, "DOCUMENTATION_LLM_MODEL");
        set_string(&mut self.github_token, "GITHUB_TOKEN");
        set_string(&mut self.github_username, "GITHUB_USERNAME");
        set_string(&mut self.github_repo, "GITHUB_REPO");
        set_string(&mut self.gitlab_token, "GITLAB_TOKEN");
        set_string(&mut self.gitlab_project_id, "GITLAB_PROJECT_ID");
        set_string(&mut self.log_level, "LOG_LEVEL");

        if let Some(value) = lookup("LLM_PROVIDER") {
            self.provider = value.parse()?;
        }
        if let Some(value) = lookup("TEMPERATURE") {
            self.temperature = parse_number("TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("MAX_TOKENS") {
            self.max_tokens = parse_number("MAX_TOKENS", &value)?;
        }
        if let Some(value) = lookup("DRY_RUN") {
            self.dry_run = parse_flag("DRY_RUN", &value)?;
        }
        if let Some(value) = lookup("AGENT_MEMORY_SIZE") {
            self.agent_memory_size = parse_number("AGENT_MEMORY_SIZE", &value)?;
        }
        if let Some(value) = lookup("FEEDBACK_THRESHOLD") {
            self.feedback_threshold = parse_number("FEEDBACK_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("MAX_WORKFLOW_STEPS") {
            self.max_workflow_steps = parse_number("MAX_WORKFLOW_STEPS", &value)?;
        }
        if let Some(value) = lookup("DEBUG_ON_TEST_FAILURE") {
            self.debug_on_test_failure = parse_flag("DEBUG_ON_TEST_FAILURE", &value)?;
        }
        if let Some(value) = lookup("TEST_TIMEOUT_SECS") {
            self.test_timeout_secs = parse_number("TEST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("FEEDBACK_DIR") {
            self.feedback_dir = PathBuf::from(value);
        }

        Ok(())
    }

    /// Model configured for an agent role.
    pub fn model_for(&self, kind: AgentKind) -> &str {
        match kind {
            AgentKind::Planning => &self.planning_model,
            AgentKind::Coding => &self.code_model,
            AgentKind::Testing => &self.testing_model,
            AgentKind::Debugging => &self.debugging_model,
            AgentKind::Documentation => &self.documentation_model,
        }
    }

    /// API key for the configured provider, empty when unset.
    pub fn api_key(&self) -> &str {
        match self.provider {
            LlmProviderKind::OpenAI => &self.openai_api_key,
            LlmProviderKind::Anthropic => &self.anthropic_api_key,
        }
    }

    pub fn with_dry_run(&self, dry_run: bool) -> Self {
        Self {
            dry_run,
            ..self.clone()
        }
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> CoreResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{} has an invalid value: {}", key, value)))
}

fn parse_flag(key: &str, value: &str) -> CoreResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(CoreError::Config(format!("{} has an invalid value: {}", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_model, "gpt-4o");
        assert_eq!(settings.max_workflow_steps, 16);
        assert!(!settings.dry_run);
        assert_eq!(settings.provider, LlmProviderKind::OpenAI);
    }

    #[test]
    fn test_yaml_partial_override() {
        let settings = Settings::from_yaml_str("code_model: gpt-4o-mini\nmax_workflow_steps: 4\n").unwrap();
        assert_eq!(settings.code_model, "gpt-4o-mini");
        assert_eq!(settings.max_workflow_steps, 4);
        assert_eq!(settings.planning_model, "gpt-4o");
    }

    #[test]
    fn test_env_wins() {
        let mut settings = Settings::from_yaml_str("provider: anthropic\n").unwrap();
        settings
            .apply_env(lookup(&[
                ("LLM_PROVIDER", "openai"),
                ("DRY_RUN", "TRUE"),
                ("TEMPERATURE", "0.5"),
                ("CODE_LLM_MODEL", "o1"),
            ]))
            .unwrap();
        assert_eq!(settings.provider, LlmProviderKind::OpenAI);
        assert!(settings.dry_run);
        assert!((settings.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(settings.model_for(AgentKind::Coding), "o1");
    }

    #[test]
    fn test_reserved_memory_size_still_validated() {
        let mut settings = Settings::default();
        assert_eq!(settings.agent_memory_size, 10);
        settings.apply_env(lookup(&[("AGENT_MEMORY_SIZE", "25")])).unwrap();
        assert_eq!(settings.agent_memory_size, 25);
        assert!(settings.apply_env(lookup(&[("AGENT_MEMORY_SIZE", "-1")])).is_err());
    }

    #[test]
    fn test_invalid_env_value() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(lookup(&[("MAX_TOKENS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_with_dry_run_leaves_original() {
        let settings = Settings::default();
        let dry = settings.with_dry_run(true);
        assert!(dry.dry_run);
        assert!(!settings.dry_run);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "debug_on_test_failure: true\n").unwrap();
        let settings = Settings::from_yaml_file(&path).unwrap();
        assert!(settings.debug_on_test_failure);
    }
}
