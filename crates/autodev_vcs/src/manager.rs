//! Feature-branch workflow on top of a [`VcsProvider`].

use std::collections::BTreeMap;
use std::str::FromStr;

use autodev_core::Settings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{VcsError, VcsResult};
use crate::github::GitHubClient;
use crate::gitlab::GitLabClient;
use crate::provider::VcsProvider;

pub const DEFAULT_BASE_BRANCH: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    GitHub,
    GitLab,
}

impl FromStr for VcsKind {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(VcsKind::GitHub),
            "gitlab" => Ok(VcsKind::GitLab),
            _ => Err(VcsError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for VcsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VcsKind::GitHub => write!(f, "github"),
            VcsKind::GitLab => write!(f, "gitlab"),
        }
    }
}

/// Lowercase, spaces to dashes, and a `feature/` prefix.
pub fn feature_branch_name(name: &str) -> String {
    let sanitized = name.to_lowercase().replace(' ', "-");
    if sanitized.starts_with("feature/") {
        sanitized
    } else {
        format!("feature/{}", sanitized)
    }
}

pub struct VersionControlManager {
    kind: VcsKind,
    provider: Box<dyn VcsProvider>,
}

impl VersionControlManager {
    /// Build a manager for `kind` using the credentials in `settings`.
    pub fn new(kind: VcsKind, settings: &Settings) -> VcsResult<Self> {
        let provider: Box<dyn VcsProvider> = match kind {
            VcsKind::GitHub => {
                if settings.github_token.is_empty()
                    || settings.github_username.is_empty()
                    || settings.github_repo.is_empty()
                {
                    return Err(VcsError::Config(
                        "GITHUB_TOKEN, GITHUB_USERNAME and GITHUB_REPO must be set".to_string(),
                    ));
                }
                Box::new(GitHubClient::new(
                    &settings.github_token,
                    &settings.github_username,
                    &settings.github_repo,
                ))
            }
            VcsKind::GitLab => {
                if settings.gitlab_token.is_empty() || settings.gitlab_project_id.is_empty() {
                    return Err(VcsError::Config(
                        "GITLAB_TOKEN and GITLAB_PROJECT_ID must be set".to_string(),
                    ));
                }
                Box::new(GitLabClient::new(&settings.gitlab_token, &settings.gitlab_project_id))
            }
        };
        Ok(Self::with_provider(kind, provider))
    }

    pub fn with_provider(kind: VcsKind, provider: Box<dyn VcsProvider>) -> Self {
        Self { kind, provider }
    }

    pub fn kind(&self) -> VcsKind {
        self.kind
    }

    pub fn provider(&self) -> &dyn VcsProvider {
        self.provider.as_ref()
    }

    pub async fn create_feature_branch(&self, name: &str) -> VcsResult<Value> {
        let branch = feature_branch_name(name);
        info!("Creating feature branch {} on {}", branch, self.kind);
        self.provider.create_branch(&branch, DEFAULT_BASE_BRANCH).await
    }

    /// One create-or-update per file, in path order.
    pub async fn commit_code_changes(
        &self,
        files: &BTreeMap<String, String>,
        message: &str,
        branch: &str,
    ) -> VcsResult<Vec<Value>> {
        let mut results = Vec::with_capacity(files.len());
        for (path, content) in files {
            results.push(
                self.provider
                    .create_or_update_file(path, content, message, branch)
                    .await?,
            );
        }
        info!("Committed {} files to {}", results.len(), branch);
        Ok(results)
    }

    pub async fn create_pull_request(&self, title: &str, description: &str, branch: &str) -> VcsResult<Value> {
        let head = if branch.starts_with("feature/") {
            branch.to_string()
        } else {
            format!("feature/{}", branch)
        };
        self.provider
            .create_pull_request(title, description, &head, DEFAULT_BASE_BRANCH)
            .await
    }
}
