//! The provider contract shared by the GitHub and GitLab clients.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{VcsError, VcsResult};

/// REST operations autodev needs from a hosted repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VcsProvider: Send + Sync {
    async fn repo_info(&self) -> VcsResult<Value>;

    async fn branches(&self) -> VcsResult<Value>;

    async fn create_branch(&self, name: &str, base: &str) -> VcsResult<Value>;

    async fn get_file(&self, path: &str, git_ref: &str) -> VcsResult<Value>;

    async fn create_or_update_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> VcsResult<Value>;

    /// Open a pull request (GitHub) or merge request (GitLab).
    async fn create_pull_request(&self, title: &str, body: &str, head: &str, base: &str) -> VcsResult<Value>;
}

/// Turn a non-success status into [`VcsError::Http`].
pub(crate) async fn ensure_success(response: reqwest::Response) -> VcsResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("VCS request failed with {}: {}", status, body);
    Err(VcsError::Http {
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn json_body(response: reqwest::Response) -> VcsResult<Value> {
    let response = ensure_success(response).await?;
    response
        .json()
        .await
        .map_err(|e| VcsError::Parse(e.to_string()))
}
