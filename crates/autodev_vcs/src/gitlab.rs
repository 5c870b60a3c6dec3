//! GitLab REST v4 client.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::error::VcsResult;
use crate::provider::{ensure_success, json_body, VcsProvider};

pub const GITLAB_API: &str = "https://gitlab.com/api/v4";

pub struct GitLabClient {
    token: String,
    project_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl GitLabClient {
    pub fn new(token: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            project_id: project_id.into(),
            base_url: GITLAB_API.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/projects/{}/{}", self.base_url, self.project_id, path)
            .trim_end_matches('/')
            .to_string()
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("PRIVATE-TOKEN", &self.token)
    }
}

/// GitLab addresses files by their URL-encoded path.
pub fn encode_file_path(path: &str) -> String {
    path.replace('/', "%2F")
}

#[async_trait]
impl VcsProvider for GitLabClient {
    async fn repo_info(&self) -> VcsResult<Value> {
        let response = self.request(reqwest::Method::GET, self.url("")).send().await?;
        json_body(response).await
    }

    async fn branches(&self) -> VcsResult<Value> {
        let response = self
            .request(reqwest::Method::GET, self.url("repository/branches"))
            .send()
            .await?;
        json_body(response).await
    }

    async fn create_branch(&self, name: &str, base: &str) -> VcsResult<Value> {
        info!("Creating branch {} from {}", name, base);
        let response = self
            .request(reqwest::Method::POST, self.url("repository/branches"))
            .form(&[("branch", name), ("ref", base)])
            .send()
            .await?;
        json_body(response).await
    }

    async fn get_file(&self, path: &str, git_ref: &str) -> VcsResult<Value> {
        let url = self.url(&format!("repository/files/{}/raw", encode_file_path(path)));
        let response = self
            .request(reqwest::Method::GET, url)
            .query(&[("ref", git_ref)])
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(json!({ "content": response.text().await? }))
    }

    async fn create_or_update_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> VcsResult<Value> {
        let method = match self.get_file(path, branch).await {
            Ok(_) => reqwest::Method::PUT,
            Err(e) if e.is_not_found() => reqwest::Method::POST,
            Err(e) => return Err(e),
        };

        let url = self.url(&format!("repository/files/{}", encode_file_path(path)));
        let response = self
            .request(method, url)
            .form(&[
                ("branch", branch),
                ("content", content),
                ("commit_message", message),
            ])
            .send()
            .await?;
        json_body(response).await
    }

    async fn create_pull_request(&self, title: &str, body: &str, head: &str, base: &str) -> VcsResult<Value> {
        info!("Opening merge request {} -> {}", head, base);
        let response = self
            .request(reqwest::Method::POST, self.url("merge_requests"))
            .form(&[
                ("title", title),
                ("description", body),
                ("source_branch", head),
                ("target_branch", base),
            ])
            .send()
            .await?;
        json_body(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_file_path() {
        assert_eq!(encode_file_path("src/app/main.py"), "src%2Fapp%2Fmain.py");
        assert_eq!(encode_file_path("README.md"), "README.md");
    }

    #[test]
    fn test_project_url() {
        let client = GitLabClient::new("t", "42").with_base_url("http://localhost:1/");
        assert_eq!(client.url("merge_requests"), "http://localhost:1/projects/42/merge_requests");
        assert_eq!(client.url(""), "http://localhost:1/projects/42");
    }
}
