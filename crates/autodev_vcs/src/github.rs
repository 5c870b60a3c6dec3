//! GitHub REST v3 client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{VcsError, VcsResult};
use crate::provider::{json_body, VcsProvider};

pub const GITHUB_API: &str = "https://api.github.com";

pub struct GitHubClient {
    token: String,
    owner: String,
    repo: String,
    base_url: String,
    client: reqwest::Client,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            base_url: GITHUB_API.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base_url, self.owner, self.repo, path)
            .trim_end_matches('/')
            .to_string()
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "autodev")
    }
}

#[async_trait]
impl VcsProvider for GitHubClient {
    async fn repo_info(&self) -> VcsResult<Value> {
        let response = self.request(reqwest::Method::GET, self.url("")).send().await?;
        json_body(response).await
    }

    async fn branches(&self) -> VcsResult<Value> {
        let response = self.request(reqwest::Method::GET, self.url("branches")).send().await?;
        json_body(response).await
    }

    async fn create_branch(&self, name: &str, base: &str) -> VcsResult<Value> {
        let base_ref = self
            .request(reqwest::Method::GET, self.url(&format!("git/refs/heads/{}", base)))
            .send()
            .await?;
        let base_ref = json_body(base_ref).await?;
        let sha = base_ref["object"]["sha"]
            .as_str()
            .ok_or_else(|| VcsError::Parse(format!("No commit SHA for branch {}", base)))?;

        info!("Creating branch {} from {} ({})", name, base, sha);
        let response = self
            .request(reqwest::Method::POST, self.url("git/refs"))
            .json(&json!({
                "ref": format!("refs/heads/{}", name),
                "sha": sha,
            }))
            .send()
            .await?;
        json_body(response).await
    }

    async fn get_file(&self, path: &str, git_ref: &str) -> VcsResult<Value> {
        let response = self
            .request(reqwest::Method::GET, self.url(&format!("contents/{}", path)))
            .query(&[("ref", git_ref)])
            .send()
            .await?;
        json_body(response).await
    }

    async fn create_or_update_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> VcsResult<Value> {
        let sha = match self.get_file(path, branch).await {
            Ok(existing) => existing["sha"].as_str().map(str::to_string),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(content.as_bytes()),
            "branch": branch,
        });
        if let Some(sha) = sha {
            body["sha"] = Value::String(sha);
        }

        let response = self
            .request(reqwest::Method::PUT, self.url(&format!("contents/{}", path)))
            .json(&body)
            .send()
            .await?;
        json_body(response).await
    }

    async fn create_pull_request(&self, title: &str, body: &str, head: &str, base: &str) -> VcsResult<Value> {
        info!("Opening pull request {} -> {}", head, base);
        let response = self
            .request(reqwest::Method::POST, self.url("pulls"))
            .json(&json!({
                "title": title,
                "body": body,
                "head": head,
                "base": base,
            }))
            .send()
            .await?;
        json_body(response).await
    }
}
