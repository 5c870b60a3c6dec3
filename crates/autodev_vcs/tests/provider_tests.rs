//! GitHub and GitLab clients against a local mock server.

use autodev_vcs::{GitHubClient, GitLabClient, VcsError, VcsKind, VcsProvider, VersionControlManager};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn github(server: &MockServer) -> GitHubClient {
    GitHubClient::new("gh-token", "octo", "demo").with_base_url(server.uri())
}

fn gitlab(server: &MockServer) -> GitLabClient {
    GitLabClient::new("gl-token", "42").with_base_url(server.uri())
}

#[tokio::test]
async fn test_github_create_branch_from_base_sha() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/git/refs/heads/main"))
        .and(header("Authorization", "token gh-token"))
        .and(header("Accept", "application/vnd.github.v3+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": {"sha": "abc123"}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/demo/git/refs"))
        .and(body_json(json!({"ref": "refs/heads/feature/x", "sha": "abc123"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ref": "refs/heads/feature/x"})))
        .expect(1)
        .mount(&server)
        .await;

    let created = github(&server).create_branch("feature/x", "main").await.unwrap();
    assert_eq!(created["ref"], "refs/heads/feature/x");
}

#[tokio::test]
async fn test_github_new_file_has_no_sha() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents/src/main.py"))
        .and(query_param("ref", "feature/x"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/octo/demo/contents/src/main.py"))
        .and(body_json(json!({
            "message": "add main",
            "content": "cHJpbnQoMSk=",
            "branch": "feature/x",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"content": {"path": "src/main.py"}})))
        .expect(1)
        .mount(&server)
        .await;

    let result = github(&server)
        .create_or_update_file("src/main.py", "print(1)", "add main", "feature/x")
        .await
        .unwrap();
    assert_eq!(result["content"]["path"], "src/main.py");
}

#[tokio::test]
async fn test_github_update_sends_existing_sha() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents/README.md"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sha": "old-sha"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/octo/demo/contents/README.md"))
        .and(body_string_contains("\"sha\":\"old-sha\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    github(&server)
        .create_or_update_file("README.md", "# hi", "docs", "main")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_github_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/demo/pulls"))
        .respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
        .mount(&server)
        .await;

    let err = github(&server)
        .create_pull_request("t", "b", "feature/x", "main")
        .await
        .unwrap_err();
    match err {
        VcsError::Http { status, body } => {
            assert_eq!(status, 422);
            assert_eq!(body, "Validation Failed");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_gitlab_create_file_when_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/42/repository/files/src%2Fmain.py/raw"))
        .and(header("PRIVATE-TOKEN", "gl-token"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/projects/42/repository/files/src%2Fmain.py"))
        .and(body_string_contains("commit_message=add"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"file_path": "src/main.py"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = gitlab(&server)
        .create_or_update_file("src/main.py", "print(1)", "add", "main")
        .await
        .unwrap();
    assert_eq!(result["file_path"], "src/main.py");
}

#[tokio::test]
async fn test_gitlab_update_existing_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/42/repository/files/app.py/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string("old"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/projects/42/repository/files/app.py"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file_path": "app.py"})))
        .expect(1)
        .mount(&server)
        .await;

    gitlab(&server)
        .create_or_update_file("app.py", "new", "update", "main")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_gitlab_merge_request_through_manager() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects/42/merge_requests"))
        .and(body_string_contains("source_branch=feature%2Fwf-1"))
        .and(body_string_contains("target_branch=main"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"iid": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let manager = VersionControlManager::with_provider(VcsKind::GitLab, Box::new(gitlab(&server)));
    let mr = manager.create_pull_request("Autodev", "Generated", "wf-1").await.unwrap();
    assert_eq!(mr["iid"], 7);
}
