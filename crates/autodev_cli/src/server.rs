//! REST API over the agent workflows.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use autodev_agents::{process_requirements, EnhancedDevelopmentWorkflow, PlanningPhaseReport};
use autodev_core::{RunResult, RunStatus, Settings};
use autodev_vcs::VcsKind;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::commands::run::publish;

pub const RESULT_API_FILE: &str = "result_api.json";

struct AppState {
    settings: Settings,
    output_root: PathBuf,
}

type SharedState = Arc<AppState>;

fn default_true() -> bool {
    true
}

fn default_api_workflow() -> String {
    "api-run".to_string()
}

fn default_plan_workflow() -> String {
    "api-plan".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_vcs() -> String {
    "none".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub requirement: String,
    #[serde(default = "default_api_workflow")]
    pub workflow_id: String,
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_vcs")]
    pub vcs: String,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub requirement: String,
    #[serde(default = "default_plan_workflow")]
    pub workflow_id: String,
    #[serde(default = "default_true")]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    message: &'static str,
}

/// An HTTP error rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn workflow_failed(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: format!("Workflow failed: {}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Router that saves results below the working directory.
pub fn router(settings: Settings) -> Router {
    router_with_output_root(settings, PathBuf::from("."))
}

/// Router whose `output_dir` request values resolve below `output_root`.
pub fn router_with_output_root(settings: Settings, output_root: PathBuf) -> Router {
    let state: SharedState = Arc::new(AppState { settings, output_root });
    Router::new()
        .route("/", get(health))
        .route("/process", post(process))
        .route("/plan", post(plan))
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        message: "Autonomous Dev Agent API is running",
    })
}

async fn process(
    State(state): State<SharedState>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<RunResult>, ApiError> {
    if req.requirement.trim().is_empty() {
        return Err(ApiError::bad_request("requirement is required"));
    }
    let vcs = match req.vcs.to_lowercase().as_str() {
        "none" | "" => None,
        other => Some(other.parse::<VcsKind>().map_err(|e| ApiError::bad_request(e.to_string()))?),
    };
    let output_dir = resolve_output_dir(&state.output_root, &req.output_dir)?;

    let settings = state.settings.with_dry_run(req.dry_run);
    info!("API run {} (dry run: {})", req.workflow_id, settings.dry_run);

    let result = process_requirements(&req.requirement, &req.workflow_id, &settings)
        .await
        .map_err(ApiError::workflow_failed)?;

    if let Some(kind) = vcs {
        if settings.dry_run {
            warn!("Dry run: skipping {} publishing", kind);
        } else if result.status == RunStatus::Completed {
            publish(kind, &settings, &req.workflow_id, &result.workflow_state)
                .await
                .map_err(|e| ApiError::workflow_failed(format!("{:#}", e)))?;
        }
    }

    save_result(&output_dir, &result).await;
    Ok(Json(result))
}

/// Only relative paths without `..` are accepted from clients.
fn resolve_output_dir(root: &Path, requested: &Path) -> Result<PathBuf, ApiError> {
    let mut dir = root.to_path_buf();
    for component in requested.components() {
        match component {
            Component::Normal(part) => dir.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ApiError::bad_request(format!(
                    "output_dir must be a relative path without '..': {}",
                    requested.display()
                )));
            }
        }
    }
    Ok(dir)
}

/// Best effort: a failure here does not fail the request.
async fn save_result(output_dir: &Path, result: &RunResult) {
    let path = output_dir.join(RESULT_API_FILE);
    let write = async {
        tokio::fs::create_dir_all(output_dir).await?;
        let body = serde_json::to_vec_pretty(result).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        tokio::fs::write(&path, body).await
    };
    if let Err(e) = write.await {
        warn!("Could not save {}: {}", path.display(), e);
    }
}

async fn plan(
    State(state): State<SharedState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanningPhaseReport>, ApiError> {
    if req.requirement.trim().is_empty() {
        return Err(ApiError::bad_request("requirement is required"));
    }

    let settings = state.settings.with_dry_run(req.dry_run);
    let mut workflow = EnhancedDevelopmentWorkflow::from_settings(&req.workflow_id, &settings)
        .map_err(ApiError::workflow_failed)?;
    let report = workflow.execute_planning_phase(&req.requirement, None).await;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::net::TcpListener;

    async fn spawn(settings: Settings) -> String {
        serve_router(router(settings)).await
    }

    async fn spawn_in(settings: Settings, output_root: PathBuf) -> String {
        serve_router(router_with_output_root(settings, output_root)).await
    }

    async fn serve_router(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn(Settings::default()).await;
        let body: Value = reqwest::get(format!("{}/", base)).await.unwrap().json().await.unwrap();
        assert_eq!(
            body,
            json!({"status": "ok", "message": "Autonomous Dev Agent API is running"})
        );
    }

    #[tokio::test]
    async fn test_process_requires_requirement() {
        let base = spawn(Settings::default()).await;
        let response = reqwest::Client::new()
            .post(format!("{}/process", base))
            .json(&json!({"requirement": ""}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"detail": "requirement is required"}));
    }

    #[tokio::test]
    async fn test_process_dry_run_saves_result() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_in(Settings::default(), dir.path().to_path_buf()).await;
        let response = reqwest::Client::new()
            .post(format!("{}/process", base))
            .json(&json!({
                "requirement": "Create a function that adds two numbers",
                "workflow_id": "api-test",
                "output_dir": "runs/api-test",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["workflow_id"], "api-test");
        assert_eq!(body["status"], "completed");
        assert!(dir.path().join("runs/api-test").join(RESULT_API_FILE).exists());
    }

    #[tokio::test]
    async fn test_process_rejects_escaping_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_in(Settings::default(), dir.path().join("root")).await;
        let outside = dir.path().join("outside");

        for output_dir in [outside.to_string_lossy().into_owned(), "../outside".to_string()] {
            let response = reqwest::Client::new()
                .post(format!("{}/process", base))
                .json(&json!({"requirement": "adder", "output_dir": output_dir}))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status().as_u16(), 400);
            let body: Value = response.json().await.unwrap();
            assert!(body["detail"].as_str().unwrap().starts_with("output_dir must be a relative path"));
        }
        assert!(!outside.exists());
    }

    #[test]
    fn test_resolve_output_dir() {
        let root = Path::new("/srv/autodev");
        assert_eq!(resolve_output_dir(root, Path::new("output")).unwrap(), root.join("output"));
        assert_eq!(resolve_output_dir(root, Path::new("./a/b")).unwrap(), root.join("a/b"));
        assert!(resolve_output_dir(root, Path::new("/etc")).is_err());
        assert!(resolve_output_dir(root, Path::new("a/../../b")).is_err());
    }

    #[tokio::test]
    async fn test_live_run_without_key_is_500() {
        let base = spawn(Settings::default()).await;
        let response = reqwest::Client::new()
            .post(format!("{}/process", base))
            .json(&json!({"requirement": "anything", "dry_run": false}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 500);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().starts_with("Workflow failed: "));
    }

    #[tokio::test]
    async fn test_plan_dry_run() {
        let base = spawn(Settings::default()).await;
        let body: Value = reqwest::Client::new()
            .post(format!("{}/plan", base))
            .json(&json!({"requirement": "A todo list API"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["workflow_id"], "api-plan");
        assert_eq!(body["overall_status"], "planning_complete");
        assert_eq!(body["planning_phase"]["ready_for_implementation"], true);
    }
}
