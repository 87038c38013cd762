//! HTTP handlers for the test-runner API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::agent::engine::TestEngine;
use crate::agent::report::TestReport;
use crate::api::AppState;
use crate::perception::types::ScreenSize;

// ── DTOs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub device: String,
    pub vision: String,
    pub intelligent_mode: bool,
    pub screen_size: ScreenSize,
}

#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub screenshot_path: String,
    pub screen_size: ScreenSize,
}

#[derive(Debug, Deserialize)]
pub struct QueryScreenRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QueryScreenResponse {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateScreenRequest {
    pub expectation: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateScreenResponse {
    pub expectation: String,
    pub passed: bool,
}

/// Request body of `POST /run_test`.
#[derive(Debug, Deserialize)]
pub struct RunTestRequest {
    #[serde(default)]
    pub app_name: Option<String>,
    pub steps: Vec<String>,
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn engine_or_unavailable(
    state: &AppState,
) -> Result<Arc<Mutex<TestEngine>>, Response> {
    state.engine.clone().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "agent not initialized; device unavailable" })),
        )
            .into_response()
    })
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        endpoints: vec![
            EndpointInfo {
                method: "POST",
                path: "/run_test",
                summary: "Execute a test case of natural-language steps",
            },
            EndpointInfo {
                method: "GET",
                path: "/health",
                summary: "Agent and device status",
            },
            EndpointInfo {
                method: "GET",
                path: "/screen",
                summary: "Capture the current screen",
            },
            EndpointInfo {
                method: "POST",
                path: "/query_screen",
                summary: "Ask the vision model about the current screen",
            },
            EndpointInfo {
                method: "POST",
                path: "/validate_screen",
                summary: "Check an expectation against the current screen",
            },
        ],
    })
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let engine = match engine_or_unavailable(&state) {
        Ok(engine) => engine,
        Err(resp) => return resp,
    };

    // A run holds the engine lock; report busy rather than queue behind it.
    let response = match engine.try_lock() {
        Ok(engine) => Json(HealthResponse {
            status: "healthy".into(),
            device: engine.device_name().into(),
            vision: engine.vision_name().into(),
            intelligent_mode: engine.intelligent_mode(),
            screen_size: engine.screen_size(),
        })
        .into_response(),
        Err(_) => Json(serde_json::json!({ "status": "busy" })).into_response(),
    };
    response
}

/// GET /screen
pub async fn screen(State(state): State<Arc<AppState>>) -> Response {
    let engine = match engine_or_unavailable(&state) {
        Ok(engine) => engine,
        Err(resp) => return resp,
    };
    let mut engine = engine.lock().await;

    match engine.capture_to_file().await {
        Ok(path) => Json(ScreenResponse {
            screenshot_path: path.display().to_string(),
            screen_size: engine.screen_size(),
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /query_screen
pub async fn query_screen(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryScreenRequest>,
) -> Response {
    let engine = match engine_or_unavailable(&state) {
        Ok(engine) => engine,
        Err(resp) => return resp,
    };
    let mut engine = engine.lock().await;

    match engine.query_screen(&req.question).await {
        Ok(answer) => Json(QueryScreenResponse {
            question: req.question,
            answer,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /validate_screen
pub async fn validate_screen(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateScreenRequest>,
) -> Response {
    let engine = match engine_or_unavailable(&state) {
        Ok(engine) => engine,
        Err(resp) => return resp,
    };
    let mut engine = engine.lock().await;

    match engine.validate_screen(&req.expectation).await {
        Ok(passed) => Json(ValidateScreenResponse {
            expectation: req.expectation,
            passed,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /run_test
pub async fn run_test(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunTestRequest>,
) -> Response {
    if req.steps.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "at least one step is required" })),
        )
            .into_response();
    }

    let engine = match engine_or_unavailable(&state) {
        Ok(engine) => engine,
        Err(resp) => return resp,
    };

    let app_name = req.app_name.unwrap_or_else(|| "Unknown App".to_string());
    tracing::info!(app = %app_name, steps = req.steps.len(), "run_test request");

    let mut engine = engine.lock().await;
    let report: TestReport = engine.run_case(&app_name, &req.steps).await;
    Json(report).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state() -> Arc<AppState> {
        Arc::new(AppState { engine: None })
    }

    #[tokio::test]
    async fn health_without_engine_is_unavailable() {
        let resp = health(State(empty_state())).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn run_test_without_engine_is_unavailable() {
        let req = RunTestRequest {
            app_name: None,
            steps: vec!["scroll down".into()],
        };
        let resp = run_test(State(empty_state()), Json(req)).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn run_test_rejects_empty_steps() {
        let req = RunTestRequest {
            app_name: Some("Empty".into()),
            steps: vec![],
        };
        let resp = run_test(State(empty_state()), Json(req)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn service_info_lists_run_test() {
        let Json(info) = service_info().await;
        assert_eq!(info.name, "tapsight");
        assert!(info.endpoints.iter().any(|e| e.path == "/run_test"));
    }

    #[test]
    fn run_test_request_accepts_missing_app_name() {
        let req: RunTestRequest =
            serde_json::from_str(r#"{"steps": ["click ok"]}"#).unwrap();
        assert!(req.app_name.is_none());
        assert_eq!(req.steps.len(), 1);
    }
}
