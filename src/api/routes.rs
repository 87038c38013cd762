use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers;
use crate::api::AppState;

/// Build the service router.
///
/// ```text
/// GET  /                 - service info
/// GET  /health           - agent and device status
/// GET  /screen           - capture current screen
/// POST /query_screen     - ask the vision model about the screen
/// POST /validate_screen  - check an expectation against the screen
/// POST /run_test         - execute a natural-language test case
/// ```
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health))
        .route("/screen", get(handlers::screen))
        .route("/query_screen", post(handlers::query_screen))
        .route("/validate_screen", post(handlers::validate_screen))
        .route("/run_test", post(handlers::run_test))
        .with_state(state)
}
