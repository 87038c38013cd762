use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TapSightError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vision provider error: {0}")]
    Vision(String),

    #[error("Perception error: {0}")]
    Perception(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl TapSightError {
    /// Status code reported when the error escapes an API handler.
    fn status_code(&self) -> StatusCode {
        match self {
            TapSightError::Vision(_) | TapSightError::Http(_) => StatusCode::BAD_GATEWAY,
            TapSightError::Device(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TapSightError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

pub type TapSightResult<T> = Result<T, TapSightError>;
