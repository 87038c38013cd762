pub mod agent;
pub mod api;
pub mod config;
pub mod device;
pub mod errors;
pub mod perception;
pub mod vision;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::agent::engine::TestEngine;
use crate::api::AppState;
use crate::config::AppConfig;
use crate::device::adb::AdbDevice;
use crate::device::Device as _;
use crate::errors::TapSightResult;
use crate::vision::provider::VisionProvider as _;
use crate::vision::providers::moondream::MoondreamProvider;

pub async fn run() -> TapSightResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config; using defaults");
            AppConfig::default()
        }
    };

    // A missing device must not keep the server down; /health reports the
    // degraded state instead.
    let engine = match build_engine(&config).await {
        Ok(engine) => Some(engine),
        Err(e) => {
            tracing::error!(error = %e, "device unavailable; serving in degraded mode");
            None
        }
    };

    let state = Arc::new(AppState::new(engine));
    let router = api::routes::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "tapsight listening");
    axum::serve(listener, router).await?;

    Ok(())
}

async fn build_engine(config: &AppConfig) -> TapSightResult<TestEngine> {
    let device = AdbDevice::connect(&config.device).await?;
    let vision = MoondreamProvider::new(&config.vision)?;
    tracing::info!(
        device = device.name(),
        vision = vision.name(),
        intelligent_mode = config.agent.intelligent_mode,
        "engine ready"
    );
    Ok(TestEngine::new(
        Arc::new(device),
        Arc::new(vision),
        config.agent.clone(),
        PathBuf::from(&config.device.screenshot_path),
    ))
}
