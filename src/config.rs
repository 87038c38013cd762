use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{TapSightError, TapSightResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Optional API key stored in config.toml (falls back to env var TAPSIGHT_VISION_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Transport-level retry budget per call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl VisionConfig {
    /// Config key wins; environment variable is the fallback.
    pub fn resolve_api_key(&self) -> String {
        self.api_key
            .clone()
            .or_else(|| std::env::var("TAPSIGHT_VISION_API_KEY").ok())
            .unwrap_or_default()
    }
}

fn default_api_base() -> String {
    "https://api.moondream.ai/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    /// Target a specific device when several are attached (`adb -s <serial>`).
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default = "default_screenshot_path")]
    pub screenshot_path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            serial: None,
            screenshot_path: default_screenshot_path(),
        }
    }
}

fn default_adb_path() -> String {
    "adb".to_string()
}

fn default_screenshot_path() -> String {
    "current_screen.png".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Auto-navigation when an element is not on the current screen.
    #[serde(default = "default_true")]
    pub intelligent_mode: bool,
    #[serde(default = "default_max_locate_attempts")]
    pub max_locate_attempts: u32,
    /// Pause between consecutive steps.
    #[serde(default = "default_step_pause_ms")]
    pub step_pause_ms: u64,
    /// Wait for the UI to settle after a navigation action.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            intelligent_mode: true,
            max_locate_attempts: default_max_locate_attempts(),
            step_pause_ms: default_step_pause_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_locate_attempts() -> u32 {
    3
}

fn default_step_pause_ms() -> u64 {
    500
}

fn default_settle_ms() -> u64 {
    1000
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in working directory");
            return Some(candidate);
        }
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("tapsight").join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config directory");
            return Some(candidate);
        }
    }

    None
}

/// Load config.toml from the usual locations, falling back to defaults so the
/// server can still come up and report readiness over /health.
pub fn load_config() -> TapSightResult<AppConfig> {
    let Some(path) = resolve_config_path() else {
        tracing::info!("config.toml not found, using defaults");
        return Ok(AppConfig::default());
    };
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), vision_api = %config.vision.api_base, "config loaded");
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> TapSightResult<()> {
    let path = resolve_config_path().ok_or_else(|| {
        TapSightError::Config("config.toml not found; nothing to overwrite".into())
    })?;
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
