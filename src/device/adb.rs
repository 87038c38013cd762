use async_trait::async_trait;
use tokio::process::Command;

use crate::config::DeviceConfig;
use crate::device::action::Key;
use crate::device::Device;
use crate::errors::{TapSightError, TapSightResult};
use crate::perception::types::{PixelPoint, ScreenSize};

/// Device automation over the adb CLI: `screencap` for frames, `input` for
/// taps, swipes, keystrokes and text.
pub struct AdbDevice {
    adb_path: String,
    serial: Option<String>,
    screen_size: ScreenSize,
}

impl AdbDevice {
    /// Connect to the device and read its screen dimensions from `wm size`.
    pub async fn connect(config: &DeviceConfig) -> TapSightResult<Self> {
        let mut device = Self {
            adb_path: config.adb_path.clone(),
            serial: config.serial.clone(),
            screen_size: ScreenSize { width: 0, height: 0 },
        };

        let output = device.run(&["shell", "wm", "size"]).await?;
        let text = String::from_utf8_lossy(&output);
        device.screen_size = parse_wm_size(&text).ok_or_else(|| {
            TapSightError::Device(format!("could not parse screen size from: {}", text.trim()))
        })?;

        tracing::info!(
            serial = device.serial.as_deref().unwrap_or("default"),
            screen = %device.screen_size,
            "device connected"
        );
        Ok(device)
    }

    async fn run(&self, args: &[&str]) -> TapSightResult<Vec<u8>> {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args);

        let output = cmd.output().await.map_err(|e| {
            TapSightError::Device(format!("failed to spawn {}: {e}", self.adb_path))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TapSightError::Device(format!(
                "adb {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl Device for AdbDevice {
    fn name(&self) -> &str {
        "adb"
    }

    fn screen_size(&self) -> ScreenSize {
        self.screen_size
    }

    async fn capture_screen(&self) -> TapSightResult<Vec<u8>> {
        // exec-out keeps the PNG byte stream clean of tty CR/LF mangling.
        let bytes = self.run(&["exec-out", "screencap", "-p"]).await?;
        if bytes.is_empty() {
            return Err(TapSightError::Device("empty screenshot from screencap".into()));
        }
        tracing::debug!(bytes = bytes.len(), "screenshot captured");
        Ok(bytes)
    }

    async fn tap(&self, point: PixelPoint) -> TapSightResult<()> {
        let (x, y) = (point.x.to_string(), point.y.to_string());
        self.run(&["shell", "input", "tap", x.as_str(), y.as_str()])
            .await?;
        tracing::info!(x = point.x, y = point.y, "tapped");
        Ok(())
    }

    async fn swipe(
        &self,
        from: PixelPoint,
        to: PixelPoint,
        duration_ms: u32,
    ) -> TapSightResult<()> {
        let args = [
            from.x.to_string(),
            from.y.to_string(),
            to.x.to_string(),
            to.y.to_string(),
            duration_ms.to_string(),
        ];
        self.run(&[
            "shell",
            "input",
            "swipe",
            args[0].as_str(),
            args[1].as_str(),
            args[2].as_str(),
            args[3].as_str(),
            args[4].as_str(),
        ])
        .await?;
        tracing::info!(?from, ?to, duration_ms, "swiped");
        Ok(())
    }

    async fn type_text(&self, text: &str) -> TapSightResult<()> {
        let escaped = escape_input_text(text);
        self.run(&["shell", "input", "text", escaped.as_str()])
            .await?;
        tracing::info!(chars = text.len(), "typed text");
        Ok(())
    }

    async fn key_press(&self, key: Key) -> TapSightResult<()> {
        self.run(&["shell", "input", "keyevent", key.keycode()]).await?;
        tracing::info!(?key, "key pressed");
        Ok(())
    }
}

/// Parse `wm size` output. An `Override size` line wins over `Physical size`.
fn parse_wm_size(output: &str) -> Option<ScreenSize> {
    let mut physical = None;
    let mut override_size = None;
    for line in output.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Physical size:") {
            physical = parse_dimensions(rest);
        } else if let Some(rest) = line.strip_prefix("Override size:") {
            override_size = parse_dimensions(rest);
        }
    }
    override_size.or(physical)
}

fn parse_dimensions(text: &str) -> Option<ScreenSize> {
    let (w, h) = text.trim().split_once('x')?;
    Some(ScreenSize {
        width: w.trim().parse().ok()?,
        height: h.trim().parse().ok()?,
    })
}

/// Escape text for `input text`: spaces become `%s`, shell metacharacters
/// get a backslash (the argument is evaluated by the device-side shell).
fn escape_input_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            ' ' => out.push_str("%s"),
            '"' | '\'' | '`' | '\\' | '$' | '&' | '|' | ';' | '(' | ')' | '<' | '>' | '*'
            | '?' | '~' | '#' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}
