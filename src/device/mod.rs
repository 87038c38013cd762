pub mod action;
pub mod adb;

use async_trait::async_trait;

use crate::device::action::Key;
use crate::errors::TapSightResult;
use crate::perception::types::{PixelPoint, ScreenSize};

/// Seam over the device-automation transport.
#[async_trait]
pub trait Device: Send + Sync {
    fn name(&self) -> &str;

    fn screen_size(&self) -> ScreenSize;

    /// Current screen as PNG bytes.
    async fn capture_screen(&self) -> TapSightResult<Vec<u8>>;

    async fn tap(&self, point: PixelPoint) -> TapSightResult<()>;

    async fn swipe(
        &self,
        from: PixelPoint,
        to: PixelPoint,
        duration_ms: u32,
    ) -> TapSightResult<()>;

    /// Type into the currently focused field.
    async fn type_text(&self, text: &str) -> TapSightResult<()>;

    async fn key_press(&self, key: Key) -> TapSightResult<()>;
}
