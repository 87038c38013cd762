use async_trait::async_trait;

use crate::errors::TapSightResult;
use crate::perception::types::Point;

/// Seam over the external vision model.
///
/// `image` is the base64 JPEG payload produced by
/// [`crate::perception::image_prep::encode_for_api`].
#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Free-form question about the screenshot, answered as text.
    async fn query(&self, image: &str, question: &str) -> TapSightResult<String>;

    /// Locate `object` on the screenshot. `None` means the model could not
    /// point at it, which is an expected outcome, not an error.
    async fn locate(&self, image: &str, object: &str) -> TapSightResult<Option<Point>>;
}
