use std::time::Duration;

use async_trait::async_trait;

use crate::config::VisionConfig;
use crate::errors::{TapSightError, TapSightResult};
use crate::perception::types::Point;
use crate::vision::provider::VisionProvider;
use crate::vision::types::{PointRequest, PointResponse, QueryRequest, QueryResponse};

/// Pause between transport retries.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Client for the Moondream-style vision API: `/query` answers free-form
/// questions about an image, `/point` returns normalized element coordinates.
pub struct MoondreamProvider {
    api_base: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl MoondreamProvider {
    pub fn new(config: &VisionConfig) -> TapSightResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.resolve_api_key(),
            max_retries: config.max_retries.max(1),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// POST `body` to `path`, retrying transport failures with a fixed delay.
    /// Non-2xx responses are terminal; only connect/timeout errors retry.
    async fn post_with_retry<B, R>(&self, path: &str, body: &B) -> TapSightResult<R>
    where
        B: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = self.endpoint(path);
        let mut attempt = 1;
        loop {
            tracing::debug!(url = %url, attempt, "vision API request (base64 image omitted)");
            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            match result {
                Ok(response) => {
                    if !response.status().is_success() {
                        let status = response.status();
                        let err_body = response.text().await.unwrap_or_default();
                        return Err(TapSightError::Vision(format!("{status}: {err_body}")));
                    }
                    return Ok(response.json::<R>().await?);
                }
                Err(e) if attempt < self.max_retries => {
                    tracing::warn!(error = %e, attempt, "vision API transport error, retrying");
                    attempt += 1;
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl VisionProvider for MoondreamProvider {
    fn name(&self) -> &str {
        "moondream"
    }

    async fn query(&self, image: &str, question: &str) -> TapSightResult<String> {
        let body = QueryRequest {
            image: image.to_string(),
            question: question.to_string(),
        };
        let response: QueryResponse = self.post_with_retry("query", &body).await?;
        tracing::debug!(answer_len = response.answer.len(), "query answered");
        Ok(response.answer)
    }

    async fn locate(&self, image: &str, object: &str) -> TapSightResult<Option<Point>> {
        let body = PointRequest {
            image: image.to_string(),
            object: object.to_string(),
        };
        let response: PointResponse = self.post_with_retry("point", &body).await?;

        match response.point.as_deref() {
            Some([x, y]) => {
                let point = Point::new(*x, *y);
                tracing::info!(object = %object, x = point.x, y = point.y, "element located");
                Ok(Some(point))
            }
            _ => {
                tracing::info!(object = %object, "element not located");
                Ok(None)
            }
        }
    }
}
