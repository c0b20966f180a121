//! HTTP transport for the generate-content API.
//!
//! Sends the request body as JSON with the API key as the `key` query
//! parameter. Status classification is left to the invoker; this layer only
//! maps reqwest failures into connectivity vs. other transport errors.

use async_trait::async_trait;
use mathtutor_config::AppConfig;
use mathtutor_core::error::TransportError;
use mathtutor_core::model::{GenerateContentRequest, ModelTransport, TransportResponse};
use std::time::Duration;
use tracing::{debug, trace};

/// reqwest-backed `ModelTransport`.
pub struct GeminiTransport {
    client: reqwest::Client,
}

impl GeminiTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Create a transport from the `[http]` config section.
    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        Self::new(Duration::from_secs(config.http.timeout_secs))
    }
}

/// reqwest's message names the request URL, which carries the key.
fn classify(err: reqwest::Error) -> TransportError {
    let err = err.without_url();
    if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[async_trait]
impl ModelTransport for GeminiTransport {
    fn name(&self) -> &str {
        "gemini-http"
    }

    async fn post(
        &self,
        endpoint: &str,
        credential: &str,
        request: &GenerateContentRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        debug!(endpoint, turns = request.contents.len(), "Sending generate-content request");

        let response = self
            .client
            .post(endpoint)
            .query(&[("key", credential)])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        trace!(status, bytes = body.len(), "Received response");

        Ok(TransportResponse { status, body })
    }
}
