//! Endpoint fallback — ordered retry over candidate endpoint URLs.
//!
//! The remote API surface is versioned and model identifiers come and go, so
//! one logical "ask the model" call may need to try several URLs. The
//! endpoint that last answered is remembered in the preference store and
//! tried first next time.
//!
//! Outcome classification per candidate:
//! - 2xx → parse, remember the endpoint, return.
//! - 404, or an error message containing "not found" → next candidate.
//! - any other HTTP status → abort with that error.
//! - connectivity failure, or a transport message containing "not found" → next candidate.
//! - any other transport failure → abort.

use mathtutor_config::AppConfig;
use mathtutor_core::error::{InvokeError, TransportError};
use mathtutor_core::model::{
    self, Content, GenerateContentRequest, GenerateContentResponse, ModelTransport,
    TransportResponse,
};
use mathtutor_core::store::{self, PreferenceStore, REMEMBERED_ENDPOINT_KEY};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Executes generate-content calls with transparent endpoint fallback.
pub struct EndpointInvoker {
    endpoints: Vec<String>,
    transport: Arc<dyn ModelTransport>,
    store: Arc<dyn PreferenceStore>,
}

/// What one candidate attempt told us.
enum Attempt {
    Success(GenerateContentResponse),
    Unavailable(String),
    Fatal(InvokeError),
}

impl EndpointInvoker {
    /// Create an invoker over a static, most-preferred-first endpoint list.
    pub fn new(
        endpoints: Vec<String>,
        transport: Arc<dyn ModelTransport>,
        store: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            endpoints,
            transport,
            store,
        }
    }

    /// Create an invoker using the endpoint list from config.
    pub fn from_config(
        config: &AppConfig,
        transport: Arc<dyn ModelTransport>,
        store: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self::new(config.endpoints.clone(), transport, store)
    }

    /// The static fallback list.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// The endpoint remembered from the last success, if readable.
    pub async fn remembered_endpoint(&self) -> Option<String> {
        match store::load::<String>(self.store.as_ref(), REMEMBERED_ENDPOINT_KEY).await {
            Ok(found) => found.filter(|e| !e.is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read remembered endpoint, ignoring");
                None
            }
        }
    }

    /// Candidate order: the remembered endpoint first, then the rest of the
    /// static list continuing after it and wrapping around. Each endpoint
    /// appears once. A remembered endpoint missing from the list is still
    /// tried first, followed by the whole list.
    pub async fn candidates(&self) -> Vec<String> {
        let Some(remembered) = self.remembered_endpoint().await else {
            return self.endpoints.clone();
        };

        let start = self
            .endpoints
            .iter()
            .position(|e| *e == remembered)
            .map_or(0, |i| i + 1);
        let mut order = Vec::with_capacity(self.endpoints.len() + 1);
        order.push(remembered.clone());
        order.extend(
            self.endpoints[start..]
                .iter()
                .chain(&self.endpoints[..start])
                .filter(|e| **e != remembered)
                .cloned(),
        );
        order
    }

    /// Ask the model. `history` is sent as-is; `system_instruction` is
    /// omitted from the body when empty.
    pub async fn invoke(
        &self,
        history: Vec<Content>,
        system_instruction: &str,
        credential: &str,
    ) -> std::result::Result<GenerateContentResponse, InvokeError> {
        if credential.trim().is_empty() {
            return Err(InvokeError::MissingCredential);
        }

        let request = GenerateContentRequest::new(history, system_instruction);
        let candidates = self.candidates().await;
        let total = candidates.len();
        let mut last_unavailable: Option<String> = None;

        for (i, endpoint) in candidates.iter().enumerate() {
            info!(
                transport = self.transport.name(),
                endpoint = %endpoint,
                attempt = i + 1,
                total,
                "Invoking model endpoint"
            );

            let outcome = match self.transport.post(endpoint, credential, &request).await {
                Ok(response) => classify_response(response),
                Err(e) => classify_transport_error(e),
            };

            match outcome {
                Attempt::Success(parsed) => {
                    self.remember(endpoint).await;
                    return Ok(parsed);
                }
                Attempt::Unavailable(reason) => {
                    warn!(endpoint = %endpoint, reason = %reason, "Endpoint unavailable, trying next");
                    last_unavailable = Some(reason);
                }
                Attempt::Fatal(err) => {
                    warn!(endpoint = %endpoint, error = %err, "Model request failed");
                    return Err(err);
                }
            }
        }

        warn!(
            attempts = total,
            last_error = last_unavailable.as_deref().unwrap_or("none"),
            "All model endpoints failed"
        );
        Err(InvokeError::Exhausted { attempts: total })
    }

    async fn remember(&self, endpoint: &str) {
        if let Err(e) = store::save(self.store.as_ref(), REMEMBERED_ENDPOINT_KEY, endpoint).await {
            // Only an optimization: the next call re-resolves from the static list
            warn!(error = %e, "Could not persist working endpoint");
        } else {
            debug!(endpoint, "Remembered working endpoint");
        }
    }
}

fn mentions_not_found(message: &str) -> bool {
    message.to_lowercase().contains("not found")
}

fn classify_response(response: TransportResponse) -> Attempt {
    if response.is_success() {
        return match serde_json::from_str::<GenerateContentResponse>(&response.body) {
            Ok(parsed) => Attempt::Success(parsed),
            Err(e) => Attempt::Fatal(InvokeError::MalformedResponse(e.to_string())),
        };
    }

    let message = model::error_message(&response.body)
        .unwrap_or_else(|| format!("HTTP Error: {}", response.status));

    if response.status == 404 || mentions_not_found(&message) {
        Attempt::Unavailable(message)
    } else {
        Attempt::Fatal(InvokeError::Api {
            status_code: response.status,
            message,
        })
    }
}

fn classify_transport_error(err: TransportError) -> Attempt {
    if err.is_connectivity() || mentions_not_found(err.message()) {
        Attempt::Unavailable(err.to_string())
    } else {
        Attempt::Fatal(InvokeError::Transport(err.to_string()))
    }
}
