//! Model transport — the abstraction over the remote generate-content API.
//!
//! The wire types mirror the JSON the remote endpoint accepts and returns.
//! A `ModelTransport` knows how to POST one request to one endpoint URL;
//! choosing *which* endpoint to call is the invoker's job, not the transport's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::TransportError;

/// One turn of history as the remote API sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// `"user"` or `"model"`
    pub role: String,

    pub parts: Vec<Part>,
}

impl Content {
    /// A single-text-part turn.
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: vec![Part::text(text)],
        }
    }
}

/// A piece of a turn: either text or base64 inline binary data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::InlineData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,

    /// Base64-encoded bytes
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

/// The body POSTed to a generate-content endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
}

impl GenerateContentRequest {
    /// Build a request; an empty instruction is omitted from the body.
    pub fn new(contents: Vec<Content>, system_instruction: &str) -> Self {
        let system_instruction = (!system_instruction.is_empty()).then(|| SystemInstruction {
            parts: vec![Part::text(system_instruction)],
        });
        Self {
            contents,
            system_instruction,
        }
    }
}

/// A successful generate-content response. Only the fields the tutor reads
/// are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// The first candidate's first text part, or `""` when absent.
    pub fn first_text(&self) -> &str {
        self.candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.as_ref())
            .and_then(|p| p.first())
            .and_then(|p| p.text.as_deref())
            .unwrap_or_default()
    }
}

/// Error envelope returned by the remote API on failure.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Extract `error.message` from an error response body, if present.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .filter(|m| !m.is_empty())
}

/// Raw HTTP outcome of one POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The transport trait.
///
/// Implementations: reqwest HTTP client, scripted transports in tests.
/// The invoker calls `post()` once per candidate endpoint.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// A human-readable name for this transport (e.g., "gemini-http").
    fn name(&self) -> &str;

    /// POST `request` to `endpoint`, authenticating with `credential`.
    ///
    /// Non-2xx statuses are *not* errors at this layer; they come back as a
    /// `TransportResponse` so the caller can classify them.
    async fn post(
        &self,
        endpoint: &str,
        credential: &str,
        request: &GenerateContentRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}
