//! Error types for the MathTutor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The generic message surfaced once every candidate endpoint has failed.
pub const EXHAUSTED_MESSAGE: &str =
    "Unable to connect to the AI service. Please check your API key configuration or VPN.";

/// The top-level error type for all MathTutor operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model invocation errors ---
    #[error("Model error: {0}")]
    Invoke(#[from] InvokeError),

    // --- Attachment errors ---
    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures surfaced by the endpoint invoker.
///
/// Endpoint-unavailable outcomes never appear here: they are retried against
/// the next candidate and only show up folded into [`InvokeError::Exhausted`].
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    #[error("No API key configured. Please enter an API key before starting.")]
    MissingCredential,

    #[error("{message}")]
    Api { status_code: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("Malformed response from model: {0}")]
    MalformedResponse(String),

    #[error("{}", EXHAUSTED_MESSAGE)]
    Exhausted { attempts: usize },
}

impl InvokeError {
    /// Whether this failure was caused by a missing local precondition
    /// rather than by the remote service.
    pub fn is_precondition(&self) -> bool {
        matches!(self, InvokeError::MissingCredential)
    }
}

/// Failures reported by a [`crate::model::ModelTransport`].
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Connectivity problems mark an endpoint as unavailable rather than
    /// aborting the whole invocation.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, TransportError::Connect(_) | TransportError::Timeout(_))
    }

    pub fn message(&self) -> &str {
        match self {
            TransportError::Connect(m) | TransportError::Timeout(m) | TransportError::Other(m) => m,
        }
    }
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("File '{name}' is too large ({size_bytes} bytes). Please choose a file under {limit_bytes} bytes.")]
    TooLarge {
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error("Unsupported file format '{mime_type}' for '{name}'. Please choose an image, PDF or Word document.")]
    UnsupportedFormat { name: String, mime_type: String },

    #[error("Could not read Word document '{name}': {reason}")]
    ExtractionFailed { name: String, reason: String },

    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization failed for key '{key}': {reason}")]
    Serialization { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition { state: String, action: String },

    #[error("Topic name must not be empty")]
    EmptyTopic,

    #[error("API key must not be empty")]
    InvalidCredential,
}
