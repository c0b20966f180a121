//! # MathTutor Core
//!
//! Domain types, ports, and error definitions for the MathTutor tutoring runtime.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (the remote model, durable storage) is a trait
//! here. Implementations live in their respective crates. This enables:
//! - Swapping the HTTP transport or storage backend via configuration
//! - Easy testing with scripted/in-memory implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod model;
pub mod store;
pub mod topic;
pub mod curriculum;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{AttachmentSummary, Conversation, Message, Role};
pub use model::{
    Content, GenerateContentRequest, GenerateContentResponse, ModelTransport, Part,
    TransportResponse,
};
pub use store::PreferenceStore;
pub use topic::{TopicStat, TopicStats};
pub use curriculum::{Grade, Mode};
