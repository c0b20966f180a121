//! Remote model access for MathTutor.
//!
//! `GeminiTransport` implements the `mathtutor_core::ModelTransport` trait
//! over HTTP. `EndpointInvoker` wraps any transport with ordered endpoint
//! fallback and remembers the endpoint that last answered.

pub mod fallback;
pub mod gemini;

pub use fallback::EndpointInvoker;
pub use gemini::GeminiTransport;
