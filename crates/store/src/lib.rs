//! Preference store implementations for MathTutor.

pub mod in_memory;
pub mod file_backend;

pub use in_memory::InMemoryStore;
pub use file_backend::FileStore;
