//! Locally resolvable previews for pending attachments.
//!
//! A preview is an opaque `preview://<uuid>` reference that the front-end can
//! resolve back to the original bytes while the attachment is pending. The
//! reference is owned by a [`PreviewHandle`]; dropping the handle removes the
//! entry, so an attachment that is sent or discarded never leaks its preview.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SCHEME: &str = "preview://";

/// The bytes behind a preview reference.
#[derive(Debug, Clone)]
pub struct Preview {
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

/// Shared table of live previews.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Mutex<HashMap<String, Preview>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Preview>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register bytes and return the handle that owns the reference.
    pub fn register(&self, mime_type: &str, bytes: Arc<[u8]>) -> PreviewHandle {
        let reference = format!("{SCHEME}{}", uuid::Uuid::new_v4());
        self.lock().insert(
            reference.clone(),
            Preview {
                mime_type: mime_type.to_string(),
                bytes,
            },
        );
        debug!(reference = %reference, "Preview registered");
        PreviewHandle {
            reference,
            registry: self.clone(),
        }
    }

    /// Look up a live preview.
    pub fn resolve(&self, reference: &str) -> Option<Preview> {
        self.lock().get(reference).cloned()
    }

    /// Number of previews not yet released.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, reference: &str) {
        if self.lock().remove(reference).is_some() {
            debug!(reference, "Preview released");
        }
    }
}

/// Owner of one preview reference. Released on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    reference: String,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(&self.reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_resolve() {
        let registry = PreviewRegistry::new();
        let handle = registry.register("image/png", Arc::from(vec![1u8, 2, 3]));

        assert!(handle.reference().starts_with("preview://"));
        let preview = registry.resolve(handle.reference()).unwrap();
        assert_eq!(preview.mime_type, "image/png");
        assert_eq!(&*preview.bytes, &[1, 2, 3]);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn dropping_handle_releases_reference() {
        let registry = PreviewRegistry::new();
        let handle = registry.register("application/pdf", Arc::from(vec![0u8; 4]));
        let reference = handle.reference().to_string();

        drop(handle);
        assert!(registry.resolve(&reference).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn references_are_unique() {
        let registry = PreviewRegistry::new();
        let a = registry.register("image/png", Arc::from(Vec::new()));
        let b = registry.register("image/png", Arc::from(Vec::new()));
        assert_ne!(a.reference(), b.reference());
        assert_eq!(registry.live_count(), 2);
    }
}
