use crate::ram_storage::RamStorage;
use std::sync::Arc;

/// The fixed set of storage backends, built once at init and never mutated
/// afterwards. Lookup maps a location id to the backend that owns it.
pub struct StorageRegistry {
    backends: Vec<Arc<RamStorage>>,
}

impl StorageRegistry {
    pub fn new(backends: Vec<Arc<RamStorage>>) -> Self {
        Self { backends }
    }

    /// The backend owning `location`, if any. Unknown locations are a
    /// request-level error for the caller, never a fault here.
    pub fn find(&self, location: &str) -> Option<Arc<RamStorage>> {
        self.backends
            .iter()
            .find(|b| b.has_location(location))
            .cloned()
    }
}
