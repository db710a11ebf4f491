use bg_common::constants::SLOT_CAPACITY;
use std::{collections::HashMap, sync::Arc, sync::RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unknown storage location: {0}")]
    UnknownLocation(String),
    #[error("no active location; set_active must succeed before read_active")]
    NoActiveLocation,
    #[error("location {0} holds no image")]
    NoImage(String),
    #[error("image of {len} octets exceeds the slot capacity of {SLOT_CAPACITY}")]
    ImageTooLarge { len: usize },
}

struct RamStorageState {
    images: HashMap<String, Arc<[u8]>>,
    active: Option<String>,
}

/// An in-RAM storage backend owning a fixed set of locations, each holding
/// at most one bytecode image. At most one location is active at a time;
/// switching is an explicit, observable side effect.
pub struct RamStorage {
    name: &'static str,
    locations: Vec<&'static str>,
    state: RwLock<RamStorageState>,
}

impl RamStorage {
    pub fn new(name: &'static str, locations: &[&'static str]) -> Self {
        Self {
            name,
            locations: locations.to_vec(),
            state: RwLock::new(RamStorageState {
                images: HashMap::new(),
                active: None,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn has_location(&self, location: &str) -> bool {
        self.locations.iter().any(|l| *l == location)
    }

    /// Makes `location` the active one. Safe to repeat; every call
    /// re-validates that the location exists and holds an image.
    pub fn set_active(&self, location: &str) -> Result<(), StorageError> {
        if !self.has_location(location) {
            return Err(StorageError::UnknownLocation(location.to_string()));
        }
        let mut state = self.state.write().expect("storage lock poisoned");
        if !state.images.contains_key(location) {
            return Err(StorageError::NoImage(location.to_string()));
        }
        tracing::debug!(backend = self.name, location, "active location set");
        state.active = Some(location.to_string());
        Ok(())
    }

    /// The active image. The returned handle stays valid even if an update
    /// swaps the slot mid-flight; callers never observe a torn image.
    pub fn read_active(&self) -> Result<Arc<[u8]>, StorageError> {
        let state = self.state.read().expect("storage lock poisoned");
        let active = state.active.as_ref().ok_or(StorageError::NoActiveLocation)?;
        state
            .images
            .get(active)
            .cloned()
            .ok_or_else(|| StorageError::NoImage(active.clone()))
    }

    /// Installs a new image into `location`. Invalidates the active marker
    /// for that location: readers must `set_active` again before the next
    /// `read_active` (the update pipeline's observable handover point).
    pub fn write_location(&self, location: &str, image: Vec<u8>) -> Result<(), StorageError> {
        if !self.has_location(location) {
            return Err(StorageError::UnknownLocation(location.to_string()));
        }
        if image.len() > SLOT_CAPACITY {
            return Err(StorageError::ImageTooLarge { len: image.len() });
        }
        let mut state = self.state.write().expect("storage lock poisoned");
        tracing::info!(
            backend = self.name,
            location,
            len = image.len(),
            "image installed"
        );
        state.images.insert(location.to_string(), Arc::from(image));
        if state.active.as_deref() == Some(location) {
            state.active = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> RamStorage {
        RamStorage::new("ram", &[".ram.0", ".ram.1"])
    }

    #[test]
    fn read_requires_prior_set_active() {
        let storage = backend();
        storage.write_location(".ram.0", vec![1, 2, 3]).unwrap();
        assert!(matches!(
            storage.read_active(),
            Err(StorageError::NoActiveLocation)
        ));
        storage.set_active(".ram.0").unwrap();
        assert_eq!(&*storage.read_active().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn set_active_requires_an_image() {
        let storage = backend();
        assert!(matches!(
            storage.set_active(".ram.0"),
            Err(StorageError::NoImage(_))
        ));
    }

    #[test]
    fn set_active_rejects_unknown_location() {
        let storage = backend();
        assert!(matches!(
            storage.set_active(".flash.9"),
            Err(StorageError::UnknownLocation(_))
        ));
    }

    #[test]
    fn update_invalidates_the_active_marker() {
        let storage = backend();
        storage.write_location(".ram.0", vec![1]).unwrap();
        storage.set_active(".ram.0").unwrap();
        storage.write_location(".ram.0", vec![2]).unwrap();
        assert!(matches!(
            storage.read_active(),
            Err(StorageError::NoActiveLocation)
        ));
        storage.set_active(".ram.0").unwrap();
        assert_eq!(&*storage.read_active().unwrap(), &[2]);
    }

    #[test]
    fn locations_hold_distinct_images() {
        let storage = backend();
        storage.write_location(".ram.0", vec![10]).unwrap();
        storage.write_location(".ram.1", vec![20]).unwrap();
        storage.set_active(".ram.0").unwrap();
        assert_eq!(&*storage.read_active().unwrap(), &[10]);
        storage.set_active(".ram.1").unwrap();
        assert_eq!(&*storage.read_active().unwrap(), &[20]);
    }

    #[test]
    fn oversized_image_is_rejected() {
        let storage = backend();
        let image = vec![0u8; SLOT_CAPACITY + 1];
        assert!(matches!(
            storage.write_location(".ram.0", image),
            Err(StorageError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn in_flight_reads_survive_an_update() {
        let storage = backend();
        storage.write_location(".ram.0", vec![1, 1, 1]).unwrap();
        storage.set_active(".ram.0").unwrap();
        let held = storage.read_active().unwrap();
        storage.write_location(".ram.0", vec![2, 2, 2]).unwrap();
        assert_eq!(&*held, &[1, 1, 1]);
    }
}
