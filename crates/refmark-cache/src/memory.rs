//! In-memory snapshot cache.
//!
//! Entries are immutable once populated. Each (key, etag) pair owns a slot;
//! concurrent callers asking for the same slot wait for the first one to
//! populate it instead of converting the same bibliography twice.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{BibliographyCache, CacheKey};

type Slot = Arc<Mutex<Option<Arc<[u8]>>>>;

/// Per-run [`BibliographyCache`] holding immutable snapshots.
#[derive(Default)]
pub struct MemoryCache {
    slots: Mutex<HashMap<(CacheKey, String), Slot>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &CacheKey, etag: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry((key.clone(), etag.to_owned()))
                .or_default(),
        )
    }
}

impl BibliographyCache for MemoryCache {
    fn get(&self, key: &CacheKey, etag: &str) -> Option<Arc<[u8]>> {
        // Release the map before waiting on a slot that may be populating.
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.get(&(key.clone(), etag.to_owned()))?)
        };
        slot.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    fn set(&self, key: &CacheKey, etag: &str, value: &[u8]) {
        let slot = self.slot(key, etag);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        // First write wins: a snapshot never changes once visible.
        if guard.is_none() {
            *guard = Some(Arc::from(value));
        }
    }

    fn get_or_populate(
        &self,
        key: &CacheKey,
        etag: &str,
        populate: &mut dyn FnMut() -> Option<Vec<u8>>,
    ) -> Option<Arc<[u8]>> {
        let slot = self.slot(key, etag);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = guard.as_ref() {
            tracing::debug!(key = key.as_str(), "bibliography cache hit");
            return Some(Arc::clone(hit));
        }
        let value: Arc<[u8]> = Arc::from(populate()?);
        *guard = Some(Arc::clone(&value));
        Some(value)
    }
}
