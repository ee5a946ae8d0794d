//! Process-lifetime result cache.
//!
//! The cache maps a request's [`CacheKey`] to the slot sequence it resolved
//! to. There is no eviction and no TTL: entries live until the process
//! exits. The store is injectable at orchestrator construction so tests can
//! substitute a fresh or pre-seeded instance.

use crate::booking::{CacheKey, Slot};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// In-memory slot cache keyed by request identity.
///
/// Guarded by a mutex so a concurrent embedding stays sound; the
/// orchestrator itself only runs one resolve at a time.
#[derive(Debug, Default)]
pub struct SlotCache {
    entries: Mutex<HashMap<CacheKey, Vec<Slot>>>,
}

impl SlotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the cached sequence for a key, cloning it out
    pub fn get(&self, key: &CacheKey) -> Option<Vec<Slot>> {
        self.lock().get(key).cloned()
    }

    /// Store a resolved sequence under its key, replacing any prior entry
    pub fn store(&self, key: CacheKey, slots: Vec<Slot>) {
        self.lock().insert(key, slots);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Vec<Slot>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
