//! Memory tier of the capability cache.
//!
//! A single slot, last writer wins. The entry is only served for the project
//! it was captured for and only while its age is within the TTL.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::models::CapabilitySnapshot;
use crate::domain::ports::{Clock, SystemClock};

/// Default time-to-live of the memory tier.
pub const MEMORY_CACHE_TTL_MS: u64 = 60_000;

/// The cached snapshot and when it was captured.
#[derive(Debug, Clone)]
pub struct MemoryCacheEntry {
    pub project_path: PathBuf,
    pub snapshot: CapabilitySnapshot,
    pub captured_at_millis: u64,
}

/// Explicitly constructed process-lifetime cache with an injected clock.
pub struct MemoryCapabilityCache {
    slot: Mutex<Option<MemoryCacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl_ms: u64,
}

impl MemoryCapabilityCache {
    pub fn new(clock: Arc<dyn Clock>, ttl_ms: u64) -> Self {
        Self {
            slot: Mutex::new(None),
            clock,
            ttl_ms,
        }
    }

    /// Wall-clock cache with the default TTL.
    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock), MEMORY_CACHE_TTL_MS)
    }

    /// The cached snapshot for `project`, if fresh.
    pub fn get(&self, project: &Path) -> Option<CapabilitySnapshot> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = slot.as_ref()?;
        if entry.project_path != project {
            return None;
        }
        let age = self.clock.now_millis().saturating_sub(entry.captured_at_millis);
        if age > self.ttl_ms {
            tracing::debug!(age_ms = age, ttl_ms = self.ttl_ms, "memory capability cache expired");
            return None;
        }
        Some(entry.snapshot.clone())
    }

    /// Replace the slot with `snapshot` for `project`.
    pub fn put(&self, project: &Path, snapshot: CapabilitySnapshot) {
        let entry = MemoryCacheEntry {
            project_path: project.to_path_buf(),
            snapshot,
            captured_at_millis: self.clock.now_millis(),
        };
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(entry);
    }

    /// Drop the cached entry.
    pub fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Default for MemoryCapabilityCache {
    fn default() -> Self {
        Self::with_system_clock()
    }
}
