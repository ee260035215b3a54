//! Disk tier of the capability cache.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DiskCacheEnvelope, CAPABILITY_CACHE_VERSION};
use crate::services::persistence::{self, ReadOutcome};

/// File name of the envelope inside the state directory.
pub const CAPABILITIES_FILE: &str = "capabilities.json";

/// Only the version field, so a mismatched envelope is rejected before its
/// body is interpreted.
#[derive(Deserialize)]
struct VersionProbe {
    version: Option<String>,
}

/// Versioned on-disk envelope store.
#[derive(Debug, Clone)]
pub struct DiskCapabilityCache {
    state_dir: PathBuf,
}

impl DiskCapabilityCache {
    /// `state_dir` is relative to each project root (e.g. `.attestor`).
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn path(&self, project: &Path) -> PathBuf {
        project.join(&self.state_dir).join(CAPABILITIES_FILE)
    }

    /// Load the envelope. Absent, unparsable or version-mismatched files are misses.
    pub fn read(&self, project: &Path) -> Option<DiskCacheEnvelope> {
        let path = self.path(project);
        match persistence::read_json::<VersionProbe>(&path) {
            ReadOutcome::Loaded(probe) => {
                if probe.version.as_deref() != Some(CAPABILITY_CACHE_VERSION) {
                    tracing::debug!(
                        path = %path.display(),
                        found = ?probe.version,
                        expected = CAPABILITY_CACHE_VERSION,
                        "capability cache version mismatch"
                    );
                    return None;
                }
            }
            ReadOutcome::Missing => return None,
            ReadOutcome::Corrupt(reason) => {
                tracing::warn!(path = %path.display(), %reason, "ignoring corrupt capability cache");
                return None;
            }
        }

        match persistence::read_json::<DiskCacheEnvelope>(&path) {
            ReadOutcome::Loaded(envelope) => Some(envelope),
            ReadOutcome::Missing => None,
            ReadOutcome::Corrupt(reason) => {
                tracing::warn!(path = %path.display(), %reason, "capability cache has an invalid shape");
                None
            }
        }
    }

    pub fn write(&self, project: &Path, envelope: &DiskCacheEnvelope) -> DomainResult<()> {
        persistence::write_json(&self.path(project), envelope)
    }

    /// Delete the envelope; an absent file is a no-op.
    pub fn remove(&self, project: &Path) -> DomainResult<()> {
        persistence::remove_file_if_exists(&self.path(project))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CapabilitySnapshot;

    #[test]
    fn round_trips_current_version() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCapabilityCache::new(".attestor");
        let envelope = DiskCacheEnvelope::new(CapabilitySnapshot::empty(), Some("abc".into()), vec![]);
        cache.write(dir.path(), &envelope).unwrap();
        assert_eq!(cache.read(dir.path()), Some(envelope));
    }

    #[test]
    fn version_mismatch_is_a_miss_even_with_valid_body() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCapabilityCache::new(".attestor");
        let mut envelope = DiskCacheEnvelope::new(CapabilitySnapshot::empty(), Some("abc".into()), vec![]);
        envelope.version = "0.9.0".into();
        cache.write(dir.path(), &envelope).unwrap();
        assert_eq!(cache.read(dir.path()), None);
    }

    #[test]
    fn corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCapabilityCache::new(".attestor");
        let path = cache.path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2").unwrap();
        assert_eq!(cache.read(dir.path()), None);

        std::fs::write(&path, r#"{"version": "1.0.0", "capabilities": 7}"#).unwrap();
        assert_eq!(cache.read(dir.path()), None);
    }

    #[test]
    fn remove_tolerates_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCapabilityCache::new(".attestor");
        cache.remove(dir.path()).unwrap();
    }
}
