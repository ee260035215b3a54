//! The flat single-file store kept in sync for older readers.

use std::path::Path;

use chrono::Utc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{LegacyStore, VerificationResult};
use crate::services::persistence::{read_json, write_json, ReadOutcome};

use super::layout::StoreLayout;
use super::CompatibilityWriter;

/// Read the legacy store. Missing or corrupt files read as `None`.
pub fn read_legacy(path: &Path) -> Option<LegacyStore> {
    match read_json::<LegacyStore>(path) {
        ReadOutcome::Loaded(store) => Some(store),
        ReadOutcome::Missing => None,
        ReadOutcome::Corrupt(reason) => {
            tracing::warn!(path = %path.display(), %reason, "ignoring corrupt legacy verification store");
            None
        }
    }
}

/// Dual-writes every saved result into `results.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyStoreWriter;

impl CompatibilityWriter for LegacyStoreWriter {
    fn name(&self) -> &'static str {
        "legacy-results"
    }

    fn record(&self, layout: &StoreLayout, result: &VerificationResult) -> DomainResult<()> {
        let path = layout.legacy_path();
        let mut store = read_legacy(&path).unwrap_or_else(LegacyStore::empty);
        store
            .results
            .insert(result.feature_id.clone(), result.clone());
        store.updated_at = Utc::now();
        write_json(&path, &store)
    }

    fn forget(&self, layout: &StoreLayout, feature_id: &str) -> DomainResult<()> {
        let path = layout.legacy_path();
        let Some(mut store) = read_legacy(&path) else {
            return Ok(());
        };
        if store.results.remove(feature_id).is_some() {
            store.updated_at = Utc::now();
            write_json(&path, &store)?;
        }
        Ok(())
    }
}
