//! One-way migration from the legacy flat store to the per-run layout.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    FeatureSummary, LegacyStore, VerificationIndex, VerificationMetadata, VerificationResult,
};
use crate::services::persistence::{ensure_dir, write_atomic, write_json};

use super::layout::StoreLayout;
use super::report::render_report;

/// What a migration did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Features written as run 1.
    pub migrated: Vec<String>,
    /// Features that could not be written, with the reason.
    pub failed: Vec<(String, String)>,
    /// Copy of the legacy file, when one was made.
    pub backup: Option<PathBuf>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

fn write_first_run(
    layout: &StoreLayout,
    feature_id: &str,
    result: &VerificationResult,
) -> DomainResult<VerificationMetadata> {
    let mut metadata = VerificationMetadata::from_result(result, 1);
    metadata.feature_id = feature_id.to_string();

    ensure_dir(&layout.feature_dir(feature_id))?;
    write_json(&layout.metadata_path(feature_id, 1), &metadata)?;
    write_atomic(&layout.report_path(feature_id, 1), &render_report(result, 1))?;
    Ok(metadata)
}

/// Write every legacy result as run 1, persist the resulting index and copy
/// the legacy file aside. The caller holds the store lock.
///
/// A feature that fails to migrate is reported and skipped; the index only
/// lists features whose run files were written.
pub fn migrate_legacy(
    layout: &StoreLayout,
    legacy: &LegacyStore,
) -> DomainResult<(VerificationIndex, MigrationReport)> {
    let mut index = VerificationIndex::empty();
    let mut report = MigrationReport::default();

    for (feature_id, result) in &legacy.results {
        match write_first_run(layout, feature_id, result) {
            Ok(metadata) => {
                index
                    .features
                    .insert(feature_id.clone(), FeatureSummary::first_run(&metadata));
                report.migrated.push(feature_id.clone());
            }
            Err(err) => {
                tracing::warn!(feature = %feature_id, error = %err, "failed to migrate legacy verification");
                report.failed.push((feature_id.clone(), err.to_string()));
            }
        }
    }

    index.updated_at = Utc::now();
    write_json(&layout.index_path(), &index)?;

    let backup = layout.backup_path();
    match fs::copy(layout.legacy_path(), &backup) {
        Ok(_) => report.backup = Some(backup),
        Err(source) => {
            let err = DomainError::FileWrite { path: backup, source };
            tracing::warn!(error = %err, "failed to back up legacy verification store");
        }
    }

    tracing::info!(
        migrated = report.migrated.len(),
        failed = report.failed.len(),
        "migrated legacy verification store"
    );
    Ok((index, report))
}
