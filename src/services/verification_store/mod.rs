//! Durable, append-only verification history.
//!
//! Each run of a feature gets a numbered metadata file and a markdown report
//! under the feature's directory; `index.json` summarises every feature.
//! After each primary write the configured [`CompatibilityWriter`]s run, by
//! default keeping the legacy `results.json` in sync for older readers.
//!
//! Writers serialise on an advisory lock so the next run number is reserved
//! atomically across processes.

pub mod layout;
pub mod legacy;
pub mod lock;
pub mod migration;
pub mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::instrument;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    FeatureSummary, VerificationIndex, VerificationMetadata, VerificationResult,
    VerificationStats,
};
use crate::services::persistence::{
    ensure_dir, read_json, remove_dir_if_exists, write_atomic, write_json, ReadOutcome,
};

pub use layout::{feature_dir_name, recorded_runs, run_id, StoreLayout};
pub use legacy::{read_legacy, LegacyStoreWriter};
pub use lock::{StoreLock, LOCK_TIMEOUT};
pub use migration::MigrationReport;

/// A secondary representation updated after every primary write.
pub trait CompatibilityWriter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Record a freshly saved result.
    fn record(&self, layout: &StoreLayout, result: &VerificationResult) -> DomainResult<()>;

    /// Drop everything recorded for `feature_id`.
    fn forget(&self, layout: &StoreLayout, feature_id: &str) -> DomainResult<()>;
}

/// Verification history for projects rooted anywhere on disk.
pub struct VerificationStore {
    state_dir: PathBuf,
    compatibility: Vec<Arc<dyn CompatibilityWriter>>,
    lock_timeout: Duration,
}

impl VerificationStore {
    /// Store keeping state in `state_dir` with the legacy dual-write enabled.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            compatibility: vec![Arc::new(LegacyStoreWriter)],
            lock_timeout: LOCK_TIMEOUT,
        }
    }

    /// Replace the compatibility writers.
    #[must_use]
    pub fn with_compatibility(mut self, writers: Vec<Arc<dyn CompatibilityWriter>>) -> Self {
        self.compatibility = writers;
        self
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn layout(&self, project: &Path) -> StoreLayout {
        StoreLayout::new(project, &self.state_dir)
    }

    fn lock(&self, layout: &StoreLayout) -> DomainResult<StoreLock> {
        StoreLock::acquire(&layout.lock_path(), self.lock_timeout)
    }

    /// Append `result` as the feature's next run and return its run number.
    ///
    /// Run files are written before the index, so the index never references
    /// a run that is not on disk. The next number is past both the index and
    /// the run files already on disk, so an index that lost a feature never
    /// hands out a used number. Any write failure propagates.
    #[instrument(skip(self, result), fields(feature = %result.feature_id, verdict = %result.verdict))]
    pub fn save(&self, project: &Path, result: &VerificationResult) -> DomainResult<u32> {
        let layout = self.layout(project);
        ensure_dir(layout.root())?;
        let _lock = self.lock(&layout)?;

        let mut index = self.load_index_locked(&layout)?;
        let feature_id = result.feature_id.as_str();
        let on_disk = recorded_runs(&layout.feature_dir(feature_id))?;
        if !index.features.contains_key(feature_id) {
            if let Some(summary) = rebuild_summary(&layout, feature_id, &on_disk) {
                tracing::warn!(
                    runs = on_disk.len(),
                    "index lost feature; rebuilt summary from run files"
                );
                index.features.insert(feature_id.to_string(), summary);
            }
        }
        let run = index
            .next_run_number(feature_id)
            .max(on_disk.last().map_or(1, |last| last.saturating_add(1)));
        let metadata = VerificationMetadata::from_result(result, run);

        ensure_dir(&layout.feature_dir(feature_id))?;
        write_json(&layout.metadata_path(feature_id, run), &metadata)?;
        write_atomic(
            &layout.report_path(feature_id, run),
            &report::render_report(result, run),
        )?;

        index
            .features
            .entry(feature_id.to_string())
            .and_modify(|summary| summary.record(&metadata))
            .or_insert_with(|| FeatureSummary::first_run(&metadata));
        index.updated_at = Utc::now();
        write_json(&layout.index_path(), &index)?;

        for writer in &self.compatibility {
            writer.record(&layout, result)?;
        }

        tracing::info!(run = %run_id(run), "saved verification run");
        Ok(run)
    }

    /// The summary index, migrating a legacy store on first read.
    ///
    /// A corrupt index reads as empty and is replaced by the next save.
    pub fn load_index(&self, project: &Path) -> DomainResult<VerificationIndex> {
        let layout = self.layout(project);
        match read_json::<VerificationIndex>(&layout.index_path()) {
            ReadOutcome::Loaded(index) => Ok(index),
            ReadOutcome::Corrupt(reason) => {
                tracing::warn!(%reason, "verification index is corrupt; treating as empty");
                Ok(VerificationIndex::empty())
            }
            ReadOutcome::Missing => {
                if !layout.legacy_path().exists() {
                    return Ok(VerificationIndex::empty());
                }
                let _lock = self.lock(&layout)?;
                self.load_index_locked(&layout)
            }
        }
    }

    /// Index load for callers already holding the lock.
    fn load_index_locked(&self, layout: &StoreLayout) -> DomainResult<VerificationIndex> {
        match read_json::<VerificationIndex>(&layout.index_path()) {
            ReadOutcome::Loaded(index) => Ok(index),
            ReadOutcome::Corrupt(reason) => {
                tracing::warn!(%reason, "verification index is corrupt; treating as empty");
                Ok(VerificationIndex::empty())
            }
            ReadOutcome::Missing => match read_legacy(&layout.legacy_path()) {
                Some(legacy) => Ok(migration::migrate_legacy(layout, &legacy)?.0),
                None => Ok(VerificationIndex::empty()),
            },
        }
    }

    /// Migrate the legacy store explicitly.
    ///
    /// Returns `None` when there is nothing to do: an index already exists
    /// or no legacy store is present.
    pub fn migrate(&self, project: &Path) -> DomainResult<Option<MigrationReport>> {
        let layout = self.layout(project);
        if layout.index_path().exists() || !layout.legacy_path().exists() {
            return Ok(None);
        }
        let _lock = self.lock(&layout)?;
        if layout.index_path().exists() {
            return Ok(None);
        }
        let Some(legacy) = read_legacy(&layout.legacy_path()) else {
            return Ok(None);
        };
        migration::migrate_legacy(&layout, &legacy).map(|(_, report)| Some(report))
    }

    /// Metadata of one run. Missing or corrupt files read as `None`.
    pub fn get_run(
        &self,
        project: &Path,
        feature_id: &str,
        run: u32,
    ) -> DomainResult<Option<VerificationMetadata>> {
        Ok(read_run(&self.layout(project), feature_id, run))
    }

    /// Metadata of the feature's latest run.
    pub fn get_last_metadata(
        &self,
        project: &Path,
        feature_id: &str,
    ) -> DomainResult<Option<VerificationMetadata>> {
        let index = self.load_index(project)?;
        match index.features.get(feature_id) {
            Some(summary) => self.get_run(project, feature_id, summary.latest_run),
            None => Ok(None),
        }
    }

    /// The feature's latest result.
    ///
    /// The legacy store holds the full result with its free text; it is used
    /// when it matches the latest run. Otherwise the result is rebuilt from
    /// metadata with empty free-text fields.
    pub fn get_last(
        &self,
        project: &Path,
        feature_id: &str,
    ) -> DomainResult<Option<VerificationResult>> {
        let metadata = self.get_last_metadata(project, feature_id)?;
        let full = read_legacy(&self.layout(project).legacy_path())
            .and_then(|mut legacy| legacy.results.remove(feature_id));

        Ok(match (metadata, full) {
            (Some(metadata), Some(full)) if full.timestamp == metadata.timestamp => Some(full),
            (Some(metadata), _) => Some(metadata.to_result()),
            (None, full) => full,
        })
    }

    /// Every recorded run of the feature, oldest first.
    ///
    /// Walks the run files actually on disk up to the indexed latest run.
    pub fn get_history(
        &self,
        project: &Path,
        feature_id: &str,
    ) -> DomainResult<Vec<VerificationMetadata>> {
        let index = self.load_index(project)?;
        let Some(summary) = index.features.get(feature_id) else {
            return Ok(Vec::new());
        };
        let layout = self.layout(project);
        Ok(recorded_runs(&layout.feature_dir(feature_id))?
            .into_iter()
            .filter(|run| *run <= summary.latest_run)
            .filter_map(|run| read_run(&layout, feature_id, run))
            .collect())
    }

    /// Remove all runs of a feature. Returns whether anything was recorded.
    #[instrument(skip(self))]
    pub fn clear(&self, project: &Path, feature_id: &str) -> DomainResult<bool> {
        let layout = self.layout(project);
        ensure_dir(layout.root())?;
        let _lock = self.lock(&layout)?;

        let mut index = self.load_index_locked(&layout)?;
        let existed = index.features.remove(feature_id).is_some();
        remove_dir_if_exists(&layout.feature_dir(feature_id))?;
        if existed {
            index.updated_at = Utc::now();
            write_json(&layout.index_path(), &index)?;
        }
        for writer in &self.compatibility {
            writer.forget(&layout, feature_id)?;
        }

        tracing::info!(existed, "cleared verification history");
        Ok(existed)
    }

    /// Feature counts by latest verdict.
    pub fn stats(&self, project: &Path) -> DomainResult<VerificationStats> {
        Ok(self.load_index(project)?.stats())
    }

    /// Summaries of every tracked feature, ordered by id.
    pub fn list_features(&self, project: &Path) -> DomainResult<Vec<FeatureSummary>> {
        Ok(self.load_index(project)?.features.into_values().collect())
    }
}

/// Metadata of one run. Missing or corrupt files read as `None`.
fn read_run(layout: &StoreLayout, feature_id: &str, run: u32) -> Option<VerificationMetadata> {
    let path = layout.metadata_path(feature_id, run);
    match read_json::<VerificationMetadata>(&path) {
        ReadOutcome::Loaded(metadata) => Some(metadata),
        ReadOutcome::Missing => None,
        ReadOutcome::Corrupt(reason) => {
            tracing::warn!(path = %path.display(), %reason, "skipping corrupt run metadata");
            None
        }
    }
}

/// Fold the readable run files of a feature back into a summary.
fn rebuild_summary(
    layout: &StoreLayout,
    feature_id: &str,
    runs: &[u32],
) -> Option<FeatureSummary> {
    let mut metadata = runs
        .iter()
        .filter_map(|run| read_run(layout, feature_id, *run));
    let mut summary = FeatureSummary::first_run(&metadata.next()?);
    for later in metadata {
        summary.record(&later);
    }
    Some(summary)
}
