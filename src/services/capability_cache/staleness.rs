//! Git-based staleness of a disk cache envelope.

use std::path::Path;

use crate::domain::models::DiskCacheEnvelope;
use crate::domain::ports::VersionControl;

/// Whether the envelope no longer describes the project.
///
/// - no recorded commit: stale
/// - no tracked files: stale iff `HEAD` moved (an unknown `HEAD` counts as moved)
/// - tracked files: stale iff a diff from the recorded commit to `HEAD`
///   touches any of them (a failed diff counts as touched)
pub async fn is_stale(vcs: &dyn VersionControl, project: &Path, envelope: &DiskCacheEnvelope) -> bool {
    let Some(cached_commit) = envelope.commit_hash.as_deref() else {
        tracing::debug!("capability cache has no commit hash");
        return true;
    };

    if envelope.tracked_files.is_empty() {
        return match vcs.current_commit_hash(project).await {
            Some(current) => current != cached_commit,
            None => {
                tracing::debug!("could not determine HEAD; treating capability cache as stale");
                true
            }
        };
    }

    match vcs
        .diff_name_only(project, cached_commit, "HEAD", &envelope.tracked_files)
        .await
    {
        Ok(changed) => {
            if !changed.is_empty() {
                tracing::debug!(?changed, "tracked config files changed since capture");
            }
            !changed.is_empty()
        }
        Err(err) => {
            tracing::debug!(error = %err, "tracked-file diff failed; treating capability cache as stale");
            true
        }
    }
}
