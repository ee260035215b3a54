//! Version control port - facts about the working tree.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Read-only access to version control state.
///
/// Implementations shell out to git (see `infrastructure::git`); tests use
/// in-memory fakes.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Current `HEAD` commit, or `None` when it cannot be determined.
    async fn current_commit_hash(&self, cwd: &Path) -> Option<String>;

    /// Paths changed between two refs, limited to `path_scope` when non-empty.
    async fn diff_name_only(
        &self,
        cwd: &Path,
        from_ref: &str,
        to_ref: &str,
        path_scope: &[String],
    ) -> DomainResult<Vec<String>>;

    /// Staged, unstaged and last-commit changes, de-duplicated.
    async fn changed_files(&self, cwd: &Path) -> Vec<String>;

    /// Textual diff of the pending change (working tree, or last commit when clean).
    async fn diff(&self, cwd: &Path) -> DomainResult<String>;
}
