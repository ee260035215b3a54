//! Git-backed [`VersionControl`] provider.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::VersionControl;

/// Shells out to the `git` binary on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub const fn new() -> Self {
        Self
    }

    /// Run git in `cwd`, returning stdout on success.
    async fn run(cwd: &Path, args: &[&str]) -> DomainResult<String> {
        let output = Command::new("git")
            .current_dir(cwd)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DomainError::ExecutionFailed(format!("failed to spawn git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(?args, stderr = %stderr.trim(), "git command failed");
            return Err(DomainError::ExecutionFailed(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn names(cwd: &Path, args: &[&str]) -> Vec<String> {
        match Self::run(cwd, args).await {
            Ok(out) => out
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn current_commit_hash(&self, cwd: &Path) -> Option<String> {
        Self::run(cwd, &["rev-parse", "HEAD"])
            .await
            .ok()
            .map(|out| out.trim().to_string())
            .filter(|hash| !hash.is_empty())
    }

    async fn diff_name_only(
        &self,
        cwd: &Path,
        from_ref: &str,
        to_ref: &str,
        path_scope: &[String],
    ) -> DomainResult<Vec<String>> {
        let mut args = vec!["diff", "--name-only", from_ref, to_ref];
        if !path_scope.is_empty() {
            args.push("--");
            args.extend(path_scope.iter().map(String::as_str));
        }
        let out = Self::run(cwd, &args).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn changed_files(&self, cwd: &Path) -> Vec<String> {
        let (staged, unstaged, last_commit) = tokio::join!(
            Self::names(cwd, &["diff", "--name-only", "--cached"]),
            Self::names(cwd, &["diff", "--name-only"]),
            Self::names(cwd, &["diff", "--name-only", "HEAD~1", "HEAD"]),
        );

        let mut files: Vec<String> = Vec::new();
        for file in staged.into_iter().chain(unstaged).chain(last_commit) {
            if !files.contains(&file) {
                files.push(file);
            }
        }
        debug!(count = files.len(), "collected changed files");
        files
    }

    async fn diff(&self, cwd: &Path) -> DomainResult<String> {
        let pending = Self::run(cwd, &["diff", "HEAD"]).await?;
        if !pending.trim().is_empty() {
            return Ok(pending);
        }
        // Clean tree: fall back to the last commit, absent on a root commit.
        Ok(Self::run(cwd, &["diff", "HEAD~1", "HEAD"])
            .await
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .await
            .is_ok_and(|o| o.status.success())
    }

    async fn git(cwd: &Path, args: &[&str]) {
        let status = Command::new("git")
            .current_dir(cwd)
            .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    #[tokio::test]
    async fn outside_a_repository_everything_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = GitCli::new();
        assert_eq!(vcs.current_commit_hash(dir.path()).await, None);
        assert!(vcs.changed_files(dir.path()).await.is_empty());
        assert!(vcs
            .diff_name_only(dir.path(), "HEAD~1", "HEAD", &[])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn reports_commits_and_scoped_diffs() {
        if !git_available().await {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        git(root, &["init", "-q"]).await;
        std::fs::write(root.join("package.json"), "{}").unwrap();
        std::fs::write(root.join("index.ts"), "export {}").unwrap();
        git(root, &["add", "."]).await;
        git(root, &["commit", "-q", "-m", "init"]).await;

        let vcs = GitCli::new();
        let first = vcs.current_commit_hash(root).await.unwrap();
        assert_eq!(first.len(), 40);

        std::fs::write(root.join("index.ts"), "export const a = 1").unwrap();
        std::fs::write(root.join("scratch.ts"), "untracked").unwrap();
        // Untracked files are not part of the change set.
        assert_eq!(vcs.changed_files(root).await, vec!["index.ts"]);
        assert!(vcs.diff(root).await.unwrap().contains("export const a = 1"));

        git(root, &["commit", "-q", "-am", "change"]).await;
        let second = vcs.current_commit_hash(root).await.unwrap();
        assert_ne!(first, second);

        let scoped = vcs
            .diff_name_only(root, &first, &second, &["package.json".to_string()])
            .await
            .unwrap();
        assert!(scoped.is_empty());
        let all = vcs.diff_name_only(root, &first, &second, &[]).await.unwrap();
        assert_eq!(all, vec!["index.ts"]);
    }
}
