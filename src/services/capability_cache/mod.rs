//! Tiered capability cache.
//!
//! Lookup runs through an ordered list of tiers, each a short-circuit on hit:
//!
//! | Tier      | Hit when                                                   |
//! |-----------|------------------------------------------------------------|
//! | Memory    | same project path and age within the TTL                   |
//! | Disk      | envelope version matches and git says it is not stale      |
//! | Discovery | always (the provider is consulted, result written back)    |
//!
//! `force` skips memory and disk and always rediscovers.

pub mod disk;
pub mod memory;
pub mod staleness;

use std::path::Path;
use std::sync::Arc;

use tracing::instrument;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CapabilitySnapshot, DiskCacheEnvelope};
use crate::domain::ports::{CapabilityDiscovery, VersionControl};

pub use disk::{DiskCapabilityCache, CAPABILITIES_FILE};
pub use memory::{MemoryCacheEntry, MemoryCapabilityCache, MEMORY_CACHE_TTL_MS};
pub use staleness::is_stale;

/// Options for [`CapabilityCache::detect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectOptions {
    /// Skip the memory and disk tiers.
    pub force: bool,
    /// Log tier decisions at info instead of debug.
    pub verbose: bool,
}

/// Cache tiers consulted before discovery, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Memory,
    Disk,
}

impl CacheTier {
    pub const LOOKUP_ORDER: [Self; 2] = [Self::Memory, Self::Disk];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Disk => "disk",
        }
    }
}

macro_rules! tier_log {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

/// Supplies "how to test/build/lint this project" to the rest of the system.
pub struct CapabilityCache {
    memory: MemoryCapabilityCache,
    disk: DiskCapabilityCache,
    vcs: Arc<dyn VersionControl>,
    discovery: Arc<dyn CapabilityDiscovery>,
}

impl CapabilityCache {
    pub fn new(
        memory: MemoryCapabilityCache,
        disk: DiskCapabilityCache,
        vcs: Arc<dyn VersionControl>,
        discovery: Arc<dyn CapabilityDiscovery>,
    ) -> Self {
        Self {
            memory,
            disk,
            vcs,
            discovery,
        }
    }

    pub const fn memory(&self) -> &MemoryCapabilityCache {
        &self.memory
    }

    pub const fn disk(&self) -> &DiskCapabilityCache {
        &self.disk
    }

    /// Capabilities of `project`, from the first tier that has them.
    #[instrument(skip(self), fields(project = %project.display()))]
    pub async fn detect(
        &self,
        project: &Path,
        options: DetectOptions,
    ) -> DomainResult<CapabilitySnapshot> {
        if options.force {
            tier_log!(options.verbose, "forced capability rediscovery");
        } else {
            for tier in CacheTier::LOOKUP_ORDER {
                if let Some(snapshot) = self.lookup(tier, project).await {
                    tier_log!(options.verbose, tier = tier.as_str(), "capability cache hit");
                    return Ok(snapshot);
                }
                tier_log!(options.verbose, tier = tier.as_str(), "capability cache miss");
            }
        }

        self.discover_and_store(project, options).await
    }

    async fn lookup(&self, tier: CacheTier, project: &Path) -> Option<CapabilitySnapshot> {
        match tier {
            CacheTier::Memory => self.memory.get(project).map(|s| s.as_cached()),
            CacheTier::Disk => {
                let envelope = self.disk.read(project)?;
                if is_stale(self.vcs.as_ref(), project, &envelope).await {
                    return None;
                }
                let snapshot = envelope.capabilities.as_cached();
                self.memory.put(project, snapshot.clone());
                Some(snapshot)
            }
        }
    }

    async fn discover_and_store(
        &self,
        project: &Path,
        options: DetectOptions,
    ) -> DomainResult<CapabilitySnapshot> {
        tier_log!(
            options.verbose,
            provider = self.discovery.name(),
            "discovering project capabilities"
        );
        let discovered = self.discovery.discover(project).await?;
        let commit_hash = self.vcs.current_commit_hash(project).await;

        let envelope = DiskCacheEnvelope::new(
            discovered.snapshot.clone(),
            commit_hash,
            discovered.config_files,
        );
        if let Err(err) = self.disk.write(project, &envelope) {
            tracing::warn!(error = %err, "failed to persist capability cache");
        }
        self.memory.put(project, discovered.snapshot.clone());

        Ok(discovered.snapshot)
    }

    /// Drop both cached tiers for `project`. Absent files are fine.
    pub fn invalidate(&self, project: &Path) -> DomainResult<()> {
        self.memory.clear();
        self.disk.remove(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::models::{CapabilitySource, CommandCapability};
    use crate::domain::ports::DiscoveredCapabilities;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubVcs {
        head: Mutex<Option<String>>,
        tracked_diff: Mutex<Result<Vec<String>, String>>,
    }

    impl StubVcs {
        fn at(head: &str) -> Self {
            Self {
                head: Mutex::new(Some(head.to_string())),
                tracked_diff: Mutex::new(Ok(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl VersionControl for StubVcs {
        async fn current_commit_hash(&self, _cwd: &Path) -> Option<String> {
            self.head.lock().unwrap().clone()
        }

        async fn diff_name_only(
            &self,
            _cwd: &Path,
            _from: &str,
            _to: &str,
            _scope: &[String],
        ) -> DomainResult<Vec<String>> {
            self.tracked_diff
                .lock()
                .unwrap()
                .clone()
                .map_err(DomainError::ExecutionFailed)
        }

        async fn changed_files(&self, _cwd: &Path) -> Vec<String> {
            Vec::new()
        }

        async fn diff(&self, _cwd: &Path) -> DomainResult<String> {
            Ok(String::new())
        }
    }

    struct CountingDiscovery {
        calls: AtomicUsize,
        config_files: Vec<String>,
    }

    #[async_trait]
    impl CapabilityDiscovery for CountingDiscovery {
        fn name(&self) -> &str {
            "counting"
        }

        async fn discover(&self, _cwd: &Path) -> DomainResult<DiscoveredCapabilities> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut snapshot = CapabilitySnapshot::empty();
            snapshot.test = CommandCapability::with_command("npm test", Some("vitest"));
            Ok(DiscoveredCapabilities {
                snapshot,
                config_files: self.config_files.clone(),
            })
        }
    }

    fn build(vcs: Arc<StubVcs>, tracked: Vec<String>) -> (CapabilityCache, Arc<CountingDiscovery>) {
        let discovery = Arc::new(CountingDiscovery {
            calls: AtomicUsize::new(0),
            config_files: tracked,
        });
        let cache = CapabilityCache::new(
            MemoryCapabilityCache::with_system_clock(),
            DiskCapabilityCache::new(".attestor"),
            vcs,
            discovery.clone(),
        );
        (cache, discovery)
    }

    #[tokio::test]
    async fn discovers_once_then_serves_from_memory() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, discovery) = build(Arc::new(StubVcs::at("aaa")), vec![]);

        let first = cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        assert_eq!(first.source, CapabilitySource::Discovered);
        let second = cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        assert_eq!(second.source, CapabilitySource::Cached);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);
        assert!(cache.disk().path(dir.path()).exists());
    }

    #[tokio::test]
    async fn disk_tier_serves_when_head_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, discovery) = build(Arc::new(StubVcs::at("aaa")), vec![]);
        cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        cache.memory().clear();

        let snapshot = cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        assert_eq!(snapshot.source, CapabilitySource::Cached);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn moved_head_rediscovers_without_tracked_files() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = Arc::new(StubVcs::at("aaa"));
        let (cache, discovery) = build(vcs.clone(), vec![]);
        cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        cache.memory().clear();

        *vcs.head.lock().unwrap() = Some("bbb".into());
        cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn tracked_files_ignore_unrelated_commits() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = Arc::new(StubVcs::at("aaa"));
        let (cache, discovery) = build(vcs.clone(), vec!["package.json".into()]);
        cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        cache.memory().clear();

        *vcs.head.lock().unwrap() = Some("bbb".into());
        cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);

        cache.memory().clear();
        *vcs.tracked_diff.lock().unwrap() = Err("git exploded".into());
        cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn force_skips_cache_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, discovery) = build(Arc::new(StubVcs::at("aaa")), vec![]);
        cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        cache
            .detect(dir.path(), DetectOptions { force: true, verbose: true })
            .await
            .unwrap();
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_clears_both_tiers_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, discovery) = build(Arc::new(StubVcs::at("aaa")), vec![]);
        cache.detect(dir.path(), DetectOptions::default()).await.unwrap();

        cache.invalidate(dir.path()).unwrap();
        cache.invalidate(dir.path()).unwrap();
        assert!(!cache.disk().path(dir.path()).exists());

        cache.detect(dir.path(), DetectOptions::default()).await.unwrap();
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 2);
    }
}
