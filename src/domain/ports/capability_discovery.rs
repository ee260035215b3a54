//! Capability discovery port.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::CapabilitySnapshot;

/// A discovery run's snapshot plus the config files it relied on.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredCapabilities {
    pub snapshot: CapabilitySnapshot,
    /// Project-relative paths; these become the cache's tracked files.
    pub config_files: Vec<String>,
}

/// Works out how to test, typecheck, lint and build a project.
///
/// May take arbitrarily long (an agent exploring the tree); callers bound it
/// with their own timeouts.
#[async_trait]
pub trait CapabilityDiscovery: Send + Sync {
    fn name(&self) -> &str;

    async fn discover(&self, cwd: &Path) -> DomainResult<DiscoveredCapabilities>;
}
