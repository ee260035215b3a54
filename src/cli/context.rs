//! Wiring of configuration, adapters and services for one CLI invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::domain::models::Config;
use crate::domain::ports::{
    AgentProvider, CapabilityDiscovery, CheckExecutor, SystemClock, VersionControl,
};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::{
    AgentCapabilityDiscovery, AgentCli, GitCli, ManifestCapabilityDiscovery, ShellCheckExecutor,
};
use crate::services::capability_cache::{
    CapabilityCache, DiskCapabilityCache, MemoryCapabilityCache,
};
use crate::services::{
    CheckRunner, JudgmentService, OrchestratorSettings, VerificationOrchestrator,
    VerificationStore,
};

/// Everything a command needs, built from the project's configuration.
pub struct AppContext {
    pub project: PathBuf,
    pub config: Config,
    vcs: Arc<dyn VersionControl>,
    agent: Arc<dyn AgentProvider>,
    pub capabilities: Arc<CapabilityCache>,
    pub store: Arc<VerificationStore>,
}

impl AppContext {
    /// Resolve `project` and build the services for it.
    pub fn load(project: &Path) -> Result<Self> {
        let project = project
            .canonicalize()
            .with_context(|| format!("Project directory not found: {}", project.display()))?;
        let config = ConfigLoader::load(&project).context("Failed to load configuration")?;
        Ok(Self::with_config(project, config))
    }

    /// Build the services for an already-loaded configuration.
    pub fn with_config(project: PathBuf, config: Config) -> Self {
        let vcs: Arc<dyn VersionControl> = Arc::new(GitCli::new());
        let agent: Arc<dyn AgentProvider> = Arc::new(AgentCli::new(&config.agent));

        let discovery: Arc<dyn CapabilityDiscovery> = if config.capabilities.agent_discovery {
            Arc::new(AgentCapabilityDiscovery::new(
                agent.clone(),
                Duration::from_secs(config.agent.timeout_secs),
            ))
        } else {
            Arc::new(ManifestCapabilityDiscovery::new())
        };

        let capabilities = Arc::new(CapabilityCache::new(
            MemoryCapabilityCache::new(Arc::new(SystemClock), config.capabilities.memory_ttl_ms),
            DiskCapabilityCache::new(&config.state_dir),
            vcs.clone(),
            discovery,
        ));
        let store = Arc::new(VerificationStore::new(&config.state_dir));

        Self {
            project,
            config,
            vcs,
            agent,
            capabilities,
            store,
        }
    }

    /// Orchestrator running checks through the shell and judging with the agent.
    pub fn orchestrator(&self) -> VerificationOrchestrator {
        let executor: Arc<dyn CheckExecutor> = Arc::new(ShellCheckExecutor::new(&self.config.checks));
        VerificationOrchestrator::new(
            self.capabilities.clone(),
            self.vcs.clone(),
            CheckRunner::new(executor, &self.config.checks),
            JudgmentService::new(
                self.agent.clone(),
                Duration::from_secs(self.config.agent.timeout_secs),
                self.config.verification.max_diff_chars,
            ),
            self.store.clone(),
            OrchestratorSettings {
                strict_tdd: self.config.verification.strict_tdd,
                default_test_mode: self.config.verification.test_mode,
            },
        )
    }
}
