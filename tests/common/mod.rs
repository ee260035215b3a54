//! Common test utilities for integration tests
//!
//! In-memory fakes for every port, so services can be exercised without git,
//! an agent binary or real check commands.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use attestor::domain::errors::{DomainError, DomainResult};
use attestor::domain::models::{
    AutomatedCheckResult, CapabilitySnapshot, CheckType, CommandCapability, ChecksConfig,
};
use attestor::domain::ports::{
    AgentProvider, AgentRequest, AgentResponse, CapabilityDiscovery, CheckExecutor, Clock,
    DiscoveredCapabilities, VersionControl,
};
use attestor::services::capability_cache::{
    CapabilityCache, DiskCapabilityCache, MemoryCapabilityCache,
};
use attestor::services::{
    CheckRunner, JudgmentService, OrchestratorSettings, VerificationOrchestrator,
    VerificationStore,
};
use tempfile::TempDir;

pub const STATE_DIR: &str = ".attestor";

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write `content` to `relative` under `root`, creating parent directories
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Version control with scripted answers.
pub struct FakeVcs {
    pub head: Mutex<Option<String>>,
    pub changed: Mutex<Vec<String>>,
    pub diff: Mutex<String>,
    /// Answer to `diff_name_only`; `Err` simulates a failing git.
    pub tracked_diff: Mutex<Result<Vec<String>, String>>,
}

impl FakeVcs {
    pub fn at(head: &str) -> Self {
        Self {
            head: Mutex::new(Some(head.to_string())),
            changed: Mutex::new(Vec::new()),
            diff: Mutex::new(String::new()),
            tracked_diff: Mutex::new(Ok(Vec::new())),
        }
    }

    pub fn with_changes(self, files: &[&str], diff: &str) -> Self {
        *self.changed.lock().unwrap() = files.iter().map(ToString::to_string).collect();
        *self.diff.lock().unwrap() = diff.to_string();
        self
    }

    pub fn move_head(&self, head: &str) {
        *self.head.lock().unwrap() = Some(head.to_string());
    }

    pub fn touch_tracked(&self, files: &[&str]) {
        *self.tracked_diff.lock().unwrap() = Ok(files.iter().map(ToString::to_string).collect());
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn current_commit_hash(&self, _cwd: &Path) -> Option<String> {
        self.head.lock().unwrap().clone()
    }

    async fn diff_name_only(
        &self,
        _cwd: &Path,
        _from_ref: &str,
        _to_ref: &str,
        _path_scope: &[String],
    ) -> DomainResult<Vec<String>> {
        self.tracked_diff
            .lock()
            .unwrap()
            .clone()
            .map_err(DomainError::ExecutionFailed)
    }

    async fn changed_files(&self, _cwd: &Path) -> Vec<String> {
        self.changed.lock().unwrap().clone()
    }

    async fn diff(&self, _cwd: &Path) -> DomainResult<String> {
        Ok(self.diff.lock().unwrap().clone())
    }
}

/// Discovery returning a fixed snapshot and counting calls.
pub struct FakeDiscovery {
    pub snapshot: CapabilitySnapshot,
    pub config_files: Vec<String>,
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl FakeDiscovery {
    pub fn new(snapshot: CapabilitySnapshot, config_files: &[&str]) -> Self {
        Self {
            snapshot,
            config_files: config_files.iter().map(ToString::to_string).collect(),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(CapabilitySnapshot::empty(), &[])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapabilityDiscovery for FakeDiscovery {
    fn name(&self) -> &str {
        "fake"
    }

    async fn discover(&self, _cwd: &Path) -> DomainResult<DiscoveredCapabilities> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DomainError::CapabilityDiscovery("discovery exploded".into()));
        }
        Ok(DiscoveredCapabilities {
            snapshot: self.snapshot.clone(),
            config_files: self.config_files.clone(),
        })
    }
}

/// Agent answering from a queue; an empty queue answers with a failure.
#[derive(Default)]
pub struct FakeAgent {
    pub responses: Mutex<VecDeque<AgentResponse>>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeAgent {
    pub fn answering(responses: Vec<AgentResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentProvider for FakeAgent {
    fn name(&self) -> &str {
        "fake-agent"
    }

    async fn ask(&self, request: AgentRequest) -> AgentResponse {
        self.prompts.lock().unwrap().push(request.prompt);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| AgentResponse::failed("no scripted response"))
    }
}

/// Check executor with per-type outcomes, recording every command.
#[derive(Default)]
pub struct FakeExecutor {
    pub failing: Mutex<HashMap<CheckType, String>>,
    pub commands: Mutex<Vec<(CheckType, String)>>,
}

impl FakeExecutor {
    pub fn failing_on(check_type: CheckType, output: &str) -> Self {
        let executor = Self::default();
        executor
            .failing
            .lock()
            .unwrap()
            .insert(check_type, output.to_string());
        executor
    }

    pub fn commands(&self) -> Vec<(CheckType, String)> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckExecutor for FakeExecutor {
    async fn run(
        &self,
        _cwd: &Path,
        check_type: CheckType,
        command: &str,
        _env: &[(String, String)],
    ) -> AutomatedCheckResult {
        self.commands
            .lock()
            .unwrap()
            .push((check_type, command.to_string()));
        match self.failing.lock().unwrap().get(&check_type) {
            Some(output) => AutomatedCheckResult {
                check_type,
                success: false,
                duration: Some(3),
                error_count: Some(1),
                output: Some(output.clone()),
            },
            None => AutomatedCheckResult {
                check_type,
                success: true,
                duration: Some(3),
                error_count: Some(0),
                output: Some("ok".to_string()),
            },
        }
    }
}

/// Clock advanced by hand.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn at(millis: u64) -> Self {
        Self {
            now: AtomicU64::new(millis),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A vitest project with typecheck and lint.
pub fn node_snapshot() -> CapabilitySnapshot {
    let mut snapshot = CapabilitySnapshot::empty();
    snapshot.test = CommandCapability::with_command("npm test", Some("vitest"));
    snapshot.typecheck = CommandCapability::with_command("npx tsc --noEmit", Some("tsc"));
    snapshot.lint = CommandCapability::with_command("npm run lint", Some("eslint"));
    snapshot.languages = vec!["typescript".into()];
    snapshot
}

/// Cache over the fakes with a manual clock and the default TTL.
pub fn capability_cache(
    vcs: Arc<FakeVcs>,
    discovery: Arc<FakeDiscovery>,
    clock: Arc<ManualClock>,
) -> CapabilityCache {
    CapabilityCache::new(
        MemoryCapabilityCache::new(clock, 60_000),
        DiskCapabilityCache::new(STATE_DIR),
        vcs,
        discovery,
    )
}

/// Everything an orchestrator test needs to inspect afterwards.
pub struct Harness {
    pub vcs: Arc<FakeVcs>,
    pub discovery: Arc<FakeDiscovery>,
    pub agent: Arc<FakeAgent>,
    pub executor: Arc<FakeExecutor>,
    pub store: Arc<VerificationStore>,
    pub orchestrator: VerificationOrchestrator,
}

impl Harness {
    pub fn new(
        vcs: FakeVcs,
        discovery: FakeDiscovery,
        agent: FakeAgent,
        executor: FakeExecutor,
        strict_tdd: bool,
    ) -> Self {
        let vcs = Arc::new(vcs);
        let discovery = Arc::new(discovery);
        let agent = Arc::new(agent);
        let executor = Arc::new(executor);
        let store = Arc::new(VerificationStore::new(STATE_DIR));
        let cache = Arc::new(capability_cache(
            vcs.clone(),
            discovery.clone(),
            Arc::new(ManualClock::at(0)),
        ));
        let orchestrator = VerificationOrchestrator::new(
            cache,
            vcs.clone(),
            CheckRunner::new(executor.clone(), &ChecksConfig::default()),
            JudgmentService::new(agent.clone(), Duration::from_secs(5), 10_000),
            store.clone(),
            OrchestratorSettings {
                strict_tdd,
                ..OrchestratorSettings::default()
            },
        );
        Self {
            vcs,
            discovery,
            agent,
            executor,
            store,
            orchestrator,
        }
    }
}
