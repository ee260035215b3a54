//! Project verification capabilities.
//!
//! A [`CapabilitySnapshot`] records how a project is tested, type-checked,
//! linted and built. Snapshots are produced by a discovery provider and
//! cached in memory and on disk (see `services::capability_cache`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written into every [`DiskCacheEnvelope`].
///
/// An envelope carrying any other version is ignored wholesale.
pub const CAPABILITY_CACHE_VERSION: &str = "1.0.0";

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapabilitySource {
    /// Served from the memory or disk cache.
    Cached,
    /// Produced by a fresh discovery run.
    #[default]
    Discovered,
}

/// Availability and invocation of a single verification command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandCapability {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Tool or framework behind the command (`vitest`, `cargo`, `tsc`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

impl CommandCapability {
    /// An available capability backed by `command`.
    pub fn with_command(command: impl Into<String>, framework: Option<&str>) -> Self {
        Self {
            available: true,
            command: Some(command.into()),
            framework: framework.map(str::to_string),
        }
    }

    /// The command to run, if the capability is available and has one.
    pub fn runnable_command(&self) -> Option<&str> {
        if !self.available {
            return None;
        }
        self.command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// End-to-end test capability.
///
/// `grep_template` and `file_template` describe how to narrow the run:
/// `{tags}` and `{files}` are substituted respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct E2eCapability {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grep_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_template: Option<String>,
}

/// A project-specific verification rule discovered alongside the standard
/// capabilities (for example a schema check or a license scan).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Discovered or cached facts about how to verify a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySnapshot {
    #[serde(default)]
    pub test: CommandCapability,
    #[serde(default)]
    pub typecheck: CommandCapability,
    #[serde(default)]
    pub lint: CommandCapability,
    #[serde(default)]
    pub build: CommandCapability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e2e: Option<E2eCapability>,
    #[serde(default)]
    pub custom_rules: Vec<CustomRule>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub source: CapabilitySource,
    pub detected_at: DateTime<Utc>,
}

impl CapabilitySnapshot {
    /// A snapshot with nothing available.
    pub fn empty() -> Self {
        Self {
            test: CommandCapability::default(),
            typecheck: CommandCapability::default(),
            lint: CommandCapability::default(),
            build: CommandCapability::default(),
            e2e: None,
            custom_rules: Vec::new(),
            languages: Vec::new(),
            source: CapabilitySource::Discovered,
            detected_at: Utc::now(),
        }
    }

    /// Detected test framework, parsed from the test capability.
    pub fn test_framework(&self) -> TestFramework {
        self.test
            .framework
            .as_deref()
            .map_or(TestFramework::Unknown, TestFramework::from_name)
    }

    /// Copy of this snapshot tagged as served from cache.
    pub fn as_cached(&self) -> Self {
        Self {
            source: CapabilitySource::Cached,
            ..self.clone()
        }
    }
}

/// Test frameworks with known selective-execution idioms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestFramework {
    Vitest,
    Jest,
    Mocha,
    Pytest,
    GoTest,
    Cargo,
    Unknown,
}

impl TestFramework {
    /// Parse a framework name as reported by discovery.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "vitest" => Self::Vitest,
            "jest" => Self::Jest,
            "mocha" => Self::Mocha,
            "pytest" => Self::Pytest,
            "go" | "gotest" | "go test" => Self::GoTest,
            "cargo" | "cargo test" | "rust" => Self::Cargo,
            _ => Self::Unknown,
        }
    }

    /// Whether individual test files can be passed as arguments.
    pub const fn accepts_file_arguments(self) -> bool {
        matches!(
            self,
            Self::Vitest | Self::Jest | Self::Mocha | Self::Pytest | Self::GoTest | Self::Cargo
        )
    }
}

/// Persisted wrapper around a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskCacheEnvelope {
    pub version: String,
    pub capabilities: CapabilitySnapshot,
    #[serde(default)]
    pub commit_hash: Option<String>,
    /// Config files whose changes invalidate the cache.
    #[serde(default)]
    pub tracked_files: Vec<String>,
}

impl DiskCacheEnvelope {
    /// Wrap a snapshot with the current schema version.
    pub fn new(
        capabilities: CapabilitySnapshot,
        commit_hash: Option<String>,
        tracked_files: Vec<String>,
    ) -> Self {
        Self {
            version: CAPABILITY_CACHE_VERSION.to_string(),
            capabilities,
            commit_hash,
            tracked_files,
        }
    }
}
