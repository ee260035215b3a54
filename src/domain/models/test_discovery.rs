//! Test discovery result types.

use serde::{Deserialize, Serialize};

/// Which rule of the discovery cascade produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoverySource {
    Explicit,
    AutoDetected,
    ModuleBased,
    None,
}

impl DiscoverySource {
    /// Confidence is a fixed function of the source.
    pub const fn confidence(self) -> f64 {
        match self {
            Self::Explicit => 1.0,
            Self::AutoDetected => 0.9,
            Self::ModuleBased => 0.6,
            Self::None => 0.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::AutoDetected => "auto-detected",
            Self::ModuleBased => "module-based",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tests selected as relevant to a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDiscoveryResult {
    pub pattern: Option<String>,
    pub source: DiscoverySource,
    /// Ordered, de-duplicated test file paths relative to the project root.
    pub test_files: Vec<String>,
    pub confidence: f64,
}

impl TestDiscoveryResult {
    /// Build a result whose confidence is derived from `source`.
    pub fn new(source: DiscoverySource, pattern: Option<String>, test_files: Vec<String>) -> Self {
        Self {
            pattern,
            source,
            test_files,
            confidence: source.confidence(),
        }
    }

    /// Nothing could be selected; run the full suite.
    pub fn none() -> Self {
        Self::new(DiscoverySource::None, None, Vec::new())
    }

    pub fn is_selective(&self) -> bool {
        self.source != DiscoverySource::None
    }
}
