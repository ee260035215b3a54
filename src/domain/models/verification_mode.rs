//! Modes and phases of a verification run.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// How the verdict of a run is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Verdict follows automated test pass/fail; no agent is consulted.
    Tdd,
    /// Verdict comes from an AI agent reviewing diff and check outcomes.
    Ai,
}

impl VerificationMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tdd => "tdd",
            Self::Ai => "ai",
        }
    }
}

/// How much of the unit test suite to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// The capability's full test command.
    Full,
    /// Only tests selected by discovery.
    #[default]
    Quick,
    /// No unit tests.
    Skip,
}

impl std::str::FromStr for TestMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "quick" => Ok(Self::Quick),
            "skip" => Ok(Self::Skip),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown test mode '{other}' (expected full, quick or skip)"
            ))),
        }
    }
}

/// Which end-to-end tests to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "tags")]
pub enum E2eMode {
    Full,
    SmokeOnly,
    TagFiltered(Vec<String>),
}

/// Tag used for the smoke subset of end-to-end tests.
pub const SMOKE_TAG: &str = "@smoke";

impl E2eMode {
    /// Choose the E2E mode from caller intent and the feature's tags.
    pub fn select(full_requested: bool, feature_tags: &[String]) -> Self {
        if full_requested {
            Self::Full
        } else if feature_tags.is_empty() {
            Self::SmokeOnly
        } else {
            Self::TagFiltered(feature_tags.to_vec())
        }
    }

    /// Tags to filter on, if any.
    pub fn tags(&self) -> Option<Vec<String>> {
        match self {
            Self::Full => None,
            Self::SmokeOnly => Some(vec![SMOKE_TAG.to_string()]),
            Self::TagFiltered(tags) => Some(tags.clone()),
        }
    }
}

/// Phases of the verification state machine, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationPhase {
    SelectingMode,
    GatheringContext,
    ExecutingChecks,
    Judging,
    Persisting,
    Done,
}

impl VerificationPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelectingMode => "selecting-mode",
            Self::GatheringContext => "gathering-context",
            Self::ExecutingChecks => "executing-checks",
            Self::Judging => "judging",
            Self::Persisting => "persisting",
            Self::Done => "done",
        }
    }

    /// Whether `next` may follow `self`.
    ///
    /// Only `executing-checks` may be omitted (gathering-context → judging).
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::SelectingMode, Self::GatheringContext)
                | (Self::GatheringContext, Self::ExecutingChecks | Self::Judging)
                | (Self::ExecutingChecks, Self::Judging)
                | (Self::Judging, Self::Persisting)
                | (Self::Persisting, Self::Done)
        )
    }
}

impl std::fmt::Display for VerificationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records the phases a run passes through and rejects out-of-order moves.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: VerificationPhase,
    visited: Vec<VerificationPhase>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: VerificationPhase::SelectingMode,
            visited: vec![VerificationPhase::SelectingMode],
        }
    }

    pub const fn current(&self) -> VerificationPhase {
        self.current
    }

    pub fn visited(&self) -> &[VerificationPhase] {
        &self.visited
    }

    pub fn advance(&mut self, next: VerificationPhase) -> DomainResult<()> {
        if !self.current.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.current.to_string(),
                to: next.to_string(),
                reason: "verification phases must run in order".to_string(),
            });
        }
        tracing::debug!(from = %self.current, to = %next, "verification phase transition");
        self.current = next;
        self.visited.push(next);
        Ok(())
    }

    pub fn into_visited(self) -> Vec<VerificationPhase> {
        self.visited
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
