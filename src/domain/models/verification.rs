//! Verification results, per-run metadata and the summary index.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version of the verification index and legacy store.
pub const VERIFICATION_STORE_VERSION: &str = "1.0.0";

/// Outcome of one verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    NeedsReview,
}

impl Verdict {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::NeedsReview => "needs_review",
        }
    }

    /// Parse a verdict as written by an agent. Accepts a few spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "pass" | "passed" => Some(Self::Pass),
            "fail" | "failed" => Some(Self::Fail),
            "needs_review" | "review" => Some(Self::NeedsReview),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of automated check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    Test,
    Typecheck,
    Lint,
    Build,
    E2e,
    Custom,
}

impl CheckType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Typecheck => "typecheck",
            Self::Lint => "lint",
            Self::Build => "build",
            Self::E2e => "e2e",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for CheckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one automated check command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomatedCheckResult {
    #[serde(rename = "type")]
    pub check_type: CheckType,
    pub success: bool,
    /// Wall-clock duration in milliseconds.
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub error_count: Option<u32>,
    #[serde(default)]
    pub output: Option<String>,
}

impl AutomatedCheckResult {
    /// A failed check that never produced output (spawn error, timeout).
    pub fn failed(check_type: CheckType, message: impl Into<String>, duration: Option<u64>) -> Self {
        Self {
            check_type,
            success: false,
            duration,
            error_count: None,
            output: Some(message.into()),
        }
    }
}

/// Judgment of one acceptance criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionResult {
    pub criterion: String,
    pub index: usize,
    pub satisfied: bool,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// One full verification outcome for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub feature_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub changed_files: Vec<String>,
    #[serde(default)]
    pub diff_summary: String,
    #[serde(default)]
    pub automated_checks: Vec<AutomatedCheckResult>,
    #[serde(default)]
    pub criteria_results: Vec<CriterionResult>,
    pub verdict: Verdict,
    pub verified_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_quality_notes: Vec<String>,
}

/// An automated check without its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactCheck {
    #[serde(rename = "type")]
    pub check_type: CheckType,
    pub success: bool,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub error_count: Option<u32>,
}

/// A criterion judgment without reasoning or evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactCriterion {
    pub criterion: String,
    pub index: usize,
    pub satisfied: bool,
    pub confidence: f64,
}

/// Storage-efficient projection of a [`VerificationResult`] for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMetadata {
    pub feature_id: String,
    pub run_number: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub changed_files: Vec<String>,
    #[serde(default)]
    pub automated_checks: Vec<CompactCheck>,
    #[serde(default)]
    pub criteria_results: Vec<CompactCriterion>,
    pub verdict: Verdict,
    pub verified_by: String,
}

impl VerificationMetadata {
    /// Compact a full result into run `run_number`'s metadata.
    pub fn from_result(result: &VerificationResult, run_number: u32) -> Self {
        Self {
            feature_id: result.feature_id.clone(),
            run_number,
            timestamp: result.timestamp,
            commit_hash: result.commit_hash.clone(),
            changed_files: result.changed_files.clone(),
            automated_checks: result
                .automated_checks
                .iter()
                .map(|c| CompactCheck {
                    check_type: c.check_type,
                    success: c.success,
                    duration: c.duration,
                    error_count: c.error_count,
                })
                .collect(),
            criteria_results: result
                .criteria_results
                .iter()
                .map(|c| CompactCriterion {
                    criterion: c.criterion.clone(),
                    index: c.index,
                    satisfied: c.satisfied,
                    confidence: c.confidence,
                })
                .collect(),
            verdict: result.verdict,
            verified_by: result.verified_by.clone(),
        }
    }

    /// Rebuild a result from metadata alone. Free-text fields come back empty.
    pub fn to_result(&self) -> VerificationResult {
        VerificationResult {
            feature_id: self.feature_id.clone(),
            timestamp: self.timestamp,
            commit_hash: self.commit_hash.clone(),
            changed_files: self.changed_files.clone(),
            diff_summary: String::new(),
            automated_checks: self
                .automated_checks
                .iter()
                .map(|c| AutomatedCheckResult {
                    check_type: c.check_type,
                    success: c.success,
                    duration: c.duration,
                    error_count: c.error_count,
                    output: None,
                })
                .collect(),
            criteria_results: self
                .criteria_results
                .iter()
                .map(|c| CriterionResult {
                    criterion: c.criterion.clone(),
                    index: c.index,
                    satisfied: c.satisfied,
                    confidence: c.confidence,
                    reasoning: String::new(),
                    evidence: Vec::new(),
                })
                .collect(),
            verdict: self.verdict,
            verified_by: self.verified_by.clone(),
            overall_reasoning: None,
            suggestions: Vec::new(),
            code_quality_notes: Vec::new(),
        }
    }
}

/// Aggregate verification state of one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSummary {
    pub feature_id: String,
    pub latest_run: u32,
    pub latest_timestamp: DateTime<Utc>,
    pub latest_verdict: Verdict,
    pub total_runs: u32,
    pub pass_count: u32,
    pub fail_count: u32,
}

impl FeatureSummary {
    /// Summary of a feature whose only run is `metadata`.
    pub fn first_run(metadata: &VerificationMetadata) -> Self {
        let mut summary = Self {
            feature_id: metadata.feature_id.clone(),
            latest_run: 0,
            latest_timestamp: metadata.timestamp,
            latest_verdict: metadata.verdict,
            total_runs: 0,
            pass_count: 0,
            fail_count: 0,
        };
        summary.record(metadata);
        summary
    }

    /// Fold the next run into the summary.
    ///
    /// `needs_review` increments neither the pass nor the fail count.
    pub fn record(&mut self, metadata: &VerificationMetadata) {
        self.total_runs += 1;
        self.latest_run = metadata.run_number;
        self.latest_timestamp = metadata.timestamp;
        self.latest_verdict = metadata.verdict;
        match metadata.verdict {
            Verdict::Pass => self.pass_count += 1,
            Verdict::Fail => self.fail_count += 1,
            Verdict::NeedsReview => {}
        }
    }

    /// Whether the summary obeys the run numbering invariants.
    pub const fn is_consistent(&self) -> bool {
        self.latest_run == self.total_runs && self.pass_count + self.fail_count <= self.total_runs
    }
}

/// Summary-only view over all features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationIndex {
    #[serde(default)]
    pub features: BTreeMap<String, FeatureSummary>,
    pub updated_at: DateTime<Utc>,
    pub version: String,
}

impl VerificationIndex {
    pub fn empty() -> Self {
        Self {
            features: BTreeMap::new(),
            updated_at: Utc::now(),
            version: VERIFICATION_STORE_VERSION.to_string(),
        }
    }

    /// Run number the next save of `feature_id` will use.
    pub fn next_run_number(&self, feature_id: &str) -> u32 {
        self.features
            .get(feature_id)
            .map_or(1, |s| s.latest_run.saturating_add(1))
    }

    /// Count features by their latest verdict.
    pub fn stats(&self) -> VerificationStats {
        let mut stats = VerificationStats {
            total: self.features.len(),
            ..VerificationStats::default()
        };
        for summary in self.features.values() {
            match summary.latest_verdict {
                Verdict::Pass => stats.passing += 1,
                Verdict::Fail => stats.failing += 1,
                Verdict::NeedsReview => stats.needs_review += 1,
            }
        }
        stats
    }
}

/// Flat single-file store kept for backward-compatible reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyStore {
    #[serde(default)]
    pub results: BTreeMap<String, VerificationResult>,
    pub updated_at: DateTime<Utc>,
    pub version: String,
}

impl LegacyStore {
    pub fn empty() -> Self {
        Self {
            results: BTreeMap::new(),
            updated_at: Utc::now(),
            version: VERIFICATION_STORE_VERSION.to_string(),
        }
    }
}

/// Feature counts by latest verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStats {
    pub total: usize,
    pub passing: usize,
    pub failing: usize,
    pub needs_review: usize,
}
