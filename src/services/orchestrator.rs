//! Verification orchestrator.
//!
//! Drives one feature through
//! `selecting-mode → gathering-context → [executing-checks] → judging → persisting → done`.
//! Every transition goes through a [`PhaseTracker`], so an out-of-order step
//! is an error rather than a silent skip.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AutomatedCheckResult, CapabilitySnapshot, CriterionResult, E2eMode, Feature, PhaseTracker,
    TestMode, Verdict, VerificationMode, VerificationPhase, VerificationResult,
};
use crate::domain::ports::VersionControl;
use crate::services::capability_cache::{CapabilityCache, DetectOptions};
use crate::services::checks::{CheckPlan, CheckRunner};
use crate::services::judgment::{Judgment, JudgmentContext, JudgmentService};
use crate::services::test_discovery::{build_test_command, resolve_test_files, TestDiscovery};
use crate::services::verification_store::VerificationStore;

/// Caller choices for one run.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Omit the executing-checks phase entirely.
    pub skip_checks: bool,
    /// Overrides the configured default.
    pub test_mode: Option<TestMode>,
    pub skip_e2e: bool,
    /// Run the whole E2E suite instead of smoke or tagged tests.
    pub e2e_full: bool,
}

/// Project-level orchestration settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorSettings {
    pub strict_tdd: bool,
    pub default_test_mode: TestMode,
}

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub result: VerificationResult,
    pub phases: Vec<VerificationPhase>,
    pub requested_mode: VerificationMode,
    pub effective_mode: VerificationMode,
    pub run_number: u32,
}

/// Rules deciding the verification mode, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRule {
    /// The project declares strict TDD.
    StrictProject,
    /// The feature marks unit or E2E tests as required.
    RequiredTests,
}

impl ModeRule {
    pub const ORDER: [Self; 2] = [Self::StrictProject, Self::RequiredTests];

    fn applies(self, strict_tdd: bool, feature: &Feature) -> bool {
        match self {
            Self::StrictProject => strict_tdd,
            Self::RequiredTests => feature.requires_tests(),
        }
    }
}

/// `tdd` when any rule applies, else `ai`.
pub fn select_mode(strict_tdd: bool, feature: &Feature) -> VerificationMode {
    match ModeRule::ORDER
        .iter()
        .find(|rule| rule.applies(strict_tdd, feature))
    {
        Some(rule) => {
            tracing::debug!(?rule, "selected tdd mode");
            VerificationMode::Tdd
        }
        None => VerificationMode::Ai,
    }
}

/// Diff facts gathered for a run.
#[derive(Debug, Clone, Default)]
struct DiffContext {
    diff: String,
    changed_files: Vec<String>,
    commit_hash: Option<String>,
}

/// Verdict, criteria and narrative produced by the judging phase.
#[derive(Debug, Clone)]
struct Judged {
    verdict: Verdict,
    verified_by: String,
    criteria: Vec<CriterionResult>,
    overall_reasoning: Option<String>,
    suggestions: Vec<String>,
    code_quality_notes: Vec<String>,
}

/// Mechanical verdict: pass iff every executed check succeeded, with every
/// criterion following that verdict.
pub fn tdd_verdict(
    feature: &Feature,
    checks: &[AutomatedCheckResult],
    test_files: &[String],
) -> (Verdict, Vec<CriterionResult>, String) {
    let failing: Vec<String> = checks
        .iter()
        .filter(|c| !c.success)
        .map(|c| c.check_type.to_string())
        .collect();
    let passed = failing.is_empty();
    let verdict = if passed { Verdict::Pass } else { Verdict::Fail };
    let reasoning = if passed {
        format!("all {} automated checks passed", checks.len())
    } else {
        format!("failing checks: {}", failing.join(", "))
    };

    let criteria = feature
        .acceptance
        .iter()
        .enumerate()
        .map(|(index, criterion)| CriterionResult {
            criterion: criterion.clone(),
            index,
            satisfied: passed,
            confidence: 1.0,
            reasoning: reasoning.clone(),
            evidence: test_files.to_vec(),
        })
        .collect();
    (verdict, criteria, reasoning)
}

/// `N files changed, +A -D` from a unified diff.
pub fn summarize_diff(diff: &str, changed_files: &[String]) -> String {
    let (mut added, mut removed) = (0_usize, 0_usize);
    for line in diff.lines() {
        if line.starts_with('+') && !line.starts_with("+++") {
            added += 1;
        } else if line.starts_with('-') && !line.starts_with("---") {
            removed += 1;
        }
    }
    let files = changed_files.len();
    let noun = if files == 1 { "file" } else { "files" };
    format!("{files} {noun} changed, +{added} -{removed}")
}

/// Ties capability lookup, test discovery, checks, judgment and the store
/// together for one feature at a time.
pub struct VerificationOrchestrator {
    capabilities: Arc<CapabilityCache>,
    vcs: Arc<dyn VersionControl>,
    discovery: TestDiscovery,
    checks: CheckRunner,
    judgment: JudgmentService,
    store: Arc<VerificationStore>,
    settings: OrchestratorSettings,
}

impl VerificationOrchestrator {
    pub fn new(
        capabilities: Arc<CapabilityCache>,
        vcs: Arc<dyn VersionControl>,
        checks: CheckRunner,
        judgment: JudgmentService,
        store: Arc<VerificationStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            capabilities,
            discovery: TestDiscovery::new(vcs.clone()),
            vcs,
            checks,
            judgment,
            store,
            settings,
        }
    }

    /// Verify `feature` and persist the result.
    ///
    /// Check and agent failures become verdicts; only phase-order violations
    /// and store write failures are errors.
    #[instrument(skip(self, feature, options), fields(feature = %feature.id))]
    pub async fn verify(
        &self,
        project: &Path,
        feature: &Feature,
        options: VerifyOptions,
    ) -> DomainResult<VerificationOutcome> {
        let mut phases = PhaseTracker::new();
        let requested_mode = select_mode(self.settings.strict_tdd, feature);
        tracing::info!(mode = requested_mode.as_str(), "verification mode selected");

        phases.advance(VerificationPhase::GatheringContext)?;
        let (context, capabilities) = tokio::join!(
            self.gather_diff(project),
            self.gather_capabilities(project, options.skip_checks)
        );

        let mut checks = Vec::new();
        let mut test_files = Vec::new();
        let mut tests_ran = false;
        if let Some(capabilities) = capabilities {
            phases.advance(VerificationPhase::ExecutingChecks)?;
            let test_mode = options.test_mode.unwrap_or(self.settings.default_test_mode);
            let (test_command, files) = self
                .resolve_tests(project, feature, &capabilities, test_mode, &context.changed_files)
                .await;
            let e2e = (!options.skip_e2e).then(|| E2eMode::select(options.e2e_full, feature.e2e_tags()));
            let plan = CheckPlan::from_capabilities(&capabilities, test_command, e2e.as_ref());

            tests_ran = plan.runs_tests();
            test_files = files;
            checks = self.checks.run(project, &plan).await;
        }

        phases.advance(VerificationPhase::Judging)?;
        let effective_mode = if requested_mode == VerificationMode::Tdd
            && (test_files.is_empty() || !tests_ran)
        {
            tracing::warn!(
                tests_ran,
                "tdd mode requested but no concrete test files ran; falling back to ai judgment"
            );
            VerificationMode::Ai
        } else {
            requested_mode
        };

        let judged = match effective_mode {
            VerificationMode::Tdd => {
                let (verdict, criteria, reasoning) = tdd_verdict(feature, &checks, &test_files);
                Judged {
                    verdict,
                    verified_by: VerificationMode::Tdd.as_str().to_string(),
                    criteria,
                    overall_reasoning: Some(reasoning),
                    suggestions: Vec::new(),
                    code_quality_notes: Vec::new(),
                }
            }
            VerificationMode::Ai => self.judge_with_agent(project, feature, &context, &checks).await,
        };

        phases.advance(VerificationPhase::Persisting)?;
        let result = VerificationResult {
            feature_id: feature.id.clone(),
            timestamp: Utc::now(),
            commit_hash: context.commit_hash,
            diff_summary: summarize_diff(&context.diff, &context.changed_files),
            changed_files: context.changed_files,
            automated_checks: checks,
            criteria_results: judged.criteria,
            verdict: judged.verdict,
            verified_by: judged.verified_by,
            overall_reasoning: judged.overall_reasoning,
            suggestions: judged.suggestions,
            code_quality_notes: judged.code_quality_notes,
        };
        let run_number = self.store.save(project, &result)?;

        phases.advance(VerificationPhase::Done)?;
        tracing::info!(
            verdict = %result.verdict,
            run = run_number,
            mode = effective_mode.as_str(),
            "verification complete"
        );
        Ok(VerificationOutcome {
            result,
            phases: phases.into_visited(),
            requested_mode,
            effective_mode,
            run_number,
        })
    }

    async fn gather_diff(&self, project: &Path) -> DiffContext {
        let (diff, changed_files, commit_hash) = tokio::join!(
            self.vcs.diff(project),
            self.vcs.changed_files(project),
            self.vcs.current_commit_hash(project)
        );
        let diff = diff.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not read diff; continuing without it");
            String::new()
        });
        DiffContext {
            diff,
            changed_files,
            commit_hash,
        }
    }

    /// `None` when checks are skipped; an empty snapshot when lookup fails.
    async fn gather_capabilities(&self, project: &Path, skip: bool) -> Option<CapabilitySnapshot> {
        if skip {
            return None;
        }
        match self.capabilities.detect(project, DetectOptions::default()).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(error = %err, "capability lookup failed; no checks will run");
                Some(CapabilitySnapshot::empty())
            }
        }
    }

    /// Test command for the mode, plus the concrete test files behind it.
    async fn resolve_tests(
        &self,
        project: &Path,
        feature: &Feature,
        capabilities: &CapabilitySnapshot,
        mode: TestMode,
        changed_files: &[String],
    ) -> (Option<String>, Vec<String>) {
        if mode == TestMode::Skip {
            return (None, Vec::new());
        }
        let selection = self
            .discovery
            .discover(project, feature, Some(changed_files.to_vec()))
            .await;
        let command = match mode {
            TestMode::Full => capabilities.test.runnable_command().map(str::to_string),
            TestMode::Quick => build_test_command(capabilities, &selection),
            TestMode::Skip => None,
        };
        if command.is_none() {
            return (None, Vec::new());
        }
        tracing::debug!(
            source = %selection.source,
            confidence = selection.confidence,
            command = ?command,
            "resolved test command"
        );
        (command, resolve_test_files(project, &selection))
    }

    async fn judge_with_agent(
        &self,
        project: &Path,
        feature: &Feature,
        context: &DiffContext,
        checks: &[AutomatedCheckResult],
    ) -> Judged {
        let ctx = JudgmentContext {
            feature,
            diff: &context.diff,
            changed_files: &context.changed_files,
            checks,
        };
        let verified_by = format!("ai:{}", self.judgment.agent_name());
        match self.judgment.judge(project, &ctx).await {
            Judgment::Parsed(parsed) => Judged {
                verdict: parsed.verdict,
                verified_by,
                criteria: parsed.criteria,
                overall_reasoning: parsed.overall_reasoning,
                suggestions: parsed.suggestions,
                code_quality_notes: parsed.code_quality_notes,
            },
            Judgment::Unavailable { reason, timed_out } => Judged {
                verdict: Verdict::NeedsReview,
                verified_by,
                criteria: Vec::new(),
                overall_reasoning: Some(if timed_out {
                    format!("agent timed out: {reason}")
                } else {
                    format!("agent unavailable: {reason}")
                }),
                suggestions: Vec::new(),
                code_quality_notes: Vec::new(),
            },
            Judgment::Malformed { reason } => Judged {
                verdict: Verdict::Fail,
                verified_by,
                criteria: Vec::new(),
                overall_reasoning: Some(reason),
                suggestions: Vec::new(),
                code_quality_notes: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CheckType, TestRequirements, UnitTestRequirement};

    #[test]
    fn mode_rules_in_order() {
        let mut feature = Feature::new("a", "b");
        assert_eq!(select_mode(false, &feature), VerificationMode::Ai);
        assert_eq!(select_mode(true, &feature), VerificationMode::Tdd);

        feature.test_requirements = Some(TestRequirements {
            unit: Some(UnitTestRequirement {
                required: true,
                pattern: None,
            }),
            e2e: None,
        });
        assert_eq!(select_mode(false, &feature), VerificationMode::Tdd);
    }

    #[test]
    fn tdd_criteria_follow_the_verdict() {
        let mut feature = Feature::new("a", "b");
        feature.acceptance = vec!["one".into(), "two".into()];
        let passing = vec![AutomatedCheckResult {
            check_type: CheckType::Test,
            success: true,
            duration: Some(1),
            error_count: Some(0),
            output: None,
        }];
        let (verdict, criteria, _) = tdd_verdict(&feature, &passing, &["a.test.ts".into()]);
        assert_eq!(verdict, Verdict::Pass);
        assert!(criteria.iter().all(|c| c.satisfied));
        assert_eq!(criteria[1].evidence, vec!["a.test.ts"]);

        let mut failing = passing.clone();
        failing.push(AutomatedCheckResult::failed(CheckType::Lint, "bad", None));
        let (verdict, criteria, reasoning) = tdd_verdict(&feature, &failing, &[]);
        assert_eq!(verdict, Verdict::Fail);
        assert!(criteria.iter().all(|c| !c.satisfied));
        assert_eq!(reasoning, "failing checks: lint");
    }

    #[test]
    fn diff_summary_counts_lines() {
        let diff = "--- a/x\n+++ b/x\n@@\n-old\n+new\n+more\n";
        assert_eq!(
            summarize_diff(diff, &["x".into()]),
            "1 file changed, +2 -1"
        );
    }
}
