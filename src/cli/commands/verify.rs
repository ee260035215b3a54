//! `attestor verify`

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{Feature, TestMode, Verdict};
use crate::services::{VerificationOutcome, VerifyOptions};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Feature definition (JSON or YAML)
    pub feature: PathBuf,

    /// Skip automated checks and go straight to judgment
    #[arg(long)]
    pub skip_checks: bool,

    /// Unit test selection: full, quick or skip (defaults to configuration)
    #[arg(long)]
    pub test_mode: Option<TestMode>,

    /// Do not run end-to-end tests
    #[arg(long)]
    pub skip_e2e: bool,

    /// Run the whole end-to-end suite instead of smoke or tagged tests
    #[arg(long, conflicts_with = "skip_e2e")]
    pub e2e_full: bool,
}

/// Parse a feature file; `.yaml`/`.yml` are YAML, anything else JSON.
pub fn load_feature(path: &Path) -> Result<Feature> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feature file {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let feature: Feature = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid feature YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid feature JSON in {}", path.display()))?
    };
    if feature.id.trim().is_empty() {
        anyhow::bail!("Feature in {} has an empty id", path.display());
    }
    Ok(feature)
}

#[derive(Debug, Serialize)]
pub struct VerifyOutput {
    #[serde(flatten)]
    pub outcome: VerificationOutcome,
}

impl CommandOutput for VerifyOutput {
    fn to_human(&self) -> String {
        let outcome = &self.outcome;
        let result = &outcome.result;
        let mut lines = vec![
            format!("Feature: {}", result.feature_id),
            format!("Verdict: {} (run {:03})", result.verdict, outcome.run_number),
            format!("Verified by: {}", result.verified_by),
        ];
        if outcome.requested_mode != outcome.effective_mode {
            lines.push(format!(
                "Mode: {} (requested {})",
                outcome.effective_mode.as_str(),
                outcome.requested_mode.as_str()
            ));
        }
        if !result.diff_summary.is_empty() {
            lines.push(format!("Changes: {}", result.diff_summary));
        }

        if !result.automated_checks.is_empty() {
            lines.push(String::new());
            lines.push(TableFormatter::new().format_checks(&result.automated_checks));
        }

        if !result.criteria_results.is_empty() {
            lines.push("\nCriteria:".to_string());
            for criterion in &result.criteria_results {
                lines.push(format!(
                    "  {} {} ({:.0}%)",
                    if criterion.satisfied { "✓" } else { "✗" },
                    criterion.criterion,
                    criterion.confidence * 100.0
                ));
            }
        }
        if let Some(reasoning) = &result.overall_reasoning {
            lines.push(format!("\n{reasoning}"));
        }
        if !result.suggestions.is_empty() {
            lines.push("\nSuggestions:".to_string());
            lines.extend(result.suggestions.iter().map(|s| format!("  - {s}")));
        }
        lines.join("\n")
    }
}

/// Exit status for a verdict: pass 0, fail 1, needs review 2.
pub const fn exit_status(verdict: Verdict) -> u8 {
    match verdict {
        Verdict::Pass => 0,
        Verdict::Fail => 1,
        Verdict::NeedsReview => 2,
    }
}

pub async fn execute(args: VerifyArgs, ctx: &AppContext, json_mode: bool) -> Result<ExitCode> {
    let feature = load_feature(&args.feature)?;
    let options = VerifyOptions {
        skip_checks: args.skip_checks,
        test_mode: args.test_mode,
        skip_e2e: args.skip_e2e,
        e2e_full: args.e2e_full,
    };

    let outcome = ctx
        .orchestrator()
        .verify(&ctx.project, &feature, options)
        .await
        .with_context(|| format!("Verification of {} failed", feature.id))?;

    let code = ExitCode::from(exit_status(outcome.result.verdict));
    output(&VerifyOutput { outcome }, json_mode);
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_json_and_yaml_features() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("feature.json");
        std::fs::write(
            &json,
            r#"{"id": "auth.login", "description": "log in", "acceptance": ["works"]}"#,
        )
        .unwrap();
        let yaml = dir.path().join("feature.yaml");
        std::fs::write(&yaml, "id: auth.logout\ntags: [auth]\n").unwrap();

        assert_eq!(load_feature(&json).unwrap().acceptance, vec!["works"]);
        assert_eq!(load_feature(&yaml).unwrap().id, "auth.logout");
    }

    #[test]
    fn empty_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feature.json");
        std::fs::write(&path, r#"{"id": "  "}"#).unwrap();
        assert!(load_feature(&path).is_err());
    }

    #[test]
    fn verdicts_map_to_exit_codes() {
        assert_eq!(exit_status(Verdict::Pass), 0);
        assert_eq!(exit_status(Verdict::Fail), 1);
        assert_eq!(exit_status(Verdict::NeedsReview), 2);
    }
}
