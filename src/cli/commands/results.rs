//! Result store commands: `history`, `last`, `stats`, `clear`, `migrate`.

use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::commands::verify::exit_status;
use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{
    FeatureSummary, VerificationMetadata, VerificationResult, VerificationStats,
};
use crate::services::MigrationReport;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOutput {
    pub feature_id: String,
    pub runs: Vec<VerificationMetadata>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.runs.is_empty() {
            return format!("No verification runs recorded for {}.", self.feature_id);
        }
        format!(
            "History of {} ({} run(s)):\n{}",
            self.feature_id,
            self.runs.len(),
            TableFormatter::new().format_history(&self.runs)
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastOutput {
    pub feature_id: String,
    pub result: Option<VerificationResult>,
}

impl CommandOutput for LastOutput {
    fn to_human(&self) -> String {
        let Some(result) = &self.result else {
            return format!("No verification result for {}.", self.feature_id);
        };
        let mut lines = vec![
            format!("Feature: {}", result.feature_id),
            format!("Verdict: {}", result.verdict),
            format!("Verified by: {}", result.verified_by),
            format!("At: {}", result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")),
        ];
        if let Some(commit) = &result.commit_hash {
            lines.push(format!("Commit: {commit}"));
        }
        if !result.automated_checks.is_empty() {
            lines.push(TableFormatter::new().format_checks(&result.automated_checks));
        }
        if let Some(reasoning) = &result.overall_reasoning {
            lines.push(format!("\n{reasoning}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct StatsOutput {
    #[serde(flatten)]
    pub stats: VerificationStats,
    pub features: Vec<FeatureSummary>,
}

impl CommandOutput for StatsOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            "Verification Statistics:".to_string(),
            format!("  Passing:       {}", self.stats.passing),
            format!("  Failing:       {}", self.stats.failing),
            format!("  Needs review:  {}", self.stats.needs_review),
            "  ------------".to_string(),
            format!("  Total:         {}", self.stats.total),
        ];
        if !self.features.is_empty() {
            lines.push(String::new());
            lines.push(TableFormatter::new().format_features(&self.features));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutput {
    pub feature_id: String,
    pub cleared: bool,
}

impl CommandOutput for ClearOutput {
    fn to_human(&self) -> String {
        if self.cleared {
            format!("Cleared verification history of {}.", self.feature_id)
        } else {
            format!("No verification history for {}.", self.feature_id)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MigrateOutput {
    pub migrated: bool,
    pub report: Option<MigrationReport>,
}

impl CommandOutput for MigrateOutput {
    fn to_human(&self) -> String {
        let Some(report) = &self.report else {
            return "Nothing to migrate.".to_string();
        };
        let mut lines = vec![format!("Migrated {} feature(s).", report.migrated.len())];
        for (feature, reason) in &report.failed {
            lines.push(format!("  ✗ {feature}: {reason}"));
        }
        if let Some(backup) = &report.backup {
            lines.push(format!("Legacy store backed up to {}", backup.display()));
        }
        lines.join("\n")
    }
}

pub fn history(ctx: &AppContext, feature_id: &str, json_mode: bool) -> Result<()> {
    let runs = ctx
        .store
        .get_history(&ctx.project, feature_id)
        .context("Failed to read verification history")?;
    output(
        &HistoryOutput {
            feature_id: feature_id.to_string(),
            runs,
        },
        json_mode,
    );
    Ok(())
}

/// Prints the latest result; the exit status follows its verdict.
pub fn last(ctx: &AppContext, feature_id: &str, json_mode: bool) -> Result<ExitCode> {
    let result = ctx
        .store
        .get_last(&ctx.project, feature_id)
        .context("Failed to read verification result")?;
    let code = result
        .as_ref()
        .map_or(ExitCode::SUCCESS, |r| ExitCode::from(exit_status(r.verdict)));
    output(
        &LastOutput {
            feature_id: feature_id.to_string(),
            result,
        },
        json_mode,
    );
    Ok(code)
}

pub fn stats(ctx: &AppContext, json_mode: bool) -> Result<()> {
    let stats = ctx
        .store
        .stats(&ctx.project)
        .context("Failed to read verification stats")?;
    let features = ctx
        .store
        .list_features(&ctx.project)
        .context("Failed to list verified features")?;
    output(&StatsOutput { stats, features }, json_mode);
    Ok(())
}

pub fn clear(ctx: &AppContext, feature_id: &str, json_mode: bool) -> Result<()> {
    let cleared = ctx
        .store
        .clear(&ctx.project, feature_id)
        .context("Failed to clear verification history")?;
    output(
        &ClearOutput {
            feature_id: feature_id.to_string(),
            cleared,
        },
        json_mode,
    );
    Ok(())
}

pub fn migrate(ctx: &AppContext, json_mode: bool) -> Result<()> {
    let report = ctx
        .store
        .migrate(&ctx.project)
        .context("Failed to migrate legacy verification store")?;
    output(
        &MigrateOutput {
            migrated: report.is_some(),
            report,
        },
        json_mode,
    );
    Ok(())
}
