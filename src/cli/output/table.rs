//! Table output formatting for CLI commands
//!
//! Renders run history, feature summaries, check results and capabilities
//! with comfy-table. Colors are dropped when `NO_COLOR` is set or the
//! terminal is dumb.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use super::truncate;
use crate::domain::models::{
    AutomatedCheckResult, CapabilitySnapshot, CommandCapability, FeatureSummary, Verdict,
    VerificationMetadata,
};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Runs of one feature, oldest first
    pub fn format_history(&self, runs: &[VerificationMetadata]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Run", "Timestamp", "Verdict", "By", "Checks", "Commit"]));

        for run in runs {
            let passed = run.automated_checks.iter().filter(|c| c.success).count();
            let commit = run
                .commit_hash
                .as_deref()
                .map_or_else(|| "-".to_string(), |h| h.chars().take(8).collect());
            table.add_row(vec![
                Cell::new(format!("{:03}", run.run_number)),
                Cell::new(run.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
                self.verdict_cell(run.verdict),
                Cell::new(&run.verified_by),
                Cell::new(format!("{passed}/{}", run.automated_checks.len())),
                Cell::new(commit),
            ]);
        }

        table.to_string()
    }

    /// Latest state of every tracked feature
    pub fn format_features(&self, features: &[FeatureSummary]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Feature", "Verdict", "Runs", "Pass", "Fail", "Last run"]));

        for feature in features {
            table.add_row(vec![
                Cell::new(truncate(&feature.feature_id, 40)),
                self.verdict_cell(feature.latest_verdict),
                Cell::new(feature.total_runs),
                Cell::new(feature.pass_count),
                Cell::new(feature.fail_count),
                Cell::new(feature.latest_timestamp.format("%Y-%m-%d %H:%M").to_string()),
            ]);
        }

        table.to_string()
    }

    /// Automated check results of one run
    pub fn format_checks(&self, checks: &[AutomatedCheckResult]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Check", "Result", "Errors", "Duration"]));

        for check in checks {
            let result = if self.use_colors {
                Cell::new(if check.success { "pass" } else { "fail" }).fg(if check.success {
                    Color::Green
                } else {
                    Color::Red
                })
            } else {
                Cell::new(if check.success { "✓ pass" } else { "✗ fail" })
            };
            table.add_row(vec![
                Cell::new(check.check_type),
                result,
                Cell::new(check.error_count.map_or_else(|| "-".to_string(), |n| n.to_string())),
                Cell::new(check.duration.map_or_else(|| "-".to_string(), |ms| format!("{ms} ms"))),
            ]);
        }

        table.to_string()
    }

    /// Discovered capabilities of a project
    pub fn format_capabilities(&self, snapshot: &CapabilitySnapshot) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Capability", "Available", "Command", "Framework"]));

        let rows: [(&str, &CommandCapability); 4] = [
            ("test", &snapshot.test),
            ("typecheck", &snapshot.typecheck),
            ("lint", &snapshot.lint),
            ("build", &snapshot.build),
        ];
        for (name, capability) in rows {
            table.add_row(vec![
                Cell::new(name),
                Cell::new(if capability.available { "yes" } else { "no" }),
                Cell::new(capability.command.as_deref().unwrap_or("-")),
                Cell::new(capability.framework.as_deref().unwrap_or("-")),
            ]);
        }
        if let Some(e2e) = &snapshot.e2e {
            table.add_row(vec![
                Cell::new("e2e"),
                Cell::new(if e2e.available { "yes" } else { "no" }),
                Cell::new(e2e.command.as_deref().unwrap_or("-")),
                Cell::new(e2e.framework.as_deref().unwrap_or("-")),
            ]);
        }
        for rule in &snapshot.custom_rules {
            table.add_row(vec![
                Cell::new(format!("custom:{}", rule.id)),
                Cell::new(if rule.command.is_some() { "yes" } else { "no" }),
                Cell::new(rule.command.as_deref().unwrap_or("-")),
                Cell::new(truncate(&rule.description, 30)),
            ]);
        }

        table.to_string()
    }

    fn verdict_cell(&self, verdict: Verdict) -> Cell {
        if self.use_colors {
            Cell::new(verdict).fg(verdict_color(verdict))
        } else {
            Cell::new(format!("{} {verdict}", verdict_icon(verdict)))
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

/// Check if color output is supported
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

const fn verdict_color(verdict: Verdict) -> Color {
    match verdict {
        Verdict::Pass => Color::Green,
        Verdict::Fail => Color::Red,
        Verdict::NeedsReview => Color::Yellow,
    }
}

const fn verdict_icon(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Pass => "✓",
        Verdict::Fail => "✗",
        Verdict::NeedsReview => "⧗",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CheckType;
    use chrono::Utc;

    fn plain() -> TableFormatter {
        TableFormatter::with_config(false, Some(120))
    }

    #[test]
    fn history_rows_show_padded_run_numbers() {
        let run = VerificationMetadata {
            feature_id: "auth.login".into(),
            run_number: 7,
            timestamp: Utc::now(),
            commit_hash: Some("0123456789abcdef".into()),
            changed_files: vec![],
            automated_checks: vec![],
            criteria_results: vec![],
            verdict: Verdict::Pass,
            verified_by: "tdd".into(),
        };
        let rendered = plain().format_history(&[run]);
        assert!(rendered.contains("007"));
        assert!(rendered.contains("✓ pass"));
        assert!(rendered.contains("01234567"));
        assert!(!rendered.contains("0123456789"));
    }

    #[test]
    fn check_rows_show_errors_and_duration() {
        let check = AutomatedCheckResult {
            check_type: CheckType::Lint,
            success: false,
            duration: Some(42),
            error_count: Some(3),
            output: None,
        };
        let rendered = plain().format_checks(&[check]);
        assert!(rendered.contains("lint"));
        assert!(rendered.contains("✗ fail"));
        assert!(rendered.contains("42 ms"));
    }

    #[test]
    fn capabilities_list_every_slot() {
        let mut snapshot = CapabilitySnapshot::empty();
        snapshot.test = CommandCapability::with_command("cargo test", Some("cargo"));
        let rendered = plain().format_capabilities(&snapshot);
        assert!(rendered.contains("cargo test"));
        assert!(rendered.contains("typecheck"));
        assert!(!rendered.contains("e2e"));
    }
}
