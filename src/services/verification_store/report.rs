//! Human-readable markdown report written next to each run's metadata.

use std::fmt::Write;

use crate::domain::models::VerificationResult;

use super::layout::run_id;

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

/// Render run `run` of `result` as markdown.
pub fn render_report(result: &VerificationResult, run: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Verification: {} (run {})", result.feature_id, run_id(run));
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Verdict:** {}", result.verdict);
    let _ = writeln!(out, "- **Verified by:** {}", result.verified_by);
    let _ = writeln!(out, "- **Timestamp:** {}", result.timestamp.to_rfc3339());
    if let Some(commit) = &result.commit_hash {
        let _ = writeln!(out, "- **Commit:** `{commit}`");
    }

    if !result.changed_files.is_empty() {
        let _ = writeln!(out, "\n## Changed files\n");
        for file in &result.changed_files {
            let _ = writeln!(out, "- `{file}`");
        }
    }

    if !result.automated_checks.is_empty() {
        let _ = writeln!(out, "\n## Automated checks\n");
        let _ = writeln!(out, "| Check | Result | Duration | Errors |");
        let _ = writeln!(out, "|-------|--------|----------|--------|");
        for check in &result.automated_checks {
            let duration = check
                .duration
                .map_or_else(|| "-".to_string(), |ms| format!("{:.1}s", ms as f64 / 1000.0));
            let errors = check
                .error_count
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            let _ = writeln!(
                out,
                "| {} | {} | {duration} | {errors} |",
                check.check_type,
                mark(check.success)
            );
        }
    }

    if !result.criteria_results.is_empty() {
        let _ = writeln!(out, "\n## Acceptance criteria\n");
        for criterion in &result.criteria_results {
            let _ = writeln!(
                out,
                "{}. {} {} ({:.0}% confidence)",
                criterion.index + 1,
                mark(criterion.satisfied),
                criterion.criterion,
                criterion.confidence * 100.0
            );
            if !criterion.reasoning.is_empty() {
                let _ = writeln!(out, "   - {}", criterion.reasoning);
            }
            for evidence in &criterion.evidence {
                let _ = writeln!(out, "   - evidence: {evidence}");
            }
        }
    }

    if let Some(reasoning) = &result.overall_reasoning {
        let _ = writeln!(out, "\n## Reasoning\n\n{reasoning}");
    }
    for (title, items) in [
        ("Suggestions", &result.suggestions),
        ("Code quality notes", &result.code_quality_notes),
    ] {
        if !items.is_empty() {
            let _ = writeln!(out, "\n## {title}\n");
            for item in items {
                let _ = writeln!(out, "- {item}");
            }
        }
    }
    if !result.diff_summary.is_empty() {
        let _ = writeln!(out, "\n## Diff summary\n\n{}", result.diff_summary);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CriterionResult, Verdict};
    use chrono::Utc;

    #[test]
    fn report_lists_verdict_and_criteria() {
        let result = VerificationResult {
            feature_id: "auth.login".into(),
            timestamp: Utc::now(),
            commit_hash: Some("abc".into()),
            changed_files: vec!["src/auth/login.ts".into()],
            diff_summary: String::new(),
            automated_checks: vec![],
            criteria_results: vec![CriterionResult {
                criterion: "rejects bad passwords".into(),
                index: 0,
                satisfied: false,
                confidence: 0.5,
                reasoning: "no test".into(),
                evidence: vec![],
            }],
            verdict: Verdict::Fail,
            verified_by: "ai:claude".into(),
            overall_reasoning: None,
            suggestions: vec!["add a test".into()],
            code_quality_notes: vec![],
        };
        let report = render_report(&result, 7);
        assert!(report.starts_with("# Verification: auth.login (run 007)"));
        assert!(report.contains("**Verdict:** fail"));
        assert!(report.contains("1. ❌ rejects bad passwords (50% confidence)"));
        assert!(report.contains("- add a test"));
    }
}
