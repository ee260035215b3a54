//! Automated check execution.
//!
//! A [`CheckPlan`] lists the commands a run will execute. [`CheckRunner`]
//! runs them in three stages: the unit-style checks (test, typecheck, lint,
//! build), optionally concurrently; then custom rules; then end-to-end tests,
//! which always go last so they never contend with the build for artifacts.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use tracing::instrument;

use crate::domain::models::{
    AutomatedCheckResult, CapabilitySnapshot, CheckType, ChecksConfig, E2eCapability, E2eMode,
};
use crate::domain::ports::CheckExecutor;
use crate::services::test_discovery::{append_args, is_appendable};

/// One command to run as a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCheck {
    pub check_type: CheckType,
    pub command: String,
    /// Custom rule id, for `custom` checks.
    pub label: Option<String>,
}

impl PlannedCheck {
    pub fn new(check_type: CheckType, command: impl Into<String>) -> Self {
        Self {
            check_type,
            command: command.into(),
            label: None,
        }
    }
}

/// Commands for one run, grouped by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckPlan {
    pub unit: Vec<PlannedCheck>,
    pub custom: Vec<PlannedCheck>,
    pub e2e: Option<PlannedCheck>,
}

impl CheckPlan {
    /// Plan from capabilities. `test_command` is the already-resolved test
    /// command (full, selective, or none when tests are skipped); `e2e` is
    /// `None` when end-to-end tests are skipped.
    pub fn from_capabilities(
        capabilities: &CapabilitySnapshot,
        test_command: Option<String>,
        e2e: Option<&E2eMode>,
    ) -> Self {
        let mut unit = Vec::new();
        if let Some(command) = test_command {
            unit.push(PlannedCheck::new(CheckType::Test, command));
        }
        for (check_type, capability) in [
            (CheckType::Typecheck, &capabilities.typecheck),
            (CheckType::Lint, &capabilities.lint),
            (CheckType::Build, &capabilities.build),
        ] {
            if let Some(command) = capability.runnable_command() {
                unit.push(PlannedCheck::new(check_type, command));
            }
        }

        let custom = capabilities
            .custom_rules
            .iter()
            .filter_map(|rule| {
                let command = rule.command.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
                Some(PlannedCheck {
                    check_type: CheckType::Custom,
                    command: command.to_string(),
                    label: Some(rule.id.clone()),
                })
            })
            .collect();

        let e2e = e2e.and_then(|mode| {
            capabilities
                .e2e
                .as_ref()
                .and_then(|cap| build_e2e_command(cap, mode))
                .map(|command| PlannedCheck::new(CheckType::E2e, command))
        });

        Self { unit, custom, e2e }
    }

    pub fn is_empty(&self) -> bool {
        self.unit.is_empty() && self.custom.is_empty() && self.e2e.is_none()
    }

    /// Whether the plan runs unit tests.
    pub fn runs_tests(&self) -> bool {
        self.unit.iter().any(|c| c.check_type == CheckType::Test)
    }
}

/// End-to-end command for the chosen mode, or `None` when the capability is
/// unavailable.
///
/// A `grep_template` with a `{tags}` placeholder is appended with the tags
/// joined by `|`. Without one, Playwright and Cypress get their own grep
/// idiom and any other runner gets the full command.
pub fn build_e2e_command(capability: &E2eCapability, mode: &E2eMode) -> Option<String> {
    if !capability.available {
        return None;
    }
    let base = capability
        .command
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())?;
    let Some(tags) = mode.tags() else {
        return Some(base.to_string());
    };
    let joined = tags.join("|");

    if let Some(template) = capability.grep_template.as_deref() {
        if template.contains("{tags}") && is_appendable(base) {
            return Some(append_args(base, &template.replace("{tags}", &joined)));
        }
    }
    let framework = capability
        .framework
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !is_appendable(base) {
        return Some(base.to_string());
    }
    Some(match framework.as_str() {
        "playwright" => append_args(base, &format!("--grep \"{joined}\"")),
        "cypress" => append_args(base, &format!("--env grepTags=\"{}\"", tags.join(" "))),
        _ => base.to_string(),
    })
}

/// Runs a [`CheckPlan`] through a [`CheckExecutor`].
pub struct CheckRunner {
    executor: Arc<dyn CheckExecutor>,
    parallel: bool,
    env: Vec<(String, String)>,
}

impl CheckRunner {
    pub fn new(executor: Arc<dyn CheckExecutor>, config: &ChecksConfig) -> Self {
        let mut env = Vec::new();
        if config.ci_mode {
            env.push(("CI".to_string(), "true".to_string()));
        }
        Self {
            executor,
            parallel: config.parallel,
            env,
        }
    }

    async fn run_one(&self, cwd: &Path, check: &PlannedCheck) -> AutomatedCheckResult {
        tracing::info!(check = %check.check_type, command = %check.command, "running check");
        let mut result = self
            .executor
            .run(cwd, check.check_type, &check.command, &self.env)
            .await;
        if let Some(label) = &check.label {
            result.output = Some(match result.output.take() {
                Some(output) => format!("[{label}]\n{output}"),
                None => format!("[{label}]"),
            });
        }
        tracing::info!(
            check = %check.check_type,
            success = result.success,
            duration_ms = result.duration,
            error_count = result.error_count,
            "check complete"
        );
        result
    }

    /// Run every planned check. Results come back in plan order; failures
    /// are recorded, never raised.
    #[instrument(skip(self, plan), fields(unit = plan.unit.len(), custom = plan.custom.len(), e2e = plan.e2e.is_some()))]
    pub async fn run(&self, cwd: &Path, plan: &CheckPlan) -> Vec<AutomatedCheckResult> {
        let mut results = if self.parallel {
            join_all(plan.unit.iter().map(|check| self.run_one(cwd, check))).await
        } else {
            let mut results = Vec::with_capacity(plan.unit.len());
            for check in &plan.unit {
                results.push(self.run_one(cwd, check).await);
            }
            results
        };

        for check in &plan.custom {
            results.push(self.run_one(cwd, check).await);
        }

        if let Some(check) = &plan.e2e {
            results.push(self.run_one(cwd, check).await);
        }
        results
    }
}

/// Extract a count preceding `keyword` from a `;`/`,` separated summary.
///
/// From `10 passed; 2 failed` the count for `failed` is 2.
fn extract_count(line: &str, keyword: &str) -> Option<u32> {
    line.split([';', ','])
        .map(str::trim)
        .filter(|part| part.contains(keyword))
        .find_map(|part| {
            let words: Vec<&str> = part.split_whitespace().collect();
            words
                .iter()
                .position(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).starts_with(keyword))
                .and_then(|idx| idx.checked_sub(1))
                .and_then(|idx| words[idx].parse::<u32>().ok())
        })
}

/// Best-effort error count from check output.
///
/// Recognises the summary lines of cargo/clippy, tsc, eslint, jest/vitest,
/// pytest and mocha. Returns `None` when no summary is found.
pub fn parse_error_count(check_type: CheckType, output: &str) -> Option<u32> {
    let mut count = None;
    for line in output.lines().rev() {
        let trimmed = line.trim();

        // rustc / clippy: "error: could not compile `x` due to 3 previous errors"
        if let Some(rest) = trimmed.split("due to ").nth(1) {
            if let Some(n) = rest.split_whitespace().next().and_then(|w| w.parse().ok()) {
                return Some(n);
            }
        }
        // cargo test: "test result: FAILED. 10 passed; 2 failed; 0 ignored"
        if trimmed.starts_with("test result:") {
            return extract_count(trimmed, "failed");
        }
        // tsc: "Found 4 errors in 2 files." / "Found 1 error."
        if let Some(rest) = trimmed.strip_prefix("Found ") {
            if let Some(n) = rest.split_whitespace().next().and_then(|w| w.parse().ok()) {
                return Some(n);
            }
        }
        // eslint: "✖ 12 problems (9 errors, 3 warnings)"
        if trimmed.contains("problem") && trimmed.contains("error") {
            if let Some(n) = extract_count(trimmed.split('(').nth(1).unwrap_or(trimmed), "error") {
                return Some(n);
            }
        }
        // jest / vitest: "Tests:  2 failed, 10 passed, 12 total" / "Tests  2 failed | 10 passed (12)"
        if trimmed.starts_with("Tests:") || trimmed.starts_with("Tests ") {
            let normalized = trimmed.replace('|', ",");
            if let Some(n) = extract_count(&normalized, "failed") {
                return Some(n);
            }
            if count.is_none() && normalized.contains("passed") {
                count = Some(0);
            }
        }
        // pytest: "==== 2 failed, 8 passed in 1.2s ====" ; mocha: "2 failing"
        if trimmed.starts_with('=') && trimmed.contains(" in ") {
            let inner = trimmed.trim_matches('=').trim();
            if let Some(n) = extract_count(inner, "failed") {
                return Some(n);
            }
            if inner.contains("passed") {
                count = count.or(Some(0));
            }
        }
        if check_type != CheckType::Lint {
            if let Some(n) = trimmed
                .strip_suffix(" failing")
                .and_then(|n| n.trim().parse().ok())
            {
                return Some(n);
            }
        }
    }
    count
}
