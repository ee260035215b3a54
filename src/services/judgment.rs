//! AI judgment of a feature's change.
//!
//! The agent gets the feature, its acceptance criteria, the diff and the
//! automated check outcomes, and must answer with a JSON verdict. The answer
//! is validated into a [`Judgment`]; a malformed answer is a value, not an
//! error, so a bad response can never abort a verification run.

use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::instrument;

use crate::domain::models::{AutomatedCheckResult, CriterionResult, Feature, Verdict};
use crate::domain::ports::{AgentProvider, AgentRequest};

/// Validated verdict returned by the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentJudgment {
    pub verdict: Verdict,
    pub criteria: Vec<CriterionResult>,
    pub overall_reasoning: Option<String>,
    pub suggestions: Vec<String>,
    pub code_quality_notes: Vec<String>,
}

/// Outcome of asking the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Judgment {
    Parsed(AgentJudgment),
    /// The agent answered, but not with a usable verdict.
    Malformed { reason: String },
    /// The agent could not be asked or did not answer in time.
    Unavailable { reason: String, timed_out: bool },
}

/// What the agent judges.
#[derive(Debug, Clone, Copy)]
pub struct JudgmentContext<'a> {
    pub feature: &'a Feature,
    pub diff: &'a str,
    pub changed_files: &'a [String],
    pub checks: &'a [AutomatedCheckResult],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCriterion {
    index: usize,
    #[serde(default)]
    criterion: Option<String>,
    satisfied: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    evidence: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJudgment {
    verdict: String,
    #[serde(default, alias = "criteriaResults")]
    criteria: Vec<RawCriterion>,
    #[serde(default, alias = "overall_reasoning")]
    overall_reasoning: Option<String>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default, alias = "code_quality_notes")]
    code_quality_notes: Vec<String>,
}

/// Cut `text` to at most `max_chars` characters, noting the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!(
            "{}\n... [truncated {} characters]",
            &text[..idx],
            text[idx..].chars().count()
        ),
        None => text.to_string(),
    }
}

/// Prompt asking the agent for a structured verdict.
pub fn build_prompt(ctx: &JudgmentContext<'_>, max_diff_chars: usize) -> String {
    let feature = ctx.feature;
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are verifying that a code change implements a feature. Judge each acceptance criterion against the diff and the automated check results."
    );
    let _ = writeln!(prompt, "\n## Feature\n\nid: {}\n{}", feature.id, feature.description);

    let _ = writeln!(prompt, "\n## Acceptance criteria\n");
    if feature.acceptance.is_empty() {
        let _ = writeln!(prompt, "(none declared; judge the description)");
    }
    for (index, criterion) in feature.acceptance.iter().enumerate() {
        let _ = writeln!(prompt, "{index}. {criterion}");
    }

    let _ = writeln!(prompt, "\n## Automated checks\n");
    if ctx.checks.is_empty() {
        let _ = writeln!(prompt, "(no checks were run)");
    }
    for check in ctx.checks {
        let _ = writeln!(
            prompt,
            "- {}: {}",
            check.check_type,
            if check.success { "passed" } else { "FAILED" }
        );
        if !check.success {
            if let Some(output) = check.output.as_deref().filter(|o| !o.trim().is_empty()) {
                let _ = writeln!(prompt, "```\n{}\n```", truncate_chars(output.trim(), 2_000));
            }
        }
    }

    let _ = writeln!(prompt, "\n## Changed files\n");
    for file in ctx.changed_files {
        let _ = writeln!(prompt, "- {file}");
    }

    let _ = writeln!(
        prompt,
        "\n## Diff\n\n```diff\n{}\n```",
        truncate_chars(ctx.diff, max_diff_chars)
    );

    let _ = writeln!(
        prompt,
        r#"
## Answer format

Reply with a single JSON object and nothing else:

```json
{{
  "verdict": "pass" | "fail" | "needs_review",
  "criteria": [
    {{"index": 0, "satisfied": true, "confidence": 0.9, "reasoning": "...", "evidence": ["file:line"]}}
  ],
  "overallReasoning": "...",
  "suggestions": ["..."],
  "codeQualityNotes": ["..."]
}}
```"#
    );
    prompt
}

/// Bodies of the fenced code blocks in `output`, in order.
fn fenced_blocks(output: &str) -> impl Iterator<Item = &str> {
    let mut rest = output;
    std::iter::from_fn(move || {
        let start = rest.find("```")?;
        let after_fence = &rest[start + 3..];
        let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
        let body = &after_fence[body_start..];
        let end = body.find("```")?;
        rest = &body[end + 3..];
        Some(body[..end].trim())
    })
}

/// The JSON document inside an agent answer: the first fenced block holding
/// an object, else the outermost braces.
pub(crate) fn extract_json(output: &str) -> Option<&str> {
    if let Some(block) = fenced_blocks(output).find(|block| block.starts_with('{')) {
        return Some(block);
    }
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (end > start).then(|| &output[start..=end])
}

/// Validate an agent answer against the feature's criteria.
pub fn parse_judgment(feature: &Feature, output: &str) -> Judgment {
    let Some(json) = extract_json(output) else {
        return Judgment::Malformed {
            reason: "agent response contains no JSON object".to_string(),
        };
    };
    let raw: RawJudgment = match serde_json::from_str(json) {
        Ok(raw) => raw,
        Err(err) => {
            return Judgment::Malformed {
                reason: format!("agent response is not a valid judgment: {err}"),
            }
        }
    };
    let Some(verdict) = Verdict::parse(&raw.verdict) else {
        return Judgment::Malformed {
            reason: format!("unknown verdict '{}'", raw.verdict),
        };
    };

    let criteria = raw
        .criteria
        .into_iter()
        .map(|c| CriterionResult {
            criterion: c
                .criterion
                .or_else(|| feature.acceptance.get(c.index).cloned())
                .unwrap_or_default(),
            index: c.index,
            satisfied: c.satisfied,
            confidence: c
                .confidence
                .filter(|v| v.is_finite())
                .map_or(0.0, |v| v.clamp(0.0, 1.0)),
            reasoning: c.reasoning,
            evidence: c.evidence,
        })
        .collect();

    Judgment::Parsed(AgentJudgment {
        verdict,
        criteria,
        overall_reasoning: raw.overall_reasoning,
        suggestions: raw.suggestions,
        code_quality_notes: raw.code_quality_notes,
    })
}

/// Asks an [`AgentProvider`] for a verdict.
pub struct JudgmentService {
    agent: Arc<dyn AgentProvider>,
    timeout: Duration,
    max_diff_chars: usize,
}

impl JudgmentService {
    pub fn new(agent: Arc<dyn AgentProvider>, timeout: Duration, max_diff_chars: usize) -> Self {
        Self {
            agent,
            timeout,
            max_diff_chars,
        }
    }

    pub fn agent_name(&self) -> &str {
        self.agent.name()
    }

    #[instrument(skip(self, ctx), fields(feature = %ctx.feature.id, agent = self.agent.name()))]
    pub async fn judge(&self, project: &Path, ctx: &JudgmentContext<'_>) -> Judgment {
        let request = AgentRequest {
            prompt: build_prompt(ctx, self.max_diff_chars),
            cwd: project.to_path_buf(),
            timeout: self.timeout,
        };
        let response = self.agent.ask(request).await;
        if !response.success {
            let reason = response
                .error
                .unwrap_or_else(|| "agent invocation failed".to_string());
            tracing::warn!(%reason, timed_out = response.timed_out, "agent judgment unavailable");
            return Judgment::Unavailable {
                reason,
                timed_out: response.timed_out,
            };
        }

        let judgment = parse_judgment(ctx.feature, &response.output);
        match &judgment {
            Judgment::Parsed(parsed) => {
                tracing::info!(verdict = %parsed.verdict, criteria = parsed.criteria.len(), "agent judgment parsed");
            }
            Judgment::Malformed { reason } => tracing::warn!(%reason, "malformed agent judgment"),
            Judgment::Unavailable { .. } => {}
        }
        judgment
    }
}
