//! Capability discovery providers.
//!
//! [`ManifestCapabilityDiscovery`] reads well-known manifests (`package.json`,
//! `Cargo.toml`, `pyproject.toml`, `go.mod`) and derives commands from them.
//! [`AgentCapabilityDiscovery`] asks the agent to explore the project and
//! falls back to the manifest provider when the agent cannot answer.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CapabilitySnapshot, CapabilitySource, CommandCapability, CustomRule, E2eCapability,
};
use crate::domain::ports::{
    AgentProvider, AgentRequest, CapabilityDiscovery, DiscoveredCapabilities,
};
use crate::services::judgment::extract_json;

/// npm's placeholder test script.
const NPM_PLACEHOLDER_TEST: &str = "no test specified";

async fn read_optional(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read manifest");
            None
        }
    }
}

/// Fill `slot` unless an earlier manifest already did.
fn fill(slot: &mut CommandCapability, command: impl Into<String>, framework: Option<&str>) {
    if !slot.available {
        *slot = CommandCapability::with_command(command, framework);
    }
}

/// Accumulates what each manifest contributes.
struct Detection {
    snapshot: CapabilitySnapshot,
    config_files: Vec<String>,
}

impl Detection {
    fn new() -> Self {
        Self {
            snapshot: CapabilitySnapshot::empty(),
            config_files: Vec::new(),
        }
    }

    fn used(&mut self, file: &str) {
        if !self.config_files.iter().any(|f| f == file) {
            self.config_files.push(file.to_string());
        }
    }

    fn language(&mut self, language: &str) {
        if !self.snapshot.languages.iter().any(|l| l == language) {
            self.snapshot.languages.push(language.to_string());
        }
    }
}

fn package_manager(cwd: &Path) -> &'static str {
    if cwd.join("pnpm-lock.yaml").exists() {
        "pnpm"
    } else if cwd.join("yarn.lock").exists() {
        "yarn"
    } else if cwd.join("bun.lockb").exists() || cwd.join("bun.lock").exists() {
        "bun"
    } else {
        "npm"
    }
}

fn detect_node(cwd: &Path, manifest: &str, detection: &mut Detection) {
    let package: Value = match serde_json::from_str(manifest) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "package.json is not valid JSON; skipping");
            return;
        }
    };
    detection.used("package.json");

    let scripts = package.get("scripts").and_then(Value::as_object);
    let script = |name: &str| {
        scripts
            .and_then(|s| s.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let deps: BTreeSet<&str> = ["dependencies", "devDependencies"]
        .iter()
        .filter_map(|key| package.get(*key).and_then(Value::as_object))
        .flat_map(|map| map.keys().map(String::as_str))
        .collect();

    let pm = package_manager(cwd);
    let run = |name: &str| format!("{pm} run {name}");

    let test_framework = ["vitest", "jest", "mocha"]
        .into_iter()
        .find(|fw| deps.contains(fw));
    match script("test") {
        Some(body) if !body.contains(NPM_PLACEHOLDER_TEST) => {
            let framework = test_framework
                .or_else(|| ["vitest", "jest", "mocha"].into_iter().find(|fw| body.contains(*fw)));
            fill(&mut detection.snapshot.test, run("test"), framework);
        }
        _ => {
            if let Some(fw) = test_framework {
                fill(&mut detection.snapshot.test, format!("npx {fw}"), Some(fw));
            }
        }
    }

    let has_tsconfig = cwd.join("tsconfig.json").exists();
    if let Some(name) = ["typecheck", "type-check", "tsc"]
        .into_iter()
        .find(|name| script(*name).is_some())
    {
        fill(&mut detection.snapshot.typecheck, run(name), Some("tsc"));
    } else if has_tsconfig {
        fill(&mut detection.snapshot.typecheck, "npx tsc --noEmit", Some("tsc"));
    }
    if has_tsconfig {
        detection.used("tsconfig.json");
        detection.language("typescript");
    } else {
        detection.language("javascript");
    }

    if script("lint").is_some() {
        let framework = deps.contains("eslint").then_some("eslint");
        fill(&mut detection.snapshot.lint, run("lint"), framework);
    }
    if script("build").is_some() {
        fill(&mut detection.snapshot.build, run("build"), None);
    }

    let e2e_script = ["test:e2e", "e2e"].into_iter().find(|name| script(*name).is_some());
    let e2e_framework = ["@playwright/test", "playwright", "cypress"]
        .into_iter()
        .find(|dep| deps.contains(dep))
        .map(|dep| if dep == "cypress" { "cypress" } else { "playwright" });
    if e2e_script.is_some() || e2e_framework.is_some() {
        let command = match (e2e_script, e2e_framework) {
            (Some(name), _) => run(name),
            (None, Some("cypress")) => "npx cypress run".to_string(),
            _ => "npx playwright test".to_string(),
        };
        let grep_template = match e2e_framework {
            Some("playwright") => Some("--grep \"{tags}\"".to_string()),
            _ => None,
        };
        detection.snapshot.e2e = Some(E2eCapability {
            available: true,
            command: Some(command),
            framework: e2e_framework.map(str::to_string),
            grep_template,
            file_template: None,
        });
    }
}

fn detect_rust(detection: &mut Detection) {
    detection.used("Cargo.toml");
    detection.language("rust");
    let snapshot = &mut detection.snapshot;
    fill(&mut snapshot.test, "cargo test", Some("cargo"));
    fill(&mut snapshot.typecheck, "cargo check --all-targets", Some("cargo"));
    fill(&mut snapshot.lint, "cargo clippy --all-targets -- -D warnings", Some("clippy"));
    fill(&mut snapshot.build, "cargo build", Some("cargo"));
}

fn detect_python(file: &str, content: &str, detection: &mut Detection) {
    let uses_pytest = file == "pytest.ini" || content.contains("pytest");
    // setup.cfg is shared by many tools; only claim it when it configures ours
    if file == "setup.cfg" && !uses_pytest && !content.contains("[mypy") {
        return;
    }
    detection.used(file);
    detection.language("python");
    let snapshot = &mut detection.snapshot;
    if uses_pytest {
        fill(&mut snapshot.test, "pytest", Some("pytest"));
    }
    if content.contains("[tool.mypy") || content.contains("[mypy") {
        fill(&mut snapshot.typecheck, "mypy .", Some("mypy"));
    }
    if content.contains("[tool.ruff") {
        fill(&mut snapshot.lint, "ruff check .", Some("ruff"));
    }
}

fn detect_go(detection: &mut Detection) {
    detection.used("go.mod");
    detection.language("go");
    let snapshot = &mut detection.snapshot;
    fill(&mut snapshot.test, "go test ./...", Some("go"));
    fill(&mut snapshot.lint, "go vet ./...", Some("go"));
    fill(&mut snapshot.build, "go build ./...", Some("go"));
}

/// Deterministic discovery from project manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestCapabilityDiscovery;

impl ManifestCapabilityDiscovery {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CapabilityDiscovery for ManifestCapabilityDiscovery {
    fn name(&self) -> &str {
        "manifest"
    }

    #[instrument(skip(self), fields(cwd = %cwd.display()))]
    async fn discover(&self, cwd: &Path) -> DomainResult<DiscoveredCapabilities> {
        let mut detection = Detection::new();

        if let Some(manifest) = read_optional(&cwd.join("package.json")).await {
            detect_node(cwd, &manifest, &mut detection);
        }
        if cwd.join("Cargo.toml").exists() {
            detect_rust(&mut detection);
        }
        for file in ["pyproject.toml", "pytest.ini", "setup.cfg"] {
            if let Some(content) = read_optional(&cwd.join(file)).await {
                detect_python(file, &content, &mut detection);
            }
        }
        if cwd.join("go.mod").exists() {
            detect_go(&mut detection);
        }

        detection.snapshot.detected_at = Utc::now();
        debug!(
            languages = ?detection.snapshot.languages,
            config_files = ?detection.config_files,
            "manifest discovery complete"
        );
        Ok(DiscoveredCapabilities {
            snapshot: detection.snapshot,
            config_files: detection.config_files,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentCapabilityDoc {
    #[serde(default)]
    test: CommandCapability,
    #[serde(default)]
    typecheck: CommandCapability,
    #[serde(default)]
    lint: CommandCapability,
    #[serde(default)]
    build: CommandCapability,
    #[serde(default)]
    e2e: Option<E2eCapability>,
    #[serde(default)]
    custom_rules: Vec<CustomRule>,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    config_files: Vec<String>,
}

const DISCOVERY_PROMPT: &str = r#"Explore this project and work out how its changes are verified.
Look at manifests, CI configuration, scripts and existing tests.

Reply with a single JSON object and nothing else:

```json
{
  "test": {"available": true, "command": "npm test", "framework": "vitest"},
  "typecheck": {"available": true, "command": "npx tsc --noEmit", "framework": "tsc"},
  "lint": {"available": false},
  "build": {"available": true, "command": "npm run build"},
  "e2e": {"available": true, "command": "npx playwright test", "framework": "playwright", "grepTemplate": "--grep \"{tags}\""},
  "customRules": [{"id": "schema", "description": "schema is valid", "command": "npm run check:schema"}],
  "languages": ["typescript"],
  "configFiles": ["package.json", "tsconfig.json"]
}
```

Only report commands that exist in this project. `configFiles` lists the
project-relative files your answer depends on."#;

/// Parse the agent's capability document.
fn parse_capability_doc(output: &str) -> Option<DiscoveredCapabilities> {
    let json = extract_json(output)?;
    let doc: AgentCapabilityDoc = match serde_json::from_str(json) {
        Ok(doc) => doc,
        Err(err) => {
            debug!(error = %err, "agent capability document did not parse");
            return None;
        }
    };
    Some(DiscoveredCapabilities {
        snapshot: CapabilitySnapshot {
            test: doc.test,
            typecheck: doc.typecheck,
            lint: doc.lint,
            build: doc.build,
            e2e: doc.e2e,
            custom_rules: doc.custom_rules,
            languages: doc.languages,
            source: CapabilitySource::Discovered,
            detected_at: Utc::now(),
        },
        config_files: doc.config_files,
    })
}

/// Agent-driven discovery with a manifest fallback.
pub struct AgentCapabilityDiscovery {
    agent: Arc<dyn AgentProvider>,
    timeout: Duration,
    fallback: ManifestCapabilityDiscovery,
}

impl AgentCapabilityDiscovery {
    pub fn new(agent: Arc<dyn AgentProvider>, timeout: Duration) -> Self {
        Self {
            agent,
            timeout,
            fallback: ManifestCapabilityDiscovery::new(),
        }
    }
}

#[async_trait]
impl CapabilityDiscovery for AgentCapabilityDiscovery {
    fn name(&self) -> &str {
        "agent"
    }

    #[instrument(skip(self), fields(cwd = %cwd.display(), agent = self.agent.name()))]
    async fn discover(&self, cwd: &Path) -> DomainResult<DiscoveredCapabilities> {
        let response = self
            .agent
            .ask(AgentRequest {
                prompt: DISCOVERY_PROMPT.to_string(),
                cwd: cwd.to_path_buf(),
                timeout: self.timeout,
            })
            .await;

        if !response.success {
            warn!(
                error = response.error.as_deref().unwrap_or("unknown"),
                timed_out = response.timed_out,
                "agent discovery failed; using manifests"
            );
            return self.fallback.discover(cwd).await;
        }

        match parse_capability_doc(&response.output) {
            Some(discovered) => {
                info!(config_files = ?discovered.config_files, "agent discovery complete");
                Ok(discovered)
            }
            None => {
                warn!("agent discovery answer was malformed; using manifests");
                self.fallback.discover(cwd).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::AgentResponse;
    use std::fs;

    struct CannedAgent(AgentResponse);

    #[async_trait]
    impl AgentProvider for CannedAgent {
        fn name(&self) -> &str {
            "canned"
        }

        async fn ask(&self, _request: AgentRequest) -> AgentResponse {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn node_project_with_vitest_and_playwright() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{
  "scripts": {"test": "vitest run", "lint": "eslint .", "build": "tsc -p ."},
  "devDependencies": {"vitest": "^1", "eslint": "^8", "@playwright/test": "^1"}
}"#,
        )
        .unwrap();
        fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();

        let found = ManifestCapabilityDiscovery::new()
            .discover(dir.path())
            .await
            .unwrap();
        let snapshot = found.snapshot;
        assert_eq!(snapshot.test.command.as_deref(), Some("pnpm run test"));
        assert_eq!(snapshot.test.framework.as_deref(), Some("vitest"));
        assert_eq!(snapshot.typecheck.command.as_deref(), Some("npx tsc --noEmit"));
        assert_eq!(snapshot.lint.framework.as_deref(), Some("eslint"));
        assert!(snapshot.build.available);
        let e2e = snapshot.e2e.unwrap();
        assert_eq!(e2e.framework.as_deref(), Some("playwright"));
        assert!(e2e.grep_template.unwrap().contains("{tags}"));
        assert_eq!(found.config_files, vec!["package.json", "tsconfig.json"]);
        assert_eq!(snapshot.languages, vec!["typescript"]);
    }

    #[tokio::test]
    async fn npm_placeholder_test_script_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"scripts": {"test": "echo \"Error: no test specified\" && exit 1"}}"#,
        )
        .unwrap();
        let found = ManifestCapabilityDiscovery::new()
            .discover(dir.path())
            .await
            .unwrap();
        assert!(!found.snapshot.test.available);
    }

    #[tokio::test]
    async fn rust_and_python_manifests() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"x\"\n").unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            "[tool.pytest.ini_options]\n[tool.ruff]\n",
        )
        .unwrap();

        let found = ManifestCapabilityDiscovery::new()
            .discover(dir.path())
            .await
            .unwrap();
        // Rust is detected first, so it owns the shared slots.
        assert_eq!(found.snapshot.test.command.as_deref(), Some("cargo test"));
        assert_eq!(found.snapshot.languages, vec!["rust", "python"]);
        assert_eq!(found.config_files, vec!["Cargo.toml", "pyproject.toml"]);
    }

    #[tokio::test]
    async fn empty_directory_has_no_capabilities() {
        let dir = tempfile::tempdir().unwrap();
        let found = ManifestCapabilityDiscovery::new()
            .discover(dir.path())
            .await
            .unwrap();
        assert!(!found.snapshot.test.available);
        assert!(found.config_files.is_empty());
    }

    #[tokio::test]
    async fn agent_document_is_used_when_valid() {
        let dir = tempfile::tempdir().unwrap();
        let answer = r#"```json
{"test": {"available": true, "command": "make test", "framework": "pytest"},
 "customRules": [{"id": "schema", "command": "make schema"}],
 "configFiles": ["Makefile"]}
```"#;
        let discovery = AgentCapabilityDiscovery::new(
            Arc::new(CannedAgent(AgentResponse::ok(answer))),
            Duration::from_secs(1),
        );
        let found = discovery.discover(dir.path()).await.unwrap();
        assert_eq!(found.snapshot.test.command.as_deref(), Some("make test"));
        assert_eq!(found.snapshot.custom_rules[0].id, "schema");
        assert_eq!(found.config_files, vec!["Makefile"]);
    }

    #[tokio::test]
    async fn agent_failure_falls_back_to_manifests() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("go.mod"), "module example.com/x\n").unwrap();

        for response in [
            AgentResponse::timeout(Duration::from_secs(1)),
            AgentResponse::ok("I could not figure it out"),
        ] {
            let discovery = AgentCapabilityDiscovery::new(
                Arc::new(CannedAgent(response)),
                Duration::from_secs(1),
            );
            let found = discovery.discover(dir.path()).await.unwrap();
            assert_eq!(found.snapshot.test.command.as_deref(), Some("go test ./..."));
            assert_eq!(found.config_files, vec!["go.mod"]);
        }
    }
}
