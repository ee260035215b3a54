//! Test discovery and selective test execution.
//!
//! Maps a change (or a feature's declared pattern) to the smallest test
//! selection that still covers it, then turns that selection into a command
//! in the detected framework's idiom.
//!
//! The cascade is an ordered list of named strategies; the first one that
//! produces a selection wins:
//!
//! 1. [`DiscoveryStrategy::ExplicitPattern`] - the feature's declared pattern
//! 2. [`DiscoveryStrategy::ChangedFileMapping`] - test files mapped from changed sources that exist on disk
//! 3. [`DiscoveryStrategy::ModuleFallback`] - a glob scoped to the feature's (or first changed) module
//!
//! With no changed files, or when nothing matches, the result is
//! [`DiscoverySource::None`] and the full suite runs.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::instrument;

use crate::domain::models::{
    CapabilitySnapshot, DiscoverySource, Feature, TestDiscoveryResult, TestFramework,
};
use crate::domain::ports::VersionControl;

/// Directories treated as the root of source code when mirroring paths and
/// extracting module names.
pub const SOURCE_ROOTS: &[&str] = &["src", "lib", "app"];

/// Directories that mirror a source root.
const TEST_ROOTS: &[&str] = &["tests", "test", "__tests__"];

/// Strategies of the discovery cascade, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    ExplicitPattern,
    ChangedFileMapping,
    ModuleFallback,
}

impl DiscoveryStrategy {
    pub const CASCADE: [Self; 3] = [
        Self::ExplicitPattern,
        Self::ChangedFileMapping,
        Self::ModuleFallback,
    ];

    /// Apply this strategy. `changed` is already de-duplicated and non-empty
    /// for the change-driven strategies.
    pub fn apply(
        self,
        feature: &Feature,
        changed: &[String],
        exists: &dyn Fn(&str) -> bool,
    ) -> Option<TestDiscoveryResult> {
        match self {
            Self::ExplicitPattern => feature.explicit_test_pattern().map(|pattern| {
                TestDiscoveryResult::new(DiscoverySource::Explicit, Some(pattern.to_string()), Vec::new())
            }),
            Self::ChangedFileMapping => {
                let files = select_existing_tests(changed, exists);
                (!files.is_empty())
                    .then(|| TestDiscoveryResult::new(DiscoverySource::AutoDetected, None, files))
            }
            Self::ModuleFallback => {
                let module = feature
                    .module
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .or_else(|| changed.iter().find_map(|p| extract_module(p)))?;
                Some(TestDiscoveryResult::new(
                    DiscoverySource::ModuleBased,
                    Some(format!("**/{module}/**")),
                    Vec::new(),
                ))
            }
        }
    }
}

/// Discovers the tests relevant to a feature's change.
pub struct TestDiscovery {
    vcs: Arc<dyn VersionControl>,
}

impl TestDiscovery {
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self { vcs }
    }

    /// Run the cascade for `feature`. When `changed_files` is `None` the
    /// change set comes from version control.
    #[instrument(skip(self, feature, changed_files), fields(feature = %feature.id))]
    pub async fn discover(
        &self,
        project: &Path,
        feature: &Feature,
        changed_files: Option<Vec<String>>,
    ) -> TestDiscoveryResult {
        let exists = |p: &str| project.join(p).is_file();

        if let Some(result) = DiscoveryStrategy::ExplicitPattern.apply(feature, &[], &exists) {
            tracing::debug!(pattern = ?result.pattern, "using explicit test pattern");
            return result;
        }

        let changed = match changed_files {
            Some(files) => files,
            None => self.vcs.changed_files(project).await,
        };
        let changed = dedup_paths(changed);
        if changed.is_empty() {
            tracing::debug!("no changed files; running the full suite");
            return TestDiscoveryResult::none();
        }

        let result = discover_from_changes(feature, &changed, &exists);
        tracing::debug!(
            source = %result.source,
            pattern = ?result.pattern,
            test_files = result.test_files.len(),
            "test discovery complete"
        );
        result
    }
}

/// The change-driven part of the cascade, for an already-known change set.
pub fn discover_from_changes(
    feature: &Feature,
    changed: &[String],
    exists: &dyn Fn(&str) -> bool,
) -> TestDiscoveryResult {
    if changed.is_empty() {
        return TestDiscoveryResult::none();
    }
    DiscoveryStrategy::CASCADE
        .iter()
        .find_map(|strategy| strategy.apply(feature, changed, exists))
        .unwrap_or_else(TestDiscoveryResult::none)
}

/// Normalize separators, drop blanks and duplicates, keep first-seen order.
fn dedup_paths(paths: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .map(|p| normalize(&p))
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect()
}

fn normalize(path: &str) -> String {
    path.trim().replace('\\', "/").trim_start_matches("./").to_string()
}

/// Changed test files plus existing test files mapped from changed sources,
/// in order, without duplicates.
pub fn select_existing_tests(changed: &[String], exists: &dyn Fn(&str) -> bool) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for path in changed {
        let path = normalize(path);
        if is_test_file(&path) {
            if exists(&path) && seen.insert(path.clone()) {
                selected.push(path);
            }
            continue;
        }
        for candidate in map_source_to_test_files(&path) {
            if exists(&candidate) && seen.insert(candidate.clone()) {
                selected.push(candidate);
            }
        }
    }
    selected
}

/// Whether a path already looks like a test.
pub fn is_test_file(path: &str) -> bool {
    let path = normalize(path);
    let segments: Vec<&str> = path.split('/').collect();
    let Some(file) = segments.last() else {
        return false;
    };
    let dirs = &segments[..segments.len() - 1];

    if dirs.iter().any(|d| TEST_ROOTS.contains(d)) {
        return true;
    }
    let (stem, _) = split_extension(file);
    stem.ends_with(".test")
        || stem.ends_with(".spec")
        || stem.ends_with("_test")
        || stem.ends_with("_spec")
        || (file.ends_with(".py") && stem.starts_with("test_"))
}

fn split_extension(file: &str) -> (&str, Option<&str>) {
    match file.rfind('.') {
        Some(idx) if idx > 0 => (&file[..idx], Some(&file[idx + 1..])),
        _ => (file, None),
    }
}

fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// Ordered candidate test locations for a source file.
///
/// For `src/auth/login.ts` this yields, among others,
/// `src/auth/login.test.ts`, `src/auth/__tests__/login.test.ts` and
/// `tests/auth/login.test.ts`.
pub fn map_source_to_test_files(source: &str) -> Vec<String> {
    let source = normalize(source);
    let segments: Vec<&str> = source.split('/').collect();
    let Some((file, dir_segments)) = segments.split_last() else {
        return Vec::new();
    };
    let (stem, ext) = split_extension(file);
    let Some(ext) = ext else {
        return Vec::new();
    };
    let dir = dir_segments.join("/");

    let mut candidates = Vec::new();
    let mut push = |c: String| {
        if !candidates.contains(&c) {
            candidates.push(c);
        }
    };

    for kind in ["test", "spec"] {
        push(join(&[&dir, &format!("{stem}.{kind}.{ext}")]));
    }
    for kind in ["test", "spec"] {
        push(join(&[&dir, "__tests__", &format!("{stem}.{kind}.{ext}")]));
    }

    let root_idx = dir_segments.iter().position(|s| SOURCE_ROOTS.contains(s));
    if let Some(idx) = root_idx {
        let prefix = dir_segments[..idx].join("/");
        let relative = dir_segments[idx + 1..].join("/");
        for test_root in TEST_ROOTS {
            for kind in ["test", "spec"] {
                push(join(&[&prefix, test_root, &relative, &format!("{stem}.{kind}.{ext}")]));
            }
        }
    }

    match ext {
        "py" => {
            push(join(&[&dir, &format!("test_{stem}.py")]));
            push(join(&[&dir, &format!("{stem}_test.py")]));
            let (prefix, relative) = root_idx.map_or_else(
                || (String::new(), dir.clone()),
                |idx| (dir_segments[..idx].join("/"), dir_segments[idx + 1..].join("/")),
            );
            push(join(&[&prefix, "tests", &relative, &format!("test_{stem}.py")]));
            push(join(&[&prefix, "tests", &format!("test_{stem}.py")]));
        }
        "go" => push(join(&[&dir, &format!("{stem}_test.go")])),
        "rs" => {
            let prefix = root_idx.map_or_else(String::new, |idx| dir_segments[..idx].join("/"));
            push(join(&[&prefix, "tests", &format!("{stem}.rs")]));
            push(join(&[&prefix, "tests", &format!("{stem}_test.rs")]));
        }
        "rb" => {
            let prefix = root_idx.map_or_else(String::new, |idx| dir_segments[..idx].join("/"));
            let relative = root_idx.map_or_else(|| dir.clone(), |idx| dir_segments[idx + 1..].join("/"));
            push(join(&[&prefix, "spec", &relative, &format!("{stem}_spec.rb")]));
        }
        _ => {}
    }

    candidates
}

/// Module name of a changed path: the first segment under a source root,
/// else the first segment. A bare file contributes its stem.
pub fn extract_module(path: &str) -> Option<String> {
    let path = normalize(path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let start = segments
        .iter()
        .position(|s| SOURCE_ROOTS.contains(s))
        .map_or(0, |idx| idx + 1);
    let segment = segments.get(start).or_else(|| segments.first())?;
    let name = if start + 1 >= segments.len() || segments.len() == 1 {
        split_extension(segment).0
    } else {
        segment
    };
    (!name.is_empty()).then(|| name.to_string())
}

fn has_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// A plain filter token from a glob: the literal path prefix, or the literal
/// segments when the glob starts with a wildcard.
pub fn filter_token(pattern: &str) -> String {
    let prefix_end = pattern.find(['*', '?', '[', '{']).unwrap_or(pattern.len());
    let prefix = pattern[..prefix_end].trim_matches('/');
    if !prefix.is_empty() {
        return prefix.to_string();
    }
    let literal: Vec<&str> = pattern
        .split('/')
        .filter(|s| !s.is_empty() && !has_glob(s))
        .collect();
    if literal.is_empty() {
        pattern.to_string()
    } else {
        literal.join("/")
    }
}

/// Whether a command invokes a package-manager script, which needs `--`
/// before forwarded arguments.
fn is_package_script(command: &str) -> bool {
    let words: Vec<&str> = command.split_whitespace().collect();
    match words.as_slice() {
        [pm, "test", ..] | [pm, "run", _, ..] => matches!(*pm, "npm" | "yarn" | "pnpm" | "bun"),
        _ => false,
    }
}

/// Whether extra arguments can safely be appended to a command.
pub fn is_appendable(command: &str) -> bool {
    !["&&", "||", "|", ";", ">", "<", "`", "$("]
        .iter()
        .any(|op| command.contains(op))
}

/// Append `args`, inserting `--` for package-manager scripts.
pub fn append_args(base: &str, args: &str) -> String {
    if is_package_script(base) && !base.split_whitespace().any(|w| w == "--") {
        format!("{base} -- {args}")
    } else {
        format!("{base} {args}")
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

fn file_command(framework: TestFramework, base: &str, files: &[String]) -> Option<String> {
    match framework {
        TestFramework::Vitest | TestFramework::Jest | TestFramework::Mocha => {
            Some(append_args(base, &files.join(" ")))
        }
        TestFramework::Pytest => {
            if base.contains("pytest") {
                Some(format!("{base} {}", files.join(" ")))
            } else {
                Some(format!("pytest {}", files.join(" ")))
            }
        }
        TestFramework::GoTest => {
            let mut packages: Vec<String> = Vec::new();
            for file in files {
                let dir = file.rsplit_once('/').map_or(".", |(d, _)| d);
                let package = if dir == "." { "./".to_string() } else { format!("./{dir}") };
                if !packages.contains(&package) {
                    packages.push(package);
                }
            }
            Some(format!("go test {}", packages.join(" ")))
        }
        TestFramework::Cargo => {
            let targets: Vec<String> = files
                .iter()
                .filter_map(|f| {
                    let (dir, file) = f.rsplit_once('/')?;
                    (dir == "tests" || dir.ends_with("/tests"))
                        .then(|| format!("--test {}", split_extension(file).0))
                })
                .collect();
            (!targets.is_empty()).then(|| format!("{base} {}", targets.join(" ")))
        }
        TestFramework::Unknown => None,
    }
}

fn pattern_command(framework: TestFramework, base: &str, pattern: &str) -> String {
    let token = filter_token(pattern);
    match framework {
        TestFramework::Vitest => append_args(base, &quote(&token)),
        TestFramework::Jest => append_args(base, &format!("--testPathPattern {}", quote(&token))),
        TestFramework::Mocha => append_args(base, &format!("--grep {}", quote(&token))),
        TestFramework::Pytest => append_args(base, &format!("-k {}", quote(&token))),
        TestFramework::GoTest => format!("{base} -run {}", quote(&token)),
        TestFramework::Cargo => format!("{base} {}", quote(&token)),
        TestFramework::Unknown => {
            if is_appendable(base) {
                append_args(base, pattern)
            } else {
                base.to_string()
            }
        }
    }
}

/// Command running the selected tests, or `None` when the project has no
/// runnable test command.
pub fn build_test_command(
    capabilities: &CapabilitySnapshot,
    selection: &TestDiscoveryResult,
) -> Option<String> {
    let base = capabilities.test.runnable_command()?;
    if selection.source == DiscoverySource::None {
        return Some(base.to_string());
    }
    let framework = capabilities.test_framework();

    if !selection.test_files.is_empty() {
        if let Some(command) = file_command(framework, base, &selection.test_files) {
            return Some(command);
        }
    }

    if let Some(pattern) = selection.pattern.as_deref() {
        if !has_glob(pattern) && framework.accepts_file_arguments() {
            if let Some(command) = file_command(framework, base, &[pattern.to_string()]) {
                return Some(command);
            }
        }
        return Some(pattern_command(framework, base, pattern));
    }

    if !selection.test_files.is_empty() && is_appendable(base) {
        return Some(append_args(base, &selection.test_files.join(" ")));
    }
    Some(base.to_string())
}

/// Concrete test files behind a selection: the discovered list, or the files
/// on disk matching its pattern.
pub fn resolve_test_files(project: &Path, selection: &TestDiscoveryResult) -> Vec<String> {
    if !selection.test_files.is_empty() {
        return selection.test_files.clone();
    }
    let Some(pattern) = selection.pattern.as_deref() else {
        return Vec::new();
    };
    let root = glob::Pattern::escape(&project.to_string_lossy());
    let full = Path::new(&root).join(pattern);
    let Ok(entries) = glob::glob(&full.to_string_lossy()) else {
        tracing::debug!(pattern, "invalid test pattern");
        return Vec::new();
    };
    let mut files: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .filter_map(|p| {
            p.strip_prefix(project)
                .ok()
                .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        })
        .filter(|p| is_test_file(p))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CommandCapability, TestRequirements, UnitTestRequirement};

    fn feature_with_pattern(pattern: Option<&str>) -> Feature {
        let mut feature = Feature::new("auth.login", "login");
        feature.test_requirements = Some(TestRequirements {
            unit: Some(UnitTestRequirement {
                required: true,
                pattern: pattern.map(str::to_string),
            }),
            e2e: None,
        });
        feature
    }

    fn snapshot(command: &str, framework: &str) -> CapabilitySnapshot {
        let mut s = CapabilitySnapshot::empty();
        s.test = CommandCapability::with_command(command, Some(framework));
        s
    }

    #[test]
    fn maps_typescript_source_to_conventional_locations() {
        let candidates = map_source_to_test_files("src/auth/login.ts");
        for expected in [
            "src/auth/login.test.ts",
            "src/auth/login.spec.ts",
            "src/auth/__tests__/login.test.ts",
            "tests/auth/login.test.ts",
            "test/auth/login.test.ts",
            "__tests__/auth/login.test.ts",
        ] {
            assert!(candidates.contains(&expected.to_string()), "missing {expected}");
        }
        assert_eq!(candidates[0], "src/auth/login.test.ts");
    }

    #[test]
    fn maps_language_specific_conventions() {
        assert!(map_source_to_test_files("pkg/auth/login.go").contains(&"pkg/auth/login_test.go".to_string()));

        let py = map_source_to_test_files("src/auth/login.py");
        assert!(py.contains(&"src/auth/test_login.py".to_string()));
        assert!(py.contains(&"tests/auth/test_login.py".to_string()));
        assert!(py.contains(&"tests/test_login.py".to_string()));

        assert!(map_source_to_test_files("src/parser.rs").contains(&"tests/parser.rs".to_string()));
    }

    #[test]
    fn mirrors_nested_source_roots() {
        let candidates = map_source_to_test_files("packages/api/src/auth/login.ts");
        assert!(candidates.contains(&"packages/api/tests/auth/login.test.ts".to_string()));
    }

    #[test]
    fn recognizes_test_files() {
        assert!(is_test_file("src/auth/login.test.ts"));
        assert!(is_test_file("src/auth/__tests__/login.ts"));
        assert!(is_test_file("tests/test_login.py"));
        assert!(is_test_file("pkg/login_test.go"));
        assert!(!is_test_file("src/auth/login.ts"));
        assert!(!is_test_file("src/testing/helpers.ts"));
    }

    #[test]
    fn extracts_modules() {
        assert_eq!(extract_module("src/auth/login.ts").as_deref(), Some("auth"));
        assert_eq!(extract_module("packages/web/lib/cart/x.ts").as_deref(), Some("cart"));
        assert_eq!(extract_module("docs/readme.md").as_deref(), Some("docs"));
        assert_eq!(extract_module("src/main.rs").as_deref(), Some("main"));
        assert_eq!(extract_module("README.md").as_deref(), Some("README"));
    }

    #[test]
    fn explicit_pattern_wins_over_changes() {
        let feature = feature_with_pattern(Some("tests/auth/**"));
        let exists = |_: &str| true;
        let changed = vec!["src/auth/login.ts".to_string()];
        let result = DiscoveryStrategy::CASCADE
            .iter()
            .find_map(|s| s.apply(&feature, &changed, &exists))
            .unwrap();
        assert_eq!(result.source, DiscoverySource::Explicit);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert!(result.test_files.is_empty());
    }

    #[test]
    fn auto_detection_keeps_changed_tests_and_dedups() {
        let feature = feature_with_pattern(None);
        let on_disk = ["src/auth/login.test.ts", "tests/auth/login.test.ts"];
        let exists = |p: &str| on_disk.contains(&p);
        let changed = vec![
            "src/auth/login.test.ts".to_string(),
            "src/auth/login.ts".to_string(),
        ];
        let result = discover_from_changes(&feature, &changed, &exists);
        assert_eq!(result.source, DiscoverySource::AutoDetected);
        assert_eq!(
            result.test_files,
            vec!["src/auth/login.test.ts", "tests/auth/login.test.ts"]
        );
    }

    #[test]
    fn module_fallback_prefers_declared_module() {
        let mut feature = feature_with_pattern(None);
        let exists = |_: &str| false;
        let changed = vec!["src/billing/invoice.ts".to_string()];

        let result = discover_from_changes(&feature, &changed, &exists);
        assert_eq!(result.source, DiscoverySource::ModuleBased);
        assert_eq!(result.pattern.as_deref(), Some("**/billing/**"));

        feature.module = Some("auth".into());
        let result = discover_from_changes(&feature, &changed, &exists);
        assert_eq!(result.pattern.as_deref(), Some("**/auth/**"));
        assert!((result.confidence - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn no_changes_means_full_suite() {
        let feature = feature_with_pattern(None);
        let result = discover_from_changes(&feature, &[], &|_| true);
        assert_eq!(result.source, DiscoverySource::None);
        let cmd = build_test_command(&snapshot("npm test", "vitest"), &result);
        assert_eq!(cmd.as_deref(), Some("npm test"));
    }

    #[test]
    fn file_arguments_follow_framework_idiom() {
        let selection = TestDiscoveryResult::new(
            DiscoverySource::AutoDetected,
            None,
            vec!["src/a.test.ts".into(), "src/b.test.ts".into()],
        );
        assert_eq!(
            build_test_command(&snapshot("npm test", "vitest"), &selection).as_deref(),
            Some("npm test -- src/a.test.ts src/b.test.ts")
        );
        assert_eq!(
            build_test_command(&snapshot("npx jest", "jest"), &selection).as_deref(),
            Some("npx jest src/a.test.ts src/b.test.ts")
        );

        let go = TestDiscoveryResult::new(
            DiscoverySource::AutoDetected,
            None,
            vec!["pkg/auth/login_test.go".into(), "pkg/auth/token_test.go".into()],
        );
        assert_eq!(
            build_test_command(&snapshot("go test ./...", "go"), &go).as_deref(),
            Some("go test ./pkg/auth")
        );

        let cargo = TestDiscoveryResult::new(
            DiscoverySource::AutoDetected,
            None,
            vec!["tests/parser.rs".into()],
        );
        assert_eq!(
            build_test_command(&snapshot("cargo test", "cargo"), &cargo).as_deref(),
            Some("cargo test --test parser")
        );
    }

    #[test]
    fn patterns_become_name_filters() {
        let selection =
            TestDiscoveryResult::new(DiscoverySource::ModuleBased, Some("**/auth/**".into()), vec![]);
        assert_eq!(
            build_test_command(&snapshot("npm test", "jest"), &selection).as_deref(),
            Some("npm test -- --testPathPattern \"auth\"")
        );
        assert_eq!(
            build_test_command(&snapshot("pytest", "pytest"), &selection).as_deref(),
            Some("pytest -k \"auth\"")
        );
        assert_eq!(
            build_test_command(&snapshot("npx mocha", "mocha"), &selection).as_deref(),
            Some("npx mocha --grep \"auth\"")
        );
    }

    #[test]
    fn unknown_framework_appends_only_when_safe() {
        let selection =
            TestDiscoveryResult::new(DiscoverySource::Explicit, Some("tests/auth/*".into()), vec![]);
        assert_eq!(
            build_test_command(&snapshot("make test", "custom"), &selection).as_deref(),
            Some("make test tests/auth/*")
        );
        assert_eq!(
            build_test_command(&snapshot("make build && make test", "custom"), &selection).as_deref(),
            Some("make build && make test")
        );
    }

    #[test]
    fn unavailable_test_capability_yields_no_command() {
        let selection = TestDiscoveryResult::none();
        assert_eq!(build_test_command(&CapabilitySnapshot::empty(), &selection), None);
    }

    #[test]
    fn filter_tokens() {
        assert_eq!(filter_token("tests/auth/**/*.test.ts"), "tests/auth");
        assert_eq!(filter_token("**/auth/**"), "auth");
        assert_eq!(filter_token("*.test.ts"), "*.test.ts");
    }

    #[test]
    fn resolves_pattern_to_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tests/auth")).unwrap();
        std::fs::write(dir.path().join("tests/auth/login.test.ts"), "").unwrap();
        std::fs::write(dir.path().join("tests/auth/fixtures.json"), "").unwrap();

        let selection =
            TestDiscoveryResult::new(DiscoverySource::Explicit, Some("tests/auth/**/*".into()), vec![]);
        assert_eq!(resolve_test_files(dir.path(), &selection), vec!["tests/auth/login.test.ts"]);

        let empty =
            TestDiscoveryResult::new(DiscoverySource::Explicit, Some("tests/none/**/*".into()), vec![]);
        assert!(resolve_test_files(dir.path(), &empty).is_empty());
    }

    #[test]
    fn resolves_pattern_under_a_project_path_with_glob_characters() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("proj[1]");
        std::fs::create_dir_all(project.join("tests")).unwrap();
        std::fs::write(project.join("tests/login.test.ts"), "").unwrap();

        let selection =
            TestDiscoveryResult::new(DiscoverySource::Explicit, Some("tests/*.test.ts".into()), vec![]);
        assert_eq!(resolve_test_files(&project, &selection), vec!["tests/login.test.ts"]);
    }
}
