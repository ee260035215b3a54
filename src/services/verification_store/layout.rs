//! Paths of the verification store under a project's state directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::errors::{DomainError, DomainResult};

pub const VERIFICATION_DIR: &str = "verification";
pub const INDEX_FILE: &str = "index.json";
pub const LEGACY_FILE: &str = "results.json";
pub const BACKUP_SUFFIX: &str = ".bak";
pub const LOCK_FILE: &str = ".lock";

/// Resolved locations of every file the store touches for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    /// Layout for `project`, with state kept in `state_dir` (relative to the
    /// project unless absolute).
    pub fn new(project: &Path, state_dir: &Path) -> Self {
        Self {
            root: project.join(state_dir).join(VERIFICATION_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn legacy_path(&self) -> PathBuf {
        self.root.join(LEGACY_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.root.join(format!("{LEGACY_FILE}{BACKUP_SUFFIX}"))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    pub fn feature_dir(&self, feature_id: &str) -> PathBuf {
        self.root.join(feature_dir_name(feature_id))
    }

    pub fn metadata_path(&self, feature_id: &str, run: u32) -> PathBuf {
        self.feature_dir(feature_id).join(format!("{}.json", run_id(run)))
    }

    pub fn report_path(&self, feature_id: &str, run: u32) -> PathBuf {
        self.feature_dir(feature_id).join(format!("{}.md", run_id(run)))
    }
}

/// Fixed-width run identifier: `001`, `002`, ...
pub fn run_id(run: u32) -> String {
    format!("{run:03}")
}

/// Directory name for a feature id.
///
/// `[A-Za-z0-9._-]` is kept and every other byte, `%` included, becomes
/// `%XX`, so distinct ids never share a directory. A name made only of dots
/// has its dots encoded and the empty id maps to `%`.
pub fn feature_dir_name(feature_id: &str) -> String {
    if feature_id.is_empty() {
        return "%".to_string();
    }
    let dots_only = feature_id.bytes().all(|b| b == b'.');
    let mut name = String::with_capacity(feature_id.len());
    for byte in feature_id.bytes() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'_' | b'-')
            || (byte == b'.' && !dots_only);
        if keep {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("%{byte:02X}"));
        }
    }
    name
}

/// Run numbers with a metadata file in `dir`, ascending. A missing directory
/// has none.
pub fn recorded_runs(dir: &Path) -> DomainResult<Vec<u32>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(DomainError::FileRead {
                path: dir.to_path_buf(),
                source,
            })
        }
    };
    let mut runs: Vec<u32> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name();
            let stem = name.to_str()?.strip_suffix(".json")?;
            if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            stem.parse().ok()
        })
        .collect();
    runs.sort_unstable();
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_zero_padded() {
        assert_eq!(run_id(1), "001");
        assert_eq!(run_id(42), "042");
        assert_eq!(run_id(1000), "1000");
    }

    #[test]
    fn feature_names_are_encoded() {
        assert_eq!(feature_dir_name("auth.login"), "auth.login");
        assert_eq!(feature_dir_name("auth_login"), "auth_login");
        assert_eq!(feature_dir_name("auth/login flow"), "auth%2Flogin%20flow");
        assert_eq!(feature_dir_name("100%"), "100%25");
        assert_eq!(feature_dir_name(".."), "%2E%2E");
        assert_eq!(feature_dir_name("."), "%2E");
        assert_eq!(feature_dir_name(""), "%");
        assert_eq!(feature_dir_name("café"), "caf%C3%A9");
    }

    #[test]
    fn ids_that_used_to_collide_get_their_own_directory() {
        let ids = ["auth/login", "auth_login", "auth%2Flogin", "auth login", "auth\\login"];
        let mut names: Vec<String> = ids.iter().map(|id| feature_dir_name(id)).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ids.len());
    }

    #[test]
    fn recorded_runs_reads_metadata_files_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["001.json", "001.md", "003.json", "index.json", "002.json.tmp"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        assert_eq!(recorded_runs(dir.path()).unwrap(), vec![1, 3]);
        assert!(recorded_runs(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn paths_nest_under_state_dir() {
        let layout = StoreLayout::new(Path::new("/p"), Path::new(".attestor"));
        assert_eq!(layout.index_path(), Path::new("/p/.attestor/verification/index.json"));
        assert_eq!(
            layout.metadata_path("auth.login", 2),
            Path::new("/p/.attestor/verification/auth.login/002.json")
        );
        assert_eq!(
            layout.backup_path(),
            Path::new("/p/.attestor/verification/results.json.bak")
        );
    }
}
