//! JSON file persistence shared by the capability cache and the verification store.
//!
//! Reads distinguish a missing file from a corrupt one: both are recoverable,
//! but only corruption is worth a warning. Writes go through a temp file and a
//! rename so a crash never leaves a half-written document behind.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::errors::{DomainError, DomainResult};

/// Result of reading a JSON document from disk.
#[derive(Debug)]
pub enum ReadOutcome<T> {
    Loaded(T),
    Missing,
    Corrupt(String),
}

impl<T> ReadOutcome<T> {
    /// The loaded value, treating missing and corrupt alike.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Missing | Self::Corrupt(_) => None,
        }
    }
}

/// Read and parse `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ReadOutcome<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return ReadOutcome::Missing,
        Err(err) => return ReadOutcome::Corrupt(format!("unreadable: {err}")),
    };
    match serde_json::from_str(&content) {
        Ok(value) => ReadOutcome::Loaded(value),
        Err(err) => ReadOutcome::Corrupt(err.to_string()),
    }
}

/// Create `dir` and its parents if needed.
pub fn ensure_dir(dir: &Path) -> DomainResult<()> {
    fs::create_dir_all(dir).map_err(|source| DomainError::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write `content` to `path` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, content: &str) -> DomainResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, content).map_err(|source| DomainError::FileWrite {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        DomainError::FileWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> DomainResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    write_atomic(path, &content)
}

/// Remove a file; a file that is already gone is not an error.
pub fn remove_file_if_exists(path: &Path) -> DomainResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DomainError::FileRemove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Remove a directory tree; a directory that is already gone is not an error.
pub fn remove_dir_if_exists(path: &Path) -> DomainResult<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DomainError::FileRemove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn missing_and_corrupt_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        assert!(matches!(read_json::<Value>(&path), ReadOutcome::Missing));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_json::<Value>(&path), ReadOutcome::Corrupt(_)));
    }

    #[test]
    fn write_json_creates_parents_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        write_json(&path, &serde_json::json!({"a": 1})).unwrap();

        let loaded: Value = read_json(&path).into_option().unwrap();
        assert_eq!(loaded["a"], 1);
        assert!(!dir.path().join("nested").join("doc.json.tmp").exists());
    }

    #[test]
    fn removing_absent_paths_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        remove_file_if_exists(&dir.path().join("nope.json")).unwrap();
        remove_dir_if_exists(&dir.path().join("nope")).unwrap();
    }
}
