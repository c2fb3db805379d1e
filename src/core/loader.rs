//! Record file loading helpers
//!
//! Reading and writing single YAML record files. The typed repositories in
//! [`crate::core::repository`] build on these.

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to serialize record: {0}")]
    Serialize(String),
}

/// Load all records of type T from a directory.
///
/// Files that fail to parse are skipped with a warning so one bad file
/// does not hide the rest of the registry.
pub fn load_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<(PathBuf, T)>, LoadError> {
    let mut records = Vec::new();

    if !dir.exists() {
        return Ok(records);
    }

    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "yaml"))
        .collect();
    paths.sort();

    for path in paths {
        match load_file::<T>(&path) {
            Ok(record) => records.push((path, record)),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable record"),
        }
    }

    Ok(records)
}

/// Find a record file by ID (exact stem first, then partial match)
pub fn find_entity_file(dir: &Path, id: &str) -> Option<PathBuf> {
    let exact = dir.join(format!("{}.yaml", id));
    if exact.exists() {
        return Some(exact);
    }

    let needle = id.to_uppercase();
    fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "yaml"))
        .find(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.to_uppercase().contains(&needle))
        })
}

/// Deserialize one record file
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yml::from_str(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Serialize a record and write it to disk
pub fn save_file<T: Serialize>(path: &Path, record: &T) -> Result<(), LoadError> {
    let yaml = serde_yml::to_string(record).map_err(|e| LoadError::Serialize(e.to_string()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| LoadError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, yaml).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_all_nonexistent_dir() {
        let records: Vec<(PathBuf, serde_json::Value)> =
            load_all(Path::new("/nonexistent/path")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_load_all_skips_broken_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("CLI-A.yaml"), "name: Ana\n").unwrap();
        fs::write(dir.path().join("CLI-B.yaml"), "name: [unclosed\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let records: Vec<(PathBuf, serde_json::Value)> = load_all(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1["name"], "Ana");
    }

    #[test]
    fn test_find_entity_file_partial() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("ORC-01J123456789ABCDEF.yaml");
        fs::write(&file_path, "id: ORC-01J123456789ABCDEF").unwrap();

        assert_eq!(
            find_entity_file(dir.path(), "ORC-01J123456789ABCDEF"),
            Some(file_path.clone())
        );
        assert_eq!(find_entity_file(dir.path(), "01j1234"), Some(file_path));
        assert!(find_entity_file(dir.path(), "ZZZ").is_none());
    }

    #[test]
    fn test_save_then_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/VEI-1.yaml");
        save_file(&path, &serde_json::json!({"plate": "ABC1D23"})).unwrap();

        let value: serde_json::Value = load_file(&path).unwrap();
        assert_eq!(value["plate"], "ABC1D23");
    }
}
