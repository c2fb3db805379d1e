//! Typed record storage
//!
//! Each record type is reached through a [`Repository`]. The CLI uses the
//! YAML-file implementation; tests and callers that do not need disk use
//! the in-memory one.

use miette::Diagnostic;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::core::loader::{self, LoadError};

#[derive(Debug, Error, Diagnostic)]
pub enum RepositoryError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} already exists")]
    Duplicate(EntityId),

    #[error("{0} does not exist")]
    Missing(EntityId),

    #[error("'{reference}' matches more than one record: {candidates}")]
    Ambiguous {
        reference: String,
        candidates: String,
    },
}

pub trait Repository<T: Entity> {
    /// All records, oldest first
    fn list(&self) -> Result<Vec<T>, RepositoryError>;

    fn find_by_id(&self, id: &EntityId) -> Result<Option<T>, RepositoryError>;

    /// Store a new record; fails if the ID is taken
    fn insert(&mut self, record: T) -> Result<(), RepositoryError>;

    /// Replace an existing record
    fn update(&mut self, record: T) -> Result<(), RepositoryError>;

    fn delete(&mut self, id: &EntityId) -> Result<(), RepositoryError>;

    /// Look a record up by full ID, falling back to a unique partial ID match
    fn find(&self, reference: &str) -> Result<Option<T>, RepositoryError> {
        if let Ok(id) = EntityId::parse(reference) {
            if let Some(record) = self.find_by_id(&id)? {
                return Ok(Some(record));
            }
        }

        let needle = reference.to_uppercase();
        let mut matches: Vec<T> = self
            .list()?
            .into_iter()
            .filter(|r| r.id().to_string().contains(&needle))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(RepositoryError::Ambiguous {
                reference: reference.to_string(),
                candidates: matches
                    .iter()
                    .map(|r| r.id().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Records kept in a `Vec`, in insertion order
#[derive(Debug)]
pub struct MemoryRepository<T> {
    records: Vec<T>,
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Entity> MemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Entity> Repository<T> for MemoryRepository<T> {
    fn list(&self) -> Result<Vec<T>, RepositoryError> {
        Ok(self.records.clone())
    }

    fn find_by_id(&self, id: &EntityId) -> Result<Option<T>, RepositoryError> {
        Ok(self.records.iter().find(|r| r.id() == id).cloned())
    }

    fn insert(&mut self, record: T) -> Result<(), RepositoryError> {
        if self.records.iter().any(|r| r.id() == record.id()) {
            return Err(RepositoryError::Duplicate(record.id().clone()));
        }
        self.records.push(record);
        Ok(())
    }

    fn update(&mut self, record: T) -> Result<(), RepositoryError> {
        let slot = self
            .records
            .iter_mut()
            .find(|r| r.id() == record.id())
            .ok_or_else(|| RepositoryError::Missing(record.id().clone()))?;
        *slot = record;
        Ok(())
    }

    fn delete(&mut self, id: &EntityId) -> Result<(), RepositoryError> {
        let before = self.records.len();
        self.records.retain(|r| r.id() != id);
        if self.records.len() == before {
            return Err(RepositoryError::Missing(id.clone()));
        }
        Ok(())
    }
}

/// One YAML file per record, named `{ID}.yaml`, in a type directory
#[derive(Debug)]
pub struct YamlRepository<T> {
    dir: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Entity> YamlRepository<T> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            _marker: PhantomData,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, id: &EntityId) -> PathBuf {
        self.dir.join(format!("{}.yaml", id))
    }
}

impl<T: Entity> Repository<T> for YamlRepository<T> {
    fn list(&self) -> Result<Vec<T>, RepositoryError> {
        let mut records: Vec<T> = loader::load_all::<T>(&self.dir)?
            .into_iter()
            .map(|(_, record)| record)
            .collect();
        records.sort_by(|a, b| a.created().cmp(&b.created()).then(a.id().cmp(b.id())));
        Ok(records)
    }

    fn find_by_id(&self, id: &EntityId) -> Result<Option<T>, RepositoryError> {
        let path = self.path_of(id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(loader::load_file(&path)?))
    }

    fn insert(&mut self, record: T) -> Result<(), RepositoryError> {
        let path = self.path_of(record.id());
        if path.exists() {
            return Err(RepositoryError::Duplicate(record.id().clone()));
        }
        loader::save_file(&path, &record)?;
        tracing::debug!(id = %record.id(), path = %path.display(), "record created");
        Ok(())
    }

    fn update(&mut self, record: T) -> Result<(), RepositoryError> {
        let path = self.path_of(record.id());
        if !path.exists() {
            return Err(RepositoryError::Missing(record.id().clone()));
        }
        loader::save_file(&path, &record)?;
        tracing::debug!(id = %record.id(), "record updated");
        Ok(())
    }

    fn delete(&mut self, id: &EntityId) -> Result<(), RepositoryError> {
        let path = self.path_of(id);
        if !path.exists() {
            return Err(RepositoryError::Missing(id.clone()));
        }
        std::fs::remove_file(&path)?;
        tracing::debug!(id = %id, "record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: EntityId,
        text: String,
        created: DateTime<Utc>,
    }

    impl Entity for Note {
        const PREFIX: EntityPrefix = EntityPrefix::Cli;

        fn id(&self) -> &EntityId {
            &self.id
        }
        fn title(&self) -> String {
            self.text.clone()
        }
        fn status(&self) -> &str {
            "active"
        }
        fn created(&self) -> DateTime<Utc> {
            self.created
        }
        fn author(&self) -> &str {
            "test"
        }
    }

    fn note(text: &str) -> Note {
        Note {
            id: EntityId::new(EntityPrefix::Cli),
            text: text.to_string(),
            created: Utc::now(),
        }
    }

    fn exercise(repo: &mut dyn Repository<Note>) {
        let a = note("first");
        let b = note("second");
        repo.insert(a.clone()).unwrap();
        repo.insert(b.clone()).unwrap();

        assert!(matches!(
            repo.insert(a.clone()),
            Err(RepositoryError::Duplicate(_))
        ));
        assert_eq!(repo.list().unwrap().len(), 2);

        let mut changed = a.clone();
        changed.text = "edited".to_string();
        repo.update(changed).unwrap();
        assert_eq!(repo.find_by_id(&a.id).unwrap().unwrap().text, "edited");

        let found = repo.find(&b.id.to_string()).unwrap().unwrap();
        assert_eq!(found.text, "second");

        repo.delete(&a.id).unwrap();
        assert!(repo.find_by_id(&a.id).unwrap().is_none());
        assert!(matches!(
            repo.delete(&a.id),
            Err(RepositoryError::Missing(_))
        ));
    }

    #[test]
    fn test_memory_repository() {
        let mut repo = MemoryRepository::<Note>::new();
        exercise(&mut repo);
    }

    #[test]
    fn test_yaml_repository() {
        let tmp = tempdir().unwrap();
        let mut repo = YamlRepository::<Note>::new(tmp.path().join("clientes"));
        exercise(&mut repo);
    }

    #[test]
    fn test_find_by_partial_id() {
        let mut repo = MemoryRepository::<Note>::new();
        let a = note("only");
        repo.insert(a.clone()).unwrap();

        let tail = &a.id.to_string()[20..];
        assert_eq!(repo.find(tail).unwrap().unwrap().id, a.id);
        assert!(repo.find("NOPE").unwrap().is_none());
    }

    #[test]
    fn test_update_missing_fails() {
        let mut repo = MemoryRepository::<Note>::new();
        assert!(matches!(
            repo.update(note("ghost")),
            Err(RepositoryError::Missing(_))
        ));
    }
}
