//! Shop project discovery and directory layout

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};

/// Name of the marker directory holding config and indexes
pub const PROJECT_DIR: &str = ".oficina";

/// Represents a shop project on disk
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .oficina/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::write_structure(root)
    }

    /// Initialize even if .oficina/ exists (config is rewritten, records kept)
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_structure(root)
    }

    fn write_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let marker = root.join(PROJECT_DIR);
        std::fs::create_dir_all(&marker).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(marker.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        for prefix in EntityPrefix::all() {
            std::fs::create_dir_all(root.join(Self::entity_directory(*prefix)))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Oficina project configuration

# Default attendant name recorded on new records (falls back to git user / $USER)
# author: ""

# Shop name printed on quotes, work orders and receipts
# shop_name: ""

# Editor used by `edit` subcommands (default: $EDITOR)
# editor: ""

# Default output format (auto, yaml, tsv, json, csv, md, id, short-id)
# default_format: auto

# Days a quote stays valid for approval
# quote_validity_days: 15

# Clamp negative net totals to zero on quotes and work orders too
# (the point of sale always clamps)
# uniform_discount_clamp: false
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .oficina configuration directory
    pub fn config_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Directory holding records of the given type
    pub fn entity_dir(&self, prefix: EntityPrefix) -> PathBuf {
        self.root.join(Self::entity_directory(prefix))
    }

    /// Path of the file for a record
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.entity_dir(id.prefix()).join(format!("{}.yaml", id))
    }

    /// Relative directory for a record type
    pub fn entity_directory(prefix: EntityPrefix) -> &'static str {
        match prefix {
            EntityPrefix::Cli => "cadastros/clientes",
            EntityPrefix::Vei => "cadastros/veiculos",
            EntityPrefix::Fun => "cadastros/funcionarios",
            EntityPrefix::Svc => "catalogo/servicos",
            EntityPrefix::Pec => "catalogo/pecas",
            EntityPrefix::Orc => "orcamentos",
            EntityPrefix::Os => "ordens",
            EntityPrefix::Vnd => "vendas",
            EntityPrefix::Agd => "agenda",
            EntityPrefix::Chk => "checklists/modelos",
            EntityPrefix::Ins => "checklists/inspecoes",
        }
    }

    /// Iterate all record files of a given type
    pub fn iter_entity_files(&self, prefix: EntityPrefix) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(self.entity_dir(prefix))
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "yaml"))
            .map(|e| e.path().to_path_buf())
    }

    /// Iterate every record file in the project
    pub fn iter_all_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        EntityPrefix::all()
            .iter()
            .flat_map(move |prefix| self.iter_entity_files(*prefix))
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not an oficina project (searched from {searched_from:?}). Run 'oficina init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("oficina project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.config_dir().join("config.yaml").exists());
        assert!(project.root().join("cadastros/clientes").is_dir());
        assert!(project.root().join("cadastros/veiculos").is_dir());
        assert!(project.root().join("orcamentos").is_dir());
        assert!(project.root().join("ordens").is_dir());
        assert!(project.root().join("checklists/inspecoes").is_dir());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_project_discover_from_nested_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("orcamentos/2026");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_marker() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn test_entity_path_uses_type_directory() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let id = EntityId::new(EntityPrefix::Os);

        let path = project.entity_path(&id);
        assert!(path.starts_with(project.root().join("ordens")));
        assert!(path.to_string_lossy().ends_with(".yaml"));
    }
}
