//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::totals::DiscountPolicy;
use crate::core::Project;

const DEFAULT_QUOTE_VALIDITY_DAYS: u32 = 15;

/// Shop configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Attendant name recorded on new records
    pub author: Option<String>,

    /// Editor command for `edit` subcommands
    pub editor: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Shop name printed on documents
    pub shop_name: Option<String>,

    /// Days a quote stays valid for approval
    pub quote_validity_days: Option<u32>,

    /// Clamp negative net totals on quotes and work orders as well
    pub uniform_discount_clamp: Option<bool>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let project_dir = Project::discover().ok().map(|p| p.config_dir());
        Self::load_from(project_dir.as_deref())
    }

    /// Load configuration for a known project
    pub fn load_for(project: &Project) -> Self {
        Self::load_from(Some(&project.config_dir()))
    }

    fn load_from(project_config_dir: Option<&Path>) -> Self {
        let mut config = Config::default();

        // Global user config (~/.config/oficina/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // Project config (.oficina/config.yaml)
        if let Some(dir) = project_config_dir {
            if let Some(project_config) = Self::read_file(&dir.join("config.yaml")) {
                config.merge(project_config);
            }
        }

        // Environment variables
        if let Ok(author) = std::env::var("OFICINA_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(editor) = std::env::var("OFICINA_EDITOR") {
            config.editor = Some(editor);
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "oficina")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.editor.is_some() {
            self.editor = other.editor;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.shop_name.is_some() {
            self.shop_name = other.shop_name;
        }
        if other.quote_validity_days.is_some() {
            self.quote_validity_days = other.quote_validity_days;
        }
        if other.uniform_discount_clamp.is_some() {
            self.uniform_discount_clamp = other.uniform_discount_clamp;
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    pub fn shop_name(&self) -> String {
        self.shop_name
            .clone()
            .unwrap_or_else(|| "Oficina".to_string())
    }

    pub fn quote_validity_days(&self) -> u32 {
        self.quote_validity_days
            .unwrap_or(DEFAULT_QUOTE_VALIDITY_DAYS)
    }

    /// Discount policy applied to quotes and work orders
    pub fn document_discount_policy(&self) -> DiscountPolicy {
        if self.uniform_discount_clamp.unwrap_or(false) {
            DiscountPolicy::ClampAtZero
        } else {
            DiscountPolicy::Unclamped
        }
    }

    /// Get the editor command
    pub fn editor(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok())
            .or_else(|| std::env::var("VISUAL").ok())
            .unwrap_or_else(|| "vi".to_string())
    }

    /// Run the editor on a file, handling commands with arguments
    /// (e.g. "code --wait")
    pub fn run_editor(&self, file_path: &Path) -> std::io::Result<std::process::ExitStatus> {
        let editor = self.editor();
        let mut parts = editor.split_whitespace();

        let Some(cmd) = parts.next() else {
            return std::process::Command::new("vi").arg(file_path).status();
        };

        std::process::Command::new(cmd)
            .args(parts)
            .arg(file_path)
            .status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_merge_prefers_later_values() {
        let mut base = Config {
            author: Some("Ana".to_string()),
            quote_validity_days: Some(10),
            ..Default::default()
        };
        base.merge(Config {
            author: Some("Bruno".to_string()),
            ..Default::default()
        });

        assert_eq!(base.author.as_deref(), Some("Bruno"));
        assert_eq!(base.quote_validity_days(), 10);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.quote_validity_days(), 15);
        assert_eq!(config.shop_name(), "Oficina");
        assert_eq!(config.document_discount_policy(), DiscountPolicy::Unclamped);
    }

    #[test]
    fn test_uniform_clamp_switches_policy() {
        let config = Config {
            uniform_discount_clamp: Some(true),
            ..Default::default()
        };
        assert_eq!(config.document_discount_policy(), DiscountPolicy::ClampAtZero);
    }

    #[test]
    fn test_project_config_is_read() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(
            project.config_dir().join("config.yaml"),
            "shop_name: Auto Center Silva\nquote_validity_days: 30\n",
        )
        .unwrap();

        let config = Config::load_for(&project);
        assert_eq!(config.shop_name(), "Auto Center Silva");
        assert_eq!(config.quote_validity_days(), 30);
    }
}
