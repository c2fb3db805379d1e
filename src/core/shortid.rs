//! Short ID system for easier record selection
//!
//! Each record gets a per-type alias like `ORC@1` or `CLI@12` the first time
//! it is created or listed. Aliases are persisted in `.oficina/shortids.json`
//! so they stay stable between invocations.

use std::collections::HashMap;
use std::fs;

use crate::core::identity::EntityPrefix;
use crate::core::project::{Project, PROJECT_DIR};

const INDEX_FILE: &str = "shortids.json";

/// A mapping of short IDs (PREFIX@N) to full record IDs
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ShortIdIndex {
    /// Maps "ORC@1" to the full record ID
    entries: HashMap<String, String>,
    /// Full ID to short alias
    #[serde(skip)]
    reverse: HashMap<String, String>,
    /// Next free number per prefix
    next: HashMap<String, u32>,
}

impl ShortIdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index from a project, or create an empty one
    pub fn load(project: &Project) -> Self {
        let path = project.root().join(PROJECT_DIR).join(INDEX_FILE);
        let Ok(content) = fs::read_to_string(&path) else {
            return Self::new();
        };

        match serde_json::from_str::<ShortIdIndex>(&content) {
            Ok(mut index) => {
                index.reverse = index
                    .entries
                    .iter()
                    .map(|(short, full)| (full.clone(), short.clone()))
                    .collect();
                index
            }
            Err(e) => {
                tracing::warn!(error = %e, "short ID index is corrupt, starting over");
                Self::new()
            }
        }
    }

    pub fn save(&self, project: &Project) -> std::io::Result<()> {
        let path = project.root().join(PROJECT_DIR).join(INDEX_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    /// Add a record ID and return its alias. Existing IDs keep their alias.
    pub fn add(&mut self, entity_id: String) -> String {
        if let Some(short) = self.reverse.get(&entity_id) {
            return short.clone();
        }

        let prefix = entity_id
            .split_once('-')
            .map(|(p, _)| p.to_uppercase())
            .unwrap_or_else(|| "ID".to_string());

        let counter = self.next.entry(prefix.clone()).or_insert(1);
        let short = format!("{}@{}", prefix, counter);
        *counter += 1;

        self.entries.insert(short.clone(), entity_id.clone());
        self.reverse.insert(entity_id, short.clone());
        short
    }

    /// Assign aliases to every ID not yet indexed
    pub fn ensure_all(&mut self, entity_ids: impl IntoIterator<Item = String>) {
        for id in entity_ids {
            self.add(id);
        }
    }

    /// Resolve a reference to a full record ID.
    ///
    /// `ORC@3` (any case) is looked up in the index; anything else is passed
    /// through unchanged for exact or partial matching by the caller.
    pub fn resolve(&self, reference: &str) -> Option<String> {
        let Some((prefix, number)) = reference.split_once('@') else {
            return Some(reference.to_string());
        };

        let prefix: EntityPrefix = prefix.parse().ok()?;
        let number: u32 = number.parse().ok()?;
        self.entries
            .get(&format!("{}@{}", prefix, number))
            .cloned()
    }

    /// Get the alias for a full record ID
    pub fn get_short_id(&self, entity_id: &str) -> Option<String> {
        self.reverse.get(entity_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_aliases_are_numbered_per_prefix() {
        let mut index = ShortIdIndex::new();

        assert_eq!(index.add("CLI-01AAA".to_string()), "CLI@1");
        assert_eq!(index.add("ORC-01BBB".to_string()), "ORC@1");
        assert_eq!(index.add("CLI-01CCC".to_string()), "CLI@2");

        assert_eq!(index.resolve("CLI@2"), Some("CLI-01CCC".to_string()));
        assert_eq!(index.resolve("orc@1"), Some("ORC-01BBB".to_string()));
        assert_eq!(index.resolve("ORC@9"), None);
    }

    #[test]
    fn test_passthrough_for_plain_references() {
        let index = ShortIdIndex::new();
        assert_eq!(index.resolve("ORC-01ABC"), Some("ORC-01ABC".to_string()));
        assert_eq!(index.resolve("ABC1D23"), Some("ABC1D23".to_string()));
    }

    #[test]
    fn test_unknown_prefix_does_not_resolve() {
        let index = ShortIdIndex::new();
        assert_eq!(index.resolve("XYZ@1"), None);
    }

    #[test]
    fn test_no_duplicates() {
        let mut index = ShortIdIndex::new();
        let first = index.add("VEI-001".to_string());
        let again = index.add("VEI-001".to_string());

        assert_eq!(first, again);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get_short_id("VEI-001"), Some("VEI@1".to_string()));
    }

    #[test]
    fn test_save_and_load_keep_aliases() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        let mut index = ShortIdIndex::new();
        index.ensure_all(vec!["OS-001".to_string(), "OS-002".to_string()]);
        index.save(&project).unwrap();

        let mut loaded = ShortIdIndex::load(&project);
        assert_eq!(loaded.resolve("OS@2"), Some("OS-002".to_string()));
        assert_eq!(loaded.add("OS-003".to_string()), "OS@3");
    }
}
