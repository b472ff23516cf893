//! Short ID system for easier record selection
//!
//! Provides session-local aliases like `RNC@1`, `QUOT@2` that map to full
//! entity IDs. They are reassigned whenever a list command runs.

use std::collections::HashMap;
use std::fs;

use crate::core::identity::EntityId;
use crate::core::project::{Project, PROJECT_DIR};

const INDEX_FILE: &str = "shortids.json";

/// A mapping of short IDs (PREFIX@N) to full entity IDs
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ShortIdIndex {
    /// Maps short reference ("RNC@1") to full entity ID string
    entries: HashMap<String, String>,
    /// Maps full entity ID to short reference (reverse lookup)
    #[serde(skip)]
    reverse: HashMap<String, String>,
    /// Next available number per prefix
    next: HashMap<String, u32>,
}

impl ShortIdIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index from a project, or create empty if not found
    pub fn load(project: &Project) -> Self {
        let path = project.root().join(PROJECT_DIR).join(INDEX_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(mut index) = serde_json::from_str::<ShortIdIndex>(&content) {
                index.reverse = index
                    .entries
                    .iter()
                    .map(|(k, v)| (v.clone(), k.clone()))
                    .collect();
                return index;
            }
        }
        Self::new()
    }

    /// Save the index to a project
    pub fn save(&self, project: &Project) -> std::io::Result<()> {
        let path = project.root().join(PROJECT_DIR).join(INDEX_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    /// Make sure every ID has a short reference, keeping existing ones stable
    pub fn ensure_all(&mut self, entity_ids: impl IntoIterator<Item = String>) {
        for id in entity_ids {
            self.add(id);
        }
    }

    /// Add an entity ID and return its short reference.
    ///
    /// Returns `None` for strings that are not entity IDs.
    pub fn add(&mut self, entity_id: String) -> Option<String> {
        if let Some(short) = self.reverse.get(&entity_id) {
            return Some(short.clone());
        }

        let prefix = EntityId::parse(&entity_id).ok()?.prefix().as_str();
        let counter = self.next.entry(prefix.to_string()).or_insert(1);
        let short = format!("{}@{}", prefix, counter);
        *counter += 1;

        self.entries.insert(short.clone(), entity_id.clone());
        self.reverse.insert(entity_id, short.clone());
        Some(short)
    }

    /// Resolve a reference to a full entity ID
    ///
    /// `RNC@3` (any case) is looked up; anything else is passed through for
    /// number or partial-ID matching.
    pub fn resolve(&self, reference: &str) -> Option<String> {
        match reference.split_once('@') {
            Some((prefix, n)) => {
                let key = format!("{}@{}", prefix.to_uppercase(), n.trim());
                self.entries.get(&key).cloned()
            }
            None => Some(reference.to_string()),
        }
    }

    /// Get the short reference for a full entity ID
    pub fn get_short_id(&self, entity_id: &str) -> Option<String> {
        self.reverse.get(entity_id).cloned()
    }

    /// Number of entries in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use tempfile::tempdir;

    #[test]
    fn test_short_id_add_and_resolve() {
        let mut index = ShortIdIndex::new();
        let rnc = EntityId::new(EntityPrefix::Rnc).to_string();
        let quote = EntityId::new(EntityPrefix::Quot).to_string();
        let rnc2 = EntityId::new(EntityPrefix::Rnc).to_string();

        assert_eq!(index.add(rnc.clone()).as_deref(), Some("RNC@1"));
        assert_eq!(index.add(quote.clone()).as_deref(), Some("QUOT@1"));
        assert_eq!(index.add(rnc2.clone()).as_deref(), Some("RNC@2"));

        assert_eq!(index.resolve("RNC@1"), Some(rnc));
        assert_eq!(index.resolve("rnc@2"), Some(rnc2));
        assert_eq!(index.resolve("QUOT@1"), Some(quote));
        assert_eq!(index.resolve("RNC@99"), None);
    }

    #[test]
    fn test_short_id_passthrough() {
        let index = ShortIdIndex::new();
        assert_eq!(index.resolve("RNC-0007"), Some("RNC-0007".to_string()));
    }

    #[test]
    fn test_short_id_no_duplicates() {
        let mut index = ShortIdIndex::new();
        let id = EntityId::new(EntityPrefix::Cal).to_string();

        let first = index.add(id.clone());
        let second = index.add(id);
        assert_eq!(first, second);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_add_rejects_non_ids() {
        let mut index = ShortIdIndex::new();
        assert_eq!(index.add("RNC-0001".to_string()), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let id = EntityId::new(EntityPrefix::Plan).to_string();

        let mut index = ShortIdIndex::new();
        index.add(id.clone());
        index.save(&project).unwrap();

        let loaded = ShortIdIndex::load(&project);
        assert_eq!(loaded.get_short_id(&id).as_deref(), Some("PLAN@1"));
        assert_eq!(loaded.resolve("PLAN@1"), Some(id));
    }
}
