//! Resource table - keyed catalogue of files referenced by an outline
//!
//! Keys are unique within a table and never change once assigned; paths may
//! be replaced (a resource re-pointed at a new file keeps its key).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::core::model::{Resource, INLINE_KEY_PREFIX, RESOURCE_KEY_PREFIX};
use crate::core::paths::same_file;

/// A problem found by `ResourceTable::validate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableIssue {
    pub code: &'static str,
    pub message: String,
}

/// Ordered set of resources addressed by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTable {
    entries: Vec<Resource>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, keeping existing keys and keying the rest by position
    pub fn from_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let mut table = Self {
            entries: resources.into_iter().collect(),
        };
        table.assign_missing_keys();
        table.fill_default_titles();
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Resource> {
        self.entries.iter().find(|r| r.key == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Resource> {
        self.entries.iter_mut().find(|r| r.key == key)
    }

    /// Resolve a file path to the key of the first resource pointing at it
    pub fn key_for_path(&self, path: &str) -> Option<&str> {
        self.find_by_path(path).map(|r| r.key.as_str())
    }

    pub fn find_by_path(&self, path: &str) -> Option<&Resource> {
        self.entries.iter().find(|r| same_path(&r.path, path))
    }

    /// Like [`find_by_path`](Self::find_by_path), but relative paths are
    /// taken from `root` so one file is one resource however it is spelled
    pub fn find_file(&self, root: &Path, path: &str) -> Option<&Resource> {
        self.entries.iter().find(|r| same_file(root, &r.path, path))
    }

    pub fn key_for_file(&self, root: &Path, path: &str) -> Option<&str> {
        self.find_file(root, path).map(|r| r.key.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Add a resource, returning its key.
    ///
    /// A resource whose key is empty or already taken is given the next free
    /// `resource_N` key.
    pub fn insert(&mut self, mut resource: Resource) -> String {
        if resource.key.is_empty() || self.contains_key(&resource.key) {
            resource.key = self.next_key(RESOURCE_KEY_PREFIX, self.entries.len() + 1);
        }
        if resource.title.is_empty() {
            resource.title = resource.file_name();
        }
        let key = resource.key.clone();
        self.entries.push(resource);
        key
    }

    /// Add a resource synthesized from edited text
    pub fn insert_inline(&mut self, path: impl Into<String>, content: String) -> String {
        let ordinal = self.entries.iter().filter(|r| r.is_inline()).count() + 1;
        let key = self.next_key(INLINE_KEY_PREFIX, ordinal);
        let mut resource = Resource::new(path).with_key(key.clone());
        resource.is_inline = true;
        resource.inline_content = Some(content);
        self.entries.push(resource);
        key
    }

    pub fn retitle(&mut self, key: &str, title: impl Into<String>) -> bool {
        match self.get_mut(key) {
            Some(resource) => {
                resource.title = title.into();
                true
            }
            None => false,
        }
    }

    pub fn describe(&mut self, key: &str, description: impl Into<String>) -> bool {
        match self.get_mut(key) {
            Some(resource) => {
                resource.description = description.into();
                true
            }
            None => false,
        }
    }

    /// Point a resource at a new file; key, title and description survive.
    /// Returns the previous path.
    pub fn replace_path(&mut self, key: &str, path: impl Into<String>) -> Option<String> {
        let resource = self.get_mut(key)?;
        Some(std::mem::replace(&mut resource.path, path.into()))
    }

    pub fn remove(&mut self, key: &str) -> Option<Resource> {
        let idx = self.entries.iter().position(|r| r.key == key)?;
        Some(self.entries.remove(idx))
    }

    /// Drop catalogue resources whose key is not in `referenced`.
    /// Inline resources are owned by their block and are left alone.
    pub fn retain_referenced(&mut self, referenced: &HashSet<String>) -> Vec<Resource> {
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|r| r.is_inline() || referenced.contains(&r.key));
        self.entries = kept;
        dropped
    }

    /// Split off inline resources, leaving only the catalogue
    pub fn take_inline(&mut self) -> Vec<Resource> {
        let (inline, catalogue): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(Resource::is_inline);
        self.entries = catalogue;
        inline
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Resource> {
        self.entries.iter_mut()
    }

    pub fn assign_missing_keys(&mut self) {
        for idx in 0..self.entries.len() {
            if self.entries[idx].key.is_empty() {
                self.entries[idx].key = self.next_key(RESOURCE_KEY_PREFIX, idx + 1);
            }
        }
    }

    pub fn fill_default_titles(&mut self) {
        for resource in &mut self.entries {
            if resource.title.is_empty() {
                resource.title = resource.file_name();
            }
        }
    }

    /// Check key uniqueness and that every entry has a key and a path
    pub fn validate(&self) -> Vec<TableIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for (idx, resource) in self.entries.iter().enumerate() {
            if resource.key.is_empty() {
                issues.push(TableIssue {
                    code: "EMPTY_KEY",
                    message: format!("Resource #{} ({}) has no key", idx + 1, resource.path),
                });
            } else if !seen.insert(resource.key.as_str()) {
                issues.push(TableIssue {
                    code: "DUPLICATE_KEY",
                    message: format!("Resource key '{}' is used more than once", resource.key),
                });
            }
            if resource.path.is_empty() {
                issues.push(TableIssue {
                    code: "EMPTY_PATH",
                    message: format!("Resource '{}' has no path", resource.key),
                });
            }
        }

        issues
    }

    /// First `{prefix}{n}` with n >= start that is not taken
    fn next_key(&self, prefix: &str, start: usize) -> String {
        let mut n = start.max(1);
        loop {
            let candidate = format!("{}{}", prefix, n);
            if !self.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

impl<'a> IntoIterator for &'a ResourceTable {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<Resource> for ResourceTable {
    fn from_iter<T: IntoIterator<Item = Resource>>(iter: T) -> Self {
        Self::from_resources(iter)
    }
}

/// Component-wise comparison so `a//b` and `a/b/` match `a/b`
fn same_path(a: &str, b: &str) -> bool {
    a == b || Path::new(a) == Path::new(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ResourceTable {
        ResourceTable::from_resources(vec![
            Resource::new("/docs/guide.md").with_description("the guide"),
            Resource::new("/docs/data.csv"),
        ])
    }

    #[test]
    fn test_keys_assigned_by_position() {
        let table = table();
        let keys: Vec<_> = table.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["resource_1", "resource_2"]);
        assert_eq!(table.get("resource_1").unwrap().title, "guide.md");
    }

    #[test]
    fn test_existing_keys_preserved() {
        let table = ResourceTable::from_resources(vec![
            Resource::new("/a.md").with_key("resource_2"),
            Resource::new("/b.md"),
        ]);
        assert_eq!(table.key_for_path("/a.md"), Some("resource_2"));
        // position 2 is taken, so the next free key is used
        assert_eq!(table.key_for_path("/b.md"), Some("resource_3"));
        assert!(table.validate().is_empty());
    }

    #[test]
    fn test_insert_avoids_collisions() {
        let mut table = table();
        table.remove("resource_1");
        let key = table.insert(Resource::new("/docs/new.md"));
        assert_eq!(key, "resource_3");
        let dup = table.insert(Resource::new("/x.md").with_key("resource_2"));
        assert_ne!(dup, "resource_2");
    }

    #[test]
    fn test_key_for_path_normalizes() {
        let table = table();
        assert_eq!(table.key_for_path("/docs//guide.md"), Some("resource_1"));
        assert_eq!(table.key_for_path("/docs/missing.md"), None);
    }

    #[test]
    fn test_key_for_file_resolves_against_root() {
        let table = ResourceTable::from_resources(vec![Resource::new("data/notes.md")]);
        let root = Path::new("/project");
        assert_eq!(table.key_for_path("/project/data/notes.md"), None);
        assert_eq!(
            table.key_for_file(root, "/project/data/notes.md"),
            Some("resource_1")
        );
        assert_eq!(table.key_for_file(Path::new("/elsewhere"), "/project/data/notes.md"), None);
    }

    #[test]
    fn test_retitle_describe_replace() {
        let mut table = table();
        assert!(table.retitle("resource_2", "Numbers"));
        assert!(table.describe("resource_2", "quarterly data"));
        let old = table.replace_path("resource_2", "/docs/data_v2.csv");
        assert_eq!(old.as_deref(), Some("/docs/data.csv"));

        let r = table.get("resource_2").unwrap();
        assert_eq!(r.title, "Numbers");
        assert_eq!(r.description, "quarterly data");
        assert_eq!(r.path, "/docs/data_v2.csv");
        assert!(!table.retitle("resource_9", "nope"));
    }

    #[test]
    fn test_inline_keys_count_separately() {
        let mut table = table();
        let a = table.insert_inline("inline_a.txt", "alpha".into());
        let b = table.insert_inline("inline_b.txt", "beta".into());
        assert_eq!(a, "inline_resource_1");
        assert_eq!(b, "inline_resource_2");
        assert!(table.get(&a).unwrap().is_inline());

        let inline = table.take_inline();
        assert_eq!(inline.len(), 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_retain_referenced() {
        let mut table = table();
        table.insert_inline("inline_a.txt", "alpha".into());
        let referenced: HashSet<String> = ["resource_2".to_string()].into_iter().collect();
        let dropped = table.retain_referenced(&referenced);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].key, "resource_1");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_validate_reports_duplicates() {
        let table: ResourceTable = serde_json::from_str(
            r#"[{"key": "k", "path": "/a"}, {"key": "k", "path": ""}]"#,
        )
        .unwrap();
        let codes: Vec<_> = table.validate().iter().map(|i| i.code).collect();
        assert_eq!(codes, vec!["DUPLICATE_KEY", "EMPTY_PATH"]);
    }
}
