//! Package manifest helpers
//!
//! The manifest is the outline JSON stored at `outline.json` inside the
//! archive. It is handled as a `serde_json::Value` so fields this crate does
//! not model survive a pack/extract round trip untouched.

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use crate::core::paths::dotted_extension;

/// Archive entry holding the outline
pub const MANIFEST_NAME: &str = "outline.json";

/// Archive directory holding resource files
pub const RESOURCE_DIR: &str = "resources";

/// File extension of packages (without the dot)
pub const PACKAGE_EXTENSION: &str = "docpack";

/// Resource fields that only exist in working copies
const TRANSIENT_FIELDS: &[&str] = &["is_inline"];

/// Package-local entry name for a resource: named by key, keeping the
/// source file's extension.
pub fn entry_name(key: &str, source: &Path) -> String {
    format!("{}/{}{}", RESOURCE_DIR, key, dotted_extension(source))
}

/// Check the manifest has the shape extraction relies on
pub fn validate(manifest: &Value) -> Result<(), String> {
    let object = manifest
        .as_object()
        .ok_or_else(|| "manifest is not a JSON object".to_string())?;

    match object.get("resources") {
        None | Some(Value::Array(_)) => Ok(()),
        Some(_) => Err("manifest 'resources' is not an array".to_string()),
    }
}

/// `(key, path)` of every resource listed in the manifest
pub fn resource_entries(manifest: &Value) -> Vec<(String, String)> {
    resources(manifest)
        .map(|entries| {
            entries
                .iter()
                .map(|r| (str_field(r, "key"), str_field(r, "path")))
                .collect()
        })
        .unwrap_or_default()
}

/// Remove working-copy markers from every resource entry
pub fn strip_transient(manifest: &mut Value) {
    for resource in resources_mut(manifest) {
        if let Some(object) = resource.as_object_mut() {
            for field in TRANSIENT_FIELDS {
                object.remove(*field);
            }
        }
    }
}

/// Set the `path` of each resource whose key is in `paths`.
/// Returns how many entries were rewritten.
pub fn rewrite_paths(manifest: &mut Value, paths: &HashMap<String, String>) -> usize {
    let mut rewritten = 0;
    for resource in resources_mut(manifest) {
        let key = str_field(resource, "key");
        if let (Some(path), Some(object)) = (paths.get(&key), resource.as_object_mut()) {
            object.insert("path".to_string(), Value::String(path.clone()));
            rewritten += 1;
        }
    }
    rewritten
}

fn resources(manifest: &Value) -> Option<&Vec<Value>> {
    manifest.get("resources").and_then(Value::as_array)
}

fn resources_mut(manifest: &mut Value) -> impl Iterator<Item = &mut Value> {
    manifest
        .get_mut("resources")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
}

fn str_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
