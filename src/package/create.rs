//! Package creation
//!
//! Writes a `.docpack` archive: the outline manifest plus one entry per
//! resource file, each stored under a name derived from its key. The archive
//! is assembled in a temporary file next to the output and moved into place
//! only once complete, so a failed pack never leaves a partial package.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::error::{DocpackError, DocpackResult};
use crate::core::model::Outline;
use crate::core::paths::{canonical, resolve};
use crate::outline::inline::write_inline_resources;
use crate::package::manifest::{
    entry_name, resource_entries, rewrite_paths, strip_transient, MANIFEST_NAME,
};

/// A manifest resource that did not make it into the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmittedResource {
    pub key: String,
    /// Path as listed in the manifest (left unchanged in the archive)
    pub path: String,
}

/// Outcome of a pack
#[derive(Debug, Clone, Serialize)]
pub struct PackReport {
    pub output: PathBuf,
    /// Keys stored in the archive, in packing order
    pub packed: Vec<String>,
    pub omitted: Vec<OmittedResource>,
}

impl PackReport {
    pub fn is_complete(&self) -> bool {
        self.omitted.is_empty()
    }
}

/// Pack `outline_json` and `resource_files` into an archive at `output`.
///
/// `key_map` maps each file's canonical path to the resource keys that point
/// at it; every key gets its own entry even when several share one file.
/// Files that cannot be read, and manifest resources with no matching file,
/// are left out and listed in the report; only archive-level failures are
/// errors.
pub fn create(
    outline_json: &Value,
    resource_files: &[PathBuf],
    key_map: &HashMap<PathBuf, Vec<String>>,
    output: &Path,
) -> DocpackResult<PackReport> {
    let mut manifest = outline_json.clone();
    strip_transient(&mut manifest);

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| DocpackError::write(output, e))?;
    let mut staging =
        tempfile::NamedTempFile::new_in(&parent).map_err(|e| DocpackError::write(output, e))?;

    let mut zip = ZipWriter::new(staging.as_file_mut());
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut packed = Vec::new();
    let mut entry_paths: HashMap<String, String> = HashMap::new();

    for file in resource_files {
        let Some(keys) = key_map
            .get(&canonical(file))
            .or_else(|| key_map.get(file))
        else {
            warn!(path = %file.display(), "No resource key for file, skipping");
            continue;
        };

        for key in keys {
            if entry_paths.contains_key(key) {
                continue;
            }

            let mut source = match File::open(file) {
                Ok(f) => f,
                Err(e) => {
                    warn!(
                        %key,
                        path = %file.display(),
                        error = %e,
                        "Resource missing at pack time, omitting"
                    );
                    continue;
                }
            };

            let entry = entry_name(key, file);
            zip.start_file(entry.as_str(), options)
                .map_err(|e| DocpackError::write(output, e))?;
            io::copy(&mut source, &mut zip).map_err(|e| DocpackError::write(output, e))?;

            debug!(%key, %entry, "Packed resource");
            entry_paths.insert(key.clone(), entry);
            packed.push(key.clone());
        }
    }

    let omitted: Vec<OmittedResource> = resource_entries(&manifest)
        .into_iter()
        .filter(|(key, _)| !entry_paths.contains_key(key))
        .map(|(key, path)| OmittedResource { key, path })
        .collect();

    rewrite_paths(&mut manifest, &entry_paths);

    let body = serde_json::to_vec_pretty(&manifest)?;
    zip.start_file(MANIFEST_NAME, options)
        .map_err(|e| DocpackError::write(output, e))?;
    zip.write_all(&body)
        .map_err(|e| DocpackError::write(output, e))?;
    zip.finish().map_err(|e| DocpackError::write(output, e))?;

    staging
        .persist(output)
        .map_err(|e| DocpackError::write(output, e.error))?;

    info!(
        output = %output.display(),
        packed = packed.len(),
        omitted = omitted.len(),
        "Package written"
    );

    Ok(PackReport {
        output: output.to_path_buf(),
        packed,
        omitted,
    })
}

/// Pack an outline, reading each resource from its path (relative paths are
/// taken from `root`). Inline resources still holding their text are written
/// to a scratch directory first.
pub fn pack_outline(outline: &Outline, root: &Path, output: &Path) -> DocpackResult<PackReport> {
    let scratch = tempfile::tempdir().map_err(|e| DocpackError::write(output, e))?;
    let mut outline = outline.clone();
    write_inline_resources(&mut outline, scratch.path())?;

    let mut files = Vec::new();
    let mut key_map: HashMap<PathBuf, Vec<String>> = HashMap::new();
    for resource in outline.resources.iter() {
        let file = resolve(root, &resource.path);
        key_map
            .entry(canonical(&file))
            .or_default()
            .push(resource.key.clone());
        files.push(file);
    }

    let manifest = serde_json::to_value(&outline)?;
    create(&manifest, &files, &key_map, output)
}
