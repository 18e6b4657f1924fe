//! Package extraction
//!
//! Restores resource files from a `.docpack` into a destination directory and
//! returns the manifest with each resource `path` pointing at its restored
//! file. Keys are never touched. Name clashes in the destination are resolved
//! with a numeric suffix and reported as collisions.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::core::error::{DocpackError, DocpackResult};
use crate::core::model::Outline;
use crate::core::paths::{canonical, normalize_path, unique_destination};
use crate::package::manifest::{resource_entries, rewrite_paths, validate, MANIFEST_NAME};

/// A restored file that had to be renamed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    /// Where the file would have gone
    pub original: PathBuf,
    pub restored: PathBuf,
}

/// Result of extracting a package
#[derive(Debug, Clone, Serialize)]
pub struct Extracted {
    pub manifest: Value,
    /// Restored files in archive order
    pub files: Vec<PathBuf>,
    pub collisions: Vec<Collision>,
    /// Keys whose manifest path names no archive entry
    pub missing: Vec<String>,
}

impl Extracted {
    /// Collisions as informational errors, for callers that report them
    pub fn notes(&self) -> Vec<DocpackError> {
        self.collisions
            .iter()
            .map(|c| DocpackError::ResourceCollision {
                original: c.original.clone(),
                restored: c.restored.clone(),
            })
            .collect()
    }

    /// Parse the manifest into an outline
    pub fn outline(&self) -> DocpackResult<Outline> {
        Ok(Outline::from_value(self.manifest.clone())?)
    }
}

/// Open an archive and parse its manifest without extracting anything
pub fn read_manifest(archive_path: &Path) -> DocpackResult<(ZipArchive<File>, Value)> {
    let file = File::open(archive_path).map_err(|e| DocpackError::io(archive_path, e))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| DocpackError::format(archive_path, e))?;

    let mut text = String::new();
    {
        let mut entry = archive.by_name(MANIFEST_NAME).map_err(|_| {
            DocpackError::format(archive_path, format!("missing {}", MANIFEST_NAME))
        })?;
        entry
            .read_to_string(&mut text)
            .map_err(|e| DocpackError::format(archive_path, e))?;
    }

    let manifest: Value = serde_json::from_str(&text).map_err(|e| {
        DocpackError::format(archive_path, format!("{} is not valid JSON: {}", MANIFEST_NAME, e))
    })?;
    validate(&manifest).map_err(|message| DocpackError::format(archive_path, message))?;

    Ok((archive, manifest))
}

/// Extract `archive_path` into `dest`.
///
/// Fails without restoring anything when the manifest is missing or invalid.
pub fn extract(archive_path: &Path, dest: &Path) -> DocpackResult<Extracted> {
    let (mut archive, mut manifest) = read_manifest(archive_path)?;

    fs::create_dir_all(dest).map_err(|e| DocpackError::io(dest, e))?;

    let mut files = Vec::new();
    let mut collisions = Vec::new();
    let mut restored: HashMap<String, String> = HashMap::new();

    for idx in 0..archive.len() {
        let mut entry = archive
            .by_index(idx)
            .map_err(|e| DocpackError::format(archive_path, e))?;
        if entry.is_dir() || entry.name() == MANIFEST_NAME {
            continue;
        }

        let entry_name = entry.name().to_string();
        let Some(file_name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        else {
            warn!(entry = %entry_name, "Skipping archive entry with unsafe name");
            continue;
        };

        let target = unique_destination(dest, &file_name);
        let wanted = dest.join(&file_name);
        if target != wanted {
            debug!(
                original = %wanted.display(),
                restored = %target.display(),
                "Destination taken, renaming restored file"
            );
            collisions.push(Collision {
                original: wanted,
                restored: target.clone(),
            });
        }

        let mut out = File::create(&target).map_err(|e| DocpackError::io(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| DocpackError::io(&target, e))?;

        let absolute = canonical(&target);
        restored.insert(entry_name, normalize_path(&absolute));
        files.push(absolute);
    }

    let mut paths = HashMap::new();
    let mut missing = Vec::new();
    for (key, path) in resource_entries(&manifest) {
        match restored.get(&path) {
            Some(new_path) => {
                paths.insert(key, new_path.clone());
            }
            None => {
                warn!(%key, %path, "Manifest resource has no archive entry");
                missing.push(key);
            }
        }
    }
    rewrite_paths(&mut manifest, &paths);

    info!(
        archive = %archive_path.display(),
        dest = %dest.display(),
        files = files.len(),
        collisions = collisions.len(),
        "Package extracted"
    );

    Ok(Extracted {
        manifest,
        files,
        collisions,
        missing,
    })
}
