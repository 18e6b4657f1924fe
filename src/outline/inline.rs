//! Inline resource materialization
//!
//! `build` keeps the text of edited blocks in memory. Before an outline can
//! be packed, that text has to exist as files the package codec can read.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::error::{DocpackError, DocpackResult};
use crate::core::model::Outline;
use crate::core::paths::normalize_path;

/// Write every inline resource with pending content into `dir` and point its
/// path at the written file. Returns the written paths in table order.
pub fn write_inline_resources(outline: &mut Outline, dir: &Path) -> DocpackResult<Vec<PathBuf>> {
    let mut written = Vec::new();

    for resource in outline.resources.iter_mut() {
        let Some(content) = resource.inline_content.take() else {
            continue;
        };

        if written.is_empty() {
            fs::create_dir_all(dir).map_err(|e| DocpackError::io(dir, e))?;
        }

        let file_name = match resource.file_name() {
            name if name.is_empty() => format!("{}.txt", resource.key),
            name => name,
        };
        let target = dir.join(file_name);
        fs::write(&target, content).map_err(|e| DocpackError::io(&target, e))?;

        debug!(key = %resource.key, path = %target.display(), "Wrote inline resource");
        resource.path = normalize_path(&target);
        written.push(target);
    }

    Ok(written)
}
