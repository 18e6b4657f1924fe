//! Block list editing
//!
//! Every operation works on a `Draft` and keeps three things consistent:
//! - indentation: the first block stays at level 0, no block goes deeper
//!   than its predecessor + 1 or past `MAX_INDENT_LEVEL`
//! - the resource catalogue and the resource copies carried by blocks
//! - text block content and the file it was loaded from
//!
//! Resource paths are compared as files, not strings: relative paths are
//! taken from `root`, so `data/a.md` and `/project/data/a.md` are one
//! resource when `root` is `/project`. New paths are stored as given.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::core::error::{DocpackError, DocpackResult};
use crate::core::model::{Block, BlockBody, BlockKind, Draft, Resource, MAX_INDENT_LEVEL};
use crate::core::paths::{resolve, same_file};

/// Indent direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" | "indent" => Ok(Direction::In),
            "out" | "outdent" => Ok(Direction::Out),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

fn position(draft: &Draft, id: &str) -> DocpackResult<usize> {
    draft
        .blocks
        .iter()
        .position(|b| b.id == id)
        .ok_or_else(|| DocpackError::BlockNotFound(id.to_string()))
}

fn block_mut<'a>(draft: &'a mut Draft, id: &str) -> DocpackResult<&'a mut Block> {
    let idx = position(draft, id)?;
    Ok(&mut draft.blocks[idx])
}

fn empty_body(kind: BlockKind) -> BlockBody {
    match kind {
        BlockKind::Heading => BlockBody::Heading {
            content: String::new(),
        },
        BlockKind::Ai => BlockBody::Ai {
            heading: String::new(),
            content: String::new(),
            resources: Vec::new(),
        },
        BlockKind::Text => BlockBody::Text {
            heading: String::new(),
            content: String::new(),
            resource: None,
            edited: false,
        },
    }
}

/// Insert an empty block after `after` (inheriting its indent level), or at
/// the end at level 0. Returns the new block's id.
pub fn insert_block(
    draft: &mut Draft,
    kind: BlockKind,
    after: Option<&str>,
) -> DocpackResult<String> {
    let block = Block::new(empty_body(kind));
    let id = block.id.clone();

    match after {
        Some(focused) => {
            let idx = position(draft, focused)?;
            let level = draft.blocks[idx].indent_level;
            draft.blocks.insert(idx + 1, block.with_indent(level));
        }
        None => draft.blocks.push(block),
    }

    debug!(%id, ?kind, "Inserted block");
    Ok(id)
}

pub fn delete_block(draft: &mut Draft, id: &str) -> DocpackResult<Block> {
    let idx = position(draft, id)?;
    Ok(draft.blocks.remove(idx))
}

pub fn set_heading(draft: &mut Draft, id: &str, text: &str) -> DocpackResult<()> {
    match &mut block_mut(draft, id)?.body {
        BlockBody::Heading { content } => *content = text.to_string(),
        BlockBody::Ai { heading, .. } | BlockBody::Text { heading, .. } => {
            *heading = text.to_string()
        }
    }
    Ok(())
}

/// Replace a block's content. Typing into a text block turns it into edited
/// text: the file it was loaded from is detached.
pub fn set_content(draft: &mut Draft, root: &Path, id: &str, text: &str) -> DocpackResult<()> {
    let detached = match &mut block_mut(draft, id)?.body {
        BlockBody::Heading { content } | BlockBody::Ai { content, .. } => {
            *content = text.to_string();
            None
        }
        BlockBody::Text {
            content,
            resource,
            edited,
            ..
        } => {
            *content = text.to_string();
            *edited = !text.is_empty();
            if *edited {
                resource.take()
            } else {
                None
            }
        }
    };

    if let Some(resource) = detached {
        release(draft, root, &resource.path);
    }
    Ok(())
}

/// Move a block one level in or out. Returns false when the move would
/// break the indent rules and nothing changed.
pub fn shift_indent(draft: &mut Draft, id: &str, direction: Direction) -> DocpackResult<bool> {
    let idx = position(draft, id)?;
    let current = draft.blocks[idx].indent_level;

    let target = match direction {
        Direction::In => {
            if idx == 0 {
                return Ok(false);
            }
            let next = current.saturating_add(1);
            let ceiling = draft.blocks[idx - 1].indent_level.saturating_add(1);
            if next > ceiling || next > MAX_INDENT_LEVEL {
                return Ok(false);
            }
            next
        }
        Direction::Out => match current.checked_sub(1) {
            Some(next) => next,
            None => return Ok(false),
        },
    };

    draft.blocks[idx].indent_level = target;
    Ok(true)
}

/// Switch a block between AI and text. The body being left is stashed and
/// comes back when the block is converted again; the heading carries over.
pub fn convert(draft: &mut Draft, id: &str, kind: BlockKind) -> DocpackResult<bool> {
    let block = block_mut(draft, id)?;
    let from = block.kind();
    if from == kind {
        return Ok(false);
    }
    if from == BlockKind::Heading || kind == BlockKind::Heading {
        return Ok(false);
    }

    let heading = block.heading_text().to_string();
    let restored = match block.stash.take() {
        Some(stashed) if body_kind(&stashed) == kind => *stashed,
        _ => empty_body(kind),
    };
    let previous = std::mem::replace(&mut block.body, restored);
    block.stash = Some(Box::new(previous));

    if let BlockBody::Ai { heading: h, .. } | BlockBody::Text { heading: h, .. } = &mut block.body
    {
        *h = heading;
    }
    Ok(true)
}

fn body_kind(body: &BlockBody) -> BlockKind {
    match body {
        BlockBody::Heading { .. } => BlockKind::Heading,
        BlockBody::Ai { .. } => BlockKind::Ai,
        BlockBody::Text { .. } => BlockKind::Text,
    }
}

/// Attach a file to a block, cataloguing it if needed. Returns its key.
///
/// AI blocks collect resources (attaching the same path twice is a no-op);
/// a text block holds one, and its content is reloaded from the file.
pub fn attach_resource(
    draft: &mut Draft,
    root: &Path,
    id: &str,
    path: &str,
) -> DocpackResult<String> {
    let idx = position(draft, id)?;

    let text_content = match draft.blocks[idx].body {
        BlockBody::Text { .. } => {
            let file = resolve(root, path);
            Some(fs::read_to_string(&file).map_err(|e| DocpackError::io(file, e))?)
        }
        _ => None,
    };

    let catalogued = match draft.resources.find_file(root, path) {
        Some(existing) => existing.clone(),
        None => {
            let key = draft.resources.insert(Resource::new(path));
            info!(%key, path, "Catalogued resource");
            draft
                .resources
                .get(&key)
                .cloned()
                .ok_or_else(|| DocpackError::ResourceNotFound(key.clone()))?
        }
    };
    let key = catalogued.key.clone();

    let replaced = match &mut draft.blocks[idx].body {
        BlockBody::Heading { .. } => None,
        BlockBody::Ai { resources, .. } => {
            if !resources
                .iter()
                .any(|r| same_file(root, &r.path, &catalogued.path))
            {
                resources.push(catalogued);
            }
            None
        }
        BlockBody::Text {
            content,
            resource,
            edited,
            ..
        } => {
            *content = text_content.unwrap_or_default();
            *edited = false;
            resource.replace(catalogued)
        }
    };

    if let Some(old) = replaced {
        if !same_file(root, &old.path, path) {
            release(draft, root, &old.path);
        }
    }
    Ok(key)
}

/// Detach one file from a block. A text block losing its file loses the
/// content loaded from it. The catalogue entry is dropped once no block
/// uses it; that entry is returned.
pub fn detach_resource(
    draft: &mut Draft,
    root: &Path,
    id: &str,
    path: &str,
) -> DocpackResult<Option<Resource>> {
    let block = block_mut(draft, id)?;
    let removed = strip_path(block, root, path);
    if !removed {
        return Ok(None);
    }
    Ok(release(draft, root, path))
}

/// Delete a resource from the catalogue and from every block using it
pub fn remove_resource(draft: &mut Draft, root: &Path, key: &str) -> DocpackResult<Resource> {
    let resource = draft
        .resources
        .remove(key)
        .ok_or_else(|| DocpackError::ResourceNotFound(key.to_string()))?;

    let mut touched = 0;
    for block in &mut draft.blocks {
        if strip_path(block, root, &resource.path) {
            touched += 1;
        }
    }
    info!(key, path = %resource.path, blocks = touched, "Removed resource");
    Ok(resource)
}

/// Point a resource at another file. The key survives; block copies follow
/// and text blocks using it reload their content. Returns the old path.
pub fn replace_resource(
    draft: &mut Draft,
    root: &Path,
    key: &str,
    new_path: &str,
) -> DocpackResult<String> {
    let old_path = draft
        .resources
        .get(key)
        .map(|r| r.path.clone())
        .ok_or_else(|| DocpackError::ResourceNotFound(key.to_string()))?;

    let used_by_text = draft.blocks.iter().any(|b| {
        matches!(
            &b.body,
            BlockBody::Text { resource: Some(r), .. } if same_file(root, &r.path, &old_path)
        )
    });
    let reloaded = if used_by_text {
        let file = resolve(root, new_path);
        Some(fs::read_to_string(&file).map_err(|e| DocpackError::io(file, e))?)
    } else {
        None
    };

    draft.resources.replace_path(key, new_path);

    for block in &mut draft.blocks {
        match &mut block.body {
            BlockBody::Ai { resources, .. } => {
                for r in resources
                    .iter_mut()
                    .filter(|r| same_file(root, &r.path, &old_path))
                {
                    r.path = new_path.to_string();
                }
            }
            BlockBody::Text {
                content,
                resource: Some(r),
                ..
            } if same_file(root, &r.path, &old_path) => {
                r.path = new_path.to_string();
                if let Some(text) = &reloaded {
                    *content = text.clone();
                }
            }
            _ => {}
        }
    }

    Ok(old_path)
}

/// Update a resource's description in the catalogue and every block copy
pub fn describe_resource(
    draft: &mut Draft,
    root: &Path,
    key: &str,
    description: &str,
) -> DocpackResult<()> {
    update_resource(draft, root, key, |r| r.description = description.to_string())
}

/// Update a resource's title in the catalogue and every block copy
pub fn retitle_resource(
    draft: &mut Draft,
    root: &Path,
    key: &str,
    title: &str,
) -> DocpackResult<()> {
    update_resource(draft, root, key, |r| r.title = title.to_string())
}

fn update_resource(
    draft: &mut Draft,
    root: &Path,
    key: &str,
    apply: impl Fn(&mut Resource),
) -> DocpackResult<()> {
    let entry = draft
        .resources
        .get_mut(key)
        .ok_or_else(|| DocpackError::ResourceNotFound(key.to_string()))?;
    let path = entry.path.clone();
    apply(entry);

    for block in &mut draft.blocks {
        match &mut block.body {
            BlockBody::Ai { resources, .. } => {
                resources
                    .iter_mut()
                    .filter(|r| same_file(root, &r.path, &path))
                    .for_each(&apply);
            }
            BlockBody::Text {
                resource: Some(r), ..
            } if same_file(root, &r.path, &path) => apply(r),
            _ => {}
        }
    }
    Ok(())
}

pub fn toggle_collapsed(draft: &mut Draft, id: &str) -> DocpackResult<bool> {
    let block = block_mut(draft, id)?;
    block.collapsed = !block.collapsed;
    Ok(block.collapsed)
}

/// Drop catalogue entries no block refers to
pub fn prune_resources(draft: &mut Draft, root: &Path) -> Vec<Resource> {
    let referenced: HashSet<String> = draft
        .blocks
        .iter()
        .flat_map(|b| b.resources())
        .filter_map(|r| draft.resources.key_for_file(root, &r.path))
        .map(str::to_string)
        .collect();
    draft.resources.retain_referenced(&referenced)
}

/// Remove `path` from a block; true if it was attached
fn strip_path(block: &mut Block, root: &Path, path: &str) -> bool {
    match &mut block.body {
        BlockBody::Heading { .. } => false,
        BlockBody::Ai { resources, .. } => {
            let before = resources.len();
            resources.retain(|r| !same_file(root, &r.path, path));
            resources.len() != before
        }
        BlockBody::Text {
            content,
            resource,
            edited,
            ..
        } => {
            if resource
                .as_ref()
                .is_some_and(|r| same_file(root, &r.path, path))
            {
                *resource = None;
                content.clear();
                *edited = false;
                true
            } else {
                false
            }
        }
    }
}

/// Drop the catalogue entry for `path` if no block still uses it
fn release(draft: &mut Draft, root: &Path, path: &str) -> Option<Resource> {
    let still_used = draft
        .blocks
        .iter()
        .any(|b| b.resources().iter().any(|r| same_file(root, &r.path, path)));
    if still_used {
        return None;
    }
    let key = draft.resources.key_for_file(root, path)?.to_string();
    debug!(%key, path, "Releasing unreferenced resource");
    draft.resources.remove(&key)
}
