//! Outline tree -> flat block list (import path)

use std::fs;
use tracing::warn;

use crate::core::model::{Block, BlockBody, Draft, Outline, Resource, Section, SectionBody};
use crate::core::resources::ResourceTable;

/// Walk the outline depth-first, emitting one block per section with
/// `indent_level` equal to the section's depth.
///
/// Text sections backed by a catalogue resource get the file content loaded;
/// text sections backed by an inline resource get its content and are marked
/// `edited` so the next build synthesizes the inline resource again.
pub fn flatten(outline: &Outline) -> Vec<Block> {
    let mut blocks = Vec::new();
    walk(&outline.sections, 0, &outline.resources, &mut blocks);
    blocks
}

/// Convert an outline back into an editor draft.
///
/// Inline resources are folded into their blocks and left out of the
/// returned catalogue. A document without sections yields a single empty AI
/// block; only the first block is expanded.
pub fn flatten_to_draft(outline: &Outline) -> Draft {
    let mut blocks = flatten(outline);
    if blocks.is_empty() {
        blocks.push(Block::ai("", ""));
    }
    for (idx, block) in blocks.iter_mut().enumerate() {
        block.collapsed = idx > 0;
    }

    let mut resources = outline.resources.clone();
    resources.take_inline();

    Draft {
        title: outline.title.clone(),
        description: outline.general_instruction.clone(),
        resources,
        blocks,
    }
}

fn walk(sections: &[Section], depth: usize, table: &ResourceTable, out: &mut Vec<Block>) {
    let indent_level = u8::try_from(depth).unwrap_or(u8::MAX);

    for section in sections {
        let body = match &section.body {
            SectionBody::Ai { prompt, refs } => BlockBody::Ai {
                heading: section.title.clone(),
                content: prompt.clone(),
                resources: refs
                    .iter()
                    .filter_map(|key| lookup(table, key, &section.title))
                    .collect(),
            },
            SectionBody::Static { resource_key } => text_body(section, resource_key, table),
        };

        let mut block = Block::new(body).with_indent(indent_level);
        block.collapsed = true;
        out.push(block);

        walk(&section.sections, depth + 1, table, out);
    }
}

fn text_body(section: &Section, resource_key: &str, table: &ResourceTable) -> BlockBody {
    let heading = section.title.clone();
    if resource_key.is_empty() {
        return BlockBody::Text {
            heading,
            content: String::new(),
            resource: None,
            edited: false,
        };
    }

    match lookup(table, resource_key, &section.title) {
        Some(resource) if resource.is_inline() => BlockBody::Text {
            heading,
            content: load_content(&resource),
            resource: None,
            edited: true,
        },
        Some(resource) => BlockBody::Text {
            heading,
            content: load_content(&resource),
            resource: Some(resource),
            edited: false,
        },
        None => BlockBody::Text {
            heading,
            content: String::new(),
            resource: None,
            edited: false,
        },
    }
}

fn lookup(table: &ResourceTable, key: &str, section: &str) -> Option<Resource> {
    let found = table.get(key).cloned();
    if found.is_none() {
        warn!(key, section, "Section references a key missing from the resource table");
    }
    found
}

/// Pending inline content wins over the file on disk
fn load_content(resource: &Resource) -> String {
    if let Some(content) = &resource.inline_content {
        return content.clone();
    }
    match fs::read_to_string(&resource.path) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                key = %resource.key,
                path = %resource.path,
                error = %e,
                "Cannot load resource content"
            );
            String::new()
        }
    }
}
