//! Flat block list -> outline tree
//!
//! Nesting is driven purely by `indent_level`: a section's children are the
//! run of following blocks one level deeper, ended by the first block at the
//! same level or shallower. Heading blocks are labels for the editor and are
//! stepped over without affecting that bookkeeping.

use tracing::{debug, warn};

use crate::core::model::{Block, BlockBody, Draft, Outline, Resource, Section, MAX_INDENT_LEVEL};
use crate::core::resources::ResourceTable;

/// Build an outline from an ordered block list.
///
/// Never fails: dangling resource references are dropped, blocks that skip
/// a level are ignored, and placeholder blocks produce no section (their
/// children are re-parented, see `collect`).
pub fn build(
    blocks: &[Block],
    resources: &ResourceTable,
    title: &str,
    instruction: &str,
) -> Outline {
    let mut table = resources.clone();
    // inline resources are regenerated from the blocks on every build
    let stale = table.take_inline();
    if !stale.is_empty() {
        debug!(count = stale.len(), "Discarding inline resources from a previous build");
    }

    let mut builder = Builder {
        blocks,
        table: &mut table,
    };
    let (sections, consumed) = builder.collect(0, -1);
    debug_assert_eq!(consumed, blocks.len());

    Outline {
        title: title.to_string(),
        general_instruction: instruction.to_string(),
        resources: table,
        sections,
    }
}

/// Build from an editor draft
pub fn build_draft(draft: &Draft) -> Outline {
    build(
        &draft.blocks,
        &draft.resources,
        &draft.title,
        &draft.description,
    )
}

struct Builder<'a> {
    blocks: &'a [Block],
    table: &'a mut ResourceTable,
}

impl Builder<'_> {
    /// Collect the sections starting at `start` whose level is
    /// `parent_level + 1`. Returns them with the index of the first block
    /// that belongs to an ancestor (or the end of the list).
    fn collect(&mut self, start: usize, parent_level: i32) -> (Vec<Section>, usize) {
        let blocks = self.blocks;
        let mut sections: Vec<Section> = Vec::new();
        let mut i = start;

        while i < blocks.len() {
            let block = &blocks[i];

            let payload = match &block.body {
                BlockBody::Heading { .. } => {
                    i += 1;
                    continue;
                }
                BlockBody::Ai {
                    heading,
                    content,
                    resources,
                } => Payload::Ai {
                    heading,
                    prompt: content,
                    resources,
                },
                BlockBody::Text {
                    heading,
                    content,
                    resource,
                    edited,
                } => Payload::Text {
                    heading,
                    content,
                    resource: resource.as_ref(),
                    edited: *edited,
                },
            };

            let level = i32::from(block.indent_level);
            if level <= parent_level {
                break;
            }

            if level > parent_level + 1 {
                debug!(
                    index = i,
                    level,
                    expected = parent_level + 1,
                    "Skipping block that jumps an indent level"
                );
                i += 1;
                continue;
            }

            if level > i32::from(MAX_INDENT_LEVEL) {
                debug!(index = i, level, "Skipping block nested past the depth limit");
                i += 1;
                continue;
            }

            if block.is_placeholder() {
                let (children, next) = self.collect(i + 1, level);
                if !children.is_empty() {
                    // children of an empty block join the previous sibling so
                    // their depth still matches their indent level
                    match sections.last_mut() {
                        Some(previous) => previous.sections.extend(children),
                        None => sections.extend(children),
                    }
                }
                i = next;
                continue;
            }

            let section = match payload {
                Payload::Ai {
                    heading,
                    prompt,
                    resources,
                } => self.ai_section(&block.id, heading, prompt, resources),
                Payload::Text {
                    heading,
                    content,
                    resource,
                    edited,
                } => self.text_section(&block.id, heading, content, resource, edited),
            };
            let (children, next) = self.collect(i + 1, level);
            sections.push(section.with_children(children));
            i = next;
        }

        (sections, i)
    }

    fn ai_section(
        &self,
        block_id: &str,
        heading: &str,
        prompt: &str,
        resources: &[Resource],
    ) -> Section {
        let refs = resources
            .iter()
            .filter_map(|attached| self.key_for(block_id, attached))
            .collect();
        Section::ai(heading.to_string(), prompt.to_string(), refs)
    }

    /// Typed text becomes an inline resource; otherwise the attached file
    /// (if any) is referenced.
    fn text_section(
        &mut self,
        block_id: &str,
        heading: &str,
        content: &str,
        resource: Option<&Resource>,
        edited: bool,
    ) -> Section {
        let resource_key = if edited && !content.is_empty() {
            self.table
                .insert_inline(format!("inline_{}.txt", block_id), content.to_string())
        } else {
            resource
                .and_then(|attached| self.key_for(block_id, attached))
                .unwrap_or_default()
        };
        Section::fixed(heading.to_string(), resource_key)
    }

    fn key_for(&self, block_id: &str, attached: &Resource) -> Option<String> {
        let key = self.table.key_for_path(&attached.path).map(str::to_string);
        if key.is_none() {
            warn!(
                block = %block_id,
                path = %attached.path,
                "Dropping reference to unknown resource"
            );
        }
        key
    }
}

/// Section-producing part of a block, borrowed from it
enum Payload<'b> {
    Ai {
        heading: &'b str,
        prompt: &'b str,
        resources: &'b [Resource],
    },
    Text {
        heading: &'b str,
        content: &'b str,
        resource: Option<&'b Resource>,
        edited: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::SectionBody;

    fn levels(levels: &[u8]) -> Vec<Block> {
        levels
            .iter()
            .enumerate()
            .map(|(i, l)| Block::ai(format!("b{}", i), "p").with_indent(*l))
            .collect()
    }

    fn titles(sections: &[Section]) -> Vec<&str> {
        sections.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn test_text_with_ai_child() {
        let blocks = vec![
            Block::text("Intro", "hello"),
            Block::ai("Sub", "expand").with_indent(1),
        ];
        let outline = build(&blocks, &ResourceTable::new(), "Doc", "Be brief");

        assert_eq!(outline.title, "Doc");
        assert_eq!(outline.general_instruction, "Be brief");
        assert_eq!(outline.sections.len(), 1);

        let root = &outline.sections[0];
        assert_eq!(root.title, "Intro");
        assert_eq!(
            root.body,
            SectionBody::Static {
                resource_key: String::new()
            }
        );
        assert_eq!(root.sections.len(), 1);
        assert_eq!(root.sections[0].title, "Sub");
        assert_eq!(
            root.sections[0].body,
            SectionBody::Ai {
                prompt: "expand".into(),
                refs: vec![]
            }
        );
    }

    #[test]
    fn test_sibling_after_grandchild() {
        let outline = build(&levels(&[0, 1, 2, 1]), &ResourceTable::new(), "", "");

        assert_eq!(titles(&outline.sections), vec!["b0"]);
        let root = &outline.sections[0];
        assert_eq!(titles(&root.sections), vec!["b1", "b3"]);
        assert_eq!(titles(&root.sections[0].sections), vec!["b2"]);
        assert!(root.sections[1].sections.is_empty());
    }

    #[test]
    fn test_multiple_roots() {
        let outline = build(&levels(&[0, 1, 0, 0, 1, 1]), &ResourceTable::new(), "", "");
        assert_eq!(titles(&outline.sections), vec!["b0", "b2", "b3"]);
        assert_eq!(titles(&outline.sections[2].sections), vec!["b4", "b5"]);
    }

    #[test]
    fn test_headings_are_transparent() {
        let blocks = vec![
            Block::ai("A", "p"),
            Block::ai("A.1", "p").with_indent(1),
            Block::heading("Label"),
            Block::ai("A.2", "p").with_indent(1),
        ];
        let outline = build(&blocks, &ResourceTable::new(), "", "");
        assert_eq!(titles(&outline.sections), vec!["A"]);
        assert_eq!(titles(&outline.sections[0].sections), vec!["A.1", "A.2"]);
    }

    #[test]
    fn test_headings_never_become_sections() {
        let blocks = vec![
            Block::heading("Part I"),
            Block::heading("Indented label").with_indent(1),
            Block::text("Body", "hello").with_edited(true),
            Block::heading("Part II"),
        ];
        let outline = build(&blocks, &ResourceTable::new(), "", "");
        assert_eq!(titles(&outline.sections), vec!["Body"]);
        assert!(outline.sections[0].sections.is_empty());
        assert_eq!(outline.resources.iter().filter(|r| r.is_inline()).count(), 1);

        let only_labels = vec![Block::heading("A"), Block::heading("B")];
        assert!(build(&only_labels, &ResourceTable::new(), "", "").sections.is_empty());
    }

    #[test]
    fn test_level_jump_is_skipped() {
        let outline = build(&levels(&[0, 2, 1]), &ResourceTable::new(), "", "");
        assert_eq!(titles(&outline.sections), vec!["b0"]);
        assert_eq!(titles(&outline.sections[0].sections), vec!["b2"]);
    }

    #[test]
    fn test_placeholder_children_join_previous_sibling() {
        let blocks = vec![
            Block::ai("A", "p"),
            Block::ai("", ""),
            Block::ai("orphan", "p").with_indent(1),
        ];
        let outline = build(&blocks, &ResourceTable::new(), "", "");
        assert_eq!(titles(&outline.sections), vec!["A"]);
        assert_eq!(titles(&outline.sections[0].sections), vec!["orphan"]);
    }

    #[test]
    fn test_placeholder_children_promoted_without_sibling() {
        let blocks = vec![
            Block::text("", ""),
            Block::ai("orphan", "p").with_indent(1),
            Block::ai("next", "p"),
        ];
        let outline = build(&blocks, &ResourceTable::new(), "", "");
        assert_eq!(titles(&outline.sections), vec!["orphan", "next"]);
    }

    #[test]
    fn test_refs_resolve_to_keys() {
        let table = ResourceTable::from_resources(vec![
            Resource::new("/docs/a.md"),
            Resource::new("/docs/b.md"),
        ]);
        let block = Block::ai("S", "p")
            .with_resource(Resource::new("/docs/b.md"))
            .with_resource(Resource::new("/docs/missing.md"))
            .with_resource(Resource::new("/docs/a.md"));

        let outline = build(&[block], &table, "", "");
        assert_eq!(
            outline.sections[0].body,
            SectionBody::Ai {
                prompt: "p".into(),
                refs: vec!["resource_2".into(), "resource_1".into()]
            }
        );
    }

    #[test]
    fn test_text_resource_key() {
        let table = ResourceTable::from_resources(vec![Resource::new("/docs/a.md")]);
        let linked = Block::text("T", "file body").with_resource(Resource::new("/docs/a.md"));
        let dangling = Block::text("U", "").with_resource(Resource::new("/nowhere.md"));

        let outline = build(&[linked, dangling], &table, "", "");
        assert_eq!(
            outline.sections[0].body,
            SectionBody::Static {
                resource_key: "resource_1".into()
            }
        );
        assert_eq!(
            outline.sections[1].body,
            SectionBody::Static {
                resource_key: String::new()
            }
        );
    }

    #[test]
    fn test_edited_text_becomes_inline_resource() {
        let table = ResourceTable::from_resources(vec![Resource::new("/docs/a.md")]);
        let blocks = vec![
            Block::text("One", "typed text").with_id("x1").with_edited(true),
            Block::text("Two", "more").with_id("x2").with_edited(true),
        ];

        let outline = build(&blocks, &table, "", "");
        assert_eq!(
            outline.sections[1].body,
            SectionBody::Static {
                resource_key: "inline_resource_2".into()
            }
        );

        let inline = outline.resources.get("inline_resource_1").unwrap();
        assert!(inline.is_inline);
        assert_eq!(inline.path, "inline_x1.txt");
        assert_eq!(inline.inline_content.as_deref(), Some("typed text"));
    }

    #[test]
    fn test_rebuild_is_fresh() {
        let blocks = vec![Block::text("One", "typed").with_edited(true)];
        let first = build(&blocks, &ResourceTable::new(), "", "");
        let second = build(&blocks, &first.resources, "", "");
        assert_eq!(first, second);
        assert_eq!(second.resources.len(), 1);
    }

    #[test]
    fn test_depth_matches_indent() {
        let outline = build(&levels(&[0, 1, 2, 3, 4, 5]), &ResourceTable::new(), "", "");
        assert_eq!(outline.max_depth(), 5);
        assert_eq!(outline.section_count(), 6);
    }

    #[test]
    fn test_depth_is_capped() {
        let outline = build(&levels(&[0, 1, 2, 3, 4, 5, 6, 5]), &ResourceTable::new(), "", "");
        assert_eq!(outline.max_depth(), 5);
        assert_eq!(outline.section_count(), 7);
    }
}
