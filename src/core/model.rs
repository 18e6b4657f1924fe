//! Document model
//!
//! Two shapes of the same document live here:
//! - the flat, editor-facing `Block` list held in a `Draft`
//! - the hierarchical, generation-facing `Outline` of `Section`s
//!
//! Both serialize to the JSON layouts exchanged with the editor and stored
//! inside `.docpack` archives.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::resources::ResourceTable;

/// Deepest indent level a block may carry
pub const MAX_INDENT_LEVEL: u8 = 5;

/// Key prefix of resources synthesized from edited text blocks
pub const INLINE_KEY_PREFIX: &str = "inline_resource_";

/// Key prefix of catalogue resources
pub const RESOURCE_KEY_PREFIX: &str = "resource_";

/// A keyed reference to a file on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub key: String,

    pub path: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Working-copy marker for resources synthesized from edited text.
    /// Never written into a package manifest.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_inline: bool,

    /// Pending content of an inline resource that has not been written yet
    #[serde(skip)]
    pub inline_content: Option<String>,
}

impl Resource {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let title = file_name_of(&path);
        Self {
            path,
            title,
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Inline either by marker or by key convention (older manifests lack the marker)
    pub fn is_inline(&self) -> bool {
        self.is_inline || self.key.starts_with(INLINE_KEY_PREFIX)
    }

    /// File name component of the path
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Kind-specific payload of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockBody {
    /// Flat label; never becomes a section
    Heading {
        #[serde(default)]
        content: String,
    },

    /// Instruction for generated content plus context resources
    Ai {
        #[serde(default)]
        heading: String,
        #[serde(default)]
        content: String,
        #[serde(default)]
        resources: Vec<Resource>,
    },

    /// Literal text, optionally backed by a single file
    Text {
        #[serde(default)]
        heading: String,
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resource: Option<Resource>,
        /// Content was typed in the editor rather than loaded from `resource`
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        edited: bool,
    },
}

/// Discriminant of `BlockBody`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Heading,
    Ai,
    Text,
}

impl std::str::FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "heading" => Ok(BlockKind::Heading),
            "ai" => Ok(BlockKind::Ai),
            "text" => Ok(BlockKind::Text),
            _ => Err(format!("Unknown block kind: {}", s)),
        }
    }
}

/// One entry of the flat, user-ordered block list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,

    #[serde(default)]
    pub indent_level: u8,

    /// Display hint only
    #[serde(default)]
    pub collapsed: bool,

    #[serde(flatten)]
    pub body: BlockBody,

    /// Body of the other section kind, restored when the block is converted back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stash: Option<Box<BlockBody>>,
}

impl Block {
    pub fn new(body: BlockBody) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            indent_level: 0,
            collapsed: false,
            body,
            stash: None,
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self::new(BlockBody::Heading {
            content: text.into(),
        })
    }

    pub fn ai(heading: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(BlockBody::Ai {
            heading: heading.into(),
            content: prompt.into(),
            resources: Vec::new(),
        })
    }

    pub fn text(heading: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(BlockBody::Text {
            heading: heading.into(),
            content: content.into(),
            resource: None,
            edited: false,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_indent(mut self, level: u8) -> Self {
        self.indent_level = level;
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        match &mut self.body {
            BlockBody::Ai { resources, .. } => resources.push(resource),
            BlockBody::Text {
                resource: slot, ..
            } => *slot = Some(resource),
            BlockBody::Heading { .. } => {}
        }
        self
    }

    pub fn with_edited(mut self, value: bool) -> Self {
        if let BlockBody::Text { edited, .. } = &mut self.body {
            *edited = value;
        }
        self
    }

    pub fn kind(&self) -> BlockKind {
        match self.body {
            BlockBody::Heading { .. } => BlockKind::Heading,
            BlockBody::Ai { .. } => BlockKind::Ai,
            BlockBody::Text { .. } => BlockKind::Text,
        }
    }

    pub fn heading_text(&self) -> &str {
        match &self.body {
            BlockBody::Heading { .. } => "",
            BlockBody::Ai { heading, .. } | BlockBody::Text { heading, .. } => heading,
        }
    }

    pub fn content(&self) -> &str {
        match &self.body {
            BlockBody::Heading { content }
            | BlockBody::Ai { content, .. }
            | BlockBody::Text { content, .. } => content,
        }
    }

    /// Resources attached to this block, in attachment order
    pub fn resources(&self) -> Vec<&Resource> {
        match &self.body {
            BlockBody::Heading { .. } => Vec::new(),
            BlockBody::Ai { resources, .. } => resources.iter().collect(),
            BlockBody::Text { resource, .. } => resource.iter().collect(),
        }
    }

    /// A section block with no heading, content or resources
    pub fn is_placeholder(&self) -> bool {
        match &self.body {
            BlockBody::Heading { .. } => false,
            _ => {
                self.heading_text().is_empty()
                    && self.content().is_empty()
                    && self.resources().is_empty()
            }
        }
    }
}

/// Kind-specific payload of a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SectionBody {
    Ai { prompt: String, refs: Vec<String> },
    Static { resource_key: String },
}

/// Node of the outline tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSection")]
pub struct Section {
    pub title: String,

    #[serde(flatten)]
    pub body: SectionBody,

    pub sections: Vec<Section>,
}

impl Section {
    pub fn ai(title: impl Into<String>, prompt: impl Into<String>, refs: Vec<String>) -> Self {
        Self {
            title: title.into(),
            body: SectionBody::Ai {
                prompt: prompt.into(),
                refs,
            },
            sections: Vec::new(),
        }
    }

    pub fn fixed(title: impl Into<String>, resource_key: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: SectionBody::Static {
                resource_key: resource_key.into(),
            },
            sections: Vec::new(),
        }
    }

    pub fn with_children(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    /// Depth of the deepest descendant (0 for a leaf)
    pub fn depth(&self) -> usize {
        self.sections
            .iter()
            .map(|s| s.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of sections in this subtree, self included
    pub fn count(&self) -> usize {
        1 + self.sections.iter().map(Section::count).sum::<usize>()
    }
}

/// Lenient wire shape: either variant may be absent in hand-written manifests
#[derive(Deserialize)]
struct RawSection {
    #[serde(default)]
    title: String,
    prompt: Option<String>,
    refs: Option<Vec<String>>,
    resource_key: Option<String>,
    #[serde(default)]
    sections: Vec<Section>,
}

impl From<RawSection> for Section {
    fn from(raw: RawSection) -> Self {
        let body = match (raw.prompt, raw.resource_key) {
            (Some(prompt), _) => SectionBody::Ai {
                prompt,
                refs: raw.refs.unwrap_or_default(),
            },
            (None, Some(resource_key)) => SectionBody::Static { resource_key },
            (None, None) => SectionBody::Ai {
                prompt: String::new(),
                refs: raw.refs.unwrap_or_default(),
            },
        };
        Section {
            title: raw.title,
            body,
            sections: raw.sections,
        }
    }
}

/// Root document model handed to generation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub general_instruction: String,

    #[serde(default)]
    pub resources: ResourceTable,

    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Outline {
    /// Parse an outline manifest, defaulting missing resource titles
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut outline: Outline = serde_json::from_str(json)?;
        outline.resources.fill_default_titles();
        Ok(outline)
    }

    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        let mut outline: Outline = serde_json::from_value(value)?;
        outline.resources.fill_default_titles();
        Ok(outline)
    }

    pub fn section_count(&self) -> usize {
        self.sections.iter().map(Section::count).sum()
    }

    /// Number of nesting levels below the roots (0 when all sections are roots)
    pub fn max_depth(&self) -> usize {
        self.sections.iter().map(Section::depth).max().unwrap_or(0)
    }
}

/// Editor-side document state: metadata, resource catalogue and flat blocks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub title: String,

    /// Free-text guidance; becomes `general_instruction`
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub resources: ResourceTable,

    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Draft {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut draft: Draft = serde_json::from_str(json)?;
        draft.resources.assign_missing_keys();
        draft.resources.fill_default_titles();
        Ok(draft)
    }
}
