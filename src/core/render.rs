//! Renderer module
//!
//! Renders outlines, drafts and reports to the CLI output formats: json, md, tree

use serde::Serialize;

use crate::core::model::{Block, BlockBody, Draft, Outline, Section, SectionBody};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
    Tree,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "tree" => Ok(OutputFormat::Tree),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Render configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl RenderConfig {
    pub fn with_pretty(format: OutputFormat, pretty: bool) -> Self {
        Self { format, pretty }
    }
}

pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self::with_config(RenderConfig::with_pretty(format, false))
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn format(&self) -> OutputFormat {
        self.config.format
    }

    /// Serialize any value as JSON, honoring `pretty`
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.config.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|_| "null".to_string())
    }

    pub fn render_outline(&self, outline: &Outline) -> String {
        match self.config.format {
            OutputFormat::Json => self.json(outline),
            OutputFormat::Markdown => outline_markdown(outline),
            OutputFormat::Tree => outline_tree(outline),
        }
    }

    pub fn render_draft(&self, draft: &Draft) -> String {
        match self.config.format {
            OutputFormat::Json => self.json(draft),
            OutputFormat::Markdown | OutputFormat::Tree => {
                blocks_tree(&draft.title, &draft.blocks)
            }
        }
    }
}

fn outline_markdown(outline: &Outline) -> String {
    let mut output = String::new();

    if !outline.title.is_empty() {
        output.push_str(&format!("# {}\n\n", outline.title));
    }
    if !outline.general_instruction.is_empty() {
        for line in outline.general_instruction.lines() {
            output.push_str(&format!("> {}\n", line));
        }
        output.push('\n');
    }

    if !outline.resources.is_empty() {
        output.push_str("## Resources\n\n");
        for resource in &outline.resources {
            output.push_str(&format!(
                "- `{}` {} (`{}`)",
                resource.key, resource.title, resource.path
            ));
            if !resource.description.is_empty() {
                output.push_str(&format!(": {}", resource.description));
            }
            output.push('\n');
        }
        output.push('\n');
    }

    if !outline.sections.is_empty() {
        output.push_str("## Sections\n\n");
        for section in &outline.sections {
            section_markdown(&mut output, section, 3);
        }
    }

    output
}

fn section_markdown(output: &mut String, section: &Section, level: usize) {
    let hashes = "#".repeat(level.min(6));
    let title = if section.title.is_empty() {
        "(untitled)"
    } else {
        section.title.as_str()
    };
    output.push_str(&format!("{} {}\n\n", hashes, title));

    match &section.body {
        SectionBody::Ai { prompt, refs } => {
            if !prompt.is_empty() {
                output.push_str("```\n");
                output.push_str(prompt);
                if !prompt.ends_with('\n') {
                    output.push('\n');
                }
                output.push_str("```\n");
            }
            if !refs.is_empty() {
                let keys: Vec<String> = refs.iter().map(|k| format!("`{}`", k)).collect();
                output.push_str(&format!("\nRefs: {}\n", keys.join(", ")));
            }
        }
        SectionBody::Static { resource_key } => {
            if resource_key.is_empty() {
                output.push_str("_Static, no resource_\n");
            } else {
                output.push_str(&format!("_Static from `{}`_\n", resource_key));
            }
        }
    }
    output.push('\n');

    for child in &section.sections {
        section_markdown(output, child, level + 1);
    }
}

fn outline_tree(outline: &Outline) -> String {
    let mut lines = vec![if outline.title.is_empty() {
        ".".to_string()
    } else {
        outline.title.clone()
    }];
    for section in &outline.sections {
        section_tree(&mut lines, section, 1);
    }
    lines.join("\n")
}

fn section_tree(lines: &mut Vec<String>, section: &Section, depth: usize) {
    let indent = "  ".repeat(depth);
    let line = match &section.body {
        SectionBody::Ai { refs, .. } if refs.is_empty() => {
            format!("{}[ai] {}", indent, section.title)
        }
        SectionBody::Ai { refs, .. } => {
            format!("{}[ai] {} <{}>", indent, section.title, refs.join(", "))
        }
        SectionBody::Static { resource_key } if resource_key.is_empty() => {
            format!("{}[text] {}", indent, section.title)
        }
        SectionBody::Static { resource_key } => {
            format!("{}[text] {} <{}>", indent, section.title, resource_key)
        }
    };
    lines.push(line);
    for child in &section.sections {
        section_tree(lines, child, depth + 1);
    }
}

fn blocks_tree(title: &str, blocks: &[Block]) -> String {
    let mut lines = vec![if title.is_empty() {
        ".".to_string()
    } else {
        title.to_string()
    }];
    for block in blocks {
        let indent = "  ".repeat(usize::from(block.indent_level) + 1);
        let label = match &block.body {
            BlockBody::Heading { content } => format!("# {}", content),
            BlockBody::Ai { heading, .. } => format!("[ai] {}", heading),
            BlockBody::Text { heading, edited, .. } if *edited => format!("[text*] {}", heading),
            BlockBody::Text { heading, .. } => format!("[text] {}", heading),
        };
        let attached = block.resources().len();
        if attached > 0 {
            lines.push(format!("{}{} ({} resources)", indent, label, attached));
        } else {
            lines.push(format!("{}{}", indent, label));
        }
    }
    lines.join("\n")
}
