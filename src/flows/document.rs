//! Document flows - build, flatten, lint and edit draft files
//!
//! A draft file is the editor-side JSON (`title`, `description`, `resources`,
//! `blocks`). These flows turn it into an outline and back, and apply
//! single editing operations to it in place.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::error::DocpackResult;
use crate::core::model::{Draft, Outline};
use crate::core::paths::{normalize_path, resolve};
use crate::core::render::{OutputFormat, RenderConfig, Renderer};
use crate::outline::lint::{lint_draft, LintIssue, LintSeverity};
use crate::outline::{build_draft, flatten_to_draft, write_inline_resources};

pub fn read_draft(path: &Path) -> Result<Draft> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read draft: {}", path.display()))?;
    Draft::from_json(&text).with_context(|| format!("Invalid draft JSON: {}", path.display()))
}

pub fn read_outline(path: &Path) -> Result<Outline> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read outline: {}", path.display()))?;
    Outline::from_json(&text).with_context(|| format!("Invalid outline JSON: {}", path.display()))
}

/// Write `value` as pretty JSON, creating parent directories
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json + "\n").with_context(|| format!("Failed to write: {}", path.display()))
}

/// Build an outline from a draft file.
///
/// Edited text blocks become inline resources; their text is written into
/// `inline_dir` (or next to `output` when only that is given) so the
/// written outline points at real files.
pub fn run_build(
    root: &Path,
    draft_path: &Path,
    output: Option<&Path>,
    inline_dir: Option<&Path>,
    config: RenderConfig,
) -> Result<()> {
    let draft = read_draft(&root.join(draft_path))?;
    let mut outline = build_draft(&draft);

    let output = output.map(|p| root.join(p));
    let inline_dir: Option<PathBuf> = inline_dir
        .map(|d| root.join(d))
        .or_else(|| output.as_ref().and_then(|o| o.parent().map(Path::to_path_buf)));

    match &inline_dir {
        Some(dir) => {
            let written = write_inline_resources(&mut outline, dir).with_context(|| {
                format!("Failed to write inline resources to {}", dir.display())
            })?;
            if !written.is_empty() {
                info!(count = written.len(), dir = %dir.display(), "Wrote inline resources");
            }
        }
        None => {
            let pending = outline
                .resources
                .iter()
                .filter(|r| r.inline_content.is_some())
                .count();
            if pending > 0 {
                warn!(pending, "Inline text not written to disk; pass --inline-dir to keep it");
            }
        }
    }

    match output {
        Some(path) => {
            write_json(&path, &outline)?;
            let renderer = Renderer::with_config(config);
            println!(
                "{}",
                renderer.json(&serde_json::json!({
                    "output": path,
                    "sections": outline.section_count(),
                    "resources": outline.resources.len(),
                }))
            );
        }
        None => println!("{}", Renderer::with_config(config).render_outline(&outline)),
    }

    Ok(())
}

/// Convert an outline file back into a draft. Relative resource paths are
/// resolved against `root` so text sections can load their files.
pub fn run_flatten(
    root: &Path,
    outline_path: &Path,
    output: Option<&Path>,
    config: RenderConfig,
) -> Result<()> {
    let mut outline = read_outline(&root.join(outline_path))?;
    for resource in outline.resources.iter_mut() {
        resource.path = resource_path(root, &resource.path);
    }
    let draft = flatten_to_draft(&outline);

    match output {
        Some(path) => {
            let path = root.join(path);
            write_json(&path, &draft)?;
            info!(output = %path.display(), blocks = draft.blocks.len(), "Draft written");
        }
        None => println!("{}", Renderer::with_config(config).render_draft(&draft)),
    }
    Ok(())
}

/// Lint a draft file. With `strict`, any error-level issue fails the command.
pub fn run_lint(root: &Path, draft_path: &Path, strict: bool, config: RenderConfig) -> Result<()> {
    let draft = read_draft(&root.join(draft_path))?;
    let issues = lint_draft(&draft);

    let renderer = Renderer::with_config(config);
    let rendered = match renderer.format() {
        OutputFormat::Json => renderer.json(&issues),
        OutputFormat::Markdown => issues_markdown(&issues),
        OutputFormat::Tree => issues_lines(&issues),
    };
    if !rendered.is_empty() {
        println!("{}", rendered);
    }

    let errors = issues
        .iter()
        .filter(|i| i.severity == LintSeverity::Error)
        .count();
    if strict && errors > 0 {
        if let Some(first) = issues.iter().find_map(LintIssue::to_error) {
            bail!("{} lint error(s), first: {}", errors, first);
        }
        bail!("{} lint error(s)", errors);
    }
    Ok(())
}

fn issues_markdown(issues: &[LintIssue]) -> String {
    if issues.is_empty() {
        return String::new();
    }
    let mut output = String::from("## Lint Issues\n\n");
    for issue in issues {
        output.push_str(&format!("- **{}**: {}", issue.code, issue.message));
        if let Some(index) = issue.index {
            output.push_str(&format!(" (block #{})", index + 1));
        }
        output.push('\n');
    }
    output
}

fn issues_lines(issues: &[LintIssue]) -> String {
    issues
        .iter()
        .map(|issue| {
            let severity = match issue.severity {
                LintSeverity::Error => "error",
                LintSeverity::Warning => "warning",
            };
            match issue.index {
                Some(index) => format!(
                    "{}[{}] #{}: {}",
                    severity,
                    issue.code,
                    index + 1,
                    issue.message
                ),
                None => format!("{}[{}]: {}", severity, issue.code, issue.message),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Apply one editing operation to a draft file and save it in place.
/// The operation's result is printed as JSON.
pub fn run_edit<F>(root: &Path, draft_path: &Path, config: RenderConfig, apply: F) -> Result<()>
where
    F: FnOnce(&mut Draft, &Path) -> DocpackResult<Value>,
{
    let path = root.join(draft_path);
    let mut draft = read_draft(&path)?;

    let outcome = apply(&mut draft, root)?;
    write_json(&path, &draft)?;

    println!("{}", Renderer::with_config(config).json(&outcome));
    Ok(())
}

/// Absolute '/'-separated form of a resource path taken from a flat outline
fn resource_path(root: &Path, path: &str) -> String {
    normalize_path(&resolve(root, path))
}
