//! Archive flows - save, pack, extract, load and inspect `.docpack` files

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};

use crate::core::error::{DocpackError, DocpackResult};
use crate::core::model::{Draft, Outline};
use crate::core::paths::{dotted_extension, safe_title};
use crate::core::render::{OutputFormat, RenderConfig, Renderer};
use crate::flows::document::{read_draft, read_outline, write_json};
use crate::outline::{build_draft, flatten_to_draft};
use crate::package::manifest::PACKAGE_EXTENSION;
use crate::package::{extract, pack_outline, read_manifest, Extracted, PackReport};

/// Resource extensions a loaded package may carry
pub const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".py", ".c", ".cpp", ".h", ".java", ".js", ".ts", ".jsx", ".tsx", ".json",
    ".xml", ".yaml", ".yml", ".toml", ".ini", ".cfg", ".conf", ".sh", ".bash", ".zsh", ".fish",
    ".ps1", ".bat", ".cmd", ".rs", ".go", ".rb", ".php", ".pl", ".lua", ".r", ".m", ".swift",
    ".kt", ".scala", ".clj", ".ex", ".exs", ".elm", ".fs", ".ml", ".sql", ".html", ".htm",
    ".css", ".scss", ".sass", ".less", ".vue", ".svelte", ".astro", ".tex", ".rst", ".adoc",
    ".org", ".csv",
];

/// `<safe title>_<YYYYmmdd_HHMMSS>_<millis>.docpack`
pub fn package_file_name(title: &str, at: DateTime<Local>) -> String {
    format!(
        "{}_{}_{:03}.{}",
        safe_title(title),
        at.format("%Y%m%d_%H%M%S"),
        at.timestamp_subsec_millis(),
        PACKAGE_EXTENSION
    )
}

/// Build a draft and pack it with its resources
pub fn save_draft(
    draft: &Draft,
    root: &Path,
    output: Option<&Path>,
    out_dir: &Path,
) -> DocpackResult<PackReport> {
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => out_dir.join(package_file_name(&draft.title, Local::now())),
    };
    let outline = build_draft(draft);
    pack_outline(&outline, root, &output)
}

/// Extract a package and turn it into an editor draft.
///
/// Only `.docpack` files are accepted, and every restored catalogue resource
/// must be a text file. Inline resources are folded into their blocks.
pub fn load_package(archive: &Path, dest: &Path) -> DocpackResult<(Draft, Extracted)> {
    if dotted_extension(archive) != format!(".{}", PACKAGE_EXTENSION) {
        return Err(DocpackError::UnsupportedPackage(archive.to_path_buf()));
    }

    let extracted = extract(archive, dest)?;
    let outline = extracted.outline()?;

    let rejected: Vec<String> = outline
        .resources
        .iter()
        .filter(|r| !r.is_inline())
        .filter_map(|r| {
            let ext = dotted_extension(Path::new(&r.path));
            if TEXT_EXTENSIONS.contains(&ext.as_str()) {
                None
            } else {
                Some(format!("{} ({})", r.title, ext))
            }
        })
        .collect();
    if !rejected.is_empty() {
        return Err(DocpackError::UnsupportedResource(rejected));
    }

    for collision in extracted.notes() {
        warn!("{}", collision);
    }

    Ok((flatten_to_draft(&outline), extracted))
}

fn print_report(report: &PackReport, config: RenderConfig) {
    let renderer = Renderer::with_config(config);
    match renderer.format() {
        OutputFormat::Json => println!("{}", renderer.json(report)),
        OutputFormat::Markdown | OutputFormat::Tree => {
            println!("Wrote {}", report.output.display());
            println!("  packed: {}", report.packed.join(", "));
            for omitted in &report.omitted {
                println!("  omitted: {} ({})", omitted.key, omitted.path);
            }
        }
    }
    for omitted in &report.omitted {
        warn!(key = %omitted.key, path = %omitted.path, "Resource left out of the package");
    }
}

pub fn run_save(
    root: &Path,
    draft_path: &Path,
    output: Option<&Path>,
    out_dir: Option<&Path>,
    config: RenderConfig,
) -> Result<()> {
    let draft = read_draft(&root.join(draft_path))?;
    let output = output.map(|p| root.join(p));
    let out_dir = out_dir.map(|d| root.join(d)).unwrap_or_else(|| root.to_path_buf());

    let report = save_draft(&draft, root, output.as_deref(), &out_dir)
        .with_context(|| format!("Failed to save {}", draft_path.display()))?;
    print_report(&report, config);
    Ok(())
}

pub fn run_pack(
    root: &Path,
    outline_path: &Path,
    output: &Path,
    config: RenderConfig,
) -> Result<()> {
    let outline = read_outline(&root.join(outline_path))?;
    let report = pack_outline(&outline, root, &root.join(output))
        .with_context(|| format!("Failed to pack {}", outline_path.display()))?;
    print_report(&report, config);
    Ok(())
}

pub fn run_extract(root: &Path, archive: &Path, dest: &Path, config: RenderConfig) -> Result<()> {
    let archive = root.join(archive);
    let extracted = extract(&archive, &root.join(dest))
        .with_context(|| format!("Failed to extract {}", archive.display()))?;
    for note in extracted.notes() {
        warn!("{}", note);
    }

    let renderer = Renderer::with_config(config);
    match renderer.format() {
        OutputFormat::Json => println!("{}", renderer.json(&extracted)),
        _ => println!("{}", renderer.render_outline(&extracted.outline()?)),
    }
    Ok(())
}

pub fn run_load(
    root: &Path,
    archive: &Path,
    dest: &Path,
    output: Option<&Path>,
    config: RenderConfig,
) -> Result<()> {
    let archive = root.join(archive);
    let (draft, extracted) = load_package(&archive, &root.join(dest))
        .with_context(|| format!("Failed to load {}", archive.display()))?;

    info!(
        blocks = draft.blocks.len(),
        resources = draft.resources.len(),
        restored = extracted.files.len(),
        "Package loaded"
    );

    match output {
        Some(path) => {
            let path = root.join(path);
            write_json(&path, &draft)?;
            println!("{}", Renderer::with_config(config).json(&json!({ "output": path })));
        }
        None => println!("{}", Renderer::with_config(config).render_draft(&draft)),
    }
    Ok(())
}

pub fn run_inspect(root: &Path, archive: &Path, config: RenderConfig) -> Result<()> {
    let archive = root.join(archive);
    let (zip, manifest) = read_manifest(&archive)
        .with_context(|| format!("Failed to open {}", archive.display()))?;
    let entries: Vec<String> = zip.file_names().map(str::to_string).collect();

    let renderer = Renderer::with_config(config);
    match renderer.format() {
        OutputFormat::Json => {
            println!(
                "{}",
                renderer.json(&json!({ "entries": entries, "manifest": manifest }))
            );
        }
        _ => {
            let outline = Outline::from_value(manifest)?;
            println!("{}", renderer.render_outline(&outline));
            println!();
            let mut sorted = entries;
            sorted.sort();
            for entry in sorted {
                println!("  {}", entry);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Block, Resource};
    use crate::core::resources::ResourceTable;
    use chrono::TimeZone;
    use std::fs;

    #[test]
    fn test_package_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            package_file_name("Q3 Report: draft", at),
            "Q3 Report_ draft_20240309_140507_000.docpack"
        );
        assert!(package_file_name("", at).starts_with("Document_"));
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("notes.md"), "background notes").unwrap();

        let draft = Draft {
            title: "Round Trip".into(),
            description: "Guide".into(),
            resources: ResourceTable::from_resources(vec![Resource::new("notes.md")]),
            blocks: vec![
                Block::text("Typed", "my words").with_edited(true),
                Block::ai("Gen", "write more")
                    .with_indent(1)
                    .with_resource(Resource::new("notes.md")),
            ],
        };

        let report = save_draft(&draft, temp.path(), None, &temp.path().join("out")).unwrap();
        assert!(report.is_complete());
        let name = report.output.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Round Trip_"));
        assert!(name.ends_with(".docpack"));

        let (loaded, extracted) =
            load_package(&report.output, &temp.path().join("restored")).unwrap();
        assert_eq!(extracted.files.len(), 2);
        assert_eq!(loaded.title, "Round Trip");
        assert_eq!(loaded.description, "Guide");
        // inline text comes back as block content, not as a catalogue entry
        assert_eq!(loaded.resources.len(), 1);
        assert_eq!(loaded.resources.iter().next().unwrap().key, "resource_1");
        assert_eq!(loaded.blocks[0].content(), "my words");
        assert!(!loaded.blocks[0].collapsed);
        assert!(loaded.blocks[1].collapsed);
        assert_eq!(loaded.blocks[1].resources().len(), 1);
    }

    #[test]
    fn test_load_rejects_other_extensions() {
        let temp = tempfile::tempdir().unwrap();
        let zip = temp.path().join("a.zip");
        fs::write(&zip, "x").unwrap();
        let err = load_package(&zip, temp.path()).unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_PACKAGE");
    }

    #[test]
    fn test_load_rejects_binary_resources() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("logo.png"), [0u8, 1, 2]).unwrap();
        let draft = Draft {
            title: "Pics".into(),
            resources: ResourceTable::from_resources(vec![Resource::new("logo.png")]),
            blocks: vec![Block::ai("A", "p").with_resource(Resource::new("logo.png"))],
            ..Default::default()
        };
        let report = save_draft(&draft, temp.path(), None, temp.path()).unwrap();

        let err = load_package(&report.output, &temp.path().join("restored")).unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_RESOURCE");
        assert!(err.to_string().contains("logo.png (.png)"));
    }

    #[test]
    fn test_load_empty_outline_gives_one_block() {
        let temp = tempfile::tempdir().unwrap();
        let draft = Draft {
            title: "Empty".into(),
            ..Default::default()
        };
        let output = temp.path().join("empty.docpack");
        save_draft(&draft, temp.path(), Some(&output), temp.path()).unwrap();

        let (loaded, _) = load_package(&output, &temp.path().join("restored")).unwrap();
        assert_eq!(loaded.blocks.len(), 1);
        assert!(loaded.blocks[0].is_placeholder());
    }
}
