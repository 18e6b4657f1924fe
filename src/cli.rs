//! CLI module - Command-line interface definitions and handlers

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

use crate::core::model::BlockKind;
use crate::core::render::{OutputFormat, RenderConfig};
use crate::outline::edit::{self, Direction};

/// docpack - turn flat block lists into document outlines and portable packages.
#[derive(Parser, Debug)]
#[command(name = "docpack")]
#[command(
    author,
    version,
    about,
    long_about = r#"docpack converts an editor draft (a flat, indentable list of AI, text and
heading blocks) into a nested outline for document generation, and bundles
that outline with every file it references into a single .docpack archive.

Output formats:
- json: machine-readable (default)
- md: human-friendly Markdown
- tree: compact indented tree

Examples:
    docpack build draft.json --output outline.json
    docpack save draft.json --out-dir packages
    docpack load packages/Report_20240309_140507_123.docpack --dest restored
    docpack edit draft.json add --kind text --after 3f2a...
"#
)]
pub struct Cli {
    /// Base directory for relative paths.
    #[arg(
        long,
        global = true,
        default_value = ".",
        env = "DOCPACK_ROOT",
        value_name = "ROOT",
        long_help = "Base directory for relative paths (defaults to the current directory).\n\n\
Draft, outline and package arguments, as well as relative resource paths inside\n\
drafts and outlines, are resolved against it."
    )]
    pub root: PathBuf,

    /// Output format (json/md/tree).
    #[arg(
        long,
        global = true,
        default_value = "json",
        value_name = "FORMAT",
        long_help = "Select the output format.\n\n\
Supported values:\n\
- json (default)\n\
- md (markdown)\n\
- tree"
    )]
    pub format: String,

    /// Quiet mode (errors only on stderr).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Only log errors to stderr. Results are still printed to stdout.\n\
RUST_LOG, when set, takes precedence."
    )]
    pub quiet: bool,

    /// Verbose mode (debug logging on stderr).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Log debug diagnostics to stderr, such as skipped blocks and dropped\n\
resource references. RUST_LOG, when set, takes precedence."
    )]
    pub verbose: bool,

    /// Pretty-print JSON output with indentation.
    #[arg(
        long,
        global = true,
        long_help = "Pretty-print JSON output with indentation for human readability.\n\n\
Has no effect on md/tree formats. Files written with --output are always pretty."
    )]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter implied by the verbosity flags
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build an outline from a draft.
    #[command(
        long_about = "Convert a draft's flat block list into a nested outline.\n\n\
Nesting follows indent levels; heading blocks and empty blocks produce no section.\n\
Edited text blocks become inline resources whose text is written to --inline-dir\n\
(or next to --output).\n\n\
Examples:\n\
  docpack build draft.json\n\
  docpack build draft.json --output outline.json\n\
  docpack --format tree build draft.json\n"
    )]
    Build {
        /// Draft JSON file.
        #[arg(value_name = "DRAFT")]
        draft: PathBuf,

        /// Write the outline JSON here instead of printing it.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Directory for inline resource files.
        #[arg(long, value_name = "DIR")]
        inline_dir: Option<PathBuf>,
    },

    /// Convert an outline back into a draft.
    #[command(
        long_about = "Walk an outline depth-first and emit one block per section, with the\n\
indent level equal to the section depth. Text sections load their file content.\n\n\
Example:\n\
  docpack flatten outline.json --output draft.json\n"
    )]
    Flatten {
        /// Outline JSON file.
        #[arg(value_name = "OUTLINE")]
        outline: PathBuf,

        /// Write the draft JSON here instead of printing it.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Check a draft for indent and resource problems.
    #[command(
        long_about = "Report indent violations (first block indented, level jumps, depth past 5),\n\
duplicate block ids, resources missing from the catalogue, empty blocks with\n\
children, and catalogue key problems.\n\n\
Examples:\n\
  docpack lint draft.json\n\
  docpack lint draft.json --strict\n"
    )]
    Lint {
        /// Draft JSON file.
        #[arg(value_name = "DRAFT")]
        draft: PathBuf,

        /// Exit with an error when any error-level issue is found.
        #[arg(long)]
        strict: bool,
    },

    /// Apply one editing operation to a draft, in place.
    Edit {
        /// Draft JSON file (rewritten on success).
        #[arg(value_name = "DRAFT")]
        draft: PathBuf,

        #[command(subcommand)]
        action: EditCommands,
    },

    /// Build a draft and pack it into a .docpack.
    #[command(
        long_about = "Build the draft's outline and pack it with its resource files.\n\n\
Without --output the package is named <title>_<YYYYmmdd_HHMMSS>_<millis>.docpack\n\
and placed in --out-dir (default: ROOT).\n\n\
Examples:\n\
  docpack save draft.json\n\
  docpack save draft.json --out-dir packages\n\
  docpack save draft.json --output report.docpack\n"
    )]
    Save {
        /// Draft JSON file.
        #[arg(value_name = "DRAFT")]
        draft: PathBuf,

        /// Package path.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Directory for generated package names.
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Pack an outline JSON file and its resources.
    Pack {
        /// Outline JSON file.
        #[arg(value_name = "OUTLINE")]
        outline: PathBuf,

        /// Package path.
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Extract a package's resources and print its manifest.
    #[command(
        long_about = "Restore every resource of a package into --dest and print the manifest\n\
with resource paths pointing at the restored files. Existing files are never\n\
overwritten: clashing names get a numeric suffix.\n\n\
Example:\n\
  docpack extract report.docpack --dest restored\n"
    )]
    Extract {
        /// Package file.
        #[arg(value_name = "PACKAGE")]
        archive: PathBuf,

        /// Destination directory.
        #[arg(long, env = "DOCPACK_DEST", default_value = "restored", value_name = "DIR")]
        dest: PathBuf,
    },

    /// Extract a package and convert it into a draft.
    #[command(
        long_about = "Load a .docpack as an editor draft. Only .docpack files are accepted and\n\
catalogue resources must be text files.\n\n\
Example:\n\
  docpack load report.docpack --dest restored --output draft.json\n"
    )]
    Load {
        /// Package file.
        #[arg(value_name = "PACKAGE")]
        archive: PathBuf,

        /// Destination directory for restored resources.
        #[arg(long, env = "DOCPACK_DEST", default_value = "restored", value_name = "DIR")]
        dest: PathBuf,

        /// Write the draft JSON here instead of printing it.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List a package's entries and show its outline without extracting.
    Inspect {
        /// Package file.
        #[arg(value_name = "PACKAGE")]
        archive: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum EditCommands {
    /// Insert an empty block.
    Add {
        /// Block kind (ai/text/heading).
        #[arg(long, default_value = "ai", value_name = "KIND")]
        kind: String,

        /// Insert after this block, taking its indent level.
        #[arg(long, value_name = "ID")]
        after: Option<String>,
    },

    /// Delete a block.
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Set a block's heading.
    Heading {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Set a block's content (text blocks become edited text).
    Content {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Indent a block one level.
    Indent {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Outdent a block one level.
    Outdent {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Convert a block between ai and text.
    Convert {
        #[arg(value_name = "ID")]
        id: String,

        /// Target kind (ai/text).
        #[arg(long, value_name = "KIND")]
        to: String,
    },

    /// Toggle a block's collapsed flag.
    Collapse {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Attach a file to a block.
    Attach {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Detach a file from a block.
    Detach {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Remove a resource from the catalogue and every block.
    RemoveResource {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Point a resource at another file, keeping its key.
    ReplaceResource {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Set a resource's description.
    Describe {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Set a resource's title.
    Retitle {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "TITLE")]
        title: String,
    },

    /// Drop catalogue resources no block uses.
    Prune,
}

fn parse_kind(kind: &str) -> Result<BlockKind> {
    kind.parse::<BlockKind>().map_err(anyhow::Error::msg)
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    // Parse output format
    let format: OutputFormat = cli.format.parse().unwrap_or_default();
    let render_config = RenderConfig::with_pretty(format, cli.pretty);

    // Get absolute root path
    let root = cli.root.canonicalize().unwrap_or(cli.root);

    match cli.command {
        Commands::Build {
            draft,
            output,
            inline_dir,
        } => crate::flows::document::run_build(
            &root,
            &draft,
            output.as_deref(),
            inline_dir.as_deref(),
            render_config,
        ),

        Commands::Flatten { outline, output } => {
            crate::flows::document::run_flatten(&root, &outline, output.as_deref(), render_config)
        }

        Commands::Lint { draft, strict } => {
            crate::flows::document::run_lint(&root, &draft, strict, render_config)
        }

        Commands::Edit { draft, action } => run_edit(&root, &draft, action, render_config),

        Commands::Save {
            draft,
            output,
            out_dir,
        } => crate::flows::archive::run_save(
            &root,
            &draft,
            output.as_deref(),
            out_dir.as_deref(),
            render_config,
        ),

        Commands::Pack { outline, output } => {
            crate::flows::archive::run_pack(&root, &outline, &output, render_config)
        }

        Commands::Extract { archive, dest } => {
            crate::flows::archive::run_extract(&root, &archive, &dest, render_config)
        }

        Commands::Load {
            archive,
            dest,
            output,
        } => crate::flows::archive::run_load(
            &root,
            &archive,
            &dest,
            output.as_deref(),
            render_config,
        ),

        Commands::Inspect { archive } => {
            crate::flows::archive::run_inspect(&root, &archive, render_config)
        }
    }
}

fn run_edit(
    root: &std::path::Path,
    draft: &std::path::Path,
    action: EditCommands,
    config: RenderConfig,
) -> Result<()> {
    use crate::flows::document::run_edit as apply;

    match action {
        EditCommands::Add { kind, after } => {
            let kind = parse_kind(&kind)?;
            apply(root, draft, config, |d, _| {
                let id = edit::insert_block(d, kind, after.as_deref())?;
                Ok(json!({ "id": id }))
            })
        }
        EditCommands::Delete { id } => apply(root, draft, config, |d, _| {
            let block = edit::delete_block(d, &id)?;
            Ok(json!({ "deleted": block.id }))
        }),
        EditCommands::Heading { id, text } => apply(root, draft, config, |d, _| {
            edit::set_heading(d, &id, &text)?;
            Ok(json!({ "id": id }))
        }),
        EditCommands::Content { id, text } => apply(root, draft, config, |d, root| {
            edit::set_content(d, root, &id, &text)?;
            Ok(json!({ "id": id }))
        }),
        EditCommands::Indent { id } => apply(root, draft, config, |d, _| {
            let moved = edit::shift_indent(d, &id, Direction::In)?;
            Ok(json!({ "id": id, "changed": moved }))
        }),
        EditCommands::Outdent { id } => apply(root, draft, config, |d, _| {
            let moved = edit::shift_indent(d, &id, Direction::Out)?;
            Ok(json!({ "id": id, "changed": moved }))
        }),
        EditCommands::Convert { id, to } => {
            let kind = parse_kind(&to)?;
            apply(root, draft, config, |d, _| {
                let converted = edit::convert(d, &id, kind)?;
                Ok(json!({ "id": id, "changed": converted }))
            })
        }
        EditCommands::Collapse { id } => apply(root, draft, config, |d, _| {
            let collapsed = edit::toggle_collapsed(d, &id)?;
            Ok(json!({ "id": id, "collapsed": collapsed }))
        }),
        EditCommands::Attach { id, path } => apply(root, draft, config, |d, root| {
            let key = edit::attach_resource(d, root, &id, &path)?;
            Ok(json!({ "id": id, "key": key }))
        }),
        EditCommands::Detach { id, path } => apply(root, draft, config, |d, root| {
            let dropped = edit::detach_resource(d, root, &id, &path)?;
            Ok(json!({ "id": id, "released": dropped.map(|r| r.key) }))
        }),
        EditCommands::RemoveResource { key } => apply(root, draft, config, |d, root| {
            let removed = edit::remove_resource(d, root, &key)?;
            Ok(json!({ "removed": removed.key, "path": removed.path }))
        }),
        EditCommands::ReplaceResource { key, path } => apply(root, draft, config, |d, root| {
            let old = edit::replace_resource(d, root, &key, &path)?;
            Ok(json!({ "key": key, "previous": old }))
        }),
        EditCommands::Describe { key, text } => apply(root, draft, config, |d, root| {
            edit::describe_resource(d, root, &key, &text)?;
            Ok(json!({ "key": key }))
        }),
        EditCommands::Retitle { key, title } => apply(root, draft, config, |d, root| {
            edit::retitle_resource(d, root, &key, &title)?;
            Ok(json!({ "key": key }))
        }),
        EditCommands::Prune => apply(root, draft, config, |d, root| {
            let dropped: Vec<String> = edit::prune_resources(d, root)
                .into_iter()
                .map(|r| r.key)
                .collect();
            Ok(json!({ "pruned": dropped }))
        }),
    }
}
