//! Flows module - Multi-step operations behind the CLI commands
//!
//! Provides:
//! - document: Build, flatten, lint and edit draft files
//! - archive: Save, pack, extract, load and inspect packages

pub mod archive;
pub mod document;
