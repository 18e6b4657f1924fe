//! Package module - `.docpack` archives
//!
//! A package is a zip archive holding the outline manifest (`outline.json`)
//! and one `resources/<key><ext>` entry per resource file.

pub mod create;
pub mod extract;
pub mod manifest;

pub use create::{create, pack_outline, OmittedResource, PackReport};
pub use extract::{extract, read_manifest, Collision, Extracted};
