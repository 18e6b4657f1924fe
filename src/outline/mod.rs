//! Outline module - Conversion between the flat block list and the outline tree
//!
//! Provides:
//! - build: Flat blocks -> nested sections
//! - flatten: Nested sections -> flat blocks (import path)
//! - inline: Write edited text out as resource files
//! - edit: Block list editing that keeps indentation and resources consistent
//! - lint: Strict validation of a block list

pub mod build;
pub mod edit;
pub mod flatten;
pub mod inline;
pub mod lint;

pub use build::{build, build_draft};
pub use flatten::{flatten, flatten_to_draft};
pub use inline::write_inline_resources;
