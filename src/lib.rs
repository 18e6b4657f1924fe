//! docpack - outline building and portable document packages
//!
//! docpack provides:
//! - Conversion of a flat, indentable block list into a nested outline
//! - The reverse conversion from outline to blocks
//! - A single-file `.docpack` archive bundling an outline with its resources
//! - Conflict-safe extraction that rewrites resource paths

pub mod cli;
pub mod core;
pub mod flows;
pub mod outline;
pub mod package;
