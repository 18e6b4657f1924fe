//! Core module - Document model and shared utilities
//!
//! This module provides:
//! - Block, section, outline and draft types
//! - The keyed resource table
//! - Error taxonomy
//! - Path helpers
//! - Rendering for the CLI output formats

pub mod error;
pub mod model;
pub mod paths;
pub mod render;
pub mod resources;
