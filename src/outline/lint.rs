//! Block list linting
//!
//! Checks for:
//! - Indent structure (first block indented, level jumps, depth past the cap)
//! - Duplicate block ids
//! - Block resources missing from the resource table
//! - Empty blocks that still host children
//! - Resource table keys (empty or duplicate) and empty paths
//!
//! Linting only reports; `build` keeps its skip-and-continue policy.

use serde::Serialize;
use std::collections::HashSet;

use crate::core::error::DocpackError;
use crate::core::model::{BlockBody, Draft, MAX_INDENT_LEVEL};

/// Lint issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    Error,
    Warning,
}

/// A lint issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    pub severity: LintSeverity,
    pub code: String,
    pub message: String,
    /// Position in the block list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl LintIssue {
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            severity: LintSeverity::Error,
            code: code.to_string(),
            message: message.to_string(),
            index: None,
            block: None,
            path: None,
        }
    }

    pub fn warning(code: &str, message: &str) -> Self {
        Self {
            severity: LintSeverity::Warning,
            ..Self::error(code, message)
        }
    }

    fn at(mut self, index: usize, block: &str) -> Self {
        self.index = Some(index);
        self.block = Some(block.to_string());
        self
    }

    fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// The taxonomy error this issue stands for, when there is one
    pub fn to_error(&self) -> Option<DocpackError> {
        match self.code.as_str() {
            "FIRST_BLOCK_INDENTED" | "INDENT_JUMP" | "INDENT_TOO_DEEP" => {
                Some(DocpackError::MalformedBlockList {
                    index: self.index?,
                    message: self.message.clone(),
                })
            }
            "UNRESOLVED_REFERENCE" => Some(DocpackError::UnresolvedReference {
                block_id: self.block.clone()?,
                path: self.path.clone()?,
            }),
            _ => None,
        }
    }
}

/// Lint a draft's block list and resource table
pub fn lint_draft(draft: &Draft) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut previous: Option<u8> = None;
    let mut seen_block = false;

    for (idx, block) in draft.blocks.iter().enumerate() {
        if !seen_ids.insert(block.id.as_str()) {
            issues.push(
                LintIssue::error(
                    "DUPLICATE_BLOCK_ID",
                    &format!("Block id '{}' is used more than once", block.id),
                )
                .at(idx, &block.id),
            );
        }

        // headings sit outside the tree and do not count for indentation
        if matches!(block.body, BlockBody::Heading { .. }) {
            continue;
        }

        // `previous` tracks the last block `build` keeps
        let level = block.indent_level;
        let allowed = previous.map_or(0, |prev| prev.saturating_add(1));
        if level > allowed {
            let issue = match previous {
                None if !seen_block => LintIssue::error(
                    "FIRST_BLOCK_INDENTED",
                    &format!("First block is indented to level {}", level),
                ),
                _ => LintIssue::error(
                    "INDENT_JUMP",
                    &format!(
                        "Block at level {} has no parent at level {}; it will be left out of the outline",
                        level,
                        level - 1
                    ),
                ),
            };
            issues.push(issue.at(idx, &block.id));
        }
        if level > MAX_INDENT_LEVEL {
            issues.push(
                LintIssue::error(
                    "INDENT_TOO_DEEP",
                    &format!(
                        "Block is at level {}, the deepest allowed is {}",
                        level, MAX_INDENT_LEVEL
                    ),
                )
                .at(idx, &block.id),
            );
        }
        if level <= allowed && level <= MAX_INDENT_LEVEL {
            previous = Some(level);
        }
        seen_block = true;

        for resource in block.resources() {
            if draft.resources.key_for_path(&resource.path).is_none() {
                issues.push(
                    LintIssue::warning(
                        "UNRESOLVED_REFERENCE",
                        &format!(
                            "Resource '{}' is not in the resource table and will be dropped",
                            resource.path
                        ),
                    )
                    .at(idx, &block.id)
                    .with_path(&resource.path),
                );
            }
        }

        if block.is_placeholder() && has_children(draft, idx) {
            issues.push(
                LintIssue::warning(
                    "EMPTY_PARENT",
                    "Empty block has indented children; they move to the previous section",
                )
                .at(idx, &block.id),
            );
        }
    }

    for table_issue in draft.resources.validate() {
        issues.push(LintIssue::error(table_issue.code, &table_issue.message));
    }

    issues
}

fn has_children(draft: &Draft, idx: usize) -> bool {
    let level = draft.blocks[idx].indent_level;
    draft.blocks[idx + 1..]
        .iter()
        .find(|b| !matches!(b.body, BlockBody::Heading { .. }))
        .is_some_and(|next| next.indent_level > level)
}
