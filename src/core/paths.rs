//! Path utilities
//!
//! Package-internal names always use '/' as separator; on-disk paths are
//! resolved against a caller-supplied root.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Characters allowed to survive in a title-derived file name
static UNSAFE_TITLE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9 _-]").expect("Invalid UNSAFE_TITLE_CHARS regex"));

/// Longest title prefix kept in generated package names
const MAX_TITLE_CHARS: usize = 50;

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Resolve `path` against `root` unless it is already absolute
pub fn resolve(root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}

/// Absolute, symlink-free form of an existing path; falls back to the input
pub fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Whether two resource paths name the same file once resolved against `root`
pub fn same_file(root: &Path, a: &str, b: &str) -> bool {
    Path::new(a) == Path::new(b) || canonical(&resolve(root, a)) == canonical(&resolve(root, b))
}

/// Lower-cased extension including the dot, or empty
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// First path under `dir` named `file_name` that does not exist yet.
///
/// Collisions are resolved by suffixing the stem: `notes.md`, `notes_1.md`,
/// `notes_2.md`, ...
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let first = dir.join(file_name);
    if !first.exists() {
        return first;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());
    let ext = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// File-system safe rendition of a document title
pub fn safe_title(title: &str) -> String {
    let cleaned = UNSAFE_TITLE_CHARS.replace_all(title, "_");
    let truncated: String = cleaned.chars().take(MAX_TITLE_CHARS).collect();
    let trimmed = truncated.trim();
    if trimmed.is_empty() {
        "Document".to_string()
    } else {
        trimmed.to_string()
    }
}
