//! Error taxonomy for outline building and package handling

use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocpackError {
    /// Indent structure violation found by strict validation
    #[error("malformed block list at index {index}: {message}")]
    MalformedBlockList { index: usize, message: String },

    /// A block references a resource path missing from the resource table
    #[error("block {block_id} references unknown resource: {path}")]
    UnresolvedReference { block_id: String, path: String },

    #[error("cannot write package {}: {message}", .path.display())]
    PackageWrite { path: PathBuf, message: String },

    #[error("invalid package {}: {message}", .path.display())]
    PackageFormat { path: PathBuf, message: String },

    /// Informational: a restored file was renamed to avoid clobbering
    #[error("{} already existed, restored as {}", .original.display(), .restored.display())]
    ResourceCollision { original: PathBuf, restored: PathBuf },

    #[error("no block with id {0}")]
    BlockNotFound(String),

    #[error("no resource with key {0}")]
    ResourceNotFound(String),

    #[error("only .docpack files are supported: {}", .0.display())]
    UnsupportedPackage(PathBuf),

    #[error("unsupported resource file types: {}", .0.join(", "))]
    UnsupportedResource(Vec<String>),

    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl serde::Serialize for DocpackError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("DocpackError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl DocpackError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedBlockList { .. } => "MALFORMED_BLOCK_LIST",
            Self::UnresolvedReference { .. } => "UNRESOLVED_REFERENCE",
            Self::PackageWrite { .. } => "PACKAGE_WRITE_ERROR",
            Self::PackageFormat { .. } => "PACKAGE_FORMAT_ERROR",
            Self::ResourceCollision { .. } => "RESOURCE_COLLISION",
            Self::BlockNotFound(_) => "BLOCK_NOT_FOUND",
            Self::ResourceNotFound(_) => "RESOURCE_NOT_FOUND",
            Self::UnsupportedPackage(_) => "UNSUPPORTED_PACKAGE",
            Self::UnsupportedResource(_) => "UNSUPPORTED_RESOURCE",
            Self::Io { .. } => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Whether the condition aborts the operation that produced it
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::MalformedBlockList { .. }
                | Self::UnresolvedReference { .. }
                | Self::ResourceCollision { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::PackageWrite {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::PackageFormat {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type DocpackResult<T> = Result<T, DocpackError>;
