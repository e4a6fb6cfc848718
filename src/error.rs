//! Typed errors for the export/store boundary.
//!
//! Orchestration code wraps these in `anyhow::Error` with context; callers that need to
//! distinguish fatal conditions (empty export directory, malformed conversations file) can
//! `downcast_ref::<ImportError>()`.

use std::io;

use thiserror::Error;

use crate::rendering::TemplateError;

pub type Result<T, E = ImportError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Export directory is empty")]
    EmptyExportDir,

    #[error("{path} is not an array")]
    NotAnArray { path: String },

    #[error("Failed to parse JSON in {path}: {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ImportError {
    /// Map an `io::Error` to `NotFound` when appropriate, `Io` otherwise
    pub fn from_io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_not_found() {
        let err = ImportError::from_io("a/b.md", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: a/b.md");
    }

    #[test]
    fn test_from_io_keeps_other_kinds() {
        let err = ImportError::from_io("a/b.md", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!err.is_not_found());
        assert!(err.to_string().starts_with("I/O error at a/b.md"));
    }
}
