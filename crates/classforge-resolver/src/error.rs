//! Error types for class resolution
//!
//! Callers tell a missing dependency ([`ResolutionError::NotFound`]) apart
//! from a broken class file ([`ResolutionError::Malformed`]) and from
//! filesystem trouble ([`ResolutionError::Io`]).

use classforge_classfile::{ArtifactError, ClassName};
use std::path::PathBuf;

/// Errors building a context or resolving a class
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// No classpath entry holds `missing`
    #[error("class {missing} not found (needed by {requested})")]
    NotFound {
        missing: ClassName,
        requested: ClassName,
    },

    /// Bytes were found but do not form the expected class
    #[error("malformed class {name} from {origin}: {source}")]
    Malformed {
        name: ClassName,
        origin: String,
        #[source]
        source: ArtifactError,
    },

    /// IO error reading a class
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Classpath entry cannot be used
    #[error("invalid classpath entry {path}: {reason}")]
    InvalidEntry { path: PathBuf, reason: String },
}

impl ResolutionError {
    /// `name` itself is missing
    #[must_use]
    pub fn not_found(name: &ClassName) -> Self {
        Self::NotFound {
            missing: name.clone(),
            requested: name.clone(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create invalid entry error
    pub fn invalid_entry(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidEntry {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a missing dependency rather than a broken class
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_both_classes() {
        let err = ResolutionError::NotFound {
            missing: ClassName::new("a.Base").unwrap(),
            requested: ClassName::new("a.Child").unwrap(),
        };
        assert_eq!(err.to_string(), "class a.Base not found (needed by a.Child)");
        assert!(err.is_not_found());
    }

    #[test]
    fn io_error_helper() {
        let err = ResolutionError::io_error(
            "/tmp/a/B.class",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("io error reading /tmp/a/B.class"));
        assert!(!err.is_not_found());
    }
}
