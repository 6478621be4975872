//! Error types for the executor
//!
//! Provides error handling for:
//! - Discovery (directory walk)
//! - Stamping and transformation units
//! - Writing artifacts
//! - Unit registry lookups
//! - Run-level failures that abort the batch

use classforge_classfile::{ArtifactError, ClassFileError, ClassName};
use classforge_resolver::ResolutionError;
use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors discovering candidate class files
#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    /// Root missing, not a directory or not listable
    #[error("cannot read input root {path}: {source}")]
    UnreadableRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LocatorError {
    /// `path` could not be read while walking
    pub fn unreadable_root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::UnreadableRoot {
            path: path.into(),
            source,
        }
    }
}

/// Errors adding or removing an idempotency stamp
#[derive(Debug, thiserror::Error)]
pub enum StampError {
    /// Stamp field already declared
    #[error("{class} already carries stamp {field}")]
    AlreadyPresent { class: ClassName, field: String },

    /// Artifact refused the edit
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Errors reported by a transformation unit
///
/// Both kinds are contained per artifact by the executor.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Unit could not build its transformation (fatal for the artifact)
    #[error("transformation build failed: {message}")]
    Build {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Transformation does not apply to this artifact (recoverable)
    #[error("cannot apply transformation: {message}")]
    CannotApply {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl TransformError {
    /// [`TransformError::Build`] without a cause
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
            source: None,
        }
    }

    /// [`TransformError::CannotApply`] without a cause
    pub fn cannot_apply(message: impl Into<String>) -> Self {
        Self::CannotApply {
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause
    #[must_use]
    pub fn with_source(self, cause: impl Into<BoxError>) -> Self {
        match self {
            Self::Build { message, .. } => Self::Build {
                message,
                source: Some(cause.into()),
            },
            Self::CannotApply { message, .. } => Self::CannotApply {
                message,
                source: Some(cause.into()),
            },
        }
    }

    /// True for [`TransformError::Build`]
    #[inline]
    #[must_use]
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build { .. })
    }
}

impl From<ArtifactError> for TransformError {
    fn from(err: ArtifactError) -> Self {
        Self::cannot_apply(err.to_string()).with_source(err)
    }
}

impl From<ClassFileError> for TransformError {
    fn from(err: ClassFileError) -> Self {
        Self::cannot_apply(err.to_string()).with_source(err)
    }
}

impl From<StampError> for TransformError {
    fn from(err: StampError) -> Self {
        Self::cannot_apply(err.to_string()).with_source(err)
    }
}

/// Errors persisting an artifact
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Structure could not be encoded
    #[error("cannot encode {class}: {source}")]
    Encode {
        class: ClassName,
        #[source]
        source: ArtifactError,
    },

    /// IO error during file write
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WriteError {
    /// I/O failure on `path`
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors creating units by name
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("transformer name must not be blank")]
    BlankName,

    #[error("unknown transformer: '{0}'")]
    UnknownUnit(String),

    #[error("transformer '{0}' is already registered")]
    Duplicate(String),

    /// Unit rejected its settings
    #[error("cannot configure transformer '{name}': {source}")]
    Configure {
        name: String,
        #[source]
        source: TransformError,
    },
}

/// Errors that abort a whole Run
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Input root cannot be walked
    #[error(transparent)]
    UnreadableRoot(#[from] LocatorError),

    /// Resolution context could not be built
    #[error("cannot build resolution context: {0}")]
    Context(#[source] ResolutionError),

    /// Output directory cannot be created
    #[error("cannot prepare output directory {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn transform_error_keeps_source() {
        let err = TransformError::build("no template")
            .with_source(std::io::Error::new(std::io::ErrorKind::NotFound, "template.txt"));
        assert!(err.is_build());
        assert_eq!(err.to_string(), "transformation build failed: no template");
        assert_eq!(err.source().unwrap().to_string(), "template.txt");
    }

    #[test]
    fn artifact_error_becomes_cannot_apply() {
        let frozen = ArtifactError::Frozen(ClassName::new("a.B").unwrap());
        let err: TransformError = frozen.into();
        assert!(!err.is_build());
        assert_eq!(err.to_string(), "cannot apply transformation: artifact a.B is frozen");
    }

    #[test]
    fn context_error_preserves_cause() {
        let cause = ResolutionError::invalid_entry("/missing", "No such file or directory");
        let err = ExecutorError::Context(cause);
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("cannot build resolution context"));
    }
}
