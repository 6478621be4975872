//! Output writer
//!
//! Persists artifacts as `<root>/<package path>/<Simple>.class` and freezes
//! them, so an artifact written twice produces the same file.

use classforge_classfile::{Artifact, ClassName, ContentHash};
use std::path::{Path, PathBuf};

use crate::error::WriteError;

/// Record of one written class file
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WrittenFile {
    /// Logical name of the written class
    pub class: ClassName,
    /// Destination below the writer's root
    pub path: PathBuf,
    /// Hash of the bytes on disk
    pub hash: ContentHash,
}

/// Writes artifacts below one output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    /// Writer rooted at `root`; directories are created on write
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination file of `name`
    #[must_use]
    pub fn path_for(&self, name: &ClassName) -> PathBuf {
        self.root.join(name.relative_path())
    }

    /// Serialize, freeze and write `artifact`
    ///
    /// # Errors
    /// - [`WriteError::Encode`] if the structure cannot be encoded
    /// - [`WriteError::Io`] if the directory or file cannot be written
    pub fn write(&self, artifact: &mut Artifact) -> Result<WrittenFile, WriteError> {
        let class = artifact.name().clone();
        let path = self.path_for(&class);
        let bytes = artifact.freeze().map_err(|source| WriteError::Encode {
            class: class.clone(),
            source,
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WriteError::io_error(parent, e))?;
        }
        std::fs::write(&path, bytes).map_err(|e| WriteError::io_error(&path, e))?;

        let hash = ContentHash::compute(bytes);
        tracing::trace!("Wrote {} to {} ({})", class, path.display(), hash.short());
        Ok(WrittenFile { class, path, hash })
    }
}
