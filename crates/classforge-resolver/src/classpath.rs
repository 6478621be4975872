//! Classpath entries and class loaders
//!
//! A [`ClasspathEntry`] is one place class bytes may come from. The
//! [`ClassLoader`] trait is the seam callers use to plug in their own source
//! (a build tool's dependency set, an in-memory map in tests).

use classforge_classfile::ClassName;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ResolutionError;

/// Packages the ambient system path always answers
pub const BOOTSTRAP_PACKAGES: &[&str] = &["java", "javax", "jdk", "sun", "com.sun"];

/// Whether `name` belongs to the platform runtime
#[must_use]
pub fn is_bootstrap(name: &ClassName) -> bool {
    BOOTSTRAP_PACKAGES.iter().any(|p| name.is_in_package(p))
}

/// Raw class bytes and where they came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassBytes {
    /// Human-readable origin (a file path for directory loaders)
    pub origin: String,
    pub bytes: Vec<u8>,
}

/// Source of class bytes
pub trait ClassLoader: fmt::Debug + Send + Sync {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Bytes of `name`, or `None` if this loader does not hold it
    ///
    /// # Errors
    /// Returns error if the class exists but cannot be read
    fn load(&self, name: &ClassName) -> Result<Option<ClassBytes>, ResolutionError>;
}

/// Loads `<root>/<package path>/<Simple>.class`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    /// Loader for classes below `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory this loader reads from
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fail unless the root is an existing directory
    ///
    /// # Errors
    /// Returns [`ResolutionError::InvalidEntry`]
    pub fn validate(&self) -> Result<(), ResolutionError> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ResolutionError::invalid_entry(&self.root, "not a directory")),
            Err(e) => Err(ResolutionError::invalid_entry(&self.root, e.to_string())),
        }
    }
}

impl ClassLoader for DirectoryLoader {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn load(&self, name: &ClassName) -> Result<Option<ClassBytes>, ResolutionError> {
        let path = self.root.join(name.relative_path());
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(ClassBytes {
                origin: path.display().to_string(),
                bytes,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ResolutionError::io_error(path, e)),
        }
    }
}

/// One entry of a resolution context, in priority order
#[derive(Debug, Clone)]
pub enum ClasspathEntry {
    /// A directory of class files (the input directory, extra build output)
    Directory(DirectoryLoader),
    /// Caller-supplied loader
    Loader(Arc<dyn ClassLoader>),
    /// The ambient system path; answers bootstrap classes without bytes
    System(Vec<DirectoryLoader>),
}

impl ClasspathEntry {
    /// Shorthand for a [`ClasspathEntry::Directory`] entry
    #[must_use]
    pub fn directory(root: impl Into<PathBuf>) -> Self {
        Self::Directory(DirectoryLoader::new(root))
    }

    /// Entry over the current ambient classpath
    #[must_use]
    pub fn system() -> Self {
        Self::System(
            crate::ambient::AmbientClasspath::snapshot()
                .into_iter()
                .map(DirectoryLoader::new)
                .collect(),
        )
    }

    pub(crate) fn validate(&self) -> Result<(), ResolutionError> {
        match self {
            Self::Directory(loader) => loader.validate(),
            Self::Loader(_) | Self::System(_) => Ok(()),
        }
    }

    pub(crate) fn load(&self, name: &ClassName) -> Result<Option<ClassBytes>, ResolutionError> {
        match self {
            Self::Directory(loader) => loader.load(name),
            Self::Loader(loader) => loader.load(name),
            Self::System(loaders) => {
                for loader in loaders {
                    if let Some(found) = loader.load(name)? {
                        return Ok(Some(found));
                    }
                }
                Ok(None)
            }
        }
    }
}

impl fmt::Display for ClasspathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(loader) => write!(f, "dir:{}", loader.describe()),
            Self::Loader(loader) => write!(f, "loader:{}", loader.describe()),
            Self::System(loaders) => write!(f, "system({} dirs)", loaders.len()),
        }
    }
}
