//! Build configuration
//!
//! `classforge.toml` describes one project: where compiled classes live,
//! what else belongs on the classpath, and which transformers run in which
//! order.
//!
//! ```toml
//! include_test_classes = true
//! classpath = ["lib/classes"]
//!
//! [[transformers]]
//! name = "marker-field"
//! settings = { field = "__introspected__", packages = "com.acme" }
//! ```

use classforge_executor::UnitConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file name
pub const CONFIG_FILE: &str = "classforge.toml";

/// Errors loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or schema error
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// `transformers` is empty
    #[error("no transformers configured")]
    NoTransformers,

    /// 1-based position of the offending entry
    #[error("transformer #{0} has a blank name")]
    BlankTransformerName(usize),
}

fn default_true() -> bool {
    true
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("target/classes")
}

fn default_test_build_dir() -> PathBuf {
    PathBuf::from("target/test-classes")
}

/// Project-level build step configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Do nothing at all
    #[serde(default)]
    pub skip: bool,

    /// Also transform the test classes directory
    #[serde(default = "default_true")]
    pub include_test_classes: bool,

    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    #[serde(default = "default_test_build_dir")]
    pub test_build_dir: PathBuf,

    /// Write results here instead of back into each input directory
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Extra class directories for dependency resolution
    #[serde(default)]
    pub classpath: Vec<PathBuf>,

    /// Transformers, applied in order
    #[serde(default)]
    pub transformers: Vec<UnitConfig>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            skip: false,
            include_test_classes: true,
            build_dir: default_build_dir(),
            test_build_dir: default_test_build_dir(),
            output_dir: None,
            classpath: Vec::new(),
            transformers: Vec::new(),
        }
    }
}

impl BuildConfig {
    /// Read and parse `path`; relative directories resolve against its parent
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config.resolve_paths(base))
    }

    /// Make every relative directory relative to `base`
    #[must_use]
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.build_dir = resolve(self.build_dir);
        self.test_build_dir = resolve(self.test_build_dir);
        self.output_dir = self.output_dir.map(resolve);
        self.classpath = self.classpath.into_iter().map(resolve).collect();
        self
    }

    /// Check the transformer list
    ///
    /// # Errors
    /// Returns error if no transformer is configured or a name is blank
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transformers.is_empty() {
            return Err(ConfigError::NoTransformers);
        }
        if let Some(i) = self
            .transformers
            .iter()
            .position(|t| t.name.trim().is_empty())
        {
            return Err(ConfigError::BlankTransformerName(i + 1));
        }
        Ok(())
    }
}
