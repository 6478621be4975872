//! classforge build step
//!
//! Configuration file, built-in units and the pieces behind the `classforge`
//! binary:
//!
//! - [`BuildConfig`]: `classforge.toml`
//! - [`BuildStep`]: main then test classes, with the configured classpath
//! - [`builtin_registry`]: transformers selectable by name
//! - [`render_report`]: text or JSON output of a [`RunReport`]

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod build_step;
mod config;
pub mod logging;
mod units;

pub use build_step::{BuildError, BuildStep, Phase};
pub use config::{BuildConfig, ConfigError, CONFIG_FILE};
pub use units::{builtin_registry, MarkerFieldUnit, DEFAULT_MARKER_FIELD, MARKER_FIELD};

use classforge_classfile::ClassName;
use classforge_executor::{locate, LocatorError, RunReport};
use std::path::Path;

/// Candidate logical names under `dir`, in discovery order
///
/// # Errors
/// Returns error if `dir` cannot be walked
pub fn list_candidates(dir: &Path) -> Result<Vec<ClassName>, LocatorError> {
    Ok(locate(dir)?.flatten().collect())
}

/// Render `report` for humans or as pretty JSON
///
/// # Errors
/// Returns error if JSON serialization fails
pub fn render_report(report: &RunReport, json: bool) -> Result<String, serde_json::Error> {
    if json {
        serde_json::to_string_pretty(report)
    } else {
        Ok(report.to_string())
    }
}
