//! classforge resolver
//!
//! Locates class bytes on a classpath and turns them into [`Artifact`]s for
//! one Run.
//!
//! # Core Concepts
//!
//! - [`ClasspathEntry`]: input directory, caller loader or ambient path
//! - [`ClassLoader`]: pluggable source of class bytes
//! - [`ResolutionContext`]: child-first lookup with a per-Run cache
//! - [`AmbientClasspath`]: process-wide path, changed only through a guard
//!
//! [`Artifact`]: classforge_classfile::Artifact

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod ambient;
mod classpath;
mod context;
mod error;

pub use ambient::{AmbientClasspath, AmbientGuard, CLASSPATH_ENV};
pub use classpath::{
    is_bootstrap, ClassBytes, ClassLoader, ClasspathEntry, DirectoryLoader, BOOTSTRAP_PACKAGES,
};
pub use context::ResolutionContext;
pub use error::ResolutionError;
