//! classforge executor
//!
//! Applies pluggable transformation units to the compiled classes under a
//! directory, exactly once per artifact, and writes the results back.
//!
//! # Core Concepts
//!
//! - [`locate`]: enumerate candidate class names under a root
//! - [`TransformationUnit`]: the pluggable transformation contract
//! - [`Stamp`]: per-unit marker field that makes Runs idempotent
//! - [`OutputWriter`]: persists and freezes artifacts
//! - [`Executor`]: the Run driver, producing a [`RunReport`]
//!
//! # Example
//!
//! ```rust,ignore
//! use classforge_executor::{Executor, RunConfig, UnitRegistry, UnitConfig};
//!
//! let units = registry.instantiate_all(&[UnitConfig::new("marker-field")])?;
//! let report = Executor::execute(&RunConfig::new("target/classes"), &units)?;
//! println!("{report}");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod executor;
mod locator;
mod registry;
mod report;
mod stamp;
mod unit;
mod writer;

pub use error::{
    ExecutorError, LocatorError, RegistryError, StampError, TransformError, WriteError,
};
pub use executor::{Executor, RunConfig};
pub use locator::{class_name_from_path, locate, ClassNames};
pub use registry::UnitRegistry;
pub use report::{ArtifactOutcome, ArtifactState, FailureKind, RunReport};
pub use stamp::{Stamp, STAMP_FIELD_PREFIX};
pub use unit::{Settings, TransformationUnit, UnitConfig};
pub use writer::{OutputWriter, WrittenFile};
