//! Transformation unit contract
//!
//! A [`TransformationUnit`] decides per artifact whether it wants to act and,
//! if so, edits the artifact in place. Units are configured once, before the
//! first artifact, and are read-only afterwards.

use classforge_classfile::Artifact;
use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt::Debug;

use crate::error::TransformError;

/// Ordered name/value settings handed to [`TransformationUnit::configure`]
pub type Settings = IndexMap<String, String>;

/// A pluggable bytecode transformation
///
/// # Contract
/// - `should_transform` must not change the artifact
/// - `apply_transformations` is called at most once per artifact per Run, and
///   only when `should_transform` returned `true`
/// - Both may fail; the executor logs the error and skips the artifact
pub trait TransformationUnit: Debug {
    /// Stable identity used to name the unit's stamp
    ///
    /// Defaults to the concrete type name.
    fn identity(&self) -> Cow<'_, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }

    /// Receive settings before any artifact is processed
    ///
    /// # Errors
    /// Returns error if a setting is missing or invalid
    fn configure(&mut self, settings: &Settings) -> Result<(), TransformError> {
        let _ = settings;
        Ok(())
    }

    /// Whether `artifact` is a candidate for this unit
    ///
    /// # Errors
    /// Returns error if the decision itself fails
    fn should_transform(&self, artifact: &Artifact) -> Result<bool, TransformError>;

    /// Edit `artifact` in place
    ///
    /// # Errors
    /// - [`TransformError::Build`] if the unit cannot produce its change
    /// - [`TransformError::CannotApply`] if the change does not fit this artifact
    fn apply_transformations(&self, artifact: &mut Artifact) -> Result<(), TransformError>;
}

/// Unit selection by registry name plus its settings
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UnitConfig {
    pub name: String,
    #[serde(default)]
    pub settings: Settings,
}

impl UnitConfig {
    /// Entry for `name` with no settings
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: Settings::new(),
        }
    }

    /// Builder: add a setting
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
}
