//! Idempotency stamp
//!
//! A unit marks every artifact it transformed with a `static final boolean`
//! field whose name is derived from the unit's identity. The field travels
//! with the class file, so a later Run over the same output sees it and
//! leaves the artifact alone.

use classforge_classfile::{AccessFlags, Artifact, ArtifactError, FieldSpec};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::StampError;
use crate::unit::TransformationUnit;

/// Prefix of every stamp field name; also the global stamp's full name
pub const STAMP_FIELD_PREFIX: &str = "__TRANSFORMED_BY_CLASSFORGE__";

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("static pattern compiles"));

/// Name of the marker field for one unit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stamp {
    field: String,
}

impl Stamp {
    /// Stamp shared by all units, for single-unit setups
    #[must_use]
    pub fn global() -> Self {
        Self {
            field: STAMP_FIELD_PREFIX.to_string(),
        }
    }

    /// Stamp of `unit`
    #[must_use]
    pub fn for_unit(unit: &dyn TransformationUnit) -> Self {
        Self::for_identity(&unit.identity())
    }

    /// Stamp for an identity string; every non-word character becomes `_`
    #[must_use]
    pub fn for_identity(identity: &str) -> Self {
        Self {
            field: format!("{STAMP_FIELD_PREFIX}{}", NON_WORD.replace_all(identity, "_")),
        }
    }

    /// Name of the marker field this stamp adds
    #[inline]
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field
    }

    /// `private static final` on classes, `public static final` on interfaces
    #[must_use]
    pub fn access_flags(artifact: &Artifact) -> AccessFlags {
        let visibility = if artifact.is_interface() {
            AccessFlags::PUBLIC
        } else {
            AccessFlags::PRIVATE
        };
        visibility | AccessFlags::STATIC | AccessFlags::FINAL
    }

    /// Whether `artifact` declares this stamp (inherited fields do not count)
    #[must_use]
    pub fn is_present(&self, artifact: &Artifact) -> bool {
        let found = artifact.class_file().declared_field(&self.field).is_some();
        tracing::debug!(
            "Stamp {}{} found in class {}",
            self.field,
            if found { "" } else { " NOT" },
            artifact.name()
        );
        found
    }

    /// Add the stamp field with a constant `true` initializer
    ///
    /// # Errors
    /// - [`StampError::AlreadyPresent`] if the field is already declared
    /// - [`StampError::Artifact`] if the artifact is frozen or full
    pub fn apply(&self, artifact: &mut Artifact) -> Result<(), StampError> {
        if artifact.class_file().declared_field(&self.field).is_some() {
            return Err(StampError::AlreadyPresent {
                class: artifact.name().clone(),
                field: self.field.clone(),
            });
        }
        let spec = FieldSpec::boolean_constant(&self.field, Self::access_flags(artifact), true);
        artifact
            .class_file_mut()?
            .add_field(&spec)
            .map_err(ArtifactError::from)?;
        Ok(())
    }

    /// Remove the stamp field, returning whether it was there
    ///
    /// # Errors
    /// Returns [`StampError::Artifact`] if the artifact is frozen
    pub fn remove(&self, artifact: &mut Artifact) -> Result<bool, StampError> {
        if artifact.class_file().declared_field(&self.field).is_none() {
            return Ok(false);
        }
        Ok(artifact.class_file_mut()?.remove_field(&self.field))
    }
}
