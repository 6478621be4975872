//! Built-in transformation units
//!
//! Selected by name from `[[transformers]]` through [`builtin_registry`].

use classforge_classfile::{AccessFlags, Artifact, FieldSpec};
use classforge_executor::{RegistryError, Settings, TransformError, TransformationUnit, UnitRegistry};
use std::borrow::Cow;

/// Registry name of [`MarkerFieldUnit`]
pub const MARKER_FIELD: &str = "marker-field";

/// Field added when no `field` setting is given
pub const DEFAULT_MARKER_FIELD: &str = "__introspected__MarkerField";

/// Registry with every unit shipped in this crate
///
/// # Errors
/// Returns error if two built-ins share a name
pub fn builtin_registry() -> Result<UnitRegistry, RegistryError> {
    let mut registry = UnitRegistry::new();
    registry.register(MARKER_FIELD, MarkerFieldUnit::default)?;
    Ok(registry)
}

/// Adds `public static final boolean <field> = true` to every class in scope
///
/// Settings:
/// - `field`: name of the marker field
/// - `packages`: comma-separated package prefixes; empty means every class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerFieldUnit {
    field: String,
    packages: Vec<String>,
}

impl Default for MarkerFieldUnit {
    fn default() -> Self {
        Self {
            field: DEFAULT_MARKER_FIELD.to_string(),
            packages: Vec::new(),
        }
    }
}

impl MarkerFieldUnit {
    /// Name of the marker field
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Package prefixes in scope; empty means every class
    #[must_use]
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    fn in_scope(&self, artifact: &Artifact) -> bool {
        self.packages.is_empty()
            || self
                .packages
                .iter()
                .any(|p| artifact.name().is_in_package(p))
    }
}

fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['.', ';', '[', '/', '<', '>'])
}

impl TransformationUnit for MarkerFieldUnit {
    // one stamp per configured field
    fn identity(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{MARKER_FIELD}.{}", self.field))
    }

    fn configure(&mut self, settings: &Settings) -> Result<(), TransformError> {
        if let Some(field) = settings.get("field") {
            let field = field.trim();
            if !is_valid_field_name(field) {
                return Err(TransformError::build(format!("invalid field name '{field}'")));
            }
            self.field = field.to_string();
        }
        if let Some(packages) = settings.get("packages") {
            self.packages = packages
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(unknown) = settings.keys().find(|k| !matches!(k.as_str(), "field" | "packages")) {
            return Err(TransformError::build(format!("unknown setting '{unknown}'")));
        }
        Ok(())
    }

    fn should_transform(&self, artifact: &Artifact) -> Result<bool, TransformError> {
        Ok(self.in_scope(artifact) && artifact.class_file().declared_field(&self.field).is_none())
    }

    fn apply_transformations(&self, artifact: &mut Artifact) -> Result<(), TransformError> {
        let spec = FieldSpec::boolean_constant(
            self.field.as_str(),
            AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL,
            true,
        );
        artifact.class_file_mut()?.add_field(&spec)?;
        tracing::debug!("Added {} to {}", self.field, artifact.name());
        Ok(())
    }
}
