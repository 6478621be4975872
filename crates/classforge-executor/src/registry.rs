//! Unit registry
//!
//! Maps configuration names to factories so units can be selected from a
//! config file without reflection.

use indexmap::IndexMap;
use std::fmt;

use crate::error::RegistryError;
use crate::unit::{TransformationUnit, UnitConfig};

type Factory = Box<dyn Fn() -> Box<dyn TransformationUnit> + Send + Sync>;

/// Registry of unit factories, in registration order
#[derive(Default)]
pub struct UnitRegistry {
    factories: IndexMap<String, Factory>,
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("units", &self.names())
            .finish()
    }
}

impl UnitRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`
    ///
    /// # Errors
    /// Returns error if the name is blank or already taken
    pub fn register<F, U>(&mut self, name: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> U + Send + Sync + 'static,
        U: TransformationUnit + 'static,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::BlankName);
        }
        if self.factories.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        let factory: Factory =
            Box::new(move || -> Box<dyn TransformationUnit> { Box::new(factory()) });
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    /// True if a factory is registered under `name`
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name.trim())
    }

    /// Registered names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Create and configure the unit named by `config`
    ///
    /// # Errors
    /// - [`RegistryError::BlankName`] / [`RegistryError::UnknownUnit`]
    /// - [`RegistryError::Configure`] if the unit rejects its settings
    pub fn instantiate(
        &self,
        config: &UnitConfig,
    ) -> Result<Box<dyn TransformationUnit>, RegistryError> {
        let name = config.name.trim();
        if name.is_empty() {
            return Err(RegistryError::BlankName);
        }
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownUnit(name.to_string()))?;
        let mut unit = factory();
        unit.configure(&config.settings)
            .map_err(|source| RegistryError::Configure {
                name: name.to_string(),
                source,
            })?;
        tracing::debug!("Configured transformer {} as {}", name, unit.identity());
        Ok(unit)
    }

    /// Instantiate every config, preserving order
    ///
    /// # Errors
    /// Fails on the first config that cannot be instantiated
    pub fn instantiate_all(
        &self,
        configs: &[UnitConfig],
    ) -> Result<Vec<Box<dyn TransformationUnit>>, RegistryError> {
        configs.iter().map(|c| self.instantiate(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::unit::Settings;
    use classforge_classfile::Artifact;

    #[derive(Debug, Default)]
    struct Strict {
        level: u8,
    }

    impl TransformationUnit for Strict {
        fn configure(&mut self, settings: &Settings) -> Result<(), TransformError> {
            if let Some(level) = settings.get("level") {
                self.level = level
                    .parse()
                    .map_err(|_| TransformError::build(format!("bad level '{level}'")))?;
            }
            Ok(())
        }

        fn should_transform(&self, _artifact: &Artifact) -> Result<bool, TransformError> {
            Ok(self.level > 0)
        }

        fn apply_transformations(&self, _artifact: &mut Artifact) -> Result<(), TransformError> {
            Ok(())
        }
    }

    fn registry() -> UnitRegistry {
        let mut registry = UnitRegistry::new();
        registry.register("strict", Strict::default).unwrap();
        registry
    }

    #[test]
    fn register_rejects_blank_and_duplicate_names() {
        let mut registry = registry();
        assert!(matches!(
            registry.register("  ", Strict::default),
            Err(RegistryError::BlankName)
        ));
        assert!(matches!(
            registry.register("strict", Strict::default),
            Err(RegistryError::Duplicate(_))
        ));
        assert_eq!(registry.names(), vec!["strict"]);
        assert_eq!(registry.len(), 1);
        assert!(format!("{registry:?}").contains("strict"));
    }

    #[test]
    fn instantiate_configures_unit() {
        let unit = registry()
            .instantiate(&UnitConfig::new(" strict ").with_setting("level", "2"))
            .unwrap();
        assert!(unit.identity().ends_with("Strict"));
    }

    #[test]
    fn instantiate_reports_errors() {
        let registry = registry();
        assert!(matches!(
            registry.instantiate(&UnitConfig::new("")),
            Err(RegistryError::BlankName)
        ));
        assert!(matches!(
            registry.instantiate(&UnitConfig::new("missing")),
            Err(RegistryError::UnknownUnit(n)) if n == "missing"
        ));
        assert!(matches!(
            registry.instantiate(&UnitConfig::new("strict").with_setting("level", "high")),
            Err(RegistryError::Configure { .. })
        ));
    }

    #[test]
    fn instantiate_all_keeps_order() {
        let units = registry()
            .instantiate_all(&[UnitConfig::new("strict"), UnitConfig::new("strict")])
            .unwrap();
        assert_eq!(units.len(), 2);
    }
}
