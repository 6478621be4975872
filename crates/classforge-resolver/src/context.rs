//! Resolution context
//!
//! One [`ResolutionContext`] serves one Run. It searches its entries
//! child-first, verifies each resolved class's superclass chain, attaches
//! immediately nested classes and caches what it loaded so later lookups in
//! the same Run see in-memory edits.
//!
//! Ownership moves out with [`ResolutionContext::checkout`] and comes back
//! with [`ResolutionContext::restore`]. An artifact that is never restored
//! (see [`ResolutionContext::discard`]) is read from disk again next time.

use classforge_classfile::{Artifact, ClassName};
use std::collections::{HashMap, HashSet};

use crate::classpath::{is_bootstrap, ClassBytes, ClasspathEntry};
use crate::error::ResolutionError;

/// Child-first, per-Run class cache
#[derive(Debug)]
pub struct ResolutionContext {
    entries: Vec<ClasspathEntry>,
    cache: HashMap<ClassName, Artifact>,
    /// Superclass links already verified up to a bootstrap class
    hierarchy: HashMap<ClassName, Option<ClassName>>,
}

impl ResolutionContext {
    /// Create a context searching `entries` in order
    ///
    /// # Errors
    /// Returns [`ResolutionError::InvalidEntry`] if a directory entry is
    /// missing or not a directory
    pub fn build(entries: Vec<ClasspathEntry>) -> Result<Self, ResolutionError> {
        for entry in &entries {
            entry.validate()?;
        }
        tracing::debug!(
            "Resolution context: {}",
            entries.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        );
        Ok(Self {
            entries,
            cache: HashMap::new(),
            hierarchy: HashMap::new(),
        })
    }

    /// Entries in search order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    /// Add a lowest-priority entry
    ///
    /// # Errors
    /// Returns [`ResolutionError::InvalidEntry`] if the entry is unusable
    pub fn append(&mut self, entry: ClasspathEntry) -> Result<(), ResolutionError> {
        entry.validate()?;
        self.entries.push(entry);
        Ok(())
    }

    /// Whether `name` is held in memory
    #[inline]
    #[must_use]
    pub fn is_cached(&self, name: &ClassName) -> bool {
        self.cache.contains_key(name)
    }

    /// Resolve `name`, loading it on first reference
    ///
    /// # Errors
    /// - [`ResolutionError::NotFound`] if the class, a superclass or a nested
    ///   class is missing
    /// - [`ResolutionError::Malformed`] or [`ResolutionError::Io`] otherwise
    pub fn resolve(&mut self, name: &ClassName) -> Result<&Artifact, ResolutionError> {
        if !self.cache.contains_key(name) {
            let artifact = self.load(name)?;
            self.restore(artifact);
        }
        self.cache
            .get(name)
            .ok_or_else(|| ResolutionError::not_found(name))
    }

    /// Resolve `name` and take ownership of it, nested classes included
    ///
    /// # Errors
    /// Same as [`ResolutionContext::resolve`]
    pub fn checkout(&mut self, name: &ClassName) -> Result<Artifact, ResolutionError> {
        let Some(mut artifact) = self.cache.remove(name) else {
            return self.load(name);
        };
        if let Err(err) = self.attach_nested(&mut artifact) {
            self.restore(artifact);
            return Err(err);
        }
        Ok(artifact)
    }

    /// Return an artifact to the cache
    ///
    /// Nested artifacts are cached under their own names and re-attached
    /// on the next checkout of the enclosing class.
    pub fn restore(&mut self, mut artifact: Artifact) {
        for nested in artifact.take_nested() {
            self.cache.insert(nested.name().clone(), nested);
        }
        self.cache.insert(artifact.name().clone(), artifact);
    }

    /// Forget any in-memory copy of `name`
    pub fn discard(&mut self, name: &ClassName) -> bool {
        self.cache.remove(name).is_some()
    }

    fn find(&self, name: &ClassName) -> Result<Option<ClassBytes>, ResolutionError> {
        for entry in &self.entries {
            if let Some(found) = entry.load(name)? {
                tracing::trace!("Found {} in {}", name, entry);
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Read and decode one class without touching the cache
    fn read(&self, name: &ClassName, requested: &ClassName) -> Result<Artifact, ResolutionError> {
        let found = self.find(name)?.ok_or_else(|| ResolutionError::NotFound {
            missing: name.clone(),
            requested: requested.clone(),
        })?;
        Artifact::from_bytes(name, &found.bytes).map_err(|source| ResolutionError::Malformed {
            name: name.clone(),
            origin: found.origin,
            source,
        })
    }

    fn load(&mut self, name: &ClassName) -> Result<Artifact, ResolutionError> {
        let mut artifact = self.read(name, name)?;
        self.warm_up(&artifact)?;
        self.attach_nested(&mut artifact)?;
        tracing::debug!("Loaded {}", artifact.describe());
        Ok(artifact)
    }

    /// Verify the superclass chain of `artifact` down to a bootstrap class
    fn warm_up(&mut self, artifact: &Artifact) -> Result<(), ResolutionError> {
        let requested = artifact.name();
        let mut visited = HashSet::from([requested.clone()]);
        let mut next = super_of(artifact)?;
        while let Some(current) = next {
            if is_bootstrap(&current) || !visited.insert(current.clone()) {
                break;
            }
            next = match self.hierarchy.get(&current) {
                Some(parent) => parent.clone(),
                None => {
                    let parent = match self.cache.get(&current) {
                        Some(cached) => super_of(cached)?,
                        None => super_of(&self.read(&current, requested)?)?,
                    };
                    self.hierarchy.insert(current, parent.clone());
                    parent
                }
            };
        }
        Ok(())
    }

    fn attach_nested(&mut self, artifact: &mut Artifact) -> Result<(), ResolutionError> {
        let names = artifact
            .class_file()
            .nested_class_names()
            .map_err(|e| malformed(artifact, e.into()))?;

        // read everything first so a failure leaves the cache untouched
        let mut from_disk = Vec::with_capacity(names.len());
        for nested in &names {
            if !self.cache.contains_key(nested) {
                from_disk.push(self.read(nested, artifact.name())?);
            }
        }

        for nested in from_disk {
            artifact.attach_nested(nested).map_err(|e| malformed(artifact, e))?;
        }
        for nested in &names {
            if let Some(cached) = self.cache.remove(nested) {
                artifact.attach_nested(cached).map_err(|e| malformed(artifact, e))?;
            }
        }
        Ok(())
    }
}

fn super_of(artifact: &Artifact) -> Result<Option<ClassName>, ResolutionError> {
    artifact
        .class_file()
        .super_name()
        .map_err(|e| malformed(artifact, e.into()))
}

fn malformed(artifact: &Artifact, source: classforge_classfile::ArtifactError) -> ResolutionError {
    ResolutionError::Malformed {
        name: artifact.name().clone(),
        origin: "in-memory".to_string(),
        source,
    }
}
