//! Testing utilities for classforge workspace
//!
//! Shared class file fixtures and an instrumented transformation unit.

#![allow(missing_docs)]

use classforge_classfile::{
    AccessFlags, Artifact, ClassFile, ClassName, FieldSpec, InnerClassEntry,
};
use classforge_executor::{TransformError, TransformationUnit};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn class_name(name: &str) -> ClassName {
    ClassName::new(name).unwrap()
}

/// Builder for synthetic class files
#[derive(Debug, Clone)]
pub struct ClassFixture {
    name: ClassName,
    super_name: Option<ClassName>,
    access_flags: AccessFlags,
    interfaces: Vec<ClassName>,
    fields: Vec<String>,
    nested: Vec<ClassName>,
}

impl ClassFixture {
    /// Public class extending `java.lang.Object`
    pub fn class(name: &str) -> Self {
        Self {
            name: class_name(name),
            super_name: Some(class_name("java.lang.Object")),
            access_flags: AccessFlags::PUBLIC | AccessFlags::SUPER,
            interfaces: Vec::new(),
            fields: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Public interface
    pub fn interface(name: &str) -> Self {
        let mut fixture = Self::class(name);
        fixture.access_flags = AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
        fixture
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(class_name(super_name));
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(class_name(interface));
        self
    }

    /// Add a private int field
    pub fn field(mut self, name: &str) -> Self {
        self.fields.push(name.to_string());
        self
    }

    /// Declare `<name>$<simple>` as an immediate nested class
    pub fn nested(mut self, simple: &str) -> Self {
        self.nested
            .push(class_name(&format!("{}${simple}", self.name)));
        self
    }

    pub fn name(&self) -> &ClassName {
        &self.name
    }

    pub fn build(&self) -> ClassFile {
        let mut cf = ClassFile::new(&self.name, self.super_name.as_ref(), self.access_flags).unwrap();
        for interface in &self.interfaces {
            cf.add_interface(interface).unwrap();
        }
        for field in &self.fields {
            cf.add_field(&FieldSpec {
                name: field.clone(),
                descriptor: "I".to_string(),
                access_flags: AccessFlags::PRIVATE,
                initializer: None,
            })
            .unwrap();
        }
        if !self.nested.is_empty() {
            let entries: Vec<InnerClassEntry> = self
                .nested
                .iter()
                .map(|inner| InnerClassEntry {
                    inner: inner.clone(),
                    outer: Some(self.name.clone()),
                    simple_name: inner.simple_name().rsplit('$').next().map(String::from),
                    access_flags: AccessFlags::PUBLIC | AccessFlags::STATIC,
                })
                .collect();
            cf.set_inner_classes(&entries).unwrap();
        }
        cf
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.build().to_bytes().unwrap()
    }

    /// Write below `root` at the class's package path
    pub fn write_to(&self, root: &Path) -> PathBuf {
        let path = root.join(self.name.relative_path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, self.bytes()).unwrap();
        path
    }

    /// Write this class and one plain fixture per declared nested class
    pub fn write_with_nested(&self, root: &Path) -> PathBuf {
        for nested in &self.nested {
            ClassFixture::class(nested.as_str()).write_to(root);
        }
        self.write_to(root)
    }
}

/// Decode the class file for `name` below `root`
pub fn read_class(root: &Path, name: &str) -> ClassFile {
    let path = root.join(class_name(name).relative_path());
    ClassFile::parse(&std::fs::read(path).unwrap()).unwrap()
}

/// Whether the class file for `name` below `root` declares `field`
pub fn has_field(root: &Path, name: &str, field: &str) -> bool {
    read_class(root, name).declared_field(field).is_some()
}

/// Calls observed by a [`RecordingUnit`]
#[derive(Debug, Default)]
pub struct Calls {
    pub checked: Vec<ClassName>,
    pub applied: Vec<ClassName>,
}

/// Unit that adds a marker field and records every call
#[derive(Debug, Clone)]
pub struct RecordingUnit {
    identity: String,
    field: String,
    only: Option<String>,
    skip_nested: bool,
    fail_on: Option<ClassName>,
    touch_nested: Option<String>,
    calls: Arc<Mutex<Calls>>,
}

impl Default for RecordingUnit {
    fn default() -> Self {
        Self::new("recording-unit")
    }
}

impl RecordingUnit {
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            field: RECORDED_FIELD.to_string(),
            only: None,
            skip_nested: false,
            fail_on: None,
            touch_nested: None,
            calls: Arc::default(),
        }
    }

    /// Add `field` instead of [`RECORDED_FIELD`]
    pub fn field(mut self, field: &str) -> Self {
        self.field = field.to_string();
        self
    }

    /// Only transform classes whose name starts with `prefix`
    pub fn only(mut self, prefix: &str) -> Self {
        self.only = Some(prefix.to_string());
        self
    }

    /// Leave nested classes to their enclosing class
    pub fn skip_nested(mut self) -> Self {
        self.skip_nested = true;
        self
    }

    /// Fail `apply_transformations` for `name`
    pub fn fail_on(mut self, name: &str) -> Self {
        self.fail_on = Some(class_name(name));
        self
    }

    /// Also modify the nested class with this simple name
    pub fn touch_nested(mut self, simple: &str) -> Self {
        self.touch_nested = Some(simple.to_string());
        self
    }

    /// Shared handle on the recorded calls
    pub fn calls(&self) -> Arc<Mutex<Calls>> {
        Arc::clone(&self.calls)
    }

    pub fn applied_count(&self) -> usize {
        self.calls.lock().applied.len()
    }

    pub fn boxed(&self) -> Box<dyn TransformationUnit> {
        Box::new(self.clone())
    }
}

impl TransformationUnit for RecordingUnit {
    fn identity(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.identity)
    }

    fn should_transform(&self, artifact: &Artifact) -> Result<bool, TransformError> {
        self.calls.lock().checked.push(artifact.name().clone());
        if self.skip_nested && artifact.name().is_nested() {
            return Ok(false);
        }
        Ok(self
            .only
            .as_deref()
            .map_or(true, |prefix| artifact.name().as_str().starts_with(prefix)))
    }

    fn apply_transformations(&self, artifact: &mut Artifact) -> Result<(), TransformError> {
        self.calls.lock().applied.push(artifact.name().clone());
        if self.fail_on.as_ref() == Some(artifact.name()) {
            return Err(TransformError::cannot_apply(format!("refusing {}", artifact.name())));
        }
        artifact
            .class_file_mut()?
            .add_field(&FieldSpec::boolean_constant(
                &self.field,
                AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL,
                true,
            ))
            .map_err(|e| TransformError::cannot_apply(e.to_string()))?;

        if let Some(simple) = &self.touch_nested {
            let suffix = format!("${simple}");
            for nested in artifact.nested_mut() {
                let declared = nested.class_file().declared_field(&self.field).is_some();
                if nested.name().as_str().ends_with(&suffix) && !declared {
                    nested.class_file_mut()?.add_field(&FieldSpec::boolean_constant(
                        &self.field,
                        AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL,
                        true,
                    ))
                    .map_err(|e| TransformError::cannot_apply(e.to_string()))?;
                }
            }
        }
        Ok(())
    }
}

/// Field added by [`RecordingUnit`]
pub const RECORDED_FIELD: &str = "__recorded";
