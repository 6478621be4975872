//! Child-first resolution and nested class handling

use classforge_classfile::{AccessFlags, Artifact, ClassFile, ClassName, FieldSpec, InnerClassEntry};
use classforge_resolver::{ClassBytes, ClassLoader, ClasspathEntry, ResolutionContext, ResolutionError};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

fn name(s: &str) -> ClassName {
    ClassName::new(s).unwrap()
}

fn class(class: &str, super_name: &str) -> ClassFile {
    ClassFile::new(&name(class), Some(&name(super_name)), AccessFlags::PUBLIC).unwrap()
}

fn write(root: &Path, cf: &ClassFile) {
    let path = root.join(cf.name().unwrap().relative_path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, cf.to_bytes().unwrap()).unwrap();
}

/// In-memory loader standing in for a build tool's dependency set
#[derive(Debug, Default)]
struct MapLoader(HashMap<ClassName, Vec<u8>>);

impl MapLoader {
    fn with(mut self, cf: &ClassFile) -> Self {
        self.0.insert(cf.name().unwrap(), cf.to_bytes().unwrap());
        self
    }
}

impl ClassLoader for MapLoader {
    fn describe(&self) -> String {
        format!("map({})", self.0.len())
    }

    fn load(&self, name: &ClassName) -> Result<Option<ClassBytes>, ResolutionError> {
        Ok(self.0.get(name).map(|bytes| ClassBytes {
            origin: format!("map:{name}"),
            bytes: bytes.clone(),
        }))
    }
}

#[test]
fn test_input_directory_shadows_external_loader() {
    let input = tempfile::tempdir().unwrap();
    let mut local = class("test.Shadowed", "java.lang.Object");
    local
        .add_field(&FieldSpec::boolean_constant("local", AccessFlags::STATIC, true))
        .unwrap();
    write(input.path(), &local);

    let external = MapLoader::default()
        .with(&class("test.Shadowed", "java.lang.Object"))
        .with(&class("dep.Base", "java.lang.Object"));

    let mut ctx = ResolutionContext::build(vec![
        ClasspathEntry::directory(input.path()),
        ClasspathEntry::Loader(Arc::new(external)),
        ClasspathEntry::system(),
    ])
    .unwrap();

    let resolved = ctx.resolve(&name("test.Shadowed")).unwrap();
    assert!(resolved.class_file().declared_field("local").is_some());

    // classes only the loader knows still resolve
    assert!(ctx.resolve(&name("dep.Base")).is_ok());
}

#[test]
fn test_superclass_from_external_loader_satisfies_warm_up() {
    let input = tempfile::tempdir().unwrap();
    write(input.path(), &class("test.Child", "dep.Base"));
    let external = MapLoader::default().with(&class("dep.Base", "java.lang.Object"));

    let mut ctx = ResolutionContext::build(vec![
        ClasspathEntry::directory(input.path()),
        ClasspathEntry::Loader(Arc::new(external)),
    ])
    .unwrap();
    assert!(ctx.checkout(&name("test.Child")).is_ok());
}

#[test]
fn test_nested_classes_attach_and_split_on_restore() {
    let input = tempfile::tempdir().unwrap();
    let mut outer = class("test.Outer", "java.lang.Object");
    let inner_entry = InnerClassEntry {
        inner: name("test.Outer$Inner"),
        outer: Some(name("test.Outer")),
        simple_name: Some("Inner".into()),
        access_flags: AccessFlags::PUBLIC | AccessFlags::STATIC,
    };
    let deep_entry = InnerClassEntry {
        inner: name("test.Outer$Inner$Deep"),
        outer: Some(name("test.Outer$Inner")),
        simple_name: Some("Deep".into()),
        access_flags: AccessFlags::STATIC,
    };
    outer.set_inner_classes(&[inner_entry.clone(), deep_entry.clone()]).unwrap();
    let mut inner = class("test.Outer$Inner", "java.lang.Object");
    inner.set_inner_classes(&[inner_entry, deep_entry]).unwrap();
    write(input.path(), &outer);
    write(input.path(), &inner);
    write(input.path(), &class("test.Outer$Inner$Deep", "java.lang.Object"));

    let mut ctx = ResolutionContext::build(vec![ClasspathEntry::directory(input.path())]).unwrap();
    let mut artifact = ctx.checkout(&name("test.Outer")).unwrap();
    let nested: Vec<&ClassName> = artifact.nested().iter().map(Artifact::name).collect();
    assert_eq!(nested, vec![&name("test.Outer$Inner")]);
    // one level only
    assert!(artifact.nested()[0].nested().is_empty());

    artifact.nested_mut()[0]
        .class_file_mut()
        .unwrap()
        .add_field(&FieldSpec::boolean_constant("touched", AccessFlags::STATIC, true))
        .unwrap();
    ctx.restore(artifact);
    assert!(ctx.is_cached(&name("test.Outer$Inner")));

    // the in-memory edit is visible both standalone and re-attached
    let standalone = ctx.resolve(&name("test.Outer$Inner")).unwrap();
    assert!(standalone.is_modified());
    let again = ctx.checkout(&name("test.Outer")).unwrap();
    assert!(again.nested()[0].class_file().declared_field("touched").is_some());
    assert!(!ctx.is_cached(&name("test.Outer$Inner")));
}

#[test]
fn test_missing_nested_class_is_not_found() {
    let input = tempfile::tempdir().unwrap();
    let mut outer = class("test.Outer", "java.lang.Object");
    outer
        .set_inner_classes(&[InnerClassEntry {
            inner: name("test.Outer$Gone"),
            outer: Some(name("test.Outer")),
            simple_name: Some("Gone".into()),
            access_flags: AccessFlags::empty(),
        }])
        .unwrap();
    write(input.path(), &outer);

    let mut ctx = ResolutionContext::build(vec![ClasspathEntry::directory(input.path())]).unwrap();
    assert!(matches!(
        ctx.checkout(&name("test.Outer")),
        Err(ResolutionError::NotFound { missing, .. }) if missing == name("test.Outer$Gone")
    ));
}

#[test]
fn test_cached_enclosing_class_gets_nested_back_on_every_checkout() {
    let input = tempfile::tempdir().unwrap();
    let mut outer = class("test.Outer", "java.lang.Object");
    outer
        .set_inner_classes(&[InnerClassEntry {
            inner: name("test.Outer$Inner"),
            outer: Some(name("test.Outer")),
            simple_name: Some("Inner".into()),
            access_flags: AccessFlags::STATIC,
        }])
        .unwrap();
    write(input.path(), &outer);
    write(input.path(), &class("test.Outer$Inner", "java.lang.Object"));

    let mut ctx = ResolutionContext::build(vec![ClasspathEntry::directory(input.path())]).unwrap();
    // resolve keeps nested classes under their own names
    assert!(ctx.resolve(&name("test.Outer")).unwrap().nested().is_empty());
    assert!(ctx.is_cached(&name("test.Outer$Inner")));

    for _ in 0..2 {
        let artifact = ctx.checkout(&name("test.Outer")).unwrap();
        assert_eq!(artifact.nested().len(), 1);
        ctx.restore(artifact);
    }

    // a discarded nested class is read from disk again
    assert!(ctx.discard(&name("test.Outer$Inner")));
    let artifact = ctx.checkout(&name("test.Outer")).unwrap();
    assert_eq!(artifact.nested()[0].name(), &name("test.Outer$Inner"));
    assert!(!artifact.nested()[0].is_modified());
}
