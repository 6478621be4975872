//! The `test.Example` scenario plus classpath handling through the executor

use classforge_classfile::{Artifact, ClassFile};
use classforge_executor::{
    ArtifactState, Executor, RunConfig, Stamp, TransformError, TransformationUnit,
};
use classforge_resolver::AmbientClasspath;
use classforge_test_utils::{class_name, has_field, ClassFixture, RecordingUnit, RECORDED_FIELD};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Always transforms; touching the structure is its only change
#[derive(Debug, Default)]
struct TouchUnit {
    applied: Arc<AtomicUsize>,
}

impl TransformationUnit for TouchUnit {
    fn should_transform(&self, _artifact: &Artifact) -> Result<bool, TransformError> {
        Ok(true)
    }

    fn apply_transformations(&self, artifact: &mut Artifact) -> Result<(), TransformError> {
        artifact.class_file_mut()?;
        self.applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_example_scenario() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Example").write_to(input.path());

    let applied = Arc::new(AtomicUsize::new(0));
    let units: Vec<Box<dyn TransformationUnit>> = vec![Box::new(TouchUnit {
        applied: Arc::clone(&applied),
    })];
    let stamp = Stamp::for_unit(units[0].as_ref());
    let config = RunConfig::new(input.path()).with_output(output.path());

    let report = Executor::execute(&config, &units).unwrap();
    assert_eq!(report.transformed, 1);
    assert_eq!(applied.load(Ordering::SeqCst), 1);

    let written = output.path().join("test/Example.class");
    let artifact =
        Artifact::from_bytes(&class_name("test.Example"), &std::fs::read(&written).unwrap()).unwrap();
    assert!(stamp.is_present(&artifact));

    // run again over the output
    let report = Executor::execute(&RunConfig::new(output.path()), &units).unwrap();
    assert_eq!(report.transformed, 0);
    assert_eq!(report.count(ArtifactState::SkippedStamped), 1);
    assert_eq!(applied.load(Ordering::SeqCst), 1);
}

#[test]
fn test_input_directory_shadows_external_classpath() {
    let input = tempfile::tempdir().unwrap();
    let external = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Shared").write_to(input.path());
    // the external copy could never resolve
    ClassFixture::class("test.Shared").extends("gone.Base").write_to(external.path());

    let unit = RecordingUnit::new("child-first");
    let report = Executor::execute(
        &RunConfig::new(input.path()).with_classpath(external.path()),
        &[unit.boxed()],
    )
    .unwrap();
    assert_eq!(report.transformed, 1);
    assert!(report.is_clean());
}

#[test]
fn test_external_classpath_supplies_superclasses() {
    let input = tempfile::tempdir().unwrap();
    let external = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Child").extends("dep.Base").write_to(input.path());
    ClassFixture::class("dep.Base").write_to(external.path());

    let unit = RecordingUnit::new("deps");
    let without = Executor::execute(&RunConfig::new(input.path()), &[unit.boxed()]).unwrap();
    assert_eq!(without.transformed, 0);
    assert_eq!(without.failures().count(), 1);

    let with = Executor::execute(
        &RunConfig::new(input.path()).with_classpath(external.path()),
        &[unit.boxed()],
    )
    .unwrap();
    assert_eq!(with.transformed, 1);
    // dependencies are resolved, never transformed
    assert!(!has_field(external.path(), "dep.Base", RECORDED_FIELD));
}

#[test]
fn test_ambient_classpath_is_consulted_while_guard_lives() {
    let input = tempfile::tempdir().unwrap();
    let ambient = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Child").extends("lib.Base").write_to(input.path());
    ClassFixture::class("lib.Base").write_to(ambient.path());

    let unit = RecordingUnit::new("ambient");
    {
        let _guard = AmbientClasspath::extend_scoped([ambient.path().to_path_buf()]);
        let report = Executor::execute(&RunConfig::new(input.path()), &[unit.boxed()]).unwrap();
        assert_eq!(report.transformed, 1);
    }
    assert!(!AmbientClasspath::snapshot().contains(&ambient.path().to_path_buf()));
}

#[test]
fn test_output_round_trips_through_class_file_parser() {
    let input = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Fields").field("count").field("name").write_to(input.path());
    let unit = RecordingUnit::new("round-trip");

    Executor::execute(&RunConfig::new(input.path()), &[unit.boxed()]).unwrap();

    let bytes = std::fs::read(input.path().join("test/Fields.class")).unwrap();
    let cf = ClassFile::parse(&bytes).unwrap();
    let names = cf.declared_field_names().unwrap();
    assert_eq!(&names[..2], ["count", "name"]);
    assert!(names.contains(&RECORDED_FIELD.to_string()));
    assert_eq!(cf.to_bytes().unwrap(), bytes);
}
