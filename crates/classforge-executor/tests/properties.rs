//! End-to-end behaviour of a Run over class files on disk

use classforge_executor::{
    ArtifactState, Executor, FailureKind, RunConfig, Stamp, TransformationUnit,
};
use classforge_test_utils::{class_name, has_field, read_class, ClassFixture, RecordingUnit, RECORDED_FIELD};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

fn stamp_of(unit: &RecordingUnit) -> Stamp {
    Stamp::for_unit(unit)
}

#[test]
fn test_second_run_is_idempotent() {
    let input = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Example").write_to(input.path());
    let unit = RecordingUnit::new("idempotent");
    let units = vec![unit.boxed()];

    let first = Executor::execute(&RunConfig::new(input.path()), &units).unwrap();
    let second = Executor::execute(&RunConfig::new(input.path()), &units).unwrap();

    assert_eq!(first.transformed, 1);
    assert_eq!(second.transformed, 0);
    assert_eq!(second.count(ArtifactState::SkippedStamped), 1);
    assert_eq!(unit.applied_count(), 1);

    let class = read_class(input.path(), "test.Example");
    let stamp = stamp_of(&unit);
    let stamps = class
        .declared_field_names()
        .unwrap()
        .into_iter()
        .filter(|f| f == stamp.field_name())
        .count();
    assert_eq!(stamps, 1);
}

#[test]
fn test_stamped_artifact_skips_predicate() {
    let input = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Example").write_to(input.path());
    let unit = RecordingUnit::new("predicate");
    let units = vec![unit.boxed()];

    Executor::execute(&RunConfig::new(input.path()), &units).unwrap();
    let checked_before = unit.calls().lock().checked.len();
    Executor::execute(&RunConfig::new(input.path()), &units).unwrap();
    assert_eq!(unit.calls().lock().checked.len(), checked_before);
}

#[test]
fn test_stamp_modifiers_for_classes_and_interfaces() {
    let input = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Impl").write_to(input.path());
    ClassFixture::interface("test.Api").write_to(input.path());
    let unit = RecordingUnit::new("modifiers");

    Executor::execute(&RunConfig::new(input.path()), &[unit.boxed()]).unwrap();

    let stamp = stamp_of(&unit);
    for (class, expected) in [
        ("test.Impl", "private static final"),
        ("test.Api", "public static final"),
    ] {
        let cf = read_class(input.path(), class);
        let field = cf.declared_field(stamp.field_name()).unwrap();
        assert_eq!(field.access_flags.to_string(), expected, "{class}");
        assert_eq!(cf.member_descriptor(field).unwrap(), "Z");
    }
}

#[test]
fn test_modified_nested_class_is_written_with_its_enclosing_class() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Outer")
        .nested("Touched")
        .nested("Untouched")
        .write_with_nested(input.path());
    let unit = RecordingUnit::new("nested").skip_nested().touch_nested("Touched");

    let report = Executor::execute(
        &RunConfig::new(input.path()).with_output(output.path()),
        &[unit.boxed()],
    )
    .unwrap();

    assert_eq!(report.transformed, 1);
    assert_eq!(report.nested_written, 1);
    assert!(output.path().join("test/Outer.class").exists());
    assert!(output.path().join("test/Outer$Touched.class").exists());
    assert!(!output.path().join("test/Outer$Untouched.class").exists());

    let stamp = stamp_of(&unit);
    assert!(has_field(output.path(), "test.Outer$Touched", stamp.field_name()));
    assert!(has_field(output.path(), "test.Outer$Touched", RECORDED_FIELD));
    // the predicate was never asked to transform the nested class itself
    assert!(!unit.calls().lock().applied.contains(&class_name("test.Outer$Touched")));
}

#[test]
fn test_missing_superclass_fails_only_that_class() {
    let input = tempfile::tempdir().unwrap();
    ClassFixture::class("test.A").write_to(input.path());
    ClassFixture::class("test.B").extends("absent.Base").write_to(input.path());
    ClassFixture::class("test.C").write_to(input.path());
    let unit = RecordingUnit::new("isolation");

    let report = Executor::execute(&RunConfig::new(input.path()), &[unit.boxed()]).unwrap();

    assert_eq!(report.transformed, 2);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].class, class_name("test.B"));
    assert_eq!(failures[0].state, ArtifactState::Failed(FailureKind::Unresolved));
    assert!(failures[0].message.as_deref().unwrap().contains("absent.Base"));
}

#[test]
fn test_transform_failure_leaves_class_unstamped() {
    let input = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Good").write_to(input.path());
    ClassFixture::class("test.Bad").write_to(input.path());
    let unit = RecordingUnit::new("failing").fail_on("test.Bad");

    let report = Executor::execute(&RunConfig::new(input.path()), &[unit.boxed()]).unwrap();
    assert_eq!(report.transformed, 1);
    assert_eq!(
        report.outcomes_for(&class_name("test.Bad")).next().unwrap().state,
        ArtifactState::Failed(FailureKind::Transform)
    );
    assert!(!has_field(input.path(), "test.Bad", stamp_of(&unit).field_name()));

    // next Run retries the failed class
    let retry = RecordingUnit::new("failing");
    let report = Executor::execute(&RunConfig::new(input.path()), &[retry.boxed()]).unwrap();
    assert_eq!(report.transformed, 1);
    assert!(has_field(input.path(), "test.Bad", RECORDED_FIELD));
}

#[test]
fn test_blank_output_writes_into_input() {
    let input = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Example").write_to(input.path());
    let unit = RecordingUnit::new("default-output");

    Executor::execute(
        &RunConfig::new(input.path()).with_output(""),
        &[unit.boxed()],
    )
    .unwrap();

    assert!(has_field(input.path(), "test.Example", RECORDED_FIELD));
}

#[test]
fn test_units_apply_in_order_with_separate_stamps() {
    let input = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Example").write_to(input.path());
    let first = RecordingUnit::new("first");
    let second = RecordingUnit::new("second").only("other.");

    let report = Executor::execute(
        &RunConfig::new(input.path()),
        &[first.boxed(), second.boxed()],
    )
    .unwrap();

    assert_eq!(report.transformed, 1);
    assert_eq!(report.count(ArtifactState::SkippedByPredicate), 1);
    assert!(has_field(input.path(), "test.Example", stamp_of(&first).field_name()));
    assert!(!has_field(input.path(), "test.Example", stamp_of(&second).field_name()));
}

#[test]
fn test_later_unit_sees_earlier_units_in_memory_changes() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Example").write_to(input.path());

    #[derive(Debug)]
    struct RequiresRecorded;

    impl TransformationUnit for RequiresRecorded {
        fn should_transform(
            &self,
            artifact: &classforge_classfile::Artifact,
        ) -> Result<bool, classforge_executor::TransformError> {
            Ok(artifact.class_file().declared_field(RECORDED_FIELD).is_some())
        }

        fn apply_transformations(
            &self,
            artifact: &mut classforge_classfile::Artifact,
        ) -> Result<(), classforge_executor::TransformError> {
            artifact.class_file_mut()?.add_interface(&class_name("java.io.Serializable"))?;
            Ok(())
        }
    }

    let units: Vec<Box<dyn TransformationUnit>> =
        vec![RecordingUnit::new("first").boxed(), Box::new(RequiresRecorded)];
    let report = Executor::execute(
        &RunConfig::new(input.path()).with_output(output.path()),
        &units,
    )
    .unwrap();

    // output differs from input, so only the shared context explains this
    assert_eq!(report.transformed, 2);
    let cf = read_class(output.path(), "test.Example");
    assert_eq!(cf.interface_names().unwrap(), vec![class_name("java.io.Serializable")]);
    assert!(cf.declared_field(RECORDED_FIELD).is_some());
}

#[test]
fn test_every_unit_sees_nested_classes() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Outer").nested("Touched").write_with_nested(input.path());
    let first = RecordingUnit::new("first").skip_nested().touch_nested("Touched");
    let second = RecordingUnit::new("second")
        .field("__second")
        .skip_nested()
        .touch_nested("Touched");

    let report = Executor::execute(
        &RunConfig::new(input.path()).with_output(output.path()),
        &[first.boxed(), second.boxed()],
    )
    .unwrap();

    assert!(report.is_clean(), "{report}");
    assert_eq!(report.transformed, 2);
    assert_eq!(report.nested_written, 2);
    let first_stamp = stamp_of(&first);
    let second_stamp = stamp_of(&second);
    for field in [
        RECORDED_FIELD,
        "__second",
        first_stamp.field_name(),
        second_stamp.field_name(),
    ] {
        assert!(has_field(output.path(), "test.Outer", field), "Outer {field}");
        assert!(has_field(output.path(), "test.Outer$Touched", field), "Touched {field}");
    }
}

#[test]
fn test_failed_unit_keeps_earlier_units_output() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Example").write_to(input.path());
    let first = RecordingUnit::new("first");
    let second = RecordingUnit::new("second").field("__second").fail_on("test.Example");
    let third = RecordingUnit::new("third").field("__third");

    let report = Executor::execute(
        &RunConfig::new(input.path()).with_output(output.path()),
        &[first.boxed(), second.boxed(), third.boxed()],
    )
    .unwrap();

    assert_eq!(report.transformed, 2);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].unit, "second");
    assert_eq!(failures[0].state, ArtifactState::Failed(FailureKind::Transform));

    let cf = read_class(output.path(), "test.Example");
    assert!(cf.declared_field(RECORDED_FIELD).is_some());
    assert!(cf.declared_field(stamp_of(&first).field_name()).is_some());
    assert!(cf.declared_field("__third").is_some());
    assert!(cf.declared_field(stamp_of(&third).field_name()).is_some());
    assert!(cf.declared_field("__second").is_none());
    assert!(cf.declared_field(stamp_of(&second).field_name()).is_none());
}

/// Records the declared fields of every nested artifact it is shown
#[derive(Debug, Default)]
struct NestedFields {
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

impl TransformationUnit for NestedFields {
    fn should_transform(
        &self,
        artifact: &classforge_classfile::Artifact,
    ) -> Result<bool, classforge_executor::TransformError> {
        let mut seen = self.seen.lock().unwrap();
        for nested in artifact.nested() {
            seen.push(nested.class_file().declared_field_names()?);
        }
        Ok(false)
    }

    fn apply_transformations(
        &self,
        _artifact: &mut classforge_classfile::Artifact,
    ) -> Result<(), classforge_executor::TransformError> {
        Ok(())
    }
}

#[test]
fn test_unwritable_nested_class_is_rolled_back_in_memory() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    ClassFixture::class("test.Outer").nested("Touched").write_with_nested(input.path());
    // a directory occupies the nested class file's path
    std::fs::create_dir_all(output.path().join("test/Outer$Touched.class")).unwrap();

    let first = RecordingUnit::new("first").skip_nested().touch_nested("Touched");
    let inspector = NestedFields::default();
    let seen = Arc::clone(&inspector.seen);
    let units: Vec<Box<dyn TransformationUnit>> = vec![first.boxed(), Box::new(inspector)];

    let report = Executor::execute(
        &RunConfig::new(input.path()).with_output(output.path()),
        &units,
    )
    .unwrap();

    assert_eq!(report.transformed, 1);
    assert_eq!(report.nested_written, 0);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].class, class_name("test.Outer$Touched"));
    assert_eq!(failures[0].state, ArtifactState::Failed(FailureKind::Write));
    assert!(has_field(output.path(), "test.Outer", RECORDED_FIELD));

    // the next unit sees the nested class without the stamp or the change
    let seen = seen.lock().unwrap();
    assert_eq!(*seen, vec![Vec::<String>::new()]);
}
