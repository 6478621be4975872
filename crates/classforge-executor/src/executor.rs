//! Transformation executor
//!
//! Drives one Run: discover candidates, resolve them through a single
//! [`ResolutionContext`], let every unit act once per artifact, stamp what
//! changed and write it out. Per-artifact failures are logged and recorded
//! in the [`RunReport`]; only setup failures abort the Run.
//!
//! # State per (unit, artifact)
//! ```text
//! Discovered -> Resolved -> SkippedStamped
//!                        -> SkippedByPredicate
//!                        -> Transformed -> Written | Failed
//! ```

use classforge_classfile::{Artifact, ClassName};
use classforge_resolver::{ClassLoader, ClasspathEntry, ResolutionContext, ResolutionError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ExecutorError;
use crate::locator;
use crate::report::{ArtifactOutcome, ArtifactState, FailureKind, RunReport};
use crate::stamp::Stamp;
use crate::unit::TransformationUnit;
use crate::writer::OutputWriter;

/// Inputs of one Run
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Root of the class files to transform; blank means nothing to do
    pub input_directory: Option<PathBuf>,
    /// Where results go; blank means back into the input directory
    pub output_directory: Option<PathBuf>,
    /// Extra class directories searched after the input directory
    pub external_classpath: Vec<PathBuf>,
    /// Caller loader searched after the external directories
    pub external_loader: Option<Arc<dyn ClassLoader>>,
}

impl RunConfig {
    /// Run over `input_directory`, writing back in place
    #[must_use]
    pub fn new(input_directory: impl Into<PathBuf>) -> Self {
        Self {
            input_directory: Some(input_directory.into()),
            ..Self::default()
        }
    }

    /// Builder: set the output directory
    #[must_use]
    pub fn with_output(mut self, output_directory: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(output_directory.into());
        self
    }

    /// Builder: append an external class directory
    #[must_use]
    pub fn with_classpath(mut self, dir: impl Into<PathBuf>) -> Self {
        self.external_classpath.push(dir.into());
        self
    }

    /// Builder: set the external loader
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn ClassLoader>) -> Self {
        self.external_loader = Some(loader);
        self
    }

    /// Input directory unless absent or blank
    #[must_use]
    pub fn input(&self) -> Option<&Path> {
        non_blank(self.input_directory.as_deref())
    }

    /// Explicit output directory, falling back to the input directory
    #[must_use]
    pub fn effective_output(&self) -> Option<&Path> {
        non_blank(self.output_directory.as_deref()).or_else(|| self.input())
    }
}

fn non_blank(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.to_string_lossy().trim().is_empty())
}

/// Runs transformation units over a directory of class files
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor;

impl Executor {
    /// Apply `units`, in order, to every class file under the input directory
    ///
    /// # Errors
    /// - [`ExecutorError::UnreadableRoot`] if the input cannot be walked
    /// - [`ExecutorError::Context`] if a classpath entry is unusable
    /// - [`ExecutorError::Output`] if the output directory cannot be created
    pub fn execute(
        config: &RunConfig,
        units: &[Box<dyn TransformationUnit>],
    ) -> Result<RunReport, ExecutorError> {
        let mut report = RunReport::default();
        let Some((input, mut context, writer)) = Self::prepare(config, units.len())? else {
            return Ok(report);
        };

        for unit in units {
            let unit = unit.as_ref();
            let identity = unit.identity().into_owned();
            let stamp = Stamp::for_unit(unit);
            let before = report.transformed;

            for name in locator::locate(input)?.flatten() {
                let mut run = UnitRun {
                    context: &mut context,
                    writer: &writer,
                    unit,
                    identity: &identity,
                    stamp: &stamp,
                    report: &mut report,
                };
                run.transform(&name);
            }

            tracing::info!(
                "#{} classes transformed by {}",
                report.transformed - before,
                identity
            );
        }

        tracing::info!(
            "Run complete: {} transformed, {} nested written, {} failed",
            report.transformed,
            report.nested_written,
            report.failures().count()
        );
        Ok(report)
    }

    /// Remove each unit's stamp wherever it is present and write the class back
    ///
    /// # Errors
    /// Same as [`Executor::execute`]
    pub fn remove_stamps(
        config: &RunConfig,
        units: &[Box<dyn TransformationUnit>],
    ) -> Result<RunReport, ExecutorError> {
        let mut report = RunReport::default();
        let Some((input, mut context, writer)) = Self::prepare(config, units.len())? else {
            return Ok(report);
        };

        for unit in units {
            let unit = unit.as_ref();
            let identity = unit.identity().into_owned();
            let stamp = Stamp::for_unit(unit);

            for name in locator::locate(input)?.flatten() {
                let mut run = UnitRun {
                    context: &mut context,
                    writer: &writer,
                    unit,
                    identity: &identity,
                    stamp: &stamp,
                    report: &mut report,
                };
                run.unstamp(&name);
            }
        }

        tracing::info!("#{} stamps removed", report.unstamped);
        Ok(report)
    }

    /// Shared setup; `None` when there is nothing to do
    fn prepare(
        config: &RunConfig,
        unit_count: usize,
    ) -> Result<Option<(&Path, ResolutionContext, OutputWriter)>, ExecutorError> {
        if unit_count == 0 {
            tracing::debug!("No transformation units; nothing to do");
            return Ok(None);
        }
        let Some(input) = config.input() else {
            tracing::debug!("No input directory; nothing to do");
            return Ok(None);
        };
        // fails fast on an unreadable root
        locator::locate(input)?;

        let context = Self::build_context(config, input)?;
        let output = config.effective_output().unwrap_or(input);
        if output != input {
            std::fs::create_dir_all(output).map_err(|source| ExecutorError::Output {
                path: output.to_path_buf(),
                source,
            })?;
        }
        tracing::debug!("Transforming {} into {}", input.display(), output.display());
        Ok(Some((input, context, OutputWriter::new(output))))
    }

    fn build_context(config: &RunConfig, input: &Path) -> Result<ResolutionContext, ExecutorError> {
        let mut entries = vec![ClasspathEntry::directory(input)];
        entries.extend(
            config
                .external_classpath
                .iter()
                .map(ClasspathEntry::directory),
        );
        if let Some(loader) = &config.external_loader {
            entries.push(ClasspathEntry::Loader(Arc::clone(loader)));
        }
        entries.push(ClasspathEntry::system());
        ResolutionContext::build(entries).map_err(ExecutorError::Context)
    }
}

/// Borrowed state for processing one unit's artifacts
struct UnitRun<'a> {
    context: &'a mut ResolutionContext,
    writer: &'a OutputWriter,
    unit: &'a dyn TransformationUnit,
    identity: &'a str,
    stamp: &'a Stamp,
    report: &'a mut RunReport,
}

impl UnitRun<'_> {
    fn record(&mut self, name: &ClassName, state: ArtifactState) {
        self.report
            .outcomes
            .push(ArtifactOutcome::new(self.identity, name, state));
    }

    fn fail(&mut self, name: &ClassName, kind: FailureKind, err: &dyn std::error::Error) {
        self.report
            .outcomes
            .push(ArtifactOutcome::failed(self.identity, name, kind, err));
    }

    fn checkout(&mut self, name: &ClassName) -> Option<Artifact> {
        tracing::debug!("Got class name {}", name);
        match self.context.checkout(name) {
            Ok(artifact) => Some(artifact),
            Err(err) => {
                let kind = match &err {
                    ResolutionError::NotFound { .. } => {
                        tracing::warn!(
                            "Class {} could not be resolved due to dependencies not found on current classpath: {}",
                            name,
                            err
                        );
                        FailureKind::Unresolved
                    }
                    ResolutionError::Malformed { .. } => {
                        tracing::error!("Class {} could not be loaded: {}", name, err);
                        FailureKind::Malformed
                    }
                    ResolutionError::Io { .. } | ResolutionError::InvalidEntry { .. } => {
                        tracing::error!("Class {} could not be read: {}", name, err);
                        FailureKind::Io
                    }
                };
                self.fail(name, kind, &err);
                None
            }
        }
    }

    fn transform(&mut self, name: &ClassName) {
        let Some(mut artifact) = self.checkout(name) else {
            return;
        };
        tracing::trace!("{}", artifact.describe());

        if self.stamp.is_present(&artifact) {
            self.context.restore(artifact);
            self.record(name, ArtifactState::SkippedStamped);
            return;
        }

        match self.unit.should_transform(&artifact) {
            Ok(true) => {}
            Ok(false) => {
                self.context.restore(artifact);
                self.record(name, ArtifactState::SkippedByPredicate);
                return;
            }
            Err(err) => {
                tracing::error!("Class {} could not be checked by {}: {}", name, self.identity, err);
                self.context.restore(artifact);
                self.fail(name, FailureKind::Predicate, &err);
                return;
            }
        }

        // an earlier unit may have written (and frozen) this artifact
        artifact.defrost();
        for nested in artifact.nested_mut() {
            nested.defrost();
            nested.clear_modified();
        }
        // state before this unit, restored on failure
        let pristine = artifact.clone();

        if let Err(err) = self.unit.apply_transformations(&mut artifact) {
            tracing::error!("Class {} could not be transformed by {}: {}", name, self.identity, err);
            self.context.restore(pristine);
            self.fail(name, FailureKind::Transform, &err);
            return;
        }
        if let Err(err) = self.stamp.apply(&mut artifact) {
            tracing::error!("Class {} could not be stamped: {}", name, err);
            self.context.restore(pristine);
            self.fail(name, FailureKind::Stamp, &err);
            return;
        }
        let written = match self.writer.write(&mut artifact) {
            Ok(written) => written,
            Err(err) => {
                tracing::error!("Class {} could not be written: {}", name, err);
                self.context.restore(pristine);
                self.fail(name, FailureKind::Write, &err);
                return;
            }
        };
        tracing::debug!("Class {} transformed by {}", name, self.identity);
        self.report.transformed += 1;
        let mut outcome = ArtifactOutcome::new(self.identity, name, ArtifactState::Written);
        outcome.files.push(written);
        self.report.outcomes.push(outcome);

        self.write_nested(&mut artifact, &pristine);
        self.context.restore(artifact);
    }

    /// Stamp and write nested artifacts the transformation touched
    ///
    /// A nested artifact that cannot be written goes back to its state in
    /// `pristine`, dropping both the stamp and the unit's change.
    fn write_nested(&mut self, artifact: &mut Artifact, pristine: &Artifact) {
        let mut failed = Vec::new();
        for nested in artifact.nested_mut() {
            if !nested.is_modified() || self.stamp.is_present(nested) {
                continue;
            }
            let name = nested.name().clone();
            nested.defrost();
            let result = self
                .stamp
                .apply(nested)
                .map_err(|e| (FailureKind::Stamp, e.to_string()))
                .and_then(|()| {
                    self.writer
                        .write(nested)
                        .map_err(|e| (FailureKind::Write, e.to_string()))
                });
            match result {
                Ok(written) => {
                    tracing::debug!("Nested class {} written", name);
                    self.report.nested_written += 1;
                    let mut outcome =
                        ArtifactOutcome::new(self.identity, &name, ArtifactState::Written);
                    outcome.files.push(written);
                    self.report.outcomes.push(outcome);
                }
                Err((kind, message)) => {
                    tracing::error!("Nested class {} could not be written: {}", name, message);
                    let mut outcome =
                        ArtifactOutcome::new(self.identity, &name, ArtifactState::Failed(kind));
                    outcome.message = Some(message);
                    self.report.outcomes.push(outcome);
                    failed.push(name);
                }
            }
        }

        if failed.is_empty() {
            return;
        }
        let kept: Vec<Artifact> = artifact
            .take_nested()
            .into_iter()
            .filter_map(|nested| {
                if !failed.contains(nested.name()) {
                    return Some(nested);
                }
                // not in the snapshot: dropped, so it is read from disk again
                pristine.nested().iter().find(|p| p.name() == nested.name()).cloned()
            })
            .collect();
        for nested in kept {
            if let Err(err) = artifact.attach_nested(nested) {
                tracing::error!("Nested class could not be re-attached: {}", err);
            }
        }
    }

    fn unstamp(&mut self, name: &ClassName) {
        let Some(mut artifact) = self.checkout(name) else {
            return;
        };
        if !self.stamp.is_present(&artifact) {
            self.context.restore(artifact);
            self.record(name, ArtifactState::NotStamped);
            return;
        }

        artifact.defrost();
        let pristine = artifact.clone();
        if let Err(err) = self.stamp.remove(&mut artifact) {
            tracing::error!("Stamp could not be removed from {}: {}", name, err);
            self.context.restore(pristine);
            self.fail(name, FailureKind::Stamp, &err);
            return;
        }
        match self.writer.write(&mut artifact) {
            Ok(written) => {
                tracing::debug!("Stamp {} removed from {}", self.stamp.field_name(), name);
                self.report.unstamped += 1;
                let mut outcome = ArtifactOutcome::new(self.identity, name, ArtifactState::Unstamped);
                outcome.files.push(written);
                self.report.outcomes.push(outcome);
                self.context.restore(artifact);
            }
            Err(err) => {
                tracing::error!("Class {} could not be written: {}", name, err);
                self.context.restore(pristine);
                self.fail(name, FailureKind::Write, &err);
            }
        }
    }
}
