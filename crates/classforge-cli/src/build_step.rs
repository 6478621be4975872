//! Build step
//!
//! Runs the configured transformers over a project's main classes and then,
//! if asked, its test classes. The configured `classpath` is installed as
//! ambient classpath for the duration of the step.

use classforge_executor::{
    Executor, ExecutorError, RegistryError, RunConfig, RunReport, TransformationUnit, UnitRegistry,
};
use classforge_resolver::AmbientClasspath;
use std::path::Path;

use crate::config::{BuildConfig, ConfigError};

/// Errors that stop the build step
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Invalid `classforge.toml`
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configured transformer cannot be instantiated
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A phase could not run at all
    #[error("{phase} classes: {source}")]
    Executor {
        phase: Phase,
        #[source]
        source: ExecutorError,
    },
}

/// Which classes directory a Run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `build_dir`, written to `output_dir` when set
    Main,
    /// `test_build_dir`, always in place
    Test,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::Test => f.write_str("test"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Transform,
    Unstamp,
}

/// One project's transformation, driven by a [`BuildConfig`]
#[derive(Debug)]
pub struct BuildStep<'a> {
    config: &'a BuildConfig,
    registry: &'a UnitRegistry,
}

impl<'a> BuildStep<'a> {
    /// Step over `config`, with units taken from `registry`
    #[must_use]
    pub fn new(config: &'a BuildConfig, registry: &'a UnitRegistry) -> Self {
        Self { config, registry }
    }

    /// Transform main, then test classes
    ///
    /// # Errors
    /// Returns error on invalid configuration or when a phase cannot start;
    /// per-class failures are only recorded in the report
    pub fn run(&self) -> Result<RunReport, BuildError> {
        self.execute(Mode::Transform)
    }

    /// Remove the configured transformers' stamps from main and test classes
    ///
    /// # Errors
    /// Same as [`BuildStep::run`]
    pub fn unstamp(&self) -> Result<RunReport, BuildError> {
        self.execute(Mode::Unstamp)
    }

    /// Run configurations in execution order
    #[must_use]
    pub fn phases(&self) -> Vec<(Phase, RunConfig)> {
        let config = self.config;
        let mut main = RunConfig::new(&config.build_dir);
        if let Some(output) = &config.output_dir {
            main = main.with_output(output);
        }
        let mut phases = vec![(Phase::Main, main)];

        if config.include_test_classes {
            // test classes always transform in place and see the main classes
            let test = RunConfig::new(&config.test_build_dir).with_classpath(&config.build_dir);
            phases.push((Phase::Test, test));
        }
        phases
    }

    fn execute(&self, mode: Mode) -> Result<RunReport, BuildError> {
        let mut report = RunReport::default();
        if self.config.skip {
            tracing::info!("Skipping executing.");
            return Ok(report);
        }
        self.config.validate()?;
        let units = self.registry.instantiate_all(&self.config.transformers)?;

        let _ambient = AmbientClasspath::extend_scoped(self.config.classpath.iter().cloned());
        for (phase, run) in self.phases() {
            let Some(input) = run.input() else { continue };
            if !input.is_dir() {
                tracing::info!("No {} classes at {}; skipping", phase, input.display());
                continue;
            }
            report.merge(Self::run_phase(phase, input, &run, &units, mode)?);
        }
        Ok(report)
    }

    fn run_phase(
        phase: Phase,
        input: &Path,
        run: &RunConfig,
        units: &[Box<dyn TransformationUnit>],
        mode: Mode,
    ) -> Result<RunReport, BuildError> {
        tracing::info!("Processing {} classes in {}", phase, input.display());
        let result = match mode {
            Mode::Transform => Executor::execute(run, units),
            Mode::Unstamp => Executor::remove_stamps(run, units),
        };
        result.map_err(|source| BuildError::Executor { phase, source })
    }
}
