//! Run report
//!
//! Every (unit, artifact) pair a Run touched ends in exactly one
//! [`ArtifactOutcome`]. The caller decides whether failures fail the build.

use classforge_classfile::ClassName;
use std::fmt;

use crate::writer::WrittenFile;

/// Why an artifact was skipped with an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A dependency (superclass, nested class) is missing
    Unresolved,
    /// Class file could not be decoded
    Malformed,
    /// Class file could not be read
    Io,
    /// `should_transform` failed
    Predicate,
    /// `apply_transformations` failed
    Transform,
    /// Stamp could not be added or removed
    Stamp,
    /// Output could not be written
    Write,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unresolved => "unresolved",
            Self::Malformed => "malformed",
            Self::Io => "io",
            Self::Predicate => "predicate",
            Self::Transform => "transform",
            Self::Stamp => "stamp",
            Self::Write => "write",
        };
        f.write_str(s)
    }
}

/// Terminal state of one (unit, artifact) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "kind")]
pub enum ArtifactState {
    /// Stamp already present; unit not consulted
    SkippedStamped,
    /// `should_transform` returned false
    SkippedByPredicate,
    /// Transformed, stamped and written
    Written,
    /// Stamp removed and written back
    Unstamped,
    /// No stamp to remove
    NotStamped,
    Failed(FailureKind),
}

/// Outcome of one (unit, artifact) pair
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArtifactOutcome {
    /// Identity of the unit
    pub unit: String,
    pub class: ClassName,
    #[serde(flatten)]
    pub state: ArtifactState,
    /// Error text for failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Files written for this artifact (nested classes have their own outcome)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<WrittenFile>,
}

impl ArtifactOutcome {
    pub(crate) fn new(unit: &str, class: &ClassName, state: ArtifactState) -> Self {
        Self {
            unit: unit.to_string(),
            class: class.clone(),
            state,
            message: None,
            files: Vec::new(),
        }
    }

    pub(crate) fn failed(
        unit: &str,
        class: &ClassName,
        kind: FailureKind,
        err: &dyn std::error::Error,
    ) -> Self {
        let mut outcome = Self::new(unit, class, ArtifactState::Failed(kind));
        outcome.message = Some(err.to_string());
        outcome
    }

    /// True for any [`ArtifactState::Failed`]
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.state, ArtifactState::Failed(_))
    }
}

/// Summary of one Run
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunReport {
    /// Artifacts transformed and written (nested classes excluded)
    pub transformed: usize,
    /// Nested artifacts stamped and written alongside their enclosing class
    pub nested_written: usize,
    /// Artifacts whose stamp was removed
    pub unstamped: usize,
    pub outcomes: Vec<ArtifactOutcome>,
}

impl RunReport {
    /// Outcomes that ended in failure
    pub fn failures(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Whether no artifact failed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Number of outcomes in `state`
    #[must_use]
    pub fn count(&self, state: ArtifactState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    /// Outcomes recorded for `class`, in order
    pub fn outcomes_for<'a>(
        &'a self,
        class: &'a ClassName,
    ) -> impl Iterator<Item = &'a ArtifactOutcome> + 'a {
        self.outcomes.iter().filter(move |o| &o.class == class)
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: RunReport) {
        self.transformed += other.transformed;
        self.nested_written += other.nested_written;
        self.unstamped += other.unstamped;
        self.outcomes.extend(other.outcomes);
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} transformed, {} nested written, {} unstamped, {} skipped (stamped), {} skipped (predicate), {} failed",
            self.transformed,
            self.nested_written,
            self.unstamped,
            self.count(ArtifactState::SkippedStamped),
            self.count(ArtifactState::SkippedByPredicate),
            self.failures().count()
        )?;
        for failure in self.failures() {
            if let ArtifactState::Failed(kind) = failure.state {
                writeln!(
                    f,
                    "  {} [{}] {}: {}",
                    failure.class,
                    kind,
                    failure.unit,
                    failure.message.as_deref().unwrap_or("")
                )?;
            }
        }
        Ok(())
    }
}
