//! Migration steps
//!
//! A [`MigrationStep`] rewrites one matched node at a time; a [`ProjectStep`]
//! contributes to the project as a whole (e.g. build-descriptor dependencies).
//! Steps hold no run state: one-time work is tracked in the project's
//! namespace registry.

use crate::error::MigrationError;
use mig_project::Project;
use mig_report::Report;
use mig_tree::{NodeRef, Query};
use std::fmt;

/// Rewrite applied to each node of a selection
pub trait MigrationStep {
    /// Human-readable description, used in logs and errors
    fn description(&self) -> &str;

    /// Selection evaluated immediately before this step runs
    ///
    /// `None` applies the step to the owning task's selection.
    fn applied_to(&self) -> Option<&Query> {
        None
    }

    /// Rewrite `node`
    ///
    /// # Errors
    /// Returns error when the rewrite cannot proceed without corrupting the
    /// output; unsupported constructs are reported instead
    fn execute(&self, node: NodeRef, project: &mut Project, report: &mut Report) -> Result<(), MigrationError>;
}

/// Contribution applied once per task run
pub trait ProjectStep {
    /// Human-readable description
    fn description(&self) -> &str;

    /// Apply the contribution
    ///
    /// # Errors
    /// Returns error if the project cannot be updated
    fn execute(&self, project: &mut Project, report: &mut Report) -> Result<(), MigrationError>;
}

/// Any step a task can hold
pub enum Step {
    /// Applied to each selected node
    Node(Box<dyn MigrationStep>),
    /// Applied once to the project
    Project(Box<dyn ProjectStep>),
}

impl Step {
    /// Wrap a node step
    #[must_use]
    pub fn node(step: impl MigrationStep + 'static) -> Self {
        Self::Node(Box::new(step))
    }

    /// Wrap a project step
    #[must_use]
    pub fn project(step: impl ProjectStep + 'static) -> Self {
        Self::Project(Box::new(step))
    }

    /// Description of the wrapped step
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Node(step) => step.description(),
            Self::Project(step) => step.description(),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(step) => f.debug_tuple("Node").field(&step.description()).finish(),
            Self::Project(step) => f.debug_tuple("Project").field(&step.description()).finish(),
        }
    }
}
