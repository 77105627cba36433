//! Error types for the migration pipeline
//!
//! Steps recover locally from unsupported constructs by reporting a
//! diagnostic; everything here is fatal and aborts the job.

use crate::job::JobState;
use mig_project::{ContractError, ProjectError, ProjectLoadError};
use mig_report::ReportError;
use mig_tree::{NodeRef, QuerySyntaxError, TreeError};
use std::path::PathBuf;

/// Fatal migration error
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Project could not be loaded
    #[error("project load failed: {0}")]
    Load(#[from] ProjectLoadError),

    /// Malformed selection query
    #[error("invalid query: {0}")]
    Query(#[from] QuerySyntaxError),

    /// Project mutation failed
    #[error("project error: {0}")]
    Project(#[from] ProjectError),

    /// Tree mutation failed
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    /// Reporting failed
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// Required contract or cross-document reference is unavailable
    #[error("unresolved reference '{reference}': {reason}")]
    UnresolvedReference {
        /// What was being resolved
        reference: String,
        /// Why it failed
        reason: String,
    },

    /// Handle does not address a node of the project
    #[error("unknown node {0:?}")]
    UnknownNode(NodeRef),

    /// A step failed on a matched node
    #[error("step '{step}' of task '{task}' failed at {location} in {}: {source}", file_label(.file))]
    StepFailed {
        /// Task description
        task: String,
        /// Step description
        step: String,
        /// Source file of the matched node
        file: Option<PathBuf>,
        /// Effective path of the matched node
        location: String,
        /// Underlying error
        #[source]
        source: Box<MigrationError>,
    },

    /// Job configuration is invalid
    #[error("invalid job configuration: {0}")]
    Config(String),

    /// Operation not allowed in the job's current state
    #[error("job is {actual}, expected {expected}")]
    InvalidState {
        /// Required state
        expected: JobState,
        /// Current state
        actual: JobState,
    },
}

fn file_label(file: &Option<PathBuf>) -> String {
    file.as_ref()
        .map_or_else(|| "<project>".to_string(), |p| p.display().to_string())
}

impl MigrationError {
    /// Build an unresolved-reference error
    #[must_use]
    pub fn unresolved(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Innermost error, looking through step context
    #[must_use]
    pub fn root_cause(&self) -> &MigrationError {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<ContractError> for MigrationError {
    fn from(e: ContractError) -> Self {
        let reference = match &e {
            ContractError::NotFound(path) | ContractError::MissingHeader(path) => path.display().to_string(),
            ContractError::Io { path, .. } | ContractError::Invalid { path, .. } => path.display().to_string(),
        };
        Self::unresolved(reference, e.to_string())
    }
}
