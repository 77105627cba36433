//! Error types for the project model

use mig_tree::{DocId, QuerySyntaxError, TreeError};
use std::path::PathBuf;

/// Project could not be loaded; raised before any task runs
#[derive(Debug, thiserror::Error)]
pub enum ProjectLoadError {
    /// Base path does not exist or is not a directory
    #[error("project directory not found: {}", .0.display())]
    MissingBaseDirectory(PathBuf),

    /// No build descriptor where one was expected
    #[error("build descriptor not found: {}", .0.display())]
    MissingBuildDescriptor(PathBuf),

    /// File could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not well-formed markup
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: TreeError,
    },

    /// Build descriptor lacks required coordinates
    #[error("invalid build descriptor {}: {message}", path.display())]
    InvalidBuildDescriptor {
        /// Descriptor path
        path: PathBuf,
        /// What is missing
        message: String,
    },

    /// Directory traversal failed
    #[error("failed to scan project: {0}")]
    Walk(#[from] walkdir::Error),
}

/// API contract could not be loaded
///
/// Cloneable so that a memoized failure can be handed out repeatedly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    /// Contract file does not exist
    #[error("api contract not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Contract file could not be read
    #[error("failed to read api contract {}: {message}", path.display())]
    Io {
        /// Contract path
        path: PathBuf,
        /// Rendered I/O error
        message: String,
    },

    /// First line is not the contract header
    #[error("{} is not a RAML 1.0 api definition", .0.display())]
    MissingHeader(PathBuf),

    /// Structurally invalid contract
    #[error("invalid api contract {}: {message}", path.display())]
    Invalid {
        /// Contract path
        path: PathBuf,
        /// Validation results
        message: String,
    },
}

/// Errors raised while querying, mutating or writing a loaded project
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// Tree mutation failed
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Malformed query
    #[error(transparent)]
    Query(#[from] QuerySyntaxError),

    /// Id does not address a document of this project
    #[error("unknown document {0}")]
    UnknownDocument(DocId),

    /// Document has no path to be written to
    #[error("document {0} has no source path")]
    Unnamed(DocId),

    /// Output could not be written
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Destination file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_file() {
        let err = ProjectLoadError::MissingBuildDescriptor(PathBuf::from("/app/pom.xml"));
        assert_eq!(err.to_string(), "build descriptor not found: /app/pom.xml");

        let err = ContractError::Invalid {
            path: PathBuf::from("api.raml"),
            message: "resource '/orders' must be a mapping".into(),
        };
        assert!(err.to_string().contains("api.raml"));
    }
}
