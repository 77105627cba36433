//! Error types for catalogs and reports

use mig_tree::TreeError;
use std::path::PathBuf;

/// Catalog could not be loaded or queried
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Source is not a valid catalog document
    #[error("invalid catalog {source_name}: {message}")]
    Parse {
        /// Where the catalog came from
        source_name: String,
        /// Deserializer message
        message: String,
    },

    /// Category or code contains a separator or is empty
    #[error("invalid catalog key '{0}'")]
    InvalidKey(String),

    /// Entry has an empty message template
    #[error("catalog entry '{0}' has an empty message")]
    EmptyMessage(String),

    /// Lookup of a key that no source defines
    #[error("unknown report entry '{0}'")]
    UnknownKey(String),

    /// Catalog file could not be read
    #[error("failed to read catalog {}: {source}", path.display())]
    Io {
        /// Catalog path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while reporting
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Catalog lookup failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Comment injection failed
    #[error("failed to annotate node: {0}")]
    Tree(#[from] TreeError),

    /// Summary could not be serialized
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    /// Summary could not be written
    #[error("failed to write report {}: {source}", path.display())]
    Io {
        /// Destination
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}
