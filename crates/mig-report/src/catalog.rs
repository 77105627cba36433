//! Typed diagnostic catalog
//!
//! Entries are keyed `category.code` and validated when a source is loaded.
//! Several sources may be merged; on collision the last one wins.

use crate::error::CatalogError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::Path;

const DEFAULT_CATALOG: &str = include_str!("../resources/report.yaml");

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Blocking: manual work is required
    Error,
    /// Needs review
    Warn,
    /// Informational
    Info,
}

impl Level {
    /// Upper-case name used in comments and summaries
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Severity
    #[serde(rename = "type")]
    pub level: Level,
    /// Message template with `{word}` placeholders
    pub message: String,
    /// Documentation links
    #[serde(default, rename = "docLinks")]
    pub doc_links: Vec<String>,
}

type RawCatalog = IndexMap<String, IndexMap<String, CatalogEntry>>;

/// Immutable-after-load mapping of `category.code` to entries
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl Catalog {
    /// Empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog shipped with this crate
    ///
    /// # Errors
    /// Returns error if the embedded source is invalid
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_yaml("embedded report.yaml", DEFAULT_CATALOG)
    }

    /// Parse and validate a YAML source
    ///
    /// # Errors
    /// - `CatalogError::Parse` for malformed documents or unknown levels
    /// - `CatalogError::InvalidKey` / `CatalogError::EmptyMessage` for bad entries
    pub fn from_yaml(source_name: &str, yaml: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_yaml::from_str(yaml).map_err(|e| CatalogError::Parse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;

        let mut entries = IndexMap::new();
        for (category, codes) in raw {
            for (code, entry) in codes {
                let key = format!("{category}.{code}");
                if category.is_empty() || code.is_empty() || category.contains('.') || code.contains('.') {
                    return Err(CatalogError::InvalidKey(key));
                }
                if entry.message.trim().is_empty() {
                    return Err(CatalogError::EmptyMessage(key));
                }
                entries.insert(key, entry);
            }
        }
        tracing::debug!("Loaded {} catalog entries from {}", entries.len(), source_name);
        Ok(Self { entries })
    }

    /// Read and parse a YAML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&path.display().to_string(), &yaml)
    }

    /// Merge another catalog in; its entries replace existing ones
    pub fn merge(&mut self, other: Catalog) {
        self.entries.extend(other.entries);
    }

    /// Look up an entry by `category.code`
    ///
    /// # Errors
    /// Returns error if no loaded source defines the key
    pub fn get(&self, key: &str) -> Result<&CatalogEntry, CatalogError> {
        self.entries
            .get(key)
            .ok_or_else(|| CatalogError::UnknownKey(key.to_string()))
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
