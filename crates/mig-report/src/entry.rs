//! Diagnostic entries

use crate::catalog::Level;
use mig_tree::NodeRef;
use serde::Serialize;

/// Namespace prefix marking constructs that are already compatible
pub const COMPATIBILITY_PREFIX: &str = "compatibility";

/// One diagnostic
///
/// Two entries are the same diagnostic when they target the same node with
/// the same message; see [`ReportEntry::key`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    /// Severity
    pub level: Level,
    /// Target node
    #[serde(skip)]
    pub element: NodeRef,
    /// Effective location of the target when reported
    pub element_path: String,
    /// Source file of the target, relative to the project base
    pub file_path: Option<String>,
    /// Rendered message
    pub message: String,
    /// Documentation links
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub doc_links: Vec<String>,
    /// Target carried the compatibility prefix when reported
    #[serde(skip)]
    pub already_compatible: bool,
}

/// Identity of an entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    /// Target node
    pub element: NodeRef,
    /// Rendered message
    pub message: String,
}

impl ReportEntry {
    /// Identity used for deduplication
    #[must_use]
    pub fn key(&self) -> EntryKey {
        EntryKey {
            element: self.element,
            message: self.message.clone(),
        }
    }

    /// Comment lines injected for this entry, in order
    #[must_use]
    pub fn comment_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Migration {}: {}", self.level, self.message)];
        if !self.doc_links.is_empty() {
            lines.push("    For more information refer to:".to_string());
            lines.extend(self.doc_links.iter().map(|link| format!("        * {link}")));
        }
        lines
    }
}
