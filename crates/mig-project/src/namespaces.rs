//! Namespace registry and `xsi:schemaLocation` bookkeeping
//!
//! Registrations are written on the document root: an `xmlns:prefix`
//! declaration plus a `uri location` pair in `xsi:schemaLocation`. The
//! registry records which `(document, uri)` pairs were registered or bridged
//! so that rules query it instead of holding one-shot flags.

use indexmap::IndexSet;
use mig_tree::{DocId, Document, Namespace, TreeError, XSI_NAMESPACE_URI};

const SCHEMA_LOCATION: &str = "schemaLocation";

/// Markers keyed by `(document, uri)`
#[derive(Debug, Clone, Default)]
pub struct NamespaceRegistry {
    registered: IndexSet<(DocId, String)>,
    bridged: IndexSet<(DocId, String)>,
}

impl NamespaceRegistry {
    /// Check whether `uri` is registered on a document
    #[must_use]
    pub fn is_registered(&self, doc: DocId, uri: &str) -> bool {
        self.registered.contains(&(doc, uri.to_string()))
    }

    /// Check whether a bridge into `uri` already ran on a document
    #[must_use]
    pub fn is_bridged(&self, doc: DocId, uri: &str) -> bool {
        self.bridged.contains(&(doc, uri.to_string()))
    }

    pub(crate) fn mark_registered(&mut self, doc: DocId, uri: &str) {
        self.registered.insert((doc, uri.to_string()));
    }

    pub(crate) fn unmark_registered(&mut self, doc: DocId, uri: &str) {
        self.registered.shift_remove(&(doc, uri.to_string()));
    }

    pub(crate) fn mark_bridged(&mut self, doc: DocId, uri: &str) {
        self.bridged.insert((doc, uri.to_string()));
    }

    /// Registered URIs of a document, in registration order
    pub fn registered(&self, doc: DocId) -> impl Iterator<Item = &str> {
        self.registered
            .iter()
            .filter(move |(d, _)| *d == doc)
            .map(|(_, uri)| uri.as_str())
    }
}

/// Parsed `xsi:schemaLocation` value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaLocations {
    pairs: Vec<(String, String)>,
}

impl SchemaLocations {
    /// Parse whitespace-separated `uri location` pairs; a dangling token is dropped
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let tokens: Vec<&str> = value.split_whitespace().collect();
        let pairs = tokens
            .chunks_exact(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();
        Self { pairs }
    }

    /// Read the root's current value
    #[must_use]
    pub fn of(doc: &Document) -> Self {
        doc.attribute_ns(doc.root(), SCHEMA_LOCATION, XSI_NAMESPACE_URI)
            .map(Self::parse)
            .unwrap_or_default()
    }

    /// Check for a pair with this URI
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.pairs.iter().any(|(u, _)| u == uri)
    }

    /// Number of pairs for this URI
    #[must_use]
    pub fn count(&self, uri: &str) -> usize {
        self.pairs.iter().filter(|(u, _)| u == uri).count()
    }

    /// Add a pair unless the URI is present; returns whether it was added
    pub fn insert(&mut self, uri: &str, location: &str) -> bool {
        if self.contains(uri) {
            return false;
        }
        self.pairs.push((uri.to_string(), location.to_string()));
        true
    }

    /// Remove every pair for this URI; returns whether anything was removed
    pub fn remove(&mut self, uri: &str) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|(u, _)| u != uri);
        self.pairs.len() != before
    }

    /// Render as an attribute value
    #[must_use]
    pub fn render(&self) -> String {
        self.pairs
            .iter()
            .map(|(uri, location)| format!("{uri} {location}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Write back to the root, removing the attribute when empty
    ///
    /// # Errors
    /// Returns error if the root cannot be updated
    pub fn store(&self, doc: &mut Document) -> Result<(), TreeError> {
        let root = doc.root();
        if self.pairs.is_empty() {
            doc.remove_attribute_ns(root, SCHEMA_LOCATION, XSI_NAMESPACE_URI)?;
        } else {
            doc.declare_namespace(root, Namespace::xsi())?;
            doc.set_attribute_ns(root, SCHEMA_LOCATION, Namespace::xsi(), self.render())?;
        }
        Ok(())
    }
}

/// Declare `ns` on the root and add its schema location
///
/// Returns whether the document changed.
///
/// # Errors
/// Returns error if the root cannot be updated
pub fn declare_on_root(doc: &mut Document, ns: &Namespace, location: &str) -> Result<bool, TreeError> {
    let root = doc.root();
    let declared = doc.declare_namespace(root, ns.clone())?;
    let mut locations = SchemaLocations::of(doc);
    let located = locations.insert(ns.uri(), location);
    if located {
        locations.store(doc)?;
    }
    Ok(declared || located)
}

/// Remove `uri` from the root's declarations and schema locations
///
/// Returns whether the document changed; absence is not an error.
///
/// # Errors
/// Returns error if the root cannot be updated
pub fn undeclare_on_root(doc: &mut Document, uri: &str) -> Result<bool, TreeError> {
    let root = doc.root();
    let undeclared = doc.remove_declaration(root, uri)?;
    let mut locations = SchemaLocations::of(doc);
    let unlocated = locations.remove(uri);
    if unlocated {
        locations.store(doc)?;
    }
    Ok(undeclared || unlocated)
}
