//! Namespace bindings
//!
//! Provides [`Namespace`], the `(prefix, uri)` pair carried by elements and
//! qualified attributes.

use std::fmt::{self, Display, Formatter};

/// URI of the schema-instance namespace (`xsi:schemaLocation` lives here)
pub const XSI_NAMESPACE_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Prefix conventionally bound to [`XSI_NAMESPACE_URI`]
pub const XSI_PREFIX: &str = "xsi";

/// URI implicitly bound to the reserved `xml` prefix
pub const XML_NAMESPACE_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// A namespace binding
///
/// An empty prefix denotes the default namespace; an empty URI denotes
/// "no namespace".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Namespace {
    prefix: String,
    uri: String,
}

impl Namespace {
    /// Create a binding
    #[inline]
    #[must_use]
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    /// The "no namespace" binding
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Schema-instance namespace bound to `xsi`
    #[inline]
    #[must_use]
    pub fn xsi() -> Self {
        Self::new(XSI_PREFIX, XSI_NAMESPACE_URI)
    }

    /// Prefix (empty for the default namespace)
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Namespace URI (empty for no namespace)
    #[inline]
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Check if this is the "no namespace" binding
    #[inline]
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.uri.is_empty()
    }

    /// Qualify a local name with this binding's prefix
    #[must_use]
    pub fn qualify(&self, local: &str) -> String {
        if self.prefix.is_empty() {
            local.to_string()
        } else {
            format!("{}:{}", self.prefix, local)
        }
    }

    /// Attribute name used to declare this binding (`xmlns` or `xmlns:p`)
    #[must_use]
    pub fn declaration_name(&self) -> String {
        if self.prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", self.prefix)
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "{{{}}}", self.uri)
        } else {
            write!(f, "{}={{{}}}", self.prefix, self.uri)
        }
    }
}

/// Stack of in-scope declarations, used by both ingress and egress
#[derive(Debug, Default)]
pub(crate) struct NamespaceScope {
    frames: Vec<Vec<Namespace>>,
}

impl NamespaceScope {
    pub(crate) fn push(&mut self, declarations: Vec<Namespace>) {
        self.frames.push(declarations);
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    /// Resolve a prefix to its URI, innermost declaration first
    pub(crate) fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE_URI);
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|ns| ns.prefix() == prefix)
            .map(Namespace::uri)
    }

    /// Check whether `ns` is already bound as-is in the current scope
    pub(crate) fn is_bound(&self, ns: &Namespace) -> bool {
        match self.resolve(ns.prefix()) {
            Some(uri) => uri == ns.uri(),
            // An unbound default prefix means "no namespace"
            None => ns.prefix().is_empty() && ns.uri().is_empty(),
        }
    }

    /// Add a declaration to the innermost frame
    pub(crate) fn bind(&mut self, ns: Namespace) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(ns);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualify_with_and_without_prefix() {
        assert_eq!(Namespace::new("ee", "urn:ee").qualify("transform"), "ee:transform");
        assert_eq!(Namespace::new("", "urn:core").qualify("flow"), "flow");
    }

    #[test]
    fn declaration_name() {
        assert_eq!(Namespace::new("doc", "urn:doc").declaration_name(), "xmlns:doc");
        assert_eq!(Namespace::new("", "urn:core").declaration_name(), "xmlns");
    }

    #[test]
    fn scope_resolves_innermost_first() {
        let mut scope = NamespaceScope::default();
        scope.push(vec![Namespace::new("a", "urn:outer")]);
        scope.push(vec![Namespace::new("a", "urn:inner")]);
        assert_eq!(scope.resolve("a"), Some("urn:inner"));
        scope.pop();
        assert_eq!(scope.resolve("a"), Some("urn:outer"));
    }

    #[test]
    fn unbound_default_is_no_namespace() {
        let scope = NamespaceScope::default();
        assert!(scope.is_bound(&Namespace::none()));
        assert!(!scope.is_bound(&Namespace::new("", "urn:core")));
        assert_eq!(scope.resolve("xml"), Some(XML_NAMESPACE_URI));
    }
}
