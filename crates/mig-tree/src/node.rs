//! Node identities and content kinds
//!
//! Nodes live in their owning [`Document`](crate::Document)'s arena and are
//! addressed by [`NodeId`]. [`NodeRef`] adds the owning document's [`DocId`]
//! so that handles can cross document boundaries inside a project.

use crate::namespace::Namespace;
use std::fmt::{self, Display, Formatter};

/// Index of a node inside its document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a document within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DocId(pub usize);

impl Display for DocId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "doc{}", self.0)
    }
}

/// Cross-document node handle
///
/// Handles stay valid for the lifetime of the document: detaching a node
/// keeps it in the arena, so a handle captured beforehand still resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    /// Owning document
    pub doc: DocId,
    /// Node inside that document
    pub node: NodeId,
}

impl NodeRef {
    /// Create a handle
    #[inline]
    #[must_use]
    pub fn new(doc: DocId, node: NodeId) -> Self {
        Self { doc, node }
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.doc, self.node)
    }
}

/// Attribute of an element
///
/// Unqualified attributes carry no namespace; the key `(name, namespace uri)`
/// is unique within an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub(crate) name: String,
    pub(crate) namespace: Option<Namespace>,
    pub(crate) value: String,
}

impl Attribute {
    /// Create an unqualified attribute
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            value: value.into(),
        }
    }

    /// Create a namespaced attribute
    #[must_use]
    pub fn with_namespace(
        name: impl Into<String>,
        namespace: Namespace,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace),
            value: value.into(),
        }
    }

    /// Local name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace, if qualified
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// Value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Name as written in markup
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => ns.qualify(&self.name),
            None => self.name.clone(),
        }
    }

    pub(crate) fn namespace_uri(&self) -> &str {
        self.namespace.as_ref().map_or("", Namespace::uri)
    }
}

/// Element payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub(crate) name: String,
    pub(crate) namespace: Namespace,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) declarations: Vec<Namespace>,
}

impl Element {
    pub(crate) fn new(name: impl Into<String>, namespace: Namespace) -> Self {
        Self {
            name: name.into(),
            namespace,
            attributes: Vec::new(),
            declarations: Vec::new(),
        }
    }

    /// Local name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace binding
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Attributes in document order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Namespace declarations made on this element
    #[inline]
    #[must_use]
    pub fn declarations(&self) -> &[Namespace] {
        &self.declarations
    }

    /// Name as written in markup
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.namespace.qualify(&self.name)
    }

    pub(crate) fn attribute_position(&self, name: &str, uri: Option<&str>) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| a.name == name && a.namespace.as_ref().map(Namespace::uri) == uri)
    }
}

/// Content kinds held by the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with name, namespace and attributes
    Element(Element),
    /// Character data
    Text(String),
    /// CDATA section
    CData(String),
    /// Comment
    Comment(String),
}

impl NodeKind {
    /// Check if this is an element
    #[inline]
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element(_))
    }

    /// Element payload, if any
    #[inline]
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// Arena slot
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}
