//! Arena-backed document
//!
//! A [`Document`] owns every node created for it. Mutations happen in place and
//! are visible to the next query immediately; there is no staging.

use crate::error::TreeError;
use crate::namespace::Namespace;
use crate::node::{Attribute, DocId, Element, NodeData, NodeId, NodeKind, NodeRef};
use crate::query::{Query, QuerySyntaxError};
use std::path::{Path, PathBuf};

/// One parsed file
///
/// # Invariants
/// - exactly one root element, which is never detached
/// - a node has at most one parent, and appears once in that parent's content
#[derive(Debug, Clone)]
pub struct Document {
    id: DocId,
    path: Option<PathBuf>,
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Document {
    /// Create a document with a fresh root element
    #[must_use]
    pub fn new(root_name: impl Into<String>, namespace: Namespace) -> Self {
        let root = NodeData::new(NodeKind::Element(Element::new(root_name, namespace)));
        Self {
            id: DocId::default(),
            path: None,
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Project-assigned identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> DocId {
        self.id
    }

    /// Assign project identity
    #[inline]
    pub fn set_id(&mut self, id: DocId) {
        self.id = id;
    }

    /// Source path, relative to the project base when loaded from a project
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set source path
    #[inline]
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// Root element
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Handle for a node of this document
    #[inline]
    #[must_use]
    pub fn node_ref(&self, node: NodeId) -> NodeRef {
        NodeRef::new(self.id, node)
    }

    /// Content kind of a node
    #[inline]
    #[must_use]
    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node.0).map(|n| &n.kind)
    }

    /// Element payload
    #[inline]
    #[must_use]
    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.kind(node).and_then(NodeKind::as_element)
    }

    fn slot(&self, node: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes.get(node.0).ok_or(TreeError::UnknownNode(node))
    }

    fn slot_mut(&mut self, node: NodeId) -> Result<&mut NodeData, TreeError> {
        self.nodes.get_mut(node.0).ok_or(TreeError::UnknownNode(node))
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut Element, TreeError> {
        match &mut self.slot_mut(node)?.kind {
            NodeKind::Element(e) => Ok(e),
            _ => Err(TreeError::NotAnElement(node)),
        }
    }

    // ------------------------------------------------------------------
    // Names and namespaces
    // ------------------------------------------------------------------

    /// Local name of an element
    #[must_use]
    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(Element::name)
    }

    /// Qualified name of an element (`prefix:local`)
    #[must_use]
    pub fn qualified_name(&self, node: NodeId) -> Option<String> {
        self.element(node).map(Element::qualified_name)
    }

    /// Namespace of an element
    #[must_use]
    pub fn namespace(&self, node: NodeId) -> Option<&Namespace> {
        self.element(node).map(Element::namespace)
    }

    /// Rename an element, keeping its namespace
    ///
    /// # Errors
    /// Returns error if `node` is not an element
    pub fn set_name(&mut self, node: NodeId, name: impl Into<String>) -> Result<(), TreeError> {
        self.element_mut(node)?.name = name.into();
        Ok(())
    }

    /// Move an element into another namespace
    ///
    /// # Errors
    /// Returns error if `node` is not an element
    pub fn set_namespace(&mut self, node: NodeId, namespace: Namespace) -> Result<(), TreeError> {
        self.element_mut(node)?.namespace = namespace;
        Ok(())
    }

    /// Declarations made on an element
    #[must_use]
    pub fn declarations(&self, node: NodeId) -> &[Namespace] {
        self.element(node).map_or(&[], Element::declarations)
    }

    /// Declare a namespace on an element
    ///
    /// Replaces an earlier declaration of the same prefix. Returns `false`
    /// if the exact binding was already declared there.
    ///
    /// # Errors
    /// Returns error if `node` is not an element
    pub fn declare_namespace(&mut self, node: NodeId, ns: Namespace) -> Result<bool, TreeError> {
        let element = self.element_mut(node)?;
        if element.declarations.contains(&ns) {
            return Ok(false);
        }
        element.declarations.retain(|d| d.prefix() != ns.prefix());
        element.declarations.push(ns);
        Ok(true)
    }

    /// Remove every declaration of `uri` from an element
    ///
    /// Returns whether anything was removed.
    ///
    /// # Errors
    /// Returns error if `node` is not an element
    pub fn remove_declaration(&mut self, node: NodeId, uri: &str) -> Result<bool, TreeError> {
        let element = self.element_mut(node)?;
        let before = element.declarations.len();
        element.declarations.retain(|d| d.uri() != uri);
        Ok(element.declarations.len() != before)
    }

    /// Resolve a prefix against the declarations on the root element
    #[must_use]
    pub fn root_prefix_uri(&self, prefix: &str) -> Option<&str> {
        self.declarations(self.root)
            .iter()
            .find(|d| d.prefix() == prefix)
            .map(Namespace::uri)
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Attributes of an element
    #[must_use]
    pub fn attributes(&self, node: NodeId) -> &[Attribute] {
        self.element(node).map_or(&[], Element::attributes)
    }

    /// Value of an unqualified attribute
    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        let element = self.element(node)?;
        element
            .attribute_position(name, None)
            .map(|i| element.attributes[i].value())
    }

    /// Value of a namespaced attribute
    #[must_use]
    pub fn attribute_ns(&self, node: NodeId, name: &str, uri: &str) -> Option<&str> {
        let element = self.element(node)?;
        element
            .attribute_position(name, Some(uri))
            .map(|i| element.attributes[i].value())
    }

    /// Set an unqualified attribute, keeping its position when it exists
    ///
    /// # Errors
    /// Returns error if `node` is not an element
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), TreeError> {
        self.put_attribute(node, Attribute::new(name, value))
    }

    /// Set a namespaced attribute
    ///
    /// # Errors
    /// Returns error if `node` is not an element
    pub fn set_attribute_ns(
        &mut self,
        node: NodeId,
        name: &str,
        namespace: Namespace,
        value: impl Into<String>,
    ) -> Result<(), TreeError> {
        self.put_attribute(node, Attribute::with_namespace(name, namespace, value))
    }

    fn put_attribute(&mut self, node: NodeId, attribute: Attribute) -> Result<(), TreeError> {
        let element = self.element_mut(node)?;
        let uri = attribute.namespace.as_ref().map(Namespace::uri);
        match element.attribute_position(&attribute.name, uri) {
            Some(i) => element.attributes[i] = attribute,
            None => element.attributes.push(attribute),
        }
        Ok(())
    }

    /// Remove an unqualified attribute, returning its value
    ///
    /// # Errors
    /// Returns error if `node` is not an element
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>, TreeError> {
        let element = self.element_mut(node)?;
        Ok(element
            .attribute_position(name, None)
            .map(|i| element.attributes.remove(i).value))
    }

    /// Remove a namespaced attribute, returning its value
    ///
    /// # Errors
    /// Returns error if `node` is not an element
    pub fn remove_attribute_ns(
        &mut self,
        node: NodeId,
        name: &str,
        uri: &str,
    ) -> Result<Option<String>, TreeError> {
        let element = self.element_mut(node)?;
        Ok(element
            .attribute_position(name, Some(uri))
            .map(|i| element.attributes.remove(i).value))
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(kind));
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: impl Into<String>, namespace: Namespace) -> NodeId {
        self.alloc(NodeKind::Element(Element::new(name, namespace)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Create a detached CDATA section
    pub fn create_cdata(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::CData(text.into()))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    /// Copy a subtree into a new detached subtree of this document
    ///
    /// # Errors
    /// Returns error if `node` is unknown
    pub fn deep_clone(&mut self, node: NodeId) -> Result<NodeId, TreeError> {
        let kind = self.slot(node)?.kind.clone();
        let children = self.slot(node)?.children.clone();
        let copy = self.alloc(kind);
        for child in children {
            let child_copy = self.deep_clone(child)?;
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        Ok(copy)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Parent of a node (`None` for the root and detached nodes)
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    /// Content sequence of a node
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node.0).map_or(&[], |n| n.children.as_slice())
    }

    /// Element children of a node
    #[must_use]
    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    /// Element children with the given local name and namespace URI
    #[must_use]
    pub fn child_elements_named(&self, node: NodeId, name: &str, uri: &str) -> Vec<NodeId> {
        self.element_children(node)
            .into_iter()
            .filter(|c| {
                self.element(*c)
                    .is_some_and(|e| e.name() == name && e.namespace().uri() == uri)
            })
            .collect()
    }

    /// Check whether a node is reachable from the root
    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.root
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.slot(parent)?;
        self.slot(child)?;
        if child == self.root {
            return Err(TreeError::RootImmovable);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        Ok(())
    }

    /// Append content to a node, moving it if it is attached elsewhere
    ///
    /// # Errors
    /// Returns error if the move would create a cycle or move the root
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let len = self
            .children(parent)
            .iter()
            .filter(|c| **c != child)
            .count();
        self.insert_child_at(parent, len, child)
    }

    /// Insert content at `index` of a node's content sequence
    ///
    /// # Errors
    /// Returns error if `index` is past the end, or the move is invalid
    pub fn insert_child_at(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.check_attachable(parent, child)?;
        let mut len = self.nodes[parent.0].children.len();
        if self.nodes[child.0].parent == Some(parent) {
            len -= 1;
        }
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        self.unlink(child);
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    fn unlink(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    /// Detach a node from its parent's content sequence
    ///
    /// The node stays in the arena; earlier handles keep resolving.
    ///
    /// # Errors
    /// Returns error for the root element or unknown ids
    pub fn remove_content(&mut self, node: NodeId) -> Result<(), TreeError> {
        self.slot(node)?;
        if node == self.root {
            return Err(TreeError::RootImmovable);
        }
        self.unlink(node);
        Ok(())
    }

    /// Detach every child of a node
    ///
    /// # Errors
    /// Returns error for unknown ids
    pub fn clear_children(&mut self, node: NodeId) -> Result<(), TreeError> {
        let children = std::mem::take(&mut self.slot_mut(node)?.children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        Ok(())
    }

    /// Append a comment as last content of a node
    ///
    /// # Errors
    /// Returns error for unknown ids
    pub fn append_comment(&mut self, node: NodeId, text: impl Into<String>) -> Result<NodeId, TreeError> {
        let comment = self.create_comment(text);
        self.append_child(node, comment)?;
        Ok(comment)
    }

    /// Insert a comment as first content of a node
    ///
    /// # Errors
    /// Returns error for unknown ids
    pub fn prepend_comment(&mut self, node: NodeId, text: impl Into<String>) -> Result<NodeId, TreeError> {
        self.insert_comment_at(node, 0, text)
    }

    /// Insert a comment at `index` of a node's content sequence
    ///
    /// # Errors
    /// Returns error if `index` is out of bounds
    pub fn insert_comment_at(
        &mut self,
        node: NodeId,
        index: usize,
        text: impl Into<String>,
    ) -> Result<NodeId, TreeError> {
        let comment = self.create_comment(text);
        self.insert_child_at(node, index, comment)?;
        Ok(comment)
    }

    /// Remove comments anywhere below a node
    pub fn remove_nested_comments(&mut self, node: NodeId) {
        let comments: Vec<NodeId> = self
            .descendants(node)
            .into_iter()
            .filter(|d| matches!(self.kind(*d), Some(NodeKind::Comment(_))))
            .collect();
        for comment in comments {
            self.unlink(comment);
        }
    }

    /// Descendants of a node in document order (excluding the node itself)
    #[must_use]
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Number of attached elements, root included
    #[must_use]
    pub fn element_count(&self) -> usize {
        1 + self
            .descendants(self.root)
            .into_iter()
            .filter(|d| self.element(*d).is_some())
            .count()
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// String value: the concatenated text and CDATA below a node
    #[must_use]
    pub fn text(&self, node: NodeId) -> String {
        match self.kind(node) {
            Some(NodeKind::Text(t) | NodeKind::CData(t) | NodeKind::Comment(t)) => t.clone(),
            Some(NodeKind::Element(_)) => self
                .descendants(node)
                .into_iter()
                .filter_map(|d| match self.kind(d) {
                    Some(NodeKind::Text(t) | NodeKind::CData(t)) => Some(t.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Replace the content of an element with a single text node
    ///
    /// # Errors
    /// Returns error if `node` is not an element
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> Result<(), TreeError> {
        self.element_mut(node)?;
        self.clear_children(node)?;
        let child = self.create_text(text);
        self.append_child(node, child)
    }

    /// Replace the content of an element with a single CDATA section
    ///
    /// # Errors
    /// Returns error if `node` is not an element
    pub fn set_cdata(&mut self, node: NodeId, text: impl Into<String>) -> Result<(), TreeError> {
        self.element_mut(node)?;
        self.clear_children(node)?;
        let child = self.create_cdata(text);
        self.append_child(node, child)
    }

    // ------------------------------------------------------------------
    // Location and queries
    // ------------------------------------------------------------------

    /// Effective location of a node, e.g. `/mule/flow[2]/logger`
    ///
    /// Sibling indexes are added only when a parent holds several elements of
    /// the same qualified name. Detached subtrees are prefixed with `(detached)`.
    #[must_use]
    pub fn effective_path(&self, node: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(c) = current {
            let segment = match self.kind(c) {
                Some(NodeKind::Element(e)) => {
                    let qname = e.qualified_name();
                    match self.parent(c) {
                        Some(parent) => {
                            let same: Vec<NodeId> = self
                                .element_children(parent)
                                .into_iter()
                                .filter(|s| self.qualified_name(*s).as_deref() == Some(qname.as_str()))
                                .collect();
                            if same.len() > 1 {
                                let position = same.iter().position(|s| *s == c).unwrap_or(0) + 1;
                                format!("{qname}[{position}]")
                            } else {
                                qname
                            }
                        }
                        None => qname,
                    }
                }
                Some(NodeKind::Text(_) | NodeKind::CData(_)) => "text()".to_string(),
                Some(NodeKind::Comment(_)) => "comment()".to_string(),
                None => return String::new(),
            };
            segments.push(segment);
            current = self.parent(c);
        }
        segments.reverse();
        let path = format!("/{}", segments.join("/"));
        if self.is_attached(node) {
            path
        } else {
            format!("(detached){path}")
        }
    }

    /// Evaluate a path query with `context` as the context node
    ///
    /// # Errors
    /// Returns error if the query does not compile
    pub fn select(&self, context: NodeId, query: &Query) -> Result<Vec<NodeId>, QuerySyntaxError> {
        query.select(self, context)
    }
}
