//! Path queries
//!
//! A subset of XPath 1.0 sufficient for selecting migration targets:
//!
//! - axes `child`, `descendant`, `descendant-or-self`, `self`, `parent`,
//!   `attribute` and the `/`, `//`, `.`, `..`, `@` abbreviations
//! - name tests `*`, `name`, `prefix:name`, `prefix:*`, plus `node()`,
//!   `text()` and `comment()`
//! - predicates with `and`, `or`, `=`, `!=`, literals, numbers (positional)
//! - functions `local-name`, `namespace-uri`, `name`, `contains`,
//!   `starts-with`, `not`, `string`, `count`, `normalize-space`, `true`,
//!   `false`
//!
//! A prefix in a name test stands for the URI the document root binds it to;
//! prefixes the root does not declare are compared literally. Unprefixed name
//! tests match unprefixed elements.
//! Compilation is deferred to first use; a malformed query surfaces as
//! [`QuerySyntaxError`] when it is evaluated.

mod eval;
mod lexer;
mod parser;

use crate::document::Document;
use crate::node::NodeId;
use eval::{Evaluator, Item};
use once_cell::unsync::OnceCell;
use parser::PathExpr;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Malformed query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid query '{query}' at offset {position}: {message}")]
pub struct QuerySyntaxError {
    /// Query source
    pub query: String,
    /// Byte offset of the offending token
    pub position: usize,
    /// What went wrong
    pub message: String,
}

impl QuerySyntaxError {
    pub(crate) fn new(query: &str, position: usize, message: impl Into<String>) -> Self {
        Self {
            query: query.to_string(),
            position,
            message: message.into(),
        }
    }
}

/// A lazily compiled path query
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    compiled: OnceCell<Result<PathExpr, QuerySyntaxError>>,
}

impl Query {
    /// Wrap query source; nothing is compiled yet
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: OnceCell::new(),
        }
    }

    /// Query source
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn compiled(&self) -> Result<&PathExpr, QuerySyntaxError> {
        self.compiled
            .get_or_init(|| parser::parse_selection(&self.source))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Compile now, reporting syntax errors without evaluating
    ///
    /// # Errors
    /// Returns error if the query is malformed
    pub fn validate(&self) -> Result<(), QuerySyntaxError> {
        self.compiled().map(|_| ())
    }

    /// Nodes selected with `context` as the context node, in document order
    ///
    /// Attribute results are not nodes of the arena and are left out; use
    /// [`Query::select_values`] to read them.
    ///
    /// # Errors
    /// Returns error if the query is malformed
    pub fn select(&self, doc: &Document, context: NodeId) -> Result<Vec<NodeId>, QuerySyntaxError> {
        let path = self.compiled()?;
        let evaluator = Evaluator::new(doc, context);
        Ok(evaluator
            .select(path, context)
            .into_iter()
            .filter_map(|item| match item {
                Item::Node(n) => Some(n),
                Item::DocumentNode | Item::Attr(..) => None,
            })
            .collect())
    }

    /// String values of everything selected, attributes included
    ///
    /// # Errors
    /// Returns error if the query is malformed
    pub fn select_values(&self, doc: &Document, context: NodeId) -> Result<Vec<String>, QuerySyntaxError> {
        let path = self.compiled()?;
        let evaluator = Evaluator::new(doc, context);
        Ok(evaluator
            .select(path, context)
            .into_iter()
            .map(|item| evaluator.string_value(item))
            .collect())
    }

    /// Check whether `node` is among the nodes selected from the root
    ///
    /// # Errors
    /// Returns error if the query is malformed
    pub fn matches(&self, doc: &Document, node: NodeId) -> Result<bool, QuerySyntaxError> {
        Ok(self.select(doc, doc.root())?.contains(&node))
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for Query {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Query {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
