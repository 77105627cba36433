//! Tree model for configuration documents
//!
//! An arena-backed element tree with namespace-aware XML ingress and egress
//! (quick-xml) and a lazily compiled path-query engine.
//!
//! # Example
//! ```
//! use mig_tree::{Document, Query};
//!
//! let doc = Document::parse(r#"<mule><flow name="main"/></mule>"#).unwrap();
//! let flows = doc.select(doc.root(), &Query::new("/mule/flow")).unwrap();
//! assert_eq!(doc.attribute(flows[0], "name"), Some("main"));
//! ```

pub mod document;
pub mod error;
pub mod namespace;
pub mod node;
mod parse;
pub mod query;
mod write;

pub use document::Document;
pub use error::TreeError;
pub use namespace::{Namespace, XML_NAMESPACE_URI, XSI_NAMESPACE_URI, XSI_PREFIX};
pub use node::{Attribute, DocId, Element, NodeId, NodeKind, NodeRef};
pub use query::{Query, QuerySyntaxError};
