//! Error types for the tree model
//!
//! Covers ingress (parsing), structural mutation and egress (writing).
//! Query compilation failures live in [`QuerySyntaxError`](crate::QuerySyntaxError).

use crate::node::NodeId;

/// Errors raised by [`Document`](crate::Document) operations
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Malformed markup
    #[error("xml syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    /// Prefix used without an in-scope declaration
    #[error("undeclared namespace prefix '{0}'")]
    UndeclaredPrefix(String),

    /// Input contained no element
    #[error("document has no root element")]
    MissingRoot,

    /// Input contained more than one top-level element
    #[error("document has more than one root element")]
    MultipleRoots,

    /// Operation requires an element
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// Id does not address a slot of this arena
    #[error("node {0} does not belong to this document")]
    UnknownNode(NodeId),

    /// Attaching would make a node its own ancestor
    #[error("cannot attach {child} under {parent}: would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    /// The root element cannot be detached or re-parented
    #[error("the root element cannot be moved")]
    RootImmovable,

    /// Child index past the end of the content sequence
    #[error("child index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Serialization failed
    #[error("xml write failed: {0}")]
    Write(String),
}

impl TreeError {
    /// Create syntax error at position
    pub fn syntax(position: u64, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let err = TreeError::syntax(12, "unexpected end");
        assert_eq!(err.to_string(), "xml syntax error at byte 12: unexpected end");
    }

    #[test]
    fn cycle_error_display() {
        let err = TreeError::Cycle {
            parent: NodeId(1),
            child: NodeId(0),
        };
        assert!(err.to_string().contains("would create a cycle"));
    }
}
