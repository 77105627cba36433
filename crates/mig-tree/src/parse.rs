//! XML ingress via quick-xml
//!
//! Text is kept verbatim except whitespace-only runs, which are dropped. Prefixes are resolved against in-scope
//! declarations, and content outside the root element is ignored.

use crate::document::Document;
use crate::error::TreeError;
use crate::namespace::{Namespace, NamespaceScope};
use crate::node::NodeId;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

impl Document {
    /// Parse markup into a document
    ///
    /// # Errors
    /// - `TreeError::Syntax` for malformed markup
    /// - `TreeError::UndeclaredPrefix` for unbound prefixes
    /// - `TreeError::MissingRoot` / `TreeError::MultipleRoots`
    pub fn parse(source: &str) -> Result<Self, TreeError> {
        let mut reader = Reader::from_str(source);

        let mut builder = TreeBuilder::default();
        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| TreeError::syntax(position, e.to_string()))?;
            match event {
                Event::Start(start) => builder.open(&start, position)?,
                Event::Empty(start) => {
                    builder.open(&start, position)?;
                    builder.close();
                }
                Event::End(_) => builder.close(),
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| TreeError::syntax(position, e.to_string()))?;
                    builder.text(&text);
                }
                Event::CData(data) => builder.cdata(String::from_utf8_lossy(&data).into_owned()),
                Event::Comment(comment) => {
                    builder.comment(String::from_utf8_lossy(&comment).into_owned());
                }
                Event::Eof => break,
                // Declaration, processing instructions, doctype
                _ => {}
            }
        }
        builder.finish(reader.buffer_position())
    }
}

#[derive(Default)]
struct TreeBuilder {
    doc: Option<Document>,
    open: Vec<NodeId>,
    scope: NamespaceScope,
}

struct RawAttribute {
    prefix: Option<String>,
    local: String,
    value: String,
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

impl TreeBuilder {
    fn open(&mut self, start: &BytesStart<'_>, position: u64) -> Result<(), TreeError> {
        if self.open.is_empty() && self.doc.is_some() {
            return Err(TreeError::MultipleRoots);
        }

        let qname = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| TreeError::syntax(position, e.to_string()))?
            .to_string();

        let mut declarations = Vec::new();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| TreeError::syntax(position, e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| TreeError::syntax(position, e.to_string()))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| TreeError::syntax(position, e.to_string()))?
                .into_owned();
            if key == "xmlns" {
                declarations.push(Namespace::new("", value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push(Namespace::new(prefix, value));
            } else {
                let (prefix, local) = split_qname(&key);
                attributes.push(RawAttribute {
                    prefix: prefix.map(str::to_string),
                    local: local.to_string(),
                    value,
                });
            }
        }

        self.scope.push(declarations.clone());

        let (prefix, local) = split_qname(&qname);
        let namespace = self.resolve(prefix.unwrap_or(""))?;

        let node = if let Some(doc) = self.doc.as_mut() {
            let parent = *self.open.last().ok_or(TreeError::MultipleRoots)?;
            let node = doc.create_element(local, namespace);
            doc.append_child(parent, node)?;
            node
        } else {
            let doc = Document::new(local, namespace);
            let root = doc.root();
            self.doc = Some(doc);
            root
        };

        for raw in attributes {
            let namespace = match raw.prefix.as_deref() {
                Some(p) => Some(self.resolve(p)?),
                None => None,
            };
            if let Some(doc) = self.doc.as_mut() {
                match namespace {
                    Some(ns) => doc.set_attribute_ns(node, &raw.local, ns, raw.value)?,
                    None => doc.set_attribute(node, &raw.local, raw.value)?,
                }
            }
        }
        if let Some(doc) = self.doc.as_mut() {
            for ns in declarations {
                doc.declare_namespace(node, ns)?;
            }
        }

        self.open.push(node);
        Ok(())
    }

    fn resolve(&self, prefix: &str) -> Result<Namespace, TreeError> {
        match self.scope.resolve(prefix) {
            Some(uri) => Ok(Namespace::new(prefix, uri)),
            None if prefix.is_empty() => Ok(Namespace::none()),
            None => Err(TreeError::UndeclaredPrefix(prefix.to_string())),
        }
    }

    fn close(&mut self) {
        if self.open.pop().is_some() {
            self.scope.pop();
        }
    }

    fn attach(&mut self, make: impl FnOnce(&mut Document) -> NodeId) {
        if let (Some(doc), Some(parent)) = (self.doc.as_mut(), self.open.last()) {
            let parent = *parent;
            let node = make(doc);
            // Parent is an open element, so attaching cannot fail
            let _ = doc.append_child(parent, node);
        }
    }

    fn text(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let text = text.to_string();
        self.attach(|doc| doc.create_text(text));
    }

    fn cdata(&mut self, text: String) {
        self.attach(|doc| doc.create_cdata(text));
    }

    fn comment(&mut self, text: String) {
        self.attach(|doc| doc.create_comment(text));
    }

    fn finish(self, position: u64) -> Result<Document, TreeError> {
        if !self.open.is_empty() {
            return Err(TreeError::syntax(position, "unclosed element at end of input"));
        }
        self.doc.ok_or(TreeError::MissingRoot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    const FLOW: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mule xmlns="http://www.mulesoft.org/schema/mule/core"
      xmlns:doc="http://www.mulesoft.org/schema/mule/documentation">
    <!-- main flow -->
    <flow name="main" doc:name="Main">
        <logger message="hello &amp; bye"/>
        <set-payload><![CDATA[#[payload]]]></set-payload>
    </flow>
</mule>"#;

    #[test]
    fn parses_namespaces_and_attributes() {
        let doc = Document::parse(FLOW).unwrap();
        let root = doc.root();
        assert_eq!(doc.name(root), Some("mule"));
        assert_eq!(doc.namespace(root).unwrap().uri(), "http://www.mulesoft.org/schema/mule/core");
        assert_eq!(doc.declarations(root).len(), 2);

        let flow = doc.element_children(root)[0];
        assert_eq!(doc.attribute(flow, "name"), Some("main"));
        assert_eq!(
            doc.attribute_ns(flow, "name", "http://www.mulesoft.org/schema/mule/documentation"),
            Some("Main")
        );

        let logger = doc.element_children(flow)[0];
        assert_eq!(doc.attribute(logger, "message"), Some("hello & bye"));
        assert_eq!(doc.namespace(logger).unwrap().prefix(), "");
    }

    #[test]
    fn keeps_comments_and_cdata() {
        let doc = Document::parse(FLOW).unwrap();
        let first = doc.children(doc.root())[0];
        assert!(matches!(doc.kind(first), Some(NodeKind::Comment(c)) if c.trim() == "main flow"));

        let flow = doc.element_children(doc.root())[0];
        let payload = doc.element_children(flow)[1];
        assert!(matches!(doc.kind(doc.children(payload)[0]), Some(NodeKind::CData(_))));
        assert_eq!(doc.text(payload), "#[payload]");
    }

    #[test]
    fn keeps_surrounding_whitespace_in_text() {
        let doc = Document::parse("<t>  spaced  </t>").unwrap();
        assert_eq!(doc.text(doc.root()), "  spaced  ");
        assert_eq!(doc.element_to_string(doc.root()).unwrap(), "<t>  spaced  </t>");
    }

    #[test]
    fn keeps_spacing_in_mixed_content() {
        let doc = Document::parse("<a>x <b/> y</a>").unwrap();
        let children = doc.children(doc.root());
        assert_eq!(children.len(), 3);
        assert!(matches!(doc.kind(children[0]), Some(NodeKind::Text(t)) if t == "x "));
        assert_eq!(doc.name(children[1]), Some("b"));
        assert!(matches!(doc.kind(children[2]), Some(NodeKind::Text(t)) if t == " y"));
        assert_eq!(doc.element_to_string(doc.root()).unwrap(), "<a>x <b/> y</a>");
    }

    #[test]
    fn rejects_undeclared_prefix() {
        let result = Document::parse("<mule><ee:transform/></mule>");
        assert!(matches!(result, Err(TreeError::UndeclaredPrefix(p)) if p == "ee"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(Document::parse("   "), Err(TreeError::MissingRoot)));
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(matches!(Document::parse("<a><b></a>"), Err(TreeError::Syntax { .. })));
    }
}
