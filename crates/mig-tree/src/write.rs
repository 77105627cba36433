//! XML egress via quick-xml
//!
//! Namespace bindings missing from the current scope are declared on the first
//! element that needs them.

use crate::document::Document;
use crate::error::TreeError;
use crate::namespace::{Namespace, NamespaceScope};
use crate::node::{NodeId, NodeKind};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

fn write_err(e: impl std::fmt::Display) -> TreeError {
    TreeError::Write(e.to_string())
}

impl Document {
    /// Serialize the whole document, pretty-printed with a 4-space indent
    ///
    /// # Errors
    /// Returns error if the writer fails
    pub fn to_xml_string(&self) -> Result<String, TreeError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_err)?;
        let mut scope = NamespaceScope::default();
        self.write_node(&mut writer, self.root(), &mut scope)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(write_err)
    }

    /// Serialize a single node compactly, declaring every namespace it uses
    ///
    /// # Errors
    /// Returns error if the writer fails
    pub fn element_to_string(&self, node: NodeId) -> Result<String, TreeError> {
        let mut writer = Writer::new(Vec::new());
        let mut scope = NamespaceScope::default();
        self.write_node(&mut writer, node, &mut scope)?;
        String::from_utf8(writer.into_inner()).map_err(write_err)
    }

    fn write_node<W: Write>(
        &self,
        writer: &mut Writer<W>,
        node: NodeId,
        scope: &mut NamespaceScope,
    ) -> Result<(), TreeError> {
        match self.kind(node).ok_or(TreeError::UnknownNode(node))? {
            NodeKind::Element(element) => {
                let qname = element.qualified_name();
                let mut start = BytesStart::new(qname.as_str());

                scope.push(Vec::new());
                let mut declared: Vec<Namespace> = Vec::new();
                for ns in element.declarations() {
                    declared.push(ns.clone());
                    scope.bind(ns.clone());
                }
                let mut required = vec![element.namespace().clone()];
                required.extend(element.attributes().iter().filter_map(|a| a.namespace().cloned()));
                for ns in required {
                    if !scope.is_bound(&ns) {
                        declared.push(ns.clone());
                        scope.bind(ns);
                    }
                }
                for ns in &declared {
                    start.push_attribute((ns.declaration_name().as_str(), ns.uri()));
                }
                for attr in element.attributes() {
                    start.push_attribute((attr.qualified_name().as_str(), attr.value()));
                }

                let children = self.children(node);
                if children.is_empty() {
                    writer.write_event(Event::Empty(start)).map_err(write_err)?;
                } else {
                    writer.write_event(Event::Start(start)).map_err(write_err)?;
                    for child in children {
                        self.write_node(writer, *child, scope)?;
                    }
                    writer
                        .write_event(Event::End(BytesEnd::new(qname.as_str())))
                        .map_err(write_err)?;
                }
                scope.pop();
            }
            NodeKind::Text(text) => {
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(write_err)?;
            }
            NodeKind::CData(text) => {
                writer
                    .write_event(Event::CData(BytesCData::new(text.as_str())))
                    .map_err(write_err)?;
            }
            NodeKind::Comment(text) => {
                writer
                    .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
                    .map_err(write_err)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn compact_output_declares_used_namespaces() {
        let mut doc = Document::new("mule", Namespace::new("", "urn:core"));
        let ee = Namespace::new("ee", "urn:ee");
        let transform = doc.create_element("transform", ee.clone());
        doc.set_attribute_ns(transform, "name", Namespace::new("doc", "urn:doc"), "URI Params")
            .unwrap();
        doc.append_child(doc.root(), transform).unwrap();

        let xml = doc.element_to_string(transform).unwrap();
        assert_eq!(
            xml,
            r#"<ee:transform xmlns:ee="urn:ee" xmlns:doc="urn:doc" doc:name="URI Params"/>"#
        );
    }

    #[test]
    fn root_declarations_are_not_repeated() {
        let mut doc = Document::new("mule", Namespace::new("", "urn:core"));
        let root = doc.root();
        doc.declare_namespace(root, Namespace::new("", "urn:core")).unwrap();
        doc.declare_namespace(root, Namespace::new("ee", "urn:ee")).unwrap();
        let flow = doc.create_element("flow", Namespace::new("", "urn:core"));
        let transform = doc.create_element("transform", Namespace::new("ee", "urn:ee"));
        doc.append_child(root, flow).unwrap();
        doc.append_child(flow, transform).unwrap();

        let xml = doc.to_xml_string().unwrap();
        assert_eq!(xml.matches("xmlns:ee=").count(), 1);
        assert_eq!(xml.matches("xmlns=").count(), 1);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    }

    #[test]
    fn reparse_preserves_structure() {
        let source = r#"<mule xmlns="urn:core" xmlns:ee="urn:ee"><flow name="a"><!--note--><ee:transform><ee:set-variable variableName="id"><![CDATA[attributes.uriParams.id]]></ee:set-variable></ee:transform></flow></mule>"#;
        let doc = Document::parse(source).unwrap();
        let again = Document::parse(&doc.to_xml_string().unwrap()).unwrap();
        assert_eq!(
            doc.element_to_string(doc.root()).unwrap(),
            again.element_to_string(again.root()).unwrap()
        );
    }

    #[test]
    fn comment_text_is_written_verbatim() {
        let mut doc = Document::new("mule", Namespace::none());
        doc.append_comment(doc.root(), "Migration ERROR: a < b").unwrap();
        let xml = doc.element_to_string(doc.root()).unwrap();
        assert_eq!(xml, "<mule><!--Migration ERROR: a < b--></mule>");
    }
}
