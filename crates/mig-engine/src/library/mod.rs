//! Step library
//!
//! Generic building blocks used by job configurations, plus the APIkit and
//! APIkit-for-SOAP migrations.

pub mod apikit;
pub mod generic;
pub mod soapkit;

use crate::error::MigrationError;
use crate::task::Task;
use mig_project::Project;
use mig_tree::{Document, Namespace, NodeRef};

/// Core namespace URI
pub const CORE_NS_URI: &str = "http://www.mulesoft.org/schema/mule/core";
/// Enterprise core namespace URI
pub const EE_NS_URI: &str = "http://www.mulesoft.org/schema/mule/ee/core";
/// Enterprise core schema location
pub const EE_SCHEMA_LOCATION: &str = "http://www.mulesoft.org/schema/mule/ee/core/current/mule-ee.xsd";
/// Documentation namespace URI
pub const DOC_NS_URI: &str = "http://www.mulesoft.org/schema/mule/documentation";

/// Enterprise core namespace bound to `ee`
#[must_use]
pub fn ee_namespace() -> Namespace {
    Namespace::new("ee", EE_NS_URI)
}

/// Documentation namespace bound to `doc`
#[must_use]
pub fn doc_namespace() -> Namespace {
    Namespace::new("doc", DOC_NS_URI)
}

/// Selector for top-level core elements named `local_name`
#[must_use]
pub fn top_level_core_selector(local_name: &str) -> String {
    format!("/*/*[namespace-uri()='{CORE_NS_URI}' and local-name()='{local_name}']")
}

/// Document owning `node`
pub(crate) fn document_mut(project: &mut Project, node: NodeRef) -> Result<&mut Document, MigrationError> {
    project.document_mut(node.doc).ok_or(MigrationError::UnknownNode(node))
}

/// Built-in tasks, in execution order
#[must_use]
pub fn builtin_tasks() -> Vec<Task> {
    vec![apikit::apikit_task(), soapkit::soapkit_task(), apikit::apikit_postprocess_task()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_tree::Query;

    #[test]
    fn top_level_selector_skips_nested() {
        let doc = Document::parse(&format!(
            r#"<mule xmlns="{CORE_NS_URI}"><flow name="a"><flow name="nested"/></flow><sub-flow name="b"/></mule>"#
        ))
        .unwrap();
        let found = doc.select(doc.root(), &Query::new(top_level_core_selector("flow"))).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(doc.attribute(found[0], "name"), Some("a"));
    }

    #[test]
    fn builtin_tasks_are_ordered() {
        let names: Vec<String> = builtin_tasks().iter().map(|t| t.description().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "Migrate APIkit router flows",
                "Migrate APIkit for SOAP",
                "Postprocess steps related to APIkit"
            ]
        );
    }
}
