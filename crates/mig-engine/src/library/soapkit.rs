//! APIkit for SOAP namespace bridging

use super::document_mut;
use crate::error::MigrationError;
use crate::step::MigrationStep;
use crate::task::Task;
use crate::version::VersionPattern;
use mig_project::{Project, ProjectType};
use mig_report::Report;
use mig_tree::{Namespace, NodeRef, Query};

/// Generation-3 namespace URI
pub const OLD_SOAPKIT_NS_URI: &str = "http://www.mulesoft.org/schema/mule/apikit-soap";
/// Generation-3 schema location
pub const OLD_SOAPKIT_SCHEMA_LOCATION: &str =
    "http://www.mulesoft.org/schema/mule/apikit-soap/current/mule-apikit-soap.xsd";
/// Generation-4 namespace URI
pub const SOAPKIT_NS_URI: &str = "http://www.mulesoft.org/schema/mule/soapkit";
/// Generation-4 schema location
pub const SOAPKIT_SCHEMA_LOCATION: &str = "http://www.mulesoft.org/schema/mule/soapkit/current/mule-soapkit.xsd";
/// Prefix kept across generations
pub const SOAPKIT_PREFIX: &str = "apikit-soap";

/// Generation-4 namespace bound to the shared prefix
#[must_use]
pub fn soapkit_namespace() -> Namespace {
    Namespace::new(SOAPKIT_PREFIX, SOAPKIT_NS_URI)
}

/// Move elements of the old namespace into the new one
///
/// The document's declarations are bridged on the first element seen in that
/// document; the registry makes later calls no-ops.
#[derive(Debug)]
pub struct SoapkitNamespace {
    elements: Query,
}

impl SoapkitNamespace {
    /// Create the step
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: Query::new(format!("//*[namespace-uri()='{OLD_SOAPKIT_NS_URI}']")),
        }
    }
}

impl Default for SoapkitNamespace {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationStep for SoapkitNamespace {
    fn description(&self) -> &str {
        "Update APIkit namespace"
    }

    fn applied_to(&self) -> Option<&Query> {
        Some(&self.elements)
    }

    fn execute(&self, node: NodeRef, project: &mut Project, _: &mut Report) -> Result<(), MigrationError> {
        let namespace = soapkit_namespace();
        if project.bridge_namespace(node.doc, OLD_SOAPKIT_NS_URI, &namespace, SOAPKIT_SCHEMA_LOCATION)? {
            tracing::info!("Updated APIkit for SOAP namespace on document {}", node.doc);
        }
        document_mut(project, node)?.set_namespace(node.node, namespace)?;
        Ok(())
    }
}

/// SOAP router migration task
#[must_use]
pub fn soapkit_task() -> Task {
    Task::new("Migrate APIkit for SOAP", ProjectType::Mule4Application)
        .from_version(VersionPattern::major(3))
        .to_version(VersionPattern::major(4))
        .node_step(SoapkitNamespace::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_project::{BuildDescriptor, SchemaLocations};
    use mig_tree::{Document, XSI_NAMESPACE_URI};
    use pretty_assertions::assert_eq;

    fn project() -> Project {
        let xml = format!(
            r#"<mule xmlns="http://www.mulesoft.org/schema/mule/core" xmlns:apikit-soap="{OLD_SOAPKIT_NS_URI}"
                    xmlns:xsi="{XSI_NAMESPACE_URI}"
                    xsi:schemaLocation="{OLD_SOAPKIT_NS_URI} {OLD_SOAPKIT_SCHEMA_LOCATION}">
                <apikit-soap:config name="soap" wsdlLocation="orders.wsdl"/>
                <flow name="main"><apikit-soap:router config-ref="soap"/></flow>
            </mule>"#
        );
        let mut project = Project::new(
            "/tmp/soap",
            ProjectType::Mule4Application,
            BuildDescriptor::minimal("org.example", "soap", "1.0.0"),
        );
        project.add_document("src/main/mule/soap.xml", Document::parse(&xml).unwrap());
        project
    }

    #[test]
    fn bridges_once_and_moves_elements() {
        let mut project = project();
        let mut report = Report::default();
        soapkit_task().run(&mut project, &mut report).unwrap();
        soapkit_task().run(&mut project, &mut report).unwrap();

        let doc = &project.documents()[0];
        let declared: Vec<&str> = doc.declarations(doc.root()).iter().map(Namespace::uri).collect();
        assert!(!declared.contains(&OLD_SOAPKIT_NS_URI));
        assert_eq!(declared.iter().filter(|u| **u == SOAPKIT_NS_URI).count(), 1);

        let locations = SchemaLocations::of(doc);
        assert_eq!(locations.count(SOAPKIT_NS_URI), 1);
        assert!(!locations.contains(OLD_SOAPKIT_NS_URI));

        let moved = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|n| doc.namespace(*n).map(Namespace::uri) == Some(SOAPKIT_NS_URI))
            .count();
        assert_eq!(moved, 2);
        assert!(report.is_empty());
    }
}
