//! Generic per-element rewrites
//!
//! Each step rewrites the matched element in place. Steps that find nothing
//! to do leave the element untouched.

use super::document_mut;
use crate::error::MigrationError;
use crate::step::{MigrationStep, ProjectStep};
use mig_project::{Dependency, Project};
use mig_report::Report;
use mig_tree::{Namespace, NodeRef};

/// Set an attribute, replacing any existing value
#[derive(Debug, Clone)]
pub struct AddAttribute {
    name: String,
    value: String,
    description: String,
}

impl AddAttribute {
    /// Step setting `name="value"`
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Add attribute {name}"),
            name,
            value: value.into(),
        }
    }
}

impl MigrationStep for AddAttribute {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, node: NodeRef, project: &mut Project, _: &mut Report) -> Result<(), MigrationError> {
        document_mut(project, node)?.set_attribute(node.node, &self.name, self.value.as_str())?;
        Ok(())
    }
}

/// Rename the element, keeping its namespace
#[derive(Debug, Clone)]
pub struct RenameElement {
    name: String,
    description: String,
}

impl RenameElement {
    /// Step renaming to `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Rename element to {name}"),
            name,
        }
    }
}

impl MigrationStep for RenameElement {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, node: NodeRef, project: &mut Project, _: &mut Report) -> Result<(), MigrationError> {
        document_mut(project, node)?.set_name(node.node, self.name.as_str())?;
        Ok(())
    }
}

/// Rename an unqualified attribute, keeping its value
#[derive(Debug, Clone)]
pub struct RenameAttribute {
    from: String,
    to: String,
    description: String,
}

impl RenameAttribute {
    /// Step renaming `from` to `to`
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        let (from, to) = (from.into(), to.into());
        Self {
            description: format!("Rename attribute {from} to {to}"),
            from,
            to,
        }
    }
}

impl MigrationStep for RenameAttribute {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, node: NodeRef, project: &mut Project, _: &mut Report) -> Result<(), MigrationError> {
        let doc = document_mut(project, node)?;
        if let Some(value) = doc.remove_attribute(node.node, &self.from)? {
            doc.set_attribute(node.node, &self.to, value)?;
        }
        Ok(())
    }
}

/// Move the element into another namespace
///
/// The namespace is registered on the document root first.
#[derive(Debug, Clone)]
pub struct SetElementNamespace {
    namespace: Namespace,
    schema_location: String,
    description: String,
}

impl SetElementNamespace {
    /// Step moving elements into `namespace`
    #[must_use]
    pub fn new(namespace: Namespace, schema_location: impl Into<String>) -> Self {
        Self {
            description: format!("Set element namespace to {}", namespace.uri()),
            namespace,
            schema_location: schema_location.into(),
        }
    }
}

impl MigrationStep for SetElementNamespace {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, node: NodeRef, project: &mut Project, _: &mut Report) -> Result<(), MigrationError> {
        project.add_namespace(node.doc, &self.namespace, &self.schema_location)?;
        document_mut(project, node)?.set_namespace(node.node, self.namespace.clone())?;
        Ok(())
    }
}

/// Replace every occurrence of a substring in the element's local name
#[derive(Debug, Clone)]
pub struct ReplaceInElementName {
    pattern: String,
    replacement: String,
    description: String,
}

impl ReplaceInElementName {
    /// Step replacing `pattern` with `replacement`
    #[must_use]
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        let (pattern, replacement) = (pattern.into(), replacement.into());
        Self {
            description: format!("Replace '{pattern}' in element names"),
            pattern,
            replacement,
        }
    }
}

impl MigrationStep for ReplaceInElementName {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, node: NodeRef, project: &mut Project, _: &mut Report) -> Result<(), MigrationError> {
        let doc = document_mut(project, node)?;
        let Some(name) = doc.name(node.node) else {
            return Ok(());
        };
        if self.pattern.is_empty() || !name.contains(self.pattern.as_str()) {
            return Ok(());
        }
        let renamed = name.replace(self.pattern.as_str(), &self.replacement);
        doc.set_name(node.node, renamed)?;
        Ok(())
    }
}

/// Move an attribute onto a (possibly new) child element of the same namespace
#[derive(Debug, Clone)]
pub struct MoveAttributeToChild {
    attribute: String,
    child: String,
    description: String,
}

impl MoveAttributeToChild {
    /// Step moving `attribute` onto child `child`
    #[must_use]
    pub fn new(attribute: impl Into<String>, child: impl Into<String>) -> Self {
        let (attribute, child) = (attribute.into(), child.into());
        Self {
            description: format!("Move attribute {attribute} to child {child}"),
            attribute,
            child,
        }
    }
}

impl MigrationStep for MoveAttributeToChild {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, node: NodeRef, project: &mut Project, _: &mut Report) -> Result<(), MigrationError> {
        let doc = document_mut(project, node)?;
        let Some(value) = doc.remove_attribute(node.node, &self.attribute)? else {
            return Ok(());
        };
        let namespace = doc.namespace(node.node).cloned().unwrap_or_default();
        let existing = doc
            .element_children(node.node)
            .into_iter()
            .find(|c| doc.name(*c) == Some(self.child.as_str()) && doc.namespace(*c) == Some(&namespace));
        let child = match existing {
            Some(child) => child,
            None => {
                let child = doc.create_element(self.child.as_str(), namespace);
                doc.append_child(node.node, child)?;
                child
            }
        };
        doc.set_attribute(child, &self.attribute, value)?;
        Ok(())
    }
}

/// Report the element through a catalog entry and leave it untouched
///
/// The element's local name and namespace URI are the template parameters.
#[derive(Debug, Clone)]
pub struct ReportElement {
    key: String,
    description: String,
}

impl ReportElement {
    /// Step reporting catalog entry `key`
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            description: format!("Report {key}"),
            key,
        }
    }
}

impl MigrationStep for ReportElement {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, node: NodeRef, project: &mut Project, report: &mut Report) -> Result<(), MigrationError> {
        let doc = document_mut(project, node)?;
        let name = doc.name(node.node).unwrap_or_default().to_string();
        let uri = doc.namespace(node.node).map(|ns| ns.uri().to_string()).unwrap_or_default();
        report.report(&self.key, doc, node.node, Some(node.node), &[name, uri])?;
        Ok(())
    }
}

/// Add a dependency to the build descriptor
#[derive(Debug, Clone)]
pub struct AddDependency {
    dependency: Dependency,
    description: String,
}

impl AddDependency {
    /// Step adding `dependency`
    #[must_use]
    pub fn new(dependency: Dependency) -> Self {
        Self {
            description: format!("Add dependency {}:{}", dependency.group_id, dependency.artifact_id),
            dependency,
        }
    }
}

impl ProjectStep for AddDependency {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, project: &mut Project, _: &mut Report) -> Result<(), MigrationError> {
        if project
            .build_descriptor_mut()
            .dependencies_mut()
            .add(self.dependency.clone())
        {
            tracing::info!("Added dependency {}:{}", self.dependency.group_id, self.dependency.artifact_id);
        }
        Ok(())
    }
}
