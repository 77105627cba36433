//! APIkit router migration
//!
//! Router flows are named after the route they implement, e.g.
//! `get:\orders\(id):api-config`. Their URI parameters are turned into
//! flow variables by an `ee:transform` inserted as the first child.

use super::{
    doc_namespace, document_mut, ee_namespace, top_level_core_selector, CORE_NS_URI, EE_NS_URI,
    EE_SCHEMA_LOCATION,
};
use crate::error::MigrationError;
use crate::resolver::resolve_route;
use crate::step::MigrationStep;
use crate::task::Task;
use crate::version::VersionPattern;
use mig_project::{Project, ProjectType};
use mig_report::Report;
use mig_tree::{Document, NodeId, NodeRef, Query, TreeError};
use once_cell::sync::Lazy;
use regex::Regex;

/// APIkit namespace URI
pub const APIKIT_NS_URI: &str = "http://www.mulesoft.org/schema/mule/mule-apikit";

/// `doc:name` of the transform added by [`ApikitUriParams`]
pub const URI_PARAMS_TRANSFORM_NAME: &str = "URI Params to Variables";

static URI_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").expect("uri parameter pattern is valid"));

/// Content of a generated `ee:set-variable`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VariableBody {
    Text,
    CData,
}

/// Ensure a leading `ee:transform` declares one variable per parameter
///
/// An existing leading transform is extended with the missing variables only.
/// Returns the number of variables added.
fn is_ee(doc: &Document, node: NodeId, name: &str) -> bool {
    doc.name(node) == Some(name) && doc.namespace(node).map(|ns| ns.uri()) == Some(EE_NS_URI)
}

/// A transform that only declares URI parameter variables
///
/// Any other transform at the head of a flow belongs to the user and is left
/// untouched.
fn is_uri_param_transform(doc: &Document, node: NodeId) -> bool {
    if !is_ee(doc, node, "transform") {
        return false;
    }
    let children = doc.element_children(node);
    let &[variables] = children.as_slice() else {
        return false;
    };
    is_ee(doc, variables, "variables")
        && doc.element_children(variables).into_iter().all(|v| {
            is_ee(doc, v, "set-variable") && doc.text(v).trim().starts_with("attributes.uriParams.")
        })
}

fn declare_uri_param_variables(
    doc: &mut Document,
    flow: NodeId,
    params: &[String],
    doc_name: Option<&str>,
    body: VariableBody,
) -> Result<usize, TreeError> {
    let ee = ee_namespace();
    let leading = doc
        .element_children(flow)
        .into_iter()
        .next()
        .filter(|first| is_uri_param_transform(doc, *first));
    let transform = match leading {
        Some(transform) => transform,
        None => {
            let transform = doc.create_element("transform", ee.clone());
            if let Some(name) = doc_name {
                doc.set_attribute_ns(transform, "name", doc_namespace(), name)?;
            }
            doc.insert_child_at(flow, 0, transform)?;
            transform
        }
    };
    let existing = doc.child_elements_named(transform, "variables", EE_NS_URI).into_iter().next();
    let variables = match existing {
        Some(variables) => variables,
        None => {
            let variables = doc.create_element("variables", ee.clone());
            doc.append_child(transform, variables)?;
            variables
        }
    };

    let declared: Vec<String> = doc
        .child_elements_named(variables, "set-variable", EE_NS_URI)
        .into_iter()
        .filter_map(|v| doc.attribute(v, "variableName").map(str::to_string))
        .collect();

    let mut added = 0;
    for param in params.iter().filter(|p| !declared.contains(p)) {
        let variable = doc.create_element("set-variable", ee.clone());
        doc.set_attribute(variable, "variableName", param.as_str())?;
        let expression = format!("attributes.uriParams.{param}");
        match body {
            VariableBody::Text => doc.set_text(variable, expression)?,
            VariableBody::CData => doc.set_cdata(variable, expression)?,
        }
        doc.append_child(variables, variable)?;
        added += 1;
    }
    Ok(added)
}

/// Extract URI parameters of router flows from the API contract
///
/// Applies to top-level flows. When an APIkit router references a
/// configuration and the flow name ends with `:<config>`, the remaining route
/// is resolved against the contract. A contract that cannot be loaded is
/// reported on the flow and aborts the run.
#[derive(Debug)]
pub struct MigrateApiConfigFlows {
    router: Query,
}

impl MigrateApiConfigFlows {
    /// Create the step
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: Query::new(format!(
                "//*[local-name()='router' and namespace-uri()='{APIKIT_NS_URI}']"
            )),
        }
    }
}

impl Default for MigrateApiConfigFlows {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationStep for MigrateApiConfigFlows {
    fn description(&self) -> &str {
        "Migrate ApiConfig flow definitions"
    }

    fn execute(&self, node: NodeRef, project: &mut Project, report: &mut Report) -> Result<(), MigrationError> {
        let Some(router) = project.node(&self.router)? else {
            return Ok(());
        };
        let Some(config) = project.attribute(router, "config-ref").map(str::to_string) else {
            let doc = document_mut(project, router)?;
            report.report("apikit.routerWithoutConfig", doc, router.node, Some(router.node), &[] as &[&str])?;
            return Ok(());
        };

        let flow_name = project.attribute(node, "name").unwrap_or_default().to_string();
        let Some(route) = flow_name.strip_suffix(&format!(":{config}")) else {
            return Ok(());
        };

        project.add_namespace(node.doc, &ee_namespace(), EE_SCHEMA_LOCATION)?;

        let params = match project.api_contract().map(|c| resolve_route(&c.resources, route)) {
            Ok(params) => params,
            Err(e) => {
                let doc = document_mut(project, node)?;
                report.report("raml.invalid", doc, node.node, Some(node.node), &[e.to_string()])?;
                return Err(e.into());
            }
        };

        let doc = document_mut(project, node)?;
        if params.is_empty() {
            if URI_PARAM.is_match(route) {
                report.report("raml.missingParams", doc, node.node, Some(node.node), &[route])?;
            }
            return Ok(());
        }

        let added = declare_uri_param_variables(doc, node.node, &params, None, VariableBody::CData)?;
        tracing::debug!("Flow {} declares {} uri parameters ({} new)", flow_name, params.len(), added);
        Ok(())
    }
}

/// Parameters named in a flow name: every `(...)` group, in order
#[must_use]
pub fn uri_params_from_flow_name(name: &str) -> Vec<String> {
    URI_PARAM
        .find_iter(name)
        .map(|m| m.as_str().trim_start_matches('(').trim_end_matches(')').to_string())
        .collect()
}

/// Turn the `(param)` groups of every core flow name into flow variables
#[derive(Debug)]
pub struct ApikitUriParams {
    flows: Query,
}

impl ApikitUriParams {
    /// Create the step
    #[must_use]
    pub fn new() -> Self {
        Self {
            flows: Query::new(format!(
                "//*[local-name()='flow' and namespace-uri()='{CORE_NS_URI}']"
            )),
        }
    }
}

impl Default for ApikitUriParams {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationStep for ApikitUriParams {
    fn description(&self) -> &str {
        "Map URI parameters of APIkit flows to variables"
    }

    fn applied_to(&self) -> Option<&Query> {
        Some(&self.flows)
    }

    fn execute(&self, node: NodeRef, project: &mut Project, _: &mut Report) -> Result<(), MigrationError> {
        let params = uri_params_from_flow_name(project.attribute(node, "name").unwrap_or_default());
        if params.is_empty() {
            return Ok(());
        }
        project.add_namespace(node.doc, &ee_namespace(), EE_SCHEMA_LOCATION)?;
        let doc = document_mut(project, node)?;
        let root = doc.root();
        doc.declare_namespace(root, doc_namespace())?;
        declare_uri_param_variables(
            doc,
            node.node,
            &params,
            Some(URI_PARAMS_TRANSFORM_NAME),
            VariableBody::Text,
        )?;
        Ok(())
    }
}

/// Router flow migration task
#[must_use]
pub fn apikit_task() -> Task {
    Task::new("Migrate APIkit router flows", ProjectType::Mule4Application)
        .from_version(VersionPattern::major(3))
        .to_version(VersionPattern::major(4))
        .applied_to(top_level_core_selector("flow"))
        .node_step(MigrateApiConfigFlows::new())
}

/// Post-processing task mapping flow name parameters
#[must_use]
pub fn apikit_postprocess_task() -> Task {
    Task::new("Postprocess steps related to APIkit", ProjectType::Mule4Application)
        .from_version(VersionPattern::major(3))
        .to_version(VersionPattern::major(4))
        .node_step(ApikitUriParams::new())
}
