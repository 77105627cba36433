//! API contract model and parser seam
//!
//! The contract is a resource tree: every resource has a relative path
//! segment, declared URI parameters, methods with optional body mime types,
//! and nested resources. Parsing sits behind [`ContractParser`]; the default
//! [`YamlContractParser`] understands the subset of RAML 1.0 this model needs.

use crate::error::ContractError;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Required first line of a contract file
pub const RAML_HEADER: &str = "#%RAML 1.0";

/// Conventional contract directory, relative to the project base
pub const API_FOLDER: &str = "src/main/resources/api";

const VERBS: [&str; 9] = [
    "get", "put", "post", "delete", "patch", "head", "options", "trace", "connect",
];

/// Conventional location of a project's contract
#[must_use]
pub fn contract_location(base: &Path, artifact_id: &str) -> PathBuf {
    base.join(API_FOLDER).join(format!("{artifact_id}.raml"))
}

/// Method declared on a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Lower-case HTTP verb
    pub verb: String,
    /// Declared body mime types, e.g. `application/json`
    pub body_types: Vec<String>,
}

impl Method {
    /// Method without bodies
    #[must_use]
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            body_types: Vec::new(),
        }
    }

    /// Add a body mime type
    #[must_use]
    pub fn with_body(mut self, mime: impl Into<String>) -> Self {
        self.body_types.push(mime.into());
        self
    }
}

/// Resource node of the contract tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resource {
    /// Path segment relative to the parent, e.g. `/{id}`
    pub path: String,
    /// Declared URI parameter names
    pub uri_parameters: Vec<String>,
    /// Declared methods
    pub methods: Vec<Method>,
    /// Nested resources
    pub resources: Vec<Resource>,
}

impl Resource {
    /// Resource with a path segment and nothing else
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Declare a URI parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>) -> Self {
        self.uri_parameters.push(name.into());
        self
    }

    /// Declare a method
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Nest a resource
    #[must_use]
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }
}

/// Parsed contract
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiContract {
    /// Contract title, if declared
    pub title: Option<String>,
    /// Top-level resources
    pub resources: Vec<Resource>,
}

/// Contract parser seam
#[cfg_attr(test, mockall::automock)]
pub trait ContractParser {
    /// Parse the contract at `path`
    ///
    /// # Errors
    /// Returns error if the file is missing or not a valid contract
    fn parse(&self, path: &Path) -> Result<ApiContract, ContractError>;
}

/// YAML-based RAML 1.0 subset parser
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlContractParser;

impl ContractParser for YamlContractParser {
    fn parse(&self, path: &Path) -> Result<ApiContract, ContractError> {
        if !path.is_file() {
            return Err(ContractError::NotFound(path.to_path_buf()));
        }
        let source = std::fs::read_to_string(path).map_err(|e| ContractError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        parse_contract(path, &source)
    }
}

/// Parse contract source; `path` is only used in errors
///
/// # Errors
/// Returns error if the header is missing or the structure is invalid
pub fn parse_contract(path: &Path, source: &str) -> Result<ApiContract, ContractError> {
    let header = source.lines().next().unwrap_or_default().trim_end();
    if header != RAML_HEADER {
        return Err(ContractError::MissingHeader(path.to_path_buf()));
    }

    let invalid = |message: String| ContractError::Invalid {
        path: path.to_path_buf(),
        message,
    };

    let value: Value = serde_yaml::from_str(source).map_err(|e| invalid(e.to_string()))?;
    let root = match value {
        Value::Mapping(m) => m,
        Value::Null => Mapping::new(),
        _ => return Err(invalid("top level must be a mapping".into())),
    };

    let title = root
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string);
    let resources = parse_resources(&root).map_err(invalid)?;
    if resources.is_empty() {
        tracing::warn!("API contract {} declares no resources", path.display());
    }
    Ok(ApiContract { title, resources })
}

fn parse_resources(mapping: &Mapping) -> Result<Vec<Resource>, String> {
    let mut resources = Vec::new();
    for (key, value) in mapping {
        let Some(key) = key.as_str() else { continue };
        if !key.starts_with('/') {
            continue;
        }
        let body = match value {
            Value::Mapping(m) => m.clone(),
            Value::Null => Mapping::new(),
            _ => return Err(format!("resource '{key}' must be a mapping")),
        };
        resources.push(parse_resource(key, &body)?);
    }
    Ok(resources)
}

fn parse_resource(path: &str, body: &Mapping) -> Result<Resource, String> {
    let mut resource = Resource::new(path);

    if let Some(params) = body.get("uriParameters") {
        match params {
            Value::Mapping(m) => {
                for name in m.keys().filter_map(Value::as_str) {
                    resource.uri_parameters.push(name.trim_end_matches('?').to_string());
                }
            }
            Value::Null => {}
            _ => return Err(format!("uriParameters of '{path}' must be a mapping")),
        }
    }
    for implicit in template_params(path) {
        if !resource.uri_parameters.contains(&implicit) {
            resource.uri_parameters.push(implicit);
        }
    }

    for (key, value) in body {
        let Some(key) = key.as_str() else { continue };
        let verb = key.trim_end_matches('?').to_ascii_lowercase();
        if !VERBS.contains(&verb.as_str()) {
            continue;
        }
        let mut method = Method::new(verb);
        if let Some(Value::Mapping(decl)) = value.as_mapping().and_then(|m| m.get("body")) {
            method.body_types = decl
                .keys()
                .filter_map(Value::as_str)
                .filter(|k| k.contains('/'))
                .map(str::to_string)
                .collect();
        }
        resource.methods.push(method);
    }

    resource.resources = parse_resources(body)?;
    Ok(resource)
}

/// Names inside `{...}` in a path segment, in order of appearance
fn template_params(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else { break };
        let name = &after[..close];
        if !name.is_empty() {
            out.push(name.to_string());
        }
        rest = &after[close + 1..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONTRACT: &str = "#%RAML 1.0
title: Orders API
/orders:
  get:
  post:
    body:
      application/json:
        type: Order
  /{id}:
    uriParameters:
      id:
        type: string
    get:
    /items/{itemId}:
      delete:
";

    #[test]
    fn parses_resource_tree() {
        let contract = parse_contract(Path::new("api.raml"), CONTRACT).unwrap();
        assert_eq!(contract.title.as_deref(), Some("Orders API"));
        let orders = &contract.resources[0];
        assert_eq!(orders.path, "/orders");
        assert_eq!(
            orders.methods,
            vec![Method::new("get"), Method::new("post").with_body("application/json")]
        );

        let by_id = &orders.resources[0];
        assert_eq!(by_id.path, "/{id}");
        assert_eq!(by_id.uri_parameters, vec!["id"]);

        let items = &by_id.resources[0];
        assert_eq!(items.uri_parameters, vec!["itemId"]);
        assert_eq!(items.methods, vec![Method::new("delete")]);
    }

    #[test]
    fn header_is_required() {
        let err = parse_contract(Path::new("api.raml"), "title: x\n/orders:\n").unwrap_err();
        assert_eq!(err, ContractError::MissingHeader(PathBuf::from("api.raml")));
    }

    #[test]
    fn non_mapping_resource_is_invalid() {
        let err = parse_contract(Path::new("api.raml"), "#%RAML 1.0\n/orders: 3\n").unwrap_err();
        assert!(matches!(err, ContractError::Invalid { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.raml");
        assert_eq!(YamlContractParser.parse(&path), Err(ContractError::NotFound(path)));
    }

    #[test]
    fn conventional_location() {
        assert_eq!(
            contract_location(Path::new("/app"), "orders"),
            PathBuf::from("/app/src/main/resources/api/orders.raml")
        );
    }

    #[test]
    fn template_params_in_order() {
        assert_eq!(template_params("/{a}/x/{b}"), vec!["a", "b"]);
        assert!(template_params("/plain").is_empty());
    }
}
