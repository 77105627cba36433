//! Route resolution against an API contract's resource tree
//!
//! A route identifier reads `verb:normalizedPath[:mime]`, e.g.
//! `get:\orders\(id)` or `post:\orders:application\json`. Normalization maps
//! `/` to `\`, brackets and braces to parentheses, and `#` to `_`.

use mig_project::Resource;

/// Normalize a resource path or mime type for identifier comparison
#[must_use]
pub fn normalize_path(path: &str) -> String {
    path.chars()
        .map(|c| match c {
            '/' => '\\',
            '[' | '{' => '(',
            ']' | '}' => ')',
            '#' => '_',
            other => other,
        })
        .collect()
}

/// Identifier of a method on a resource, optionally with a body mime type
#[must_use]
pub fn route_identifier(verb: &str, full_path: &str, mime: Option<&str>) -> String {
    let mut id = format!("{verb}:{}", normalize_path(full_path));
    if let Some(mime) = mime {
        id.push(':');
        id.push_str(&mime.replace('/', "\\"));
    }
    id
}

/// Verbs compare case-insensitively, the rest exactly
fn same_route(candidate: &str, route: &str) -> bool {
    match (candidate.split_once(':'), route.split_once(':')) {
        (Some((cv, cp)), Some((rv, rp))) => cv.eq_ignore_ascii_case(rv) && cp == rp,
        _ => candidate == route,
    }
}

struct Frame<'a> {
    resource: &'a Resource,
    full_path: String,
    params: Vec<String>,
}

impl<'a> Frame<'a> {
    fn child(&self, resource: &'a Resource) -> Self {
        let mut params = self.params.clone();
        for name in &resource.uri_parameters {
            if !params.contains(name) {
                params.push(name.clone());
            }
        }
        Frame {
            resource,
            full_path: format!("{}{}", self.full_path, resource.path),
            params,
        }
    }

    fn matches(&self, route: &str) -> bool {
        self.resource.methods.iter().any(|method| {
            same_route(&route_identifier(&method.verb, &self.full_path, None), route)
                || method
                    .body_types
                    .iter()
                    .any(|mime| same_route(&route_identifier(&method.verb, &self.full_path, Some(mime)), route))
        })
    }
}

/// URI parameters of the first resource whose route equals `route`
///
/// Parameters declared on every ancestor come first, in order from the
/// contract root. Resources are visited depth-first in declaration order;
/// the first match wins. No match yields an empty list.
#[must_use]
pub fn resolve_route(resources: &[Resource], route: &str) -> Vec<String> {
    let root = Resource::default();
    let top = Frame {
        resource: &root,
        full_path: String::new(),
        params: Vec::new(),
    };
    let mut stack: Vec<Frame<'_>> = resources.iter().rev().map(|r| top.child(r)).collect();

    while let Some(frame) = stack.pop() {
        if frame.matches(route) {
            tracing::trace!("Route {} resolved at {}", route, frame.full_path);
            return frame.params;
        }
        stack.extend(frame.resource.resources.iter().rev().map(|r| frame.child(r)));
    }
    tracing::debug!("Route {} not found in contract", route);
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_project::Method;
    use pretty_assertions::assert_eq;

    fn orders() -> Vec<Resource> {
        vec![Resource::new("/orders")
            .with_method(Method::new("get"))
            .with_method(Method::new("post").with_body("application/json"))
            .with_resource(
                Resource::new("/{id}")
                    .with_param("id")
                    .with_method(Method::new("get"))
                    .with_resource(
                        Resource::new("/items/{item}")
                            .with_param("item")
                            .with_method(Method::new("delete")),
                    ),
            )]
    }

    #[test]
    fn resolves_nested_route() {
        assert_eq!(resolve_route(&orders(), r"GET:\orders\(id)"), vec!["id"]);
        assert_eq!(resolve_route(&orders(), r"get:\orders\(id)"), vec!["id"]);
    }

    #[test]
    fn unknown_route_is_empty() {
        assert!(resolve_route(&orders(), r"GET:\orders\(missing)").is_empty());
        assert!(resolve_route(&[], r"get:\orders").is_empty());
    }

    #[test]
    fn accumulates_ancestor_params() {
        assert_eq!(
            resolve_route(&orders(), r"delete:\orders\(id)\items\(item)"),
            vec!["id", "item"]
        );
    }

    #[test]
    fn matches_body_mime_type() {
        assert!(resolve_route(&orders(), r"post:\orders:application\json").is_empty());
        let tree = vec![Resource::new("/{tenant}")
            .with_param("tenant")
            .with_method(Method::new("put").with_body("application/xml"))];
        assert_eq!(resolve_route(&tree, r"put:\(tenant):application\xml"), vec!["tenant"]);
        assert!(resolve_route(&tree, r"put:\(tenant):text\plain").is_empty());
    }

    #[test]
    fn first_match_wins() {
        let tree = vec![
            Resource::new("/a").with_param("first").with_method(Method::new("get")),
            Resource::new("/a").with_param("second").with_method(Method::new("get")),
        ];
        assert_eq!(resolve_route(&tree, r"get:\a"), vec!["first"]);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_path("/a/{b}/[c]#d"), r"\a\(b)\(c)_d");
        assert_eq!(route_identifier("get", "/x", Some("application/json")), r"get:\x:application\json");
    }
}
