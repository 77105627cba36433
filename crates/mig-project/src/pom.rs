//! Build descriptor and dependency model
//!
//! The descriptor keeps its parsed document so that everything other than the
//! `<dependencies>` block round-trips unchanged; inside that block only the
//! nodes whose records changed in the [`DependencyModel`] are touched on
//! egress.

use crate::error::{ProjectError, ProjectLoadError};
use indexmap::IndexMap;
use mig_tree::{Document, Namespace, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default build descriptor file name
pub const BUILD_DESCRIPTOR_FILE: &str = "pom.xml";

/// Identity of a dependency record; the version is not part of it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey {
    /// Group coordinate
    pub group_id: String,
    /// Artifact coordinate
    pub artifact_id: String,
    /// Optional classifier
    pub classifier: Option<String>,
}

/// One dependency record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// Group coordinate
    pub group_id: String,
    /// Artifact coordinate
    pub artifact_id: String,
    /// Version, when pinned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Classifier, e.g. `mule-plugin`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    /// Packaging type
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Scope, e.g. `test`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Dependency {
    /// Create a record from coordinates
    #[must_use]
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: Some(version.into()),
            classifier: None,
            kind: None,
            scope: None,
        }
    }

    /// Set the classifier
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Set the scope
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Identity of this record
    #[must_use]
    pub fn key(&self) -> DependencyKey {
        DependencyKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            classifier: self.classifier.clone(),
        }
    }
}

/// Ordered dependency list, deduplicated by [`DependencyKey`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyModel {
    entries: IndexMap<DependencyKey, Dependency>,
}

impl DependencyModel {
    /// Empty model
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; returns `false` if one with the same identity exists
    pub fn add(&mut self, dependency: Dependency) -> bool {
        let key = dependency.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, dependency);
        true
    }

    /// Remove a record; a missing record is not an error
    pub fn remove(&mut self, key: &DependencyKey) -> Option<Dependency> {
        self.entries.shift_remove(key)
    }

    /// Look up a record
    #[must_use]
    pub fn get(&self, key: &DependencyKey) -> Option<&Dependency> {
        self.entries.get(key)
    }

    /// Check whether a record with this identity exists
    #[must_use]
    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.entries.values()
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parsed build descriptor
#[derive(Debug, Clone)]
pub struct BuildDescriptor {
    path: PathBuf,
    document: Document,
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    dependencies: DependencyModel,
}

fn child_text(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    doc.element_children(node)
        .into_iter()
        .find(|c| doc.name(*c) == Some(name))
        .map(|c| doc.text(c).trim().to_string())
        .filter(|t| !t.is_empty())
}

fn child_named(doc: &Document, node: NodeId, name: &str) -> Option<NodeId> {
    doc.element_children(node)
        .into_iter()
        .find(|c| doc.name(*c) == Some(name))
}

impl BuildDescriptor {
    /// Read coordinates and dependencies from a parsed descriptor
    ///
    /// `path` is recorded relative to the project base and reused on egress.
    ///
    /// # Errors
    /// Returns error if the artifact id is missing
    pub fn from_document(path: impl Into<PathBuf>, document: Document) -> Result<Self, ProjectLoadError> {
        let path = path.into();
        let root = document.root();
        let parent = child_named(&document, root, "parent");

        let artifact_id = child_text(&document, root, "artifactId").ok_or_else(|| {
            ProjectLoadError::InvalidBuildDescriptor {
                path: path.clone(),
                message: "missing artifactId".into(),
            }
        })?;
        let group_id = child_text(&document, root, "groupId")
            .or_else(|| parent.and_then(|p| child_text(&document, p, "groupId")))
            .unwrap_or_default();
        let version = child_text(&document, root, "version")
            .or_else(|| parent.and_then(|p| child_text(&document, p, "version")));

        let mut dependencies = DependencyModel::new();
        if let Some(block) = child_named(&document, root, "dependencies") {
            for node in document.element_children(block) {
                if document.name(node) != Some("dependency") {
                    continue;
                }
                let (Some(group_id), Some(artifact_id)) = (
                    child_text(&document, node, "groupId"),
                    child_text(&document, node, "artifactId"),
                ) else {
                    tracing::warn!("Skipping dependency without coordinates in {}", path.display());
                    continue;
                };
                dependencies.add(Dependency {
                    group_id,
                    artifact_id,
                    version: child_text(&document, node, "version"),
                    classifier: child_text(&document, node, "classifier"),
                    kind: child_text(&document, node, "type"),
                    scope: child_text(&document, node, "scope"),
                });
            }
        }

        Ok(Self {
            path,
            document,
            group_id,
            artifact_id,
            version,
            dependencies,
        })
    }

    /// Minimal descriptor for in-memory projects
    #[must_use]
    pub fn minimal(group_id: &str, artifact_id: &str, version: &str) -> Self {
        let ns = Namespace::new("", "http://maven.apache.org/POM/4.0.0");
        let mut document = Document::new("project", ns.clone());
        let root = document.root();
        for (name, value) in [
            ("modelVersion", "4.0.0"),
            ("groupId", group_id),
            ("artifactId", artifact_id),
            ("version", version),
        ] {
            let node = document.create_element(name, ns.clone());
            // Fresh nodes under the root cannot fail to attach
            let _ = document.set_text(node, value);
            let _ = document.append_child(root, node);
        }
        Self {
            path: PathBuf::from(BUILD_DESCRIPTOR_FILE),
            document,
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: Some(version.into()),
            dependencies: DependencyModel::new(),
        }
    }

    /// Path relative to the project base
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Group coordinate
    #[inline]
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Artifact coordinate; doubles as the project name
    #[inline]
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Project version
    #[inline]
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Dependency model
    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &DependencyModel {
        &self.dependencies
    }

    /// Mutable dependency model
    #[inline]
    pub fn dependencies_mut(&mut self) -> &mut DependencyModel {
        &mut self.dependencies
    }

    /// Serialize with the dependency block synchronized to the model
    ///
    /// Existing `<dependency>` nodes whose identity is still modeled are kept
    /// as written, with only their version brought in line. Nodes for removed
    /// records are detached and new records are appended. Nodes without
    /// coordinates, comments and other children are left alone.
    ///
    /// # Errors
    /// Returns error if the tree cannot be rewritten or written
    pub fn render(&self) -> Result<String, ProjectError> {
        let mut doc = self.document.clone();
        let root = doc.root();
        let ns = doc.namespace(root).cloned().unwrap_or_default();

        let block = match child_named(&doc, root, "dependencies") {
            Some(block) => block,
            None => {
                let block = doc.create_element("dependencies", ns.clone());
                doc.append_child(root, block)?;
                block
            }
        };

        let mut written = HashSet::new();
        for node in doc.element_children(block) {
            if doc.name(node) != Some("dependency") {
                continue;
            }
            let Some(key) = dependency_key(&doc, node) else {
                continue;
            };
            let Some(dependency) = self.dependencies.get(&key) else {
                doc.remove_content(node)?;
                continue;
            };
            if written.insert(key) {
                sync_version(&mut doc, node, dependency, &ns)?;
            }
        }

        for dependency in self.dependencies.iter() {
            if written.contains(&dependency.key()) {
                continue;
            }
            let node = doc.create_element("dependency", ns.clone());
            let fields = [
                ("groupId", Some(dependency.group_id.as_str())),
                ("artifactId", Some(dependency.artifact_id.as_str())),
                ("version", dependency.version.as_deref()),
                ("classifier", dependency.classifier.as_deref()),
                ("type", dependency.kind.as_deref()),
                ("scope", dependency.scope.as_deref()),
            ];
            for (name, value) in fields {
                if let Some(value) = value {
                    let field = doc.create_element(name, ns.clone());
                    doc.set_text(field, value)?;
                    doc.append_child(node, field)?;
                }
            }
            doc.append_child(block, node)?;
        }

        Ok(doc.to_xml_string()?)
    }
}

fn dependency_key(doc: &Document, node: NodeId) -> Option<DependencyKey> {
    Some(DependencyKey {
        group_id: child_text(doc, node, "groupId")?,
        artifact_id: child_text(doc, node, "artifactId")?,
        classifier: child_text(doc, node, "classifier"),
    })
}

fn sync_version(doc: &mut Document, node: NodeId, dependency: &Dependency, ns: &Namespace) -> Result<(), ProjectError> {
    if child_text(doc, node, "version") == dependency.version {
        return Ok(());
    }
    match (child_named(doc, node, "version"), dependency.version.as_deref()) {
        (Some(field), Some(version)) => doc.set_text(field, version)?,
        (Some(field), None) => doc.remove_content(field)?,
        (None, Some(version)) => {
            let field = doc.create_element("version", ns.clone());
            doc.set_text(field, version)?;
            let artifact = child_named(doc, node, "artifactId");
            let at = doc
                .children(node)
                .iter()
                .position(|c| Some(*c) == artifact)
                .map_or(0, |i| i + 1);
            doc.insert_child_at(node, at, field)?;
        }
        (None, None) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const POM: &str = r#"<project xmlns="http://maven.apache.org/POM/4.0.0">
        <modelVersion>4.0.0</modelVersion>
        <parent><groupId>com.acme</groupId><version>2.0.0</version></parent>
        <artifactId>orders-api</artifactId>
        <dependencies>
            <dependency>
                <groupId>org.mule.connectors</groupId>
                <artifactId>mule-http-connector</artifactId>
                <version>1.5.0</version>
                <classifier>mule-plugin</classifier>
            </dependency>
            <dependency>
                <groupId>org.mule.connectors</groupId>
                <artifactId>mule-http-connector</artifactId>
                <version>1.6.0</version>
                <classifier>mule-plugin</classifier>
            </dependency>
        </dependencies>
    </project>"#;

    fn descriptor() -> BuildDescriptor {
        BuildDescriptor::from_document("pom.xml", Document::parse(POM).unwrap()).unwrap()
    }

    #[test]
    fn coordinates_fall_back_to_parent() {
        let pom = descriptor();
        assert_eq!(pom.artifact_id(), "orders-api");
        assert_eq!(pom.group_id(), "com.acme");
        assert_eq!(pom.version(), Some("2.0.0"));
    }

    #[test]
    fn duplicate_identity_is_dropped() {
        let pom = descriptor();
        assert_eq!(pom.dependencies().len(), 1);
        let first = pom.dependencies().iter().next().unwrap();
        assert_eq!(first.version.as_deref(), Some("1.5.0"));
    }

    #[test]
    fn add_and_remove_by_identity() {
        let mut model = DependencyModel::new();
        let dep = Dependency::new("com.mulesoft", "apikit", "1.3.0").with_classifier("mule-plugin");
        assert!(model.add(dep.clone()));
        assert!(!model.add(Dependency { version: Some("9.9".into()), ..dep.clone() }));
        // Different classifier is a different identity
        assert!(model.add(Dependency::new("com.mulesoft", "apikit", "1.3.0")));
        assert_eq!(model.len(), 2);
        assert!(model.remove(&dep.key()).is_some());
        assert!(model.remove(&dep.key()).is_none());
    }

    #[test]
    fn render_appends_new_records() {
        let mut pom = descriptor();
        pom.dependencies_mut()
            .add(Dependency::new("org.mule.modules", "mule-apikit-module", "1.3.0").with_classifier("mule-plugin"));
        let xml = pom.render().unwrap();
        let reparsed = BuildDescriptor::from_document("pom.xml", Document::parse(&xml).unwrap()).unwrap();
        let artifacts: Vec<_> = reparsed.dependencies().iter().map(|d| d.artifact_id.as_str()).collect();
        assert_eq!(artifacts, vec!["mule-http-connector", "mule-apikit-module"]);
        assert_eq!(xml.matches("<dependencies>").count(), 1);
    }

    #[test]
    fn render_keeps_untouched_dependency_nodes() {
        let xml = r#"<project xmlns="http://maven.apache.org/POM/4.0.0">
            <artifactId>orders-api</artifactId>
            <dependencies>
                <!-- pinned by the platform team -->
                <dependency>
                    <groupId>org.mule.connectors</groupId>
                    <artifactId>mule-http-connector</artifactId>
                    <version>1.5.0</version>
                    <optional>true</optional>
                    <exclusions>
                        <exclusion>
                            <groupId>commons-io</groupId>
                            <artifactId>commons-io</artifactId>
                        </exclusion>
                    </exclusions>
                </dependency>
                <dependency>
                    <artifactId>coordinate-less</artifactId>
                </dependency>
                <dependency>
                    <groupId>org.mule.modules</groupId>
                    <artifactId>mule-legacy-module</artifactId>
                    <version>0.1.0</version>
                </dependency>
            </dependencies>
        </project>"#;
        let mut pom = BuildDescriptor::from_document("pom.xml", Document::parse(xml).unwrap()).unwrap();
        let legacy = Dependency::new("org.mule.modules", "mule-legacy-module", "0.1.0");
        pom.dependencies_mut().remove(&legacy.key());
        pom.dependencies_mut()
            .add(Dependency::new("org.mule.modules", "mule-apikit-module", "1.3.0").with_classifier("mule-plugin"));

        let rendered = pom.render().unwrap();
        assert!(rendered.contains("<!-- pinned by the platform team -->"), "{rendered}");
        assert!(rendered.contains("<optional>true</optional>"), "{rendered}");
        assert!(rendered.contains("<artifactId>commons-io</artifactId>"), "{rendered}");
        assert!(rendered.contains("<artifactId>coordinate-less</artifactId>"), "{rendered}");
        assert!(!rendered.contains("mule-legacy-module"), "{rendered}");

        let doc = Document::parse(&rendered).unwrap();
        let block = child_named(&doc, doc.root(), "dependencies").unwrap();
        let artifacts: Vec<_> = doc
            .element_children(block)
            .into_iter()
            .filter_map(|n| child_text(&doc, n, "artifactId"))
            .collect();
        assert_eq!(artifacts, vec!["mule-http-connector", "coordinate-less", "mule-apikit-module"]);

        // Rendering again from the rendered text is stable
        let again = BuildDescriptor::from_document("pom.xml", doc).unwrap().render().unwrap();
        assert_eq!(again, rendered);
    }

    #[test]
    fn render_updates_version_of_kept_node() {
        let mut pom = descriptor();
        let http = Dependency::new("org.mule.connectors", "mule-http-connector", "1.7.0").with_classifier("mule-plugin");
        pom.dependencies_mut().remove(&http.key());
        pom.dependencies_mut().add(http);
        let rendered = pom.render().unwrap();
        assert!(rendered.contains("<version>1.7.0</version>"), "{rendered}");
        assert!(!rendered.contains("<version>1.5.0</version>"), "{rendered}");
        // The second, duplicate node was never modeled and stays as written
        assert!(rendered.contains("<version>1.6.0</version>"), "{rendered}");
    }

    #[test]
    fn missing_artifact_id_is_rejected() {
        let doc = Document::parse("<project><groupId>g</groupId></project>").unwrap();
        let err = BuildDescriptor::from_document("pom.xml", doc).unwrap_err();
        assert!(matches!(err, ProjectLoadError::InvalidBuildDescriptor { .. }));
    }

    #[test]
    fn minimal_descriptor_renders_block() {
        let mut pom = BuildDescriptor::minimal("com.acme", "app", "1.0.0");
        pom.dependencies_mut().add(Dependency::new("g", "a", "1"));
        let xml = pom.render().unwrap();
        assert!(xml.contains("<artifactId>app</artifactId>"));
        assert!(xml.contains("<dependency>"));
    }
}
