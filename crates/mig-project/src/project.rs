//! Project model
//!
//! A [`Project`] owns every configuration [`Document`], the build descriptor
//! and the namespace registry. Documents are addressed by [`DocId`], which is
//! their index in scan order; cross-document lookups return [`NodeRef`]s.

use crate::contract::{contract_location, ApiContract, ContractParser, YamlContractParser};
use crate::error::{ContractError, ProjectError, ProjectLoadError};
use crate::namespaces::{declare_on_root, undeclare_on_root, NamespaceRegistry};
use crate::pom::{BuildDescriptor, BUILD_DESCRIPTOR_FILE};
use crate::project_type::ProjectType;
use mig_tree::{DocId, Document, Namespace, NodeRef, Query, QuerySyntaxError};
use once_cell::unsync::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Loaded project
pub struct Project {
    base_path: PathBuf,
    project_type: ProjectType,
    documents: Vec<Document>,
    build: BuildDescriptor,
    namespaces: NamespaceRegistry,
    parser: Box<dyn ContractParser>,
    contract: OnceCell<Result<ApiContract, ContractError>>,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("base_path", &self.base_path)
            .field("project_type", &self.project_type)
            .field("documents", &self.documents.len())
            .field("artifact_id", &self.build.artifact_id())
            .finish_non_exhaustive()
    }
}

impl Project {
    /// Empty project around an existing build descriptor
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>, project_type: ProjectType, build: BuildDescriptor) -> Self {
        Self {
            base_path: base_path.into(),
            project_type,
            documents: Vec::new(),
            build,
            namespaces: NamespaceRegistry::default(),
            parser: Box::new(YamlContractParser),
            contract: OnceCell::new(),
        }
    }

    /// Start a builder that scans `base_path`
    #[must_use]
    pub fn builder(base_path: impl Into<PathBuf>, project_type: ProjectType) -> ProjectBuilder {
        ProjectBuilder::new(base_path, project_type)
    }

    /// Replace the contract parser; any memoized contract is dropped
    pub fn set_contract_parser(&mut self, parser: Box<dyn ContractParser>) {
        self.parser = parser;
        self.contract = OnceCell::new();
    }

    /// Base path
    #[inline]
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Project type
    #[inline]
    #[must_use]
    pub fn project_type(&self) -> ProjectType {
        self.project_type
    }

    /// Project name (the artifact id)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.build.artifact_id()
    }

    /// Build descriptor
    #[inline]
    #[must_use]
    pub fn build_descriptor(&self) -> &BuildDescriptor {
        &self.build
    }

    /// Mutable build descriptor
    #[inline]
    pub fn build_descriptor_mut(&mut self) -> &mut BuildDescriptor {
        &mut self.build
    }

    /// Namespace registry
    #[inline]
    #[must_use]
    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Add a document; it is assigned the next [`DocId`]
    pub fn add_document(&mut self, path: impl Into<PathBuf>, mut document: Document) -> DocId {
        let id = DocId(self.documents.len());
        document.set_id(id);
        document.set_path(path);
        self.documents.push(document);
        id
    }

    /// Documents in scan order
    #[inline]
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Document ids in scan order
    pub fn document_ids(&self) -> impl Iterator<Item = DocId> {
        (0..self.documents.len()).map(DocId)
    }

    /// Look up a document
    #[must_use]
    pub fn document(&self, id: DocId) -> Option<&Document> {
        self.documents.get(id.0)
    }

    /// Look up a document for mutation
    pub fn document_mut(&mut self, id: DocId) -> Option<&mut Document> {
        self.documents.get_mut(id.0)
    }

    fn require_mut(&mut self, id: DocId) -> Result<&mut Document, ProjectError> {
        self.documents.get_mut(id.0).ok_or(ProjectError::UnknownDocument(id))
    }

    /// Attached elements across all documents
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.documents.iter().map(Document::element_count).sum()
    }

    /// Change a document's relative path; returns the old one
    ///
    /// # Errors
    /// Returns error for unknown ids
    pub fn relocate(&mut self, id: DocId, path: impl Into<PathBuf>) -> Result<Option<PathBuf>, ProjectError> {
        let doc = self.require_mut(id)?;
        let old = doc.path().map(Path::to_path_buf);
        doc.set_path(path);
        Ok(old)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Evaluate a query against every document, in project order
    ///
    /// # Errors
    /// Returns error if the query is malformed
    pub fn nodes(&self, query: &Query) -> Result<Vec<NodeRef>, QuerySyntaxError> {
        let mut out = Vec::new();
        for doc in &self.documents {
            out.extend(
                query
                    .select(doc, doc.root())?
                    .into_iter()
                    .map(|node| doc.node_ref(node)),
            );
        }
        Ok(out)
    }

    /// First match of a query across the project
    ///
    /// # Errors
    /// Returns error if the query is malformed
    pub fn node(&self, query: &Query) -> Result<Option<NodeRef>, QuerySyntaxError> {
        for doc in &self.documents {
            if let Some(node) = query.select(doc, doc.root())?.into_iter().next() {
                return Ok(Some(doc.node_ref(node)));
            }
        }
        Ok(None)
    }

    /// Top-level element whose `name` attribute equals `name`
    #[must_use]
    pub fn find_top_level_by_name(&self, name: &str) -> Option<NodeRef> {
        self.documents.iter().find_map(|doc| {
            doc.element_children(doc.root())
                .into_iter()
                .find(|n| doc.attribute(*n, "name") == Some(name))
                .map(|n| doc.node_ref(n))
        })
    }

    /// Value of an unqualified attribute on a referenced node
    #[must_use]
    pub fn attribute(&self, node: NodeRef, name: &str) -> Option<&str> {
        self.document(node.doc)?.attribute(node.node, name)
    }

    // ------------------------------------------------------------------
    // Namespaces
    // ------------------------------------------------------------------

    /// Register `ns` on a document root, with its schema location
    ///
    /// Idempotent per `(document, uri)`: once registered, the root is not
    /// inspected again. Returns whether anything changed.
    ///
    /// # Errors
    /// Returns error for unknown documents
    pub fn add_namespace(&mut self, doc: DocId, ns: &Namespace, schema_location: &str) -> Result<bool, ProjectError> {
        if self.namespaces.is_registered(doc, ns.uri()) {
            return Ok(false);
        }
        let document = self.require_mut(doc)?;
        let changed = declare_on_root(document, ns, schema_location)?;
        self.namespaces.mark_registered(doc, ns.uri());
        if changed {
            tracing::debug!("Registered namespace {} on {}", ns, doc);
        }
        Ok(changed)
    }

    /// Remove a namespace registration; a missing one is a no-op
    ///
    /// # Errors
    /// Returns error for unknown documents
    pub fn remove_namespace(&mut self, doc: DocId, uri: &str) -> Result<bool, ProjectError> {
        let document = self.require_mut(doc)?;
        let changed = undeclare_on_root(document, uri)?;
        self.namespaces.unmark_registered(doc, uri);
        Ok(changed)
    }

    /// Replace `from` with `to` on a document, once
    ///
    /// Returns `false` when the bridge into `to` already ran on this document.
    ///
    /// # Errors
    /// Returns error for unknown documents
    pub fn bridge_namespace(
        &mut self,
        doc: DocId,
        from: &str,
        to: &Namespace,
        to_location: &str,
    ) -> Result<bool, ProjectError> {
        if self.namespaces.is_bridged(doc, to.uri()) {
            return Ok(false);
        }
        self.remove_namespace(doc, from)?;
        self.add_namespace(doc, to, to_location)?;
        self.namespaces.mark_bridged(doc, to.uri());
        tracing::debug!("Bridged namespace {} to {} on {}", from, to.uri(), doc);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // API contract
    // ------------------------------------------------------------------

    /// Conventional contract path for this project
    #[must_use]
    pub fn contract_path(&self) -> PathBuf {
        contract_location(&self.base_path, self.build.artifact_id())
    }

    /// The project's API contract, parsed at most once per run
    ///
    /// # Errors
    /// Returns the (memoized) parse failure
    pub fn api_contract(&self) -> Result<&ApiContract, ContractError> {
        self.contract
            .get_or_init(|| {
                let path = self.contract_path();
                tracing::info!("Loading API contract {}", path.display());
                self.parser.parse(&path)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    // ------------------------------------------------------------------
    // Egress
    // ------------------------------------------------------------------

    /// Write every document and the build descriptor under `destination`
    ///
    /// # Errors
    /// Returns error if serialization or any write fails
    pub fn write_to(&self, destination: &Path) -> Result<(), ProjectError> {
        for doc in &self.documents {
            let relative = doc.path().ok_or(ProjectError::Unnamed(doc.id()))?;
            write_file(&destination.join(relative), &doc.to_xml_string()?)?;
        }
        write_file(&destination.join(self.build.path()), &self.build.render()?)?;
        tracing::info!(
            "Wrote {} documents to {}",
            self.documents.len(),
            destination.display()
        );
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ProjectError> {
    let io = |source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(path, contents).map_err(io)
}

/// Scans a directory into a [`Project`]
pub struct ProjectBuilder {
    base_path: PathBuf,
    project_type: ProjectType,
    build_descriptor: Option<PathBuf>,
    parser: Option<Box<dyn ContractParser>>,
}

impl ProjectBuilder {
    /// Builder for `base_path`
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>, project_type: ProjectType) -> Self {
        Self {
            base_path: base_path.into(),
            project_type,
            build_descriptor: None,
            parser: None,
        }
    }

    /// Use a build descriptor other than `<base>/pom.xml`
    #[must_use]
    pub fn build_descriptor(mut self, path: impl Into<PathBuf>) -> Self {
        self.build_descriptor = Some(path.into());
        self
    }

    /// Use a custom contract parser
    #[must_use]
    pub fn contract_parser(mut self, parser: Box<dyn ContractParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Scan and parse
    ///
    /// # Errors
    /// - `ProjectLoadError::MissingBaseDirectory` if the base is not a directory
    /// - `ProjectLoadError::MissingBuildDescriptor` if no descriptor exists
    /// - `ProjectLoadError::Io` / `ProjectLoadError::Parse` for unreadable files
    pub fn build(self) -> Result<Project, ProjectLoadError> {
        if !self.base_path.is_dir() {
            return Err(ProjectLoadError::MissingBaseDirectory(self.base_path));
        }

        let descriptor_path = self
            .build_descriptor
            .unwrap_or_else(|| self.base_path.join(BUILD_DESCRIPTOR_FILE));
        if !descriptor_path.is_file() {
            return Err(ProjectLoadError::MissingBuildDescriptor(descriptor_path));
        }
        let relative_descriptor = descriptor_path
            .strip_prefix(&self.base_path)
            .map_or_else(|_| PathBuf::from(BUILD_DESCRIPTOR_FILE), Path::to_path_buf);
        let build = BuildDescriptor::from_document(relative_descriptor, parse_file(&descriptor_path)?)?;

        let mut project = Project::new(&self.base_path, self.project_type, build);
        if let Some(parser) = self.parser {
            project.parser = parser;
        }

        for relative in scan_config_files(&self.base_path, self.project_type)? {
            let document = parse_file(&self.base_path.join(&relative))?;
            tracing::debug!("Loaded {}", relative.display());
            project.add_document(relative, document);
        }

        tracing::info!(
            "Loaded project '{}' ({}) with {} configuration files",
            project.name(),
            project.project_type,
            project.documents.len()
        );
        Ok(project)
    }
}

fn parse_file(path: &Path) -> Result<Document, ProjectLoadError> {
    let source = std::fs::read_to_string(path).map_err(|source| ProjectLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Document::parse(&source).map_err(|source| ProjectLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration files of a project, relative to the base, sorted
fn scan_config_files(base: &Path, project_type: ProjectType) -> Result<Vec<PathBuf>, ProjectLoadError> {
    let mut files = Vec::new();
    for dir in project_type.config_dirs() {
        let root = base.join(dir);
        if !root.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&root) {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|e| e == "xml") {
                if let Ok(relative) = path.strip_prefix(base) {
                    files.push(relative.to_path_buf());
                }
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockContractParser, Resource};
    use mig_tree::XSI_NAMESPACE_URI;
    use pretty_assertions::assert_eq;
    use std::fs;

    const POM: &str = r#"<project xmlns="http://maven.apache.org/POM/4.0.0">
    <groupId>com.acme</groupId><artifactId>orders</artifactId><version>1.0.0</version>
</project>"#;

    fn write(base: &Path, relative: &str, contents: &str) {
        let path = base.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "pom.xml", POM);
        write(
            dir.path(),
            "src/main/mule/b.xml",
            r#"<mule xmlns="urn:core"><flow name="second"/></mule>"#,
        );
        write(
            dir.path(),
            "src/main/mule/a.xml",
            r#"<mule xmlns="urn:core"><flow name="first"/><sub-flow name="shared"/></mule>"#,
        );
        write(dir.path(), "src/main/mule/notes.txt", "ignored");
        write(
            dir.path(),
            "src/test/munit/a-test.xml",
            r#"<mule xmlns="urn:core" xmlns:munit="urn:munit"><munit:test name="t"/></mule>"#,
        );
        dir
    }

    #[test]
    fn scan_is_sorted_and_filtered() {
        let dir = fixture();
        let project = Project::builder(dir.path(), ProjectType::Mule4Application).build().unwrap();
        let paths: Vec<_> = project
            .documents()
            .iter()
            .map(|d| d.path().unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            paths,
            vec!["src/main/mule/a.xml", "src/main/mule/b.xml", "src/test/munit/a-test.xml"]
        );
        assert_eq!(project.name(), "orders");
        assert_eq!(project.documents()[2].id(), DocId(2));
    }

    #[test]
    fn missing_build_descriptor_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Project::builder(dir.path(), ProjectType::Mule4Application).build().unwrap_err();
        assert!(matches!(err, ProjectLoadError::MissingBuildDescriptor(_)));
    }

    #[test]
    fn unparsable_file_names_the_path() {
        let dir = fixture();
        write(dir.path(), "src/main/mule/broken.xml", "<mule><flow></mule>");
        let err = Project::builder(dir.path(), ProjectType::Mule4Application).build().unwrap_err();
        assert!(err.to_string().contains("broken.xml"));
    }

    #[test]
    fn queries_span_documents() {
        let dir = fixture();
        let project = Project::builder(dir.path(), ProjectType::Mule4Application).build().unwrap();
        let flows = project.nodes(&Query::new("/*/flow")).unwrap();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[1].doc, DocId(1));

        let first = project.node(&Query::new("//flow")).unwrap().unwrap();
        assert_eq!(project.attribute(first, "name"), Some("first"));
        assert_eq!(project.node(&Query::new("//nothing")).unwrap(), None);

        let shared = project.find_top_level_by_name("second").unwrap();
        assert_eq!(shared.doc, DocId(1));
        assert!(project.find_top_level_by_name("missing").is_none());
    }

    #[test]
    fn namespace_registration_is_idempotent() {
        let mut project = Project::new("/app", ProjectType::Mule4Application, BuildDescriptor::minimal("g", "a", "1"));
        let doc = project.add_document("app.xml", Document::parse(r#"<mule xmlns="urn:core"/>"#).unwrap());
        let ee = Namespace::new("ee", "urn:ee");
        assert!(project.add_namespace(doc, &ee, "urn:ee/ee.xsd").unwrap());
        assert!(!project.add_namespace(doc, &ee, "urn:ee/ee.xsd").unwrap());
        assert!(project.namespaces().is_registered(doc, "urn:ee"));

        let root = project.document(doc).unwrap().root();
        let location = project.document(doc).unwrap().attribute_ns(root, "schemaLocation", XSI_NAMESPACE_URI);
        assert_eq!(location, Some("urn:ee urn:ee/ee.xsd"));

        assert!(project.remove_namespace(doc, "urn:ee").unwrap());
        assert!(!project.remove_namespace(doc, "urn:never").unwrap());
    }

    #[test]
    fn registered_namespace_is_not_redeclared() {
        let mut project = Project::new("/app", ProjectType::Mule4Application, BuildDescriptor::minimal("g", "a", "1"));
        let doc = project.add_document("app.xml", Document::parse(r#"<mule xmlns="urn:core"/>"#).unwrap());
        let ee = Namespace::new("ee", "urn:ee");
        assert!(project.add_namespace(doc, &ee, "urn:ee/ee.xsd").unwrap());

        let document = project.document_mut(doc).unwrap();
        let root = document.root();
        assert!(document.remove_declaration(root, "urn:ee").unwrap());

        assert!(!project.add_namespace(doc, &ee, "urn:ee/ee.xsd").unwrap());
        assert_eq!(project.document(doc).unwrap().root_prefix_uri("ee"), None);
    }

    #[test]
    fn bridge_runs_once_per_document() {
        let mut project = Project::new("/app", ProjectType::Mule4Application, BuildDescriptor::minimal("g", "a", "1"));
        let doc = project.add_document(
            "app.xml",
            Document::parse(r#"<mule xmlns="urn:core" xmlns:soap="urn:old"><soap:config/></mule>"#).unwrap(),
        );
        let new = Namespace::new("soap", "urn:new");
        assert!(project.bridge_namespace(doc, "urn:old", &new, "urn:new/s.xsd").unwrap());
        assert!(!project.bridge_namespace(doc, "urn:old", &new, "urn:new/s.xsd").unwrap());
        let document = project.document(doc).unwrap();
        assert_eq!(document.root_prefix_uri("soap"), Some("urn:new"));
        let locations = crate::namespaces::SchemaLocations::of(document);
        assert_eq!(locations.count("urn:new"), 1);
        assert_eq!(locations.count("urn:old"), 0);
    }

    #[test]
    fn contract_is_parsed_once() {
        let mut parser = MockContractParser::new();
        parser
            .expect_parse()
            .times(1)
            .returning(|_| Ok(ApiContract {
                title: None,
                resources: vec![Resource::new("/orders")],
            }));
        let mut project = Project::new("/app", ProjectType::Mule4Application, BuildDescriptor::minimal("g", "orders", "1"));
        project.set_contract_parser(Box::new(parser));
        assert_eq!(project.api_contract().unwrap().resources.len(), 1);
        assert_eq!(project.api_contract().unwrap().resources[0].path, "/orders");
    }

    #[test]
    fn contract_failure_is_memoized() {
        let mut parser = MockContractParser::new();
        parser
            .expect_parse()
            .times(1)
            .returning(|p| Err(ContractError::NotFound(p.to_path_buf())));
        let mut project = Project::new("/app", ProjectType::Mule4Application, BuildDescriptor::minimal("g", "orders", "1"));
        project.set_contract_parser(Box::new(parser));
        assert!(project.api_contract().is_err());
        let err = project.api_contract().unwrap_err();
        assert!(err.to_string().contains("orders.raml"));
    }

    #[test]
    fn write_to_mirrors_layout() {
        let dir = fixture();
        let project = Project::builder(dir.path(), ProjectType::Mule4Application).build().unwrap();
        let out = tempfile::tempdir().unwrap();
        project.write_to(out.path()).unwrap();
        let written = fs::read_to_string(out.path().join("src/main/mule/a.xml")).unwrap();
        assert!(written.contains(r#"<flow name="first"/>"#));
        assert!(out.path().join("pom.xml").is_file());
        assert!(out.path().join("src/test/munit/a-test.xml").is_file());
    }
}
