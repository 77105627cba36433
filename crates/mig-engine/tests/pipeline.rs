//! End-to-end runs of the built-in tasks against on-disk projects

use mig_engine::library::builtin_tasks;
use mig_engine::{JobConfig, JobState, MigrationError, MigrationJob, SchemaVersion};
use mig_project::{ApiContract, ContractError, ContractParser, Method, Project, Resource};
use mig_report::{Level, Report};
use mig_test_utils::{mule_config, ProjectFixture, ORDERS_RAML};
use mig_tree::{Document, NodeId, NodeKind};
use mockall::mock;
use pretty_assertions::assert_eq;
use std::path::Path;

mock! {
    Parser {}
    impl ContractParser for Parser {
        fn parse(&self, path: &Path) -> Result<ApiContract, ContractError>;
    }
}

const ROUTER_FLOWS: &str = r#"
    <apikit:config name="api-config" raml="orders.raml"/>
    <flow name="orders-main">
        <apikit:router config-ref="api-config"/>
    </flow>
    <flow name="get:\orders\(id):api-config">
        <logger message="fetching"/>
    </flow>
    <flow name="get:\orders:api-config">
        <logger message="listing"/>
    </flow>
"#;

fn job() -> MigrationJob {
    let mut job = MigrationJob::new(SchemaVersion::new(3, 9, 0), SchemaVersion::new(4, 4, 0));
    job.add_tasks(builtin_tasks());
    job
}

fn fixture() -> ProjectFixture {
    ProjectFixture::new("orders")
        .with_config("orders.xml", &mule_config(ROUTER_FLOWS))
        .with_contract(ORDERS_RAML)
}

fn flow(doc: &Document, name: &str) -> NodeId {
    doc.element_children(doc.root())
        .into_iter()
        .find(|n| doc.attribute(*n, "name") == Some(name))
        .unwrap()
}

#[test]
fn router_flow_declares_uri_params_first() {
    let fixture = fixture();
    let mut project = fixture.load();
    let mut report = Report::with_default_catalog().unwrap();
    let mut job = job();

    job.run(&mut project, &mut report).unwrap();
    assert_eq!(job.state(), JobState::Completed);

    let doc = &project.documents()[0];
    let by_id = flow(doc, r"get:\orders\(id):api-config");
    let first = doc.element_children(by_id)[0];
    assert_eq!(doc.qualified_name(first).as_deref(), Some("ee:transform"));

    let variables = doc.element_children(first)[0];
    let set = doc.element_children(variables);
    assert_eq!(set.len(), 1);
    assert_eq!(doc.attribute(set[0], "variableName"), Some("id"));
    assert_eq!(doc.text(set[0]), "attributes.uriParams.id");

    let listing = flow(doc, r"get:\orders:api-config");
    assert_eq!(doc.qualified_name(doc.element_children(listing)[0]).as_deref(), Some("logger"));

    assert!(report.is_empty());
    assert_eq!(report.success_ratio(), Some(1.0));
    assert_eq!(report.error_ratio(), Some(0.0));
}

#[test]
fn migrated_project_is_written_back() {
    let fixture = fixture();
    let mut project = fixture.load();
    job().run(&mut project, &mut Report::with_default_catalog().unwrap()).unwrap();

    let out = tempfile::tempdir().unwrap();
    project.write_to(out.path()).unwrap();

    let written = std::fs::read_to_string(out.path().join("src/main/mule/orders.xml")).unwrap();
    let doc = Document::parse(&written).unwrap();
    let by_id = flow(&doc, r"get:\orders\(id):api-config");
    assert_eq!(doc.name(doc.element_children(by_id)[0]), Some("transform"));
    assert!(doc.root_prefix_uri("ee").is_some());
    assert!(std::fs::read_to_string(out.path().join("pom.xml")).unwrap().contains("mule-http-connector"));
}

#[test]
fn second_run_adds_no_diagnostics_or_content() {
    let fixture = ProjectFixture::new("orders")
        .with_config(
            "orders.xml",
            &mule_config(&format!(r#"{ROUTER_FLOWS}<flow name="get:\orders\(missing):api-config"/>"#)),
        )
        .with_contract(ORDERS_RAML);
    let mut project = fixture.load();
    let mut report = Report::with_default_catalog().unwrap();

    job().run(&mut project, &mut report).unwrap();
    let entries = report.len();
    let first = project.documents()[0].to_xml_string().unwrap();
    assert_eq!(entries, 1);

    job().run(&mut project, &mut report).unwrap();
    assert_eq!(report.len(), entries);
    assert_eq!(project.documents()[0].to_xml_string().unwrap(), first);
}

#[test]
fn contract_is_parsed_once_per_run() {
    let fixture = ProjectFixture::new("orders").with_config(
        "orders.xml",
        &mule_config(&format!(r#"{ROUTER_FLOWS}<flow name="delete:\orders\(id):api-config"/>"#)),
    );
    let mut parser = MockParser::new();
    parser
        .expect_parse()
        .withf(|path| path.ends_with("src/main/resources/api/orders.raml"))
        .times(1)
        .returning(|_| {
            Ok(ApiContract {
                title: None,
                resources: vec![Resource::new("/orders").with_method(Method::new("get")).with_resource(
                    Resource::new("/{id}")
                        .with_param("id")
                        .with_method(Method::new("get"))
                        .with_method(Method::new("delete")),
                )],
            })
        });

    let mut project = Project::builder(fixture.path(), mig_project::ProjectType::Mule4Application)
        .contract_parser(Box::new(parser))
        .build()
        .unwrap();
    job().run(&mut project, &mut Report::with_default_catalog().unwrap()).unwrap();

    let doc = &project.documents()[0];
    for name in [r"get:\orders\(id):api-config", r"delete:\orders\(id):api-config"] {
        let first = doc.element_children(flow(doc, name))[0];
        assert_eq!(doc.name(first), Some("transform"));
    }
}

#[test]
fn missing_contract_aborts_with_location() {
    let fixture = ProjectFixture::new("orders").with_config("orders.xml", &mule_config(ROUTER_FLOWS));
    let mut project = fixture.load();
    let mut report = Report::with_default_catalog().unwrap();
    let mut job = job();

    let err = job.run(&mut project, &mut report).unwrap_err();
    assert_eq!(job.state(), JobState::Aborted);
    assert!(matches!(err.root_cause(), MigrationError::UnresolvedReference { .. }));
    let message = err.to_string();
    assert!(message.contains("src/main/mule/orders.xml"), "{message}");
    assert!(message.contains("/mule/flow[2]"), "{message}");

    assert_eq!(report.count(Level::Error), 1);
    let doc = &project.documents()[0];
    let by_id = flow(doc, r"get:\orders\(id):api-config");
    let annotated = doc.children(by_id)[0];
    assert!(matches!(doc.kind(annotated), Some(NodeKind::Comment(c)) if c.starts_with("Migration ERROR: ")));
}

#[test]
fn configured_tasks_run_after_builtin_ones() {
    let fixture = fixture();
    let mut project = fixture.load();
    let config = JobConfig::from_json(
        r#"{
            "tasks": [{
                "description": "Tag loggers",
                "projectType": "MULE_FOUR_APPLICATION",
                "from": "3",
                "to": "4",
                "appliedTo": "//*[local-name()='logger']",
                "steps": [
                    { "step": "renameAttribute", "from": "message", "to": "category" },
                    { "step": "addDependency", "groupId": "org.mule.modules", "artifactId": "mule-validation-module", "version": "2.0.0" }
                ]
            }]
        }"#,
    )
    .unwrap();

    let mut job = MigrationJob::new(SchemaVersion::new(3, 9, 0), SchemaVersion::new(4, 4, 0));
    job.add_tasks(config.into_tasks().unwrap());
    let outcome = job.run(&mut project, &mut Report::with_default_catalog().unwrap()).unwrap();
    assert_eq!(outcome.tasks_run, 4);

    let doc = &project.documents()[0];
    let listing = flow(doc, r"get:\orders:api-config");
    let logger = doc.element_children(listing)[0];
    assert_eq!(doc.attribute(logger, "category"), Some("listing"));
    assert_eq!(project.build_descriptor().dependencies().len(), 2);
}
