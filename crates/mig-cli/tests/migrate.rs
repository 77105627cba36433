use mig_cli::{migrate, JobArgs, MigrateArgs};
use mig_engine::SchemaVersion;
use mig_project::ProjectType;
use mig_test_utils::{mule_config, ProjectFixture, ORDERS_RAML};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

const FLOWS: &str = r#"
    <apikit:config name="api-config"/>
    <flow name="main"><apikit:router config-ref="api-config"/></flow>
    <flow name="get:\orders\(id):api-config"><logger/></flow>
    <flow name="get:\orders\(sku):api-config"><logger/></flow>
"#;

fn args(project: PathBuf, output: PathBuf) -> MigrateArgs {
    MigrateArgs {
        project,
        output,
        report: None,
        catalogs: Vec::new(),
        job: JobArgs {
            project_type: ProjectType::Mule4Application,
            from: SchemaVersion::new(3, 9, 0),
            to: SchemaVersion::new(4, 4, 0),
            config: None,
        },
    }
}

#[test]
fn writes_project_and_report() {
    let fixture = ProjectFixture::new("orders")
        .with_config("orders.xml", &mule_config(FLOWS))
        .with_contract(ORDERS_RAML);
    let out = tempfile::tempdir().unwrap();

    let summary = migrate(&args(fixture.path().to_path_buf(), out.path().to_path_buf())).unwrap();
    assert_eq!(summary.outcome.tasks_run, 3);
    assert_eq!(summary.outcome.entries, 1);

    let migrated = std::fs::read_to_string(out.path().join("src/main/mule/orders.xml")).unwrap();
    assert!(migrated.contains(r#"variableName="id""#));
    assert!(migrated.contains("No URI parameters found for route"));
    assert_eq!(fixture.read("src/main/mule/orders.xml"), mule_config(FLOWS));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("migration-report.json")).unwrap()).unwrap();
    assert_eq!(json["projectName"], "orders");
    assert_eq!(json["entries"][0]["level"], "WARN");
}

#[test]
fn aborted_run_writes_nothing() {
    let fixture = ProjectFixture::new("orders").with_config("orders.xml", &mule_config(FLOWS));
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("migrated");

    let err = migrate(&args(fixture.path().to_path_buf(), target.clone())).unwrap_err();
    assert!(format!("{err:#}").contains("unresolved reference"));
    assert!(!target.exists());
}

#[test]
fn custom_catalog_overrides_messages() {
    let fixture = ProjectFixture::new("orders")
        .with_config("orders.xml", &mule_config(FLOWS))
        .with_contract(ORDERS_RAML);
    let catalog = fixture.write(
        "catalog.yaml",
        "raml:\n  missingParams:\n    type: INFO\n    message: \"Route {route} has no parameters\"\n",
    );
    let out = tempfile::tempdir().unwrap();
    let mut args = args(fixture.path().to_path_buf(), out.path().to_path_buf());
    args.catalogs.push(catalog);
    args.report = Some(out.path().join("report.json"));

    migrate(&args).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(json["entries"][0]["level"], "INFO");
    assert_eq!(json["entries"][0]["message"], r"Route get:\orders\(sku) has no parameters");
}
