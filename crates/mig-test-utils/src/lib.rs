//! Testing utilities for the migration workspace
//!
//! Temp-dir project fixtures shared by integration tests.

#![allow(missing_docs)]

use mig_project::{Project, ProjectType};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CORE_NS: &str = "http://www.mulesoft.org/schema/mule/core";
pub const APIKIT_NS: &str = "http://www.mulesoft.org/schema/mule/mule-apikit";
pub const DOC_NS: &str = "http://www.mulesoft.org/schema/mule/documentation";

/// Contract with `/orders` and `/orders/{id}`
pub const ORDERS_RAML: &str = "#%RAML 1.0
title: Orders
/orders:
  get:
  post:
    body:
      application/json:
  /{id}:
    uriParameters:
      id:
        type: string
    get:
    delete:
";

pub fn pom_xml(group_id: &str, artifact_id: &str, version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
    <groupId>{group_id}</groupId>
    <artifactId>{artifact_id}</artifactId>
    <version>{version}</version>
    <dependencies>
        <dependency>
            <groupId>org.mule.connectors</groupId>
            <artifactId>mule-http-connector</artifactId>
            <version>1.5.0</version>
            <classifier>mule-plugin</classifier>
        </dependency>
    </dependencies>
</project>
"#
    )
}

/// Wrap `body` in a root element declaring the core, APIkit and doc namespaces
pub fn mule_config(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<mule xmlns="{CORE_NS}" xmlns:apikit="{APIKIT_NS}" xmlns:doc="{DOC_NS}">
{body}
</mule>
"#
    )
}

/// Project directory on disk, removed on drop
pub struct ProjectFixture {
    dir: TempDir,
    artifact_id: String,
}

impl ProjectFixture {
    /// Directory with a build descriptor for `artifact_id`
    pub fn new(artifact_id: &str) -> Self {
        let fixture = Self {
            dir: TempDir::new().unwrap(),
            artifact_id: artifact_id.to_string(),
        };
        fixture.write("pom.xml", &pom_xml("org.example", artifact_id, "1.0.0"));
        fixture
    }

    /// Directory without any file
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            artifact_id: String::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Write a file relative to the project base
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Add a generation-4 configuration file
    #[must_use]
    pub fn with_config(self, file_name: &str, xml: &str) -> Self {
        self.write(&format!("src/main/mule/{file_name}"), xml);
        self
    }

    /// Add the API contract at its conventional location
    #[must_use]
    pub fn with_contract(self, raml: &str) -> Self {
        let relative = format!("src/main/resources/api/{}.raml", self.artifact_id);
        self.write(&relative, raml);
        self
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.dir.path().join(relative)).unwrap()
    }

    /// Load as a generation-4 application
    pub fn load(&self) -> Project {
        self.load_as(ProjectType::Mule4Application)
    }

    pub fn load_as(&self, project_type: ProjectType) -> Project {
        Project::builder(self.dir.path(), project_type).build().unwrap()
    }
}
