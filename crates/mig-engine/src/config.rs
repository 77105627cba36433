//! Job configuration file
//!
//! A JSON document listing tasks built from generic steps, e.g.
//!
//! ```json
//! {
//!   "tasks": [{
//!     "description": "Describe tests",
//!     "projectType": "MULE_FOUR_APPLICATION",
//!     "appliedTo": "//munit:test",
//!     "steps": [{ "step": "addAttribute", "name": "description", "value": "migrated" }]
//!   }]
//! }
//! ```

use crate::error::MigrationError;
use crate::library::builtin_tasks;
use crate::library::generic::{
    AddAttribute, AddDependency, MoveAttributeToChild, RenameAttribute, RenameElement, ReplaceInElementName,
    ReportElement, SetElementNamespace,
};
use crate::step::Step;
use crate::task::Task;
use crate::version::VersionPattern;
use mig_project::{Dependency, ProjectType};
use mig_tree::Namespace;
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn include_builtin_default() -> bool {
    true
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobConfig {
    /// Run the built-in tasks before the configured ones
    #[serde(default = "include_builtin_default")]
    pub include_builtin: bool,
    /// Extra diagnostic catalogs, merged over the embedded one in order
    #[serde(default)]
    pub catalogs: Vec<PathBuf>,
    /// Configured tasks, in execution order
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            include_builtin: true,
            catalogs: Vec::new(),
            tasks: Vec::new(),
        }
    }
}

/// One configured task
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskConfig {
    /// Description used in logs and errors
    pub description: String,
    /// Project type the task is registered for
    pub project_type: ProjectType,
    /// Source version pattern
    #[serde(default = "VersionPattern::any")]
    pub from: VersionPattern,
    /// Target version pattern
    #[serde(default = "VersionPattern::any")]
    pub to: VersionPattern,
    /// Selection for the task's element steps
    #[serde(default)]
    pub applied_to: Option<String>,
    /// Steps in order
    pub steps: Vec<StepConfig>,
}

/// Generic step descriptor
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum StepConfig {
    /// See [`AddAttribute`]
    AddAttribute {
        /// Attribute name
        name: String,
        /// Attribute value
        value: String,
    },
    /// See [`RenameElement`]
    RenameElement {
        /// New local name
        name: String,
    },
    /// See [`RenameAttribute`]
    RenameAttribute {
        /// Current name
        from: String,
        /// New name
        to: String,
    },
    /// See [`SetElementNamespace`]
    SetElementNamespace {
        /// Prefix to bind
        prefix: String,
        /// Namespace URI
        uri: String,
        /// Schema location registered with the namespace
        #[serde(rename = "schemaLocation")]
        schema_location: String,
    },
    /// See [`ReplaceInElementName`]
    ReplaceInElementName {
        /// Substring to replace
        pattern: String,
        /// Replacement
        replacement: String,
    },
    /// See [`MoveAttributeToChild`]
    MoveAttributeToChild {
        /// Attribute to move
        attribute: String,
        /// Child element name
        child: String,
    },
    /// See [`ReportElement`]
    Report {
        /// Catalog key
        key: String,
    },
    /// See [`AddDependency`]
    AddDependency(Dependency),
}

impl StepConfig {
    fn is_element_step(&self) -> bool {
        !matches!(self, Self::AddDependency(_))
    }

    fn into_step(self) -> Step {
        match self {
            Self::AddAttribute { name, value } => Step::node(AddAttribute::new(name, value)),
            Self::RenameElement { name } => Step::node(RenameElement::new(name)),
            Self::RenameAttribute { from, to } => Step::node(RenameAttribute::new(from, to)),
            Self::SetElementNamespace {
                prefix,
                uri,
                schema_location,
            } => Step::node(SetElementNamespace::new(Namespace::new(prefix, uri), schema_location)),
            Self::ReplaceInElementName { pattern, replacement } => {
                Step::node(ReplaceInElementName::new(pattern, replacement))
            }
            Self::MoveAttributeToChild { attribute, child } => Step::node(MoveAttributeToChild::new(attribute, child)),
            Self::Report { key } => Step::node(ReportElement::new(key)),
            Self::AddDependency(dependency) => Step::project(AddDependency::new(dependency)),
        }
    }
}

impl TaskConfig {
    /// Build the task
    ///
    /// # Errors
    /// Returns error if element steps have no selection to apply to
    pub fn into_task(self) -> Result<Task, MigrationError> {
        if self.applied_to.is_none() && self.steps.iter().any(StepConfig::is_element_step) {
            return Err(MigrationError::Config(format!(
                "task '{}' has element steps but no appliedTo selection",
                self.description
            )));
        }
        let mut task = Task::new(self.description, self.project_type)
            .from_version(self.from)
            .to_version(self.to);
        if let Some(query) = self.applied_to {
            task = task.applied_to(query);
        }
        Ok(self.steps.into_iter().fold(task, |task, step| task.step(step.into_step())))
    }
}

impl JobConfig {
    /// Parse a configuration document
    ///
    /// # Errors
    /// Returns error if the document is not a valid configuration
    pub fn from_json(json: &str) -> Result<Self, MigrationError> {
        serde_json::from_str(json).map_err(|e| MigrationError::Config(e.to_string()))
    }

    /// Read and parse a configuration file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid
    pub fn from_file(path: &Path) -> Result<Self, MigrationError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| MigrationError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_json(&json)?;
        tracing::debug!("Loaded {} configured tasks from {}", config.tasks.len(), path.display());
        Ok(config)
    }

    /// Tasks to register: built-in ones first, then the configured ones
    ///
    /// # Errors
    /// Returns error if a configured task is invalid
    pub fn into_tasks(self) -> Result<Vec<Task>, MigrationError> {
        let mut tasks = if self.include_builtin { builtin_tasks() } else { Vec::new() };
        for task in self.tasks {
            tasks.push(task.into_task()?);
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"{
        "includeBuiltin": false,
        "tasks": [{
            "description": "Describe tests",
            "projectType": "MULE_FOUR_APPLICATION",
            "from": "3.*.*",
            "appliedTo": "//munit:test",
            "steps": [
                { "step": "addAttribute", "name": "description", "value": "migrated" },
                { "step": "setElementNamespace", "prefix": "munit", "uri": "urn:munit", "schemaLocation": "urn:munit/munit.xsd" },
                { "step": "report", "key": "components.deprecated" },
                { "step": "addDependency", "groupId": "com.mulesoft.munit", "artifactId": "munit-runner", "version": "2.3.0", "classifier": "mule-plugin" }
            ]
        }]
    }"#;

    #[test]
    fn parses_tasks_and_steps() {
        let config = JobConfig::from_json(CONFIG).unwrap();
        assert!(!config.include_builtin);
        let task = &config.tasks[0];
        assert_eq!(task.from, VersionPattern::major(3));
        assert_eq!(task.to, VersionPattern::any());
        assert_eq!(task.steps.len(), 4);
        assert_eq!(
            task.steps[3],
            StepConfig::AddDependency(
                Dependency::new("com.mulesoft.munit", "munit-runner", "2.3.0").with_classifier("mule-plugin")
            )
        );

        let tasks = config.into_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        let kinds: Vec<bool> = tasks[0].steps().iter().map(|s| matches!(s, Step::Node(_))).collect();
        assert_eq!(kinds, vec![true, true, true, false]);
    }

    #[test]
    fn builtin_tasks_come_first() {
        let config = JobConfig::from_json(r#"{ "tasks": [] }"#).unwrap();
        assert_eq!(config.into_tasks().unwrap().len(), builtin_tasks().len());
    }

    #[test]
    fn element_steps_need_a_selection() {
        let config = JobConfig::from_json(
            r#"{ "tasks": [{ "description": "x", "projectType": "MULE_FOUR_APPLICATION",
                 "steps": [{ "step": "renameElement", "name": "y" }] }] }"#,
        )
        .unwrap();
        assert!(matches!(config.into_tasks(), Err(MigrationError::Config(_))));
    }

    #[test]
    fn rejects_unknown_steps() {
        let err = JobConfig::from_json(
            r#"{ "tasks": [{ "description": "x", "projectType": "MULE_FOUR_APPLICATION",
                 "steps": [{ "step": "explode" }] }] }"#,
        );
        assert!(matches!(err, Err(MigrationError::Config(_))));
    }
}
