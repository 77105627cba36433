//! Tasks: ordered steps sharing a selection and an applicability range

use crate::error::MigrationError;
use crate::step::{MigrationStep, ProjectStep, Step};
use crate::version::{SchemaVersion, VersionPattern};
use mig_project::{Project, ProjectType};
use mig_report::Report;
use mig_tree::{NodeRef, Query};
use std::path::Path;

/// Ordered sequence of steps
///
/// The task selection is evaluated once when the task starts; nodes added
/// while it runs are not revisited. Steps run in order and each one is
/// applied to every selected node in document order before the next starts.
#[derive(Debug)]
pub struct Task {
    description: String,
    project_type: ProjectType,
    from: VersionPattern,
    to: VersionPattern,
    applied_to: Option<Query>,
    steps: Vec<Step>,
}

impl Task {
    /// Task for `project_type`, applicable to every version pair
    #[must_use]
    pub fn new(description: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            description: description.into(),
            project_type,
            from: VersionPattern::any(),
            to: VersionPattern::any(),
            applied_to: None,
            steps: Vec::new(),
        }
    }

    /// Restrict the source versions
    #[must_use]
    pub fn from_version(mut self, pattern: VersionPattern) -> Self {
        self.from = pattern;
        self
    }

    /// Restrict the target versions
    #[must_use]
    pub fn to_version(mut self, pattern: VersionPattern) -> Self {
        self.to = pattern;
        self
    }

    /// Shared selection for node steps without their own
    #[must_use]
    pub fn applied_to(mut self, query: impl Into<Query>) -> Self {
        self.applied_to = Some(query.into());
        self
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a node step
    #[must_use]
    pub fn node_step(self, step: impl MigrationStep + 'static) -> Self {
        self.step(Step::node(step))
    }

    /// Append a project step
    #[must_use]
    pub fn project_step(self, step: impl ProjectStep + 'static) -> Self {
        self.step(Step::project(step))
    }

    /// Description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Project type the task is registered for
    #[inline]
    #[must_use]
    pub fn project_type(&self) -> ProjectType {
        self.project_type
    }

    /// Steps in order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether the task runs for a project of `project_type` migrated `from` → `to`
    ///
    /// A task registered for either the source or the target project type applies.
    #[must_use]
    pub fn applies(&self, project_type: ProjectType, from: &SchemaVersion, to: &SchemaVersion) -> bool {
        (self.project_type == project_type || self.project_type == project_type.target())
            && self.from.matches(from)
            && self.to.matches(to)
    }

    /// Run every step
    ///
    /// # Errors
    /// Returns the first step failure, with the matched node's file and location
    pub fn run(&self, project: &mut Project, report: &mut Report) -> Result<(), MigrationError> {
        let span = tracing::info_span!("task", description = %self.description);
        let _guard = span.enter();

        let snapshot = match &self.applied_to {
            Some(query) => project.nodes(query)?,
            None => Vec::new(),
        };
        tracing::debug!("Selected {} nodes", snapshot.len());

        for step in &self.steps {
            match step {
                Step::Node(node_step) => {
                    let own = node_step.applied_to().map(|q| project.nodes(q)).transpose()?;
                    let nodes = own.as_deref().unwrap_or(&snapshot);
                    for &node in nodes {
                        self.apply(node_step.as_ref(), node, project, report)?;
                    }
                }
                Step::Project(project_step) => {
                    project_step
                        .execute(project, report)
                        .map_err(|source| MigrationError::StepFailed {
                            task: self.description.clone(),
                            step: project_step.description().to_string(),
                            file: None,
                            location: "/".to_string(),
                            source: Box::new(source),
                        })?;
                }
            }
        }
        Ok(())
    }

    fn apply(
        &self,
        step: &dyn MigrationStep,
        node: NodeRef,
        project: &mut Project,
        report: &mut Report,
    ) -> Result<(), MigrationError> {
        let Some(doc) = project.document(node.doc) else {
            return Err(MigrationError::UnknownNode(node));
        };
        if !doc.is_attached(node.node) {
            tracing::trace!("Skipping detached node {:?}", node);
            return Ok(());
        }
        let file = doc.path().map(Path::to_path_buf);
        let location = doc.effective_path(node.node);

        step.execute(node, project, report)
            .map_err(|source| MigrationError::StepFailed {
                task: self.description.clone(),
                step: step.description().to_string(),
                file,
                location,
                source: Box::new(source),
            })
    }
}
