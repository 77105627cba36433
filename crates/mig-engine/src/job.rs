//! Migration job: runs registered tasks in order against one project

use crate::error::MigrationError;
use crate::task::Task;
use crate::version::SchemaVersion;
use mig_project::Project;
use mig_report::Report;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    /// Not started
    Idle,
    /// Executing tasks
    Running,
    /// Every applicable task ran
    Completed,
    /// A fatal error stopped the run
    Aborted,
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    /// Tasks that applied and ran
    pub tasks_run: usize,
    /// Tasks skipped by project type or version
    pub tasks_skipped: usize,
    /// Entries in the report after the run
    pub entries: usize,
}

/// Ordered set of tasks for one source → target version pair
#[derive(Debug)]
pub struct MigrationJob {
    from: SchemaVersion,
    to: SchemaVersion,
    tasks: Vec<Task>,
    state: JobState,
}

impl MigrationJob {
    /// Idle job without tasks
    #[must_use]
    pub fn new(from: SchemaVersion, to: SchemaVersion) -> Self {
        Self {
            from,
            to,
            tasks: Vec::new(),
            state: JobState::Idle,
        }
    }

    /// Register a task; tasks run in registration order
    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Register several tasks
    pub fn add_tasks(&mut self, tasks: impl IntoIterator<Item = Task>) {
        self.tasks.extend(tasks);
    }

    /// Registered tasks
    #[inline]
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Run every applicable task against `project`
    ///
    /// The report is initialized with the project identity and the element
    /// count before the first task runs.
    ///
    /// # Errors
    /// - `MigrationError::InvalidState` if the job already ran
    /// - the first fatal task failure; the job is then `Aborted` and the
    ///   project must not be written out
    pub fn run(&mut self, project: &mut Project, report: &mut Report) -> Result<JobOutcome, MigrationError> {
        if self.state != JobState::Idle {
            return Err(MigrationError::InvalidState {
                expected: JobState::Idle,
                actual: self.state,
            });
        }
        self.state = JobState::Running;
        tracing::info!(
            "Migrating '{}' ({}) from {} to {}",
            project.name(),
            project.project_type(),
            self.from,
            self.to
        );

        report.initialize(project.project_type(), project.name());
        report.add_processed_elements(project.element_count());

        match self.run_tasks(project, report) {
            Ok(outcome) => {
                self.state = JobState::Completed;
                tracing::info!(
                    "Migration completed: {} tasks run, {} skipped, {} report entries",
                    outcome.tasks_run,
                    outcome.tasks_skipped,
                    outcome.entries
                );
                Ok(outcome)
            }
            Err(e) => {
                self.state = JobState::Aborted;
                tracing::error!("Migration aborted: {}", e);
                Err(e)
            }
        }
    }

    fn run_tasks(&self, project: &mut Project, report: &mut Report) -> Result<JobOutcome, MigrationError> {
        let mut tasks_run = 0;
        let mut tasks_skipped = 0;
        for task in &self.tasks {
            if !task.applies(project.project_type(), &self.from, &self.to) {
                tracing::debug!("Skipping task '{}'", task.description());
                tasks_skipped += 1;
                continue;
            }
            task.run(project, report)?;
            tasks_run += 1;
        }
        Ok(JobOutcome {
            tasks_run,
            tasks_skipped,
            entries: report.len(),
        })
    }
}
