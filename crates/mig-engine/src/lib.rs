//! Migration engine
//!
//! Provides:
//! - [`MigrationJob`]: runs registered [`Task`]s in order, gated by project
//!   type and schema version pair
//! - [`Task`] / [`Step`]: ordered rewrites over a selection snapshot
//! - [`resolver`]: route lookup in an API contract's resource tree
//! - [`library`]: built-in and generic steps
//! - [`config`]: JSON job configuration
//!
//! # Example
//! ```
//! use mig_engine::library::generic::AddAttribute;
//! use mig_engine::{MigrationJob, SchemaVersion, Task};
//! use mig_project::{BuildDescriptor, Project, ProjectType};
//! use mig_report::Report;
//! use mig_tree::Document;
//!
//! let mut project = Project::new(
//!     "/tmp/app",
//!     ProjectType::Mule4Application,
//!     BuildDescriptor::minimal("org.example", "app", "1.0.0"),
//! );
//! project.add_document("src/main/mule/app.xml", Document::parse("<mule><flow/></mule>").unwrap());
//!
//! let mut job = MigrationJob::new(SchemaVersion::new(3, 9, 0), SchemaVersion::new(4, 4, 0));
//! job.add_task(
//!     Task::new("mark flows", ProjectType::Mule4Application)
//!         .applied_to("//flow")
//!         .node_step(AddAttribute::new("migrated", "true")),
//! );
//! let mut report = Report::with_default_catalog().unwrap();
//! job.run(&mut project, &mut report).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod job;
pub mod library;
pub mod resolver;
pub mod step;
pub mod task;
pub mod version;

pub use config::{JobConfig, StepConfig, TaskConfig};
pub use error::MigrationError;
pub use job::{JobOutcome, JobState, MigrationJob};
pub use resolver::{normalize_path, resolve_route, route_identifier};
pub use step::{MigrationStep, ProjectStep, Step};
pub use task::Task;
pub use version::{InvalidVersion, SchemaVersion, VersionPattern, MULE_3_VERSION, MULE_4_VERSION};
