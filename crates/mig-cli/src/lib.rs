//! Command-line driver
//!
//! Parses arguments, assembles a [`mig_engine::MigrationJob`] from the
//! built-in and configured tasks, and writes the migrated project and its
//! report.

pub mod cli;
pub mod run;

pub use cli::{Cli, Commands, JobArgs, LogFormat, MigrateArgs};
pub use run::{applicable_tasks, assemble_job, init_tracing, migrate, MigrationSummary};
