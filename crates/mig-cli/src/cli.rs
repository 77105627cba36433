//! Command-line arguments

use clap::{Args, Parser, Subcommand, ValueEnum};
use mig_engine::SchemaVersion;
use mig_project::ProjectType;
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Top-level arguments
#[derive(Parser, Debug)]
#[command(name = "mig", version, about = "Migrate integration projects between schema generations")]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the migration and write the result
    Migrate(MigrateArgs),
    /// List the tasks a migration would run
    Tasks(JobArgs),
}

/// Options shared by every command that assembles a job
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Type of the input project
    #[arg(long, default_value_t = ProjectType::Mule4Application)]
    pub project_type: ProjectType,
    /// Source schema version
    #[arg(long, default_value = "3.9.0")]
    pub from: SchemaVersion,
    /// Target schema version
    #[arg(long, default_value = "4.4.0")]
    pub to: SchemaVersion,
    /// Job configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Arguments of `migrate`
#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    /// Project base directory
    pub project: PathBuf,
    /// Directory the migrated project is written to
    #[arg(long, short)]
    pub output: PathBuf,
    /// Report file (defaults to `<output>/migration-report.json`)
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Extra diagnostic catalog (YAML), may be repeated
    #[arg(long = "catalog")]
    pub catalogs: Vec<PathBuf>,
    /// Job assembly options
    #[command(flatten)]
    pub job: JobArgs,
}

impl MigrateArgs {
    /// Where the report summary goes
    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.report
            .clone()
            .unwrap_or_else(|| self.output.join("migration-report.json"))
    }
}
