//! Command execution

use crate::cli::{JobArgs, LogFormat, MigrateArgs};
use anyhow::{bail, Context, Result};
use mig_engine::{JobConfig, JobOutcome, MigrationJob};
use mig_project::Project;
use mig_report::{Catalog, Report};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// What a finished migration produced
#[derive(Debug, Clone)]
pub struct MigrationSummary {
    /// Task counts of the job
    pub outcome: JobOutcome,
    /// `None` when nothing was processed
    pub success_ratio: Option<f64>,
    /// `None` when nothing was processed
    pub error_ratio: Option<f64>,
    /// Where the report was written
    pub report_path: PathBuf,
}

fn load_config(args: &JobArgs) -> Result<JobConfig> {
    match &args.config {
        Some(path) => Ok(JobConfig::from_file(path)?),
        None => Ok(JobConfig::default()),
    }
}

/// Job for `args`, plus the catalog files its configuration names
///
/// # Errors
/// Returns error if the configuration cannot be read or holds invalid tasks
pub fn assemble_job(args: &JobArgs) -> Result<(MigrationJob, Vec<PathBuf>)> {
    let config = load_config(args)?;
    let catalogs = config.catalogs.clone();
    let mut job = MigrationJob::new(args.from, args.to);
    job.add_tasks(config.into_tasks()?);
    Ok((job, catalogs))
}

fn build_report(catalogs: impl IntoIterator<Item = PathBuf>) -> Result<Report> {
    let mut catalog = Catalog::embedded()?;
    for path in catalogs {
        catalog.merge(Catalog::from_file(&path).with_context(|| format!("loading catalog {}", path.display()))?);
    }
    Ok(Report::new(catalog))
}

/// Load, migrate and write a project
///
/// Nothing is written when the job aborts.
///
/// # Errors
/// Returns error if loading, the migration itself or writing fails
pub fn migrate(args: &MigrateArgs) -> Result<MigrationSummary> {
    if args.output == args.project {
        bail!("output directory must differ from the project directory");
    }
    let (mut job, config_catalogs) = assemble_job(&args.job)?;
    let mut report = build_report(config_catalogs.into_iter().chain(args.catalogs.iter().cloned()))?;

    let mut project = Project::builder(&args.project, args.job.project_type)
        .build()
        .with_context(|| format!("loading project {}", args.project.display()))?;

    let outcome = job.run(&mut project, &mut report)?;

    project
        .write_to(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    let report_path = args.report_path();
    report.write_json(&report_path)?;
    tracing::info!("Report written to {}", report_path.display());

    Ok(MigrationSummary {
        outcome,
        success_ratio: report.success_ratio(),
        error_ratio: report.error_ratio(),
        report_path,
    })
}

/// Descriptions of the tasks that apply to `args`, in run order
///
/// # Errors
/// Returns error if the job cannot be assembled
pub fn applicable_tasks(args: &JobArgs) -> Result<Vec<String>> {
    let (job, _) = assemble_job(args)?;
    Ok(job
        .tasks()
        .iter()
        .filter(|t| t.applies(args.project_type, &args.from, &args.to))
        .map(|t| t.description().to_string())
        .collect())
}
