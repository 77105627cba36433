use clap::Parser;
use mig_cli::{applicable_tasks, init_tracing, migrate, Cli, Commands};

fn percent(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Migrate(args) => {
            let summary = migrate(&args)?;
            println!(
                "Migrated {} into {} ({} tasks run, {} skipped)",
                args.project.display(),
                args.output.display(),
                summary.outcome.tasks_run,
                summary.outcome.tasks_skipped
            );
            println!(
                "Report: {} entries, success {}, errors {} ({})",
                summary.outcome.entries,
                percent(summary.success_ratio),
                percent(summary.error_ratio),
                summary.report_path.display()
            );
        }
        Commands::Tasks(args) => {
            for description in applicable_tasks(&args)? {
                println!("{description}");
            }
        }
    }
    Ok(())
}
