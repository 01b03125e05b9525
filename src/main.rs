use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod aggregate;
mod chart;
mod config;
mod delimiter;
mod error;
mod logging;
mod models;
mod pipeline;
mod reconcile;
mod report;
mod resolver;
mod temporal;
mod tsv;

use chart::JsonChartRenderer;
use config::PipelineConfig;
use error::PipelineError;
use models::DayStateTally;
use resolver::PatientRegistry;

#[derive(Parser)]
#[command(name = "case-pipeline")]
#[command(about = "Normalizes raw case reports into per-patient records and outbreak aggregates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage, then write the aggregate charts and a report
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,
    },
    /// Unify delimiters and date separators, upper-case every row
    Clean {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Rejoin split postal codes and temperatures into nine columns
    Reconcile {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Replace dates with day offsets and ages, canonicalize status
    Dates {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Merge observations into one record per patient
    Resolve {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    let result = execute(cli.command);
    if let Err(err) = &result {
        if let Some(failure) = err.downcast_ref::<PipelineError>() {
            tracing::error!(kind = failure.kind(), line = ?failure.line(), "{}", failure.root());
        }
    }
    result
}

fn execute(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run { input, work_dir } => {
            let config = PipelineConfig::new(input, work_dir);
            let summary = pipeline::run(&config, &JsonChartRenderer)?;
            println!(
                "Resolved {} patients from {} rows across {} days.",
                summary.patients, summary.raw_rows, summary.days
            );
            println!("Report written to {}.", config.report_path().display());
        }
        Commands::Clean { input, output } => {
            let rows = delimiter::run_stage(&input, &output)
                .with_context(|| format!("failed to clean {}", input.display()))?;
            println!("Wrote {rows} rows to {}.", output.display());
        }
        Commands::Reconcile { input, output } => {
            let rows = reconcile::run_stage(&input, &output)
                .with_context(|| format!("failed to reconcile {}", input.display()))?;
            println!("Wrote {rows} rows to {}.", output.display());
        }
        Commands::Dates { input, output } => {
            let mut tally = DayStateTally::new();
            temporal::run_stage(&input, &output, &mut tally)
                .with_context(|| format!("failed to normalize dates in {}", input.display()))?;
            println!("{}", serde_json::to_string(&tally)?);
        }
        Commands::Resolve { input, output } => {
            let mut registry = PatientRegistry::new();
            let patients = resolver::run_stage(&input, &output, &mut registry)
                .with_context(|| format!("failed to resolve {}", input.display()))?;
            println!("Wrote {patients} patients to {}.", output.display());
        }
    }

    Ok(())
}
