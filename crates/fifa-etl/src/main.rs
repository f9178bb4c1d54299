//! CLI entry point for the FIFA21 ETL pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use fifa_etl::config::{
    DEFAULT_INPUT_PATH, DEFAULT_LOG_FILE, DEFAULT_OUTPUT_PATH, DEFAULT_TABLE_NAME,
};
use fifa_etl::{DatabaseConfig, EtlConfig, EtlError, EtlPipeline, EtlSummary};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Clean the FIFA21 player export and load it into CSV and PostgreSQL",
    long_about = "Reads the raw FIFA21 player CSV, normalizes units, currencies, ratings and \
                  contract fields, then writes the clean table to a CSV file and a PostgreSQL table.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  DB_HOST, DB_PORT, DB_NAME, DB_USER, DB_PASSWORD    database connection (.env supported)\n  \
                  RUST_LOG                                           overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Default paths, CSV and database\n  \
                  fifa-etl\n\n  \
                  # CSV only, custom paths\n  \
                  fifa-etl --input raw.csv --output out/clean.csv --no-database"
)]
struct Args {
    /// Path to the raw CSV export
    #[arg(short, long, default_value = DEFAULT_INPUT_PATH)]
    input: String,

    /// Path of the clean CSV to write
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    output: String,

    /// Database table to replace
    #[arg(short, long, default_value = DEFAULT_TABLE_NAME)]
    table: String,

    /// Append-mode log file
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Skip the database sink
    #[arg(long)]
    no_database: bool,

    /// Output the run summary as JSON on stdout
    ///
    /// Console logging is disabled; the log file is still written.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber: console (unless `json_output`) and log file.
fn init_logging(level: &str, log_file: &Path, json_output: bool) -> Result<()> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = (!json_output).then(|| fmt::layer().with_target(false));
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Arc::new(file));

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
    Ok(())
}

fn build_config(args: &Args) -> Result<EtlConfig> {
    let mut builder = EtlConfig::builder()
        .input_path(&args.input)
        .output_path(&args.output)
        .table_name(&args.table)
        .log_file(&args.log_file)
        .write_database(!args.no_database);

    if !args.no_database {
        let database =
            DatabaseConfig::from_env().context("Database settings are incomplete")?;
        debug!("Database target: {:?}", database);
        builder = builder.database(database);
    }

    Ok(builder.build()?)
}

fn run(args: &Args) -> Result<EtlSummary> {
    let config = build_config(args)?;

    let mut pipeline = EtlPipeline::builder()
        .config(config)
        .on_progress(|update| {
            debug!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        })
        .build()?;

    Ok(pipeline.run()?)
}

fn print_summary(summary: &EtlSummary) {
    println!("\n{}", "=".repeat(60));
    println!("FIFA21 ETL SUMMARY");
    println!("{}", "=".repeat(60));
    println!("  Input:        {}", summary.input_file);
    println!(
        "  Read:         {} rows x {} columns",
        summary.rows_read, summary.columns_read
    );
    println!(
        "  Written:      {} columns",
        summary.transform.columns_after
    );
    let contracts = &summary.transform.contracts;
    println!(
        "  Contracts:    {} contract, {} loan, {} free, {} unknown",
        contracts.contract, contracts.loan, contracts.free, contracts.unknown
    );
    if let Some(fill) = &summary.transform.hits_fill {
        println!(
            "  Hits filled:  {} (mean {:.2}K)",
            fill.filled, fill.mean
        );
    }
    println!("  Sinks:        {}", summary.sinks_written.join(", "));
    println!("  Duration:     {} ms", summary.duration_ms);
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Load environment variables from .env file
    dotenv().ok();

    if let Err(e) = init_logging(&args.log_level, Path::new(&args.log_file), args.json) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    info!("fifa-etl {} starting", env!("CARGO_PKG_VERSION"));

    match run(&args) {
        Ok(summary) => {
            if args.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialize summary: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print_summary(&summary);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("ETL run failed: {:#}", e);
            if args.json {
                if let Some(etl_error) = e.downcast_ref::<EtlError>() {
                    if let Ok(json) = serde_json::to_string_pretty(etl_error) {
                        println!("{}", json);
                    }
                }
            }
            ExitCode::FAILURE
        }
    }
}
