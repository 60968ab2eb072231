mod client;
mod config;
mod dashboard;
mod engine;
mod models;
mod source;
mod storage;
mod types;

use std::fs::{File, OpenOptions};
use std::io::{stderr, stdout, BufWriter, Write};
use std::path::Path;
use std::process::exit;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::client::{HttpTransport, RemoteSubmitter, TransportSetupError};
use crate::config::Settings;
use crate::dashboard::{check_connection, AppState};
use crate::engine::{compute_status, BatchOrchestrator};

const USAGE: &str = "Usage: vehicle-sync <serve|run|status|test-connection> [log_level:optional]";

#[tokio::main]
async fn main() -> Result<()> {
    //NOTE: Settings come from the environment; a .env file next to the binary is honoured but optional.
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("{USAGE}");
        eprintln!("Available log levels: error, warn, info, debug, trace (default: VEHICLE_SYNC_LOG_LEVEL or info)");
        exit(1);
    }

    let settings = Settings::from_env()?;
    let log_level = parse_log_level(args.get(2).unwrap_or(&settings.log_level));

    setup_logging(log_level, &settings.log_file);

    match args[1].as_str() {
        "serve" => serve(settings).await,
        "run" => run(settings).await,
        "status" => status(settings),
        "test-connection" => test_connection(settings).await,
        other => {
            eprintln!("Unknown command '{other}'");
            eprintln!("{USAGE}");
            exit(1);
        }
    }
}

async fn serve(settings: Settings) -> Result<()> {
    let state = AppState::from_settings(settings)?;

    dashboard::serve(state).await
}

async fn run(settings: Settings) -> Result<()> {
    let transport = HttpTransport::from_settings(&settings)?;
    let ledger = Arc::new(settings.ledger());

    info!("Target endpoint: {}", transport.url());
    info!("CSV file: {}", settings.csv_path.display());
    info!("Processed ledger: {}", ledger.processed_path().display());
    info!("Failed ledger: {}", ledger.failed_path().display());

    let submitter = Arc::new(RemoteSubmitter::new(transport, settings.retry_policy()));
    let orchestrator = BatchOrchestrator::configured(&settings, ledger.clone(), submitter);

    let summary = orchestrator.run_all().await?;

    match ledger.failed_count() {
        Ok(count) => info!("Failed ledger now holds {count} entries"),
        Err(error) => warn!("{error}")
    }

    write_json_to_stdout(&summary)
}

fn status(settings: Settings) -> Result<()> {
    let status = compute_status(&settings.source(), &settings.ledger());

    write_json_to_stdout(&status)
}

async fn test_connection(settings: Settings) -> Result<()> {
    let submitter = match HttpTransport::from_settings(&settings) {
        Ok(transport) => Some(RemoteSubmitter::new(transport, settings.retry_policy())),
        Err(TransportSetupError::MissingToken) => None,
        Err(error) => return Err(error.into())
    };

    let report = check_connection(submitter.as_ref()).await;

    write_json_to_stdout(&report)
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'info'", level);
            LevelFilter::INFO
        }
    }
}

fn setup_logging(level: LevelFilter, log_file: &Path) {
    //NOTE: stdout carries the JSON results, so the terminal log goes to stderr
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    let file_log = match open_log_file(log_file) {
        Ok(file) => Some(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(level)
        ),
        Err(error) => {
            eprintln!("Unable to open log file '{}': {error}", log_file.display());
            None
        }
    };

    tracing_subscriber::registry()
        .with(terminal_log)
        .with(file_log)
        .init();
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn write_json_to_stdout<T: Serialize>(value: &T) -> Result<()> {
    let mut output = BufWriter::new(stdout().lock());

    serde_json::to_writer_pretty(&mut output, value)?;
    writeln!(output)?;

    output.flush()?;

    Ok(())
}
