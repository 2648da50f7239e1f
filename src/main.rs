mod config;
mod error;
mod location;
mod payload;
mod store;
mod workflow;

use std::process::ExitCode;

use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use config::{Config, General};
use error::{Error, Result};
use store::S3Store;

fn file_appender(general: &General) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("s3drop.log")
        .build(&general.log_directory)
        .map_err(|e| {
            Error::ConfigLoad(format!(
                "cannot write logs to '{}': {}",
                general.log_directory, e
            ))
        })
}

fn init_tracing(general: &General) -> Result<WorkerGuard> {
    // Set up rolling logs
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(general)?);

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&general.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();
    Ok(guard)
}

async fn execute(config: &Config) -> Result<()> {
    let store = S3Store::from_config(&config.s3).await?;
    let report = workflow::run(config, &store).await?;
    info!(
        "Uploaded {} bytes to {}; bucket now lists {} objects",
        report.bytes_uploaded,
        report.location,
        report.after.entries.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logging depends on the config, so these failures go straight to the console.
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let _guard = match init_tracing(&config.general) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Tracing initialized");

    match execute(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
