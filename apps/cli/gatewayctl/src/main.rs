use gatewayctl::cli::Cli;
use gatewayctl::commands::run;
use gatewayctl::error::GatewayCtlError;
use gatewayctl::logger::initialize as LoggerInitialize;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match start(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("gatewayctl: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn start(cli: &Cli) -> Result<(), GatewayCtlError> {
    let config_dir = cli.resolve_config_dir();

    create_dir_all(&config_dir).map_err(|e| GatewayCtlError::Gatewayctl {
        message: format!("Failed to create config directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Logger first, so config loading is logged too.
    LoggerInitialize(&config_dir, cli.verbose)?;
    info!("Config directory: {}", config_dir.display());

    run(cli).await
}
