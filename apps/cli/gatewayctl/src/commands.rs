//! Subcommand execution.
//!
//! One-shot commands connect, run a single gateway operation, print the
//! result to stdout and disconnect. `watch` stays connected until Ctrl-C.

use crate::cli::{Cli, Command};
use crate::error::GatewayCtlError;

use common::{ErrorLocation, RedactedToken};

use gateway_core::api::{AgentFilesClient, ConfigClient, StatusClient};
use gateway_core::{ClientConfig, GatewayEvent, GatewaySession, SessionConfig};

use std::panic::Location;

use log::{info, warn};
use serde_json::{Value, json};

/// Where to connect and with what.
pub struct Target {
    pub url: String,
    pub token: RedactedToken,
}

/// What a one-shot command prints.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Json(Value),
    Text(String),
}

/// Pick the gateway URL (flag over config) and the token (flag or env only).
pub fn resolve_target(cli: &Cli, config: &ClientConfig) -> Result<Target, GatewayCtlError> {
    let url = cli
        .url
        .clone()
        .or_else(|| config.gateway.url.clone())
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| GatewayCtlError::MissingSetting {
            message: "No gateway URL: pass --url or run `gatewayctl set-url <url>`".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let token = cli
        .token
        .as_deref()
        .filter(|token| !token.is_empty())
        .map(RedactedToken::from)
        .ok_or_else(|| GatewayCtlError::MissingSetting {
            message: "No gateway token: pass --token or set GATEWAY_TOKEN".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(Target { url, token })
}

/// Run `cli.command` against the config in `cli.resolve_config_dir()`.
pub async fn run(cli: &Cli) -> Result<(), GatewayCtlError> {
    let config_dir = cli.resolve_config_dir();
    let mut config = ClientConfig::load(&config_dir)?;

    if let Command::SetUrl { url } = &cli.command {
        config.gateway.url = Some(url.clone());
        config.save(&config_dir)?;
        println!("Gateway URL saved: {url}");
        return Ok(());
    }

    let target = resolve_target(cli, &config)?;
    let session = GatewaySession::new(SessionConfig::from(&config));

    if cli.command == Command::Watch {
        return watch(&session, &target).await;
    }

    info!("Connecting to {}", target.url);
    session.connect(&target.url, target.token.clone()).await?;
    let result = execute(&session, &cli.command).await;
    session.disconnect().await;

    match result? {
        Output::Json(value) => println!("{}", pretty(&value)),
        Output::Text(text) => println!("{text}"),
    }
    Ok(())
}

/// Run one gateway operation on a connected session.
pub async fn execute(session: &GatewaySession, command: &Command) -> Result<Output, GatewayCtlError> {
    let output = match command {
        Command::Status => Output::Json(StatusClient::new(session.clone()).status().await?),
        Command::Health => Output::Json(StatusClient::new(session.clone()).health().await?),
        Command::Sessions => Output::Json(StatusClient::new(session.clone()).sessions().await?),
        Command::ConfigGet => {
            let snapshot = ConfigClient::new(session.clone()).get().await?;
            Output::Json(json!({
                "hash": snapshot.hash,
                "config": snapshot.parsed_or_lenient(),
                "raw": snapshot.raw,
            }))
        }
        Command::Files { agent } => {
            let files = AgentFilesClient::new(session.clone()).list_files(agent).await?;
            Output::Json(to_json(&files)?)
        }
        Command::File { agent, name } => {
            Output::Text(AgentFilesClient::new(session.clone()).read_file(agent, name).await?)
        }
        Command::Watch | Command::SetUrl { .. } => {
            return Err(GatewayCtlError::Gatewayctl {
                message: format!("{command:?} is not a one-shot command"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    };
    Ok(output)
}

/// Print status changes and events until Ctrl-C.
async fn watch(session: &GatewaySession, target: &Target) -> Result<(), GatewayCtlError> {
    session.on_status_change(|status| println!("status: {status}"));
    session.on_any(|event: &GatewayEvent| println!("{}", event_line(event)));

    session.connect(&target.url, target.token.clone()).await?;
    info!("Watching {} (Ctrl-C to stop)", target.url);

    let interrupted = tokio::signal::ctrl_c().await;
    session.disconnect().await;
    interrupted.map_err(|e| GatewayCtlError::Gatewayctl {
        message: format!("Failed to listen for Ctrl-C: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// One line per event: name, sequence number when present, payload.
pub fn event_line(event: &GatewayEvent) -> String {
    let payload = event
        .payload
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| "{}".to_string());
    match event.seq {
        Some(seq) => format!("event {} #{seq} {payload}", event.event),
        None => format!("event {} {payload}", event.event),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, GatewayCtlError> {
    serde_json::to_value(value).map_err(|e| GatewayCtlError::Gatewayctl {
        message: format!("Failed to encode output: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        warn!("Failed to pretty-print output: {e}");
        value.to_string()
    })
}
