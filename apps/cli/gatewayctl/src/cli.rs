//! Command line of `gatewayctl`.

use crate::APP_NAME;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Operator CLI for an OpenClaw-style gateway
#[derive(Parser, Debug)]
#[command(name = "gatewayctl")]
#[command(about = "Query and watch a gateway over its WebSocket protocol")]
#[command(version)]
pub struct Cli {
    /// Directory holding config.json and the log file
    ///
    /// Defaults to the platform config directory, e.g. ~/.config/gatewayctl.
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Gateway address (ws://, wss://, http://, https:// or host:port)
    ///
    /// Overrides `gateway.url` from the config file.
    #[arg(long)]
    pub url: Option<String>,

    /// Gateway auth token. Never written to disk.
    #[arg(long, env = "GATEWAY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the gateway status object
    Status,

    /// Print the gateway health object
    Health,

    /// List gateway sessions
    Sessions,

    /// Print the gateway config document and its hash
    #[command(name = "config-get")]
    ConfigGet,

    /// List an agent's workspace files
    Files {
        /// Agent id
        agent: String,
    },

    /// Print one agent file (empty if missing)
    File {
        /// Agent id
        agent: String,

        /// File name, e.g. AGENTS.md
        name: String,
    },

    /// Print status changes and every gateway event until Ctrl-C
    Watch,

    /// Store the gateway URL in config.json
    #[command(name = "set-url")]
    SetUrl {
        /// Gateway address to store
        url: String,
    },
}

impl Cli {
    /// `--config-dir`, or the platform default.
    pub fn resolve_config_dir(&self) -> PathBuf {
        self.config_dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_NAME)
        })
    }
}
