//! Command-line argument parsing for the Plaza server.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Plaza server command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "plaza", about = "Shared-world synchronization server")]
pub struct CliArgs {
    /// Address to bind the game listener to.
    #[arg(long)]
    pub bind: Option<String>,

    /// Game listener port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Health endpoint port.
    #[arg(long)]
    pub health_port: Option<u16>,

    /// Maximum concurrent connections.
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// City generator seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref bind) = args.bind {
            self.network.bind_address = bind.clone();
        }
        if let Some(port) = args.port {
            self.network.port = port;
        }
        if let Some(port) = args.health_port {
            self.network.health_port = port;
        }
        if let Some(max) = args.max_connections {
            self.network.max_connections = max;
        }
        if let Some(seed) = args.seed {
            self.city.seed = Some(seed);
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
