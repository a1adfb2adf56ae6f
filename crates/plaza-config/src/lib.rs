//! Configuration system for the Plaza server.
//!
//! Settings persist to disk as RON, take CLI overrides via clap, and
//! tolerate missing or unknown fields so old config files keep working.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CityConfig, Config, DebugConfig, NetworkConfig, default_config_dir};
pub use error::ConfigError;
