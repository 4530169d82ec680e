//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// mavcam - MAVLink to camera-control bridge
#[derive(Debug, Parser)]
#[command(name = "mavcam")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "MAVCAM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    // --- Link flags ---
    /// Serial device of the flight controller, optionally with `:baud`
    #[arg(long, short, group = "link", global = true)]
    pub device: Option<String>,

    /// Full MAVLink address (e.g. `udpin:0.0.0.0:14550`)
    #[arg(long, group = "link", global = true)]
    pub url: Option<String>,

    /// Connect to a local simulator on udpin:127.0.0.1:14540
    #[arg(long, group = "link", global = true)]
    pub sitl: bool,

    /// MAVLink protocol version (`v1.0` or `v2.0`)
    #[arg(long, global = true)]
    pub protocol_version: Option<String>,

    // --- Camera flags ---
    /// Abstract socket name of the camera channel
    #[arg(long, env = "MAVCAM_SOCKET_NAME", global = true)]
    pub socket_name: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge in the foreground (default)
    Run,

    /// Serve the camera channel with an in-memory camera
    CameraSim,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration
    Dump {
        /// Print JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Show configuration file path
    Path,
}
