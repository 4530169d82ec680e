//! mavcam CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use mavcam_cli::cli::{Cli, Command, ConfigAction, LogFormat};
use mavcam_cli::commands;
use mavcam_cli::config::MavcamConfig;
use mavcam_cli::error::{CliError, CliResult};
use mavcam_core::{TracingConfig, TracingOutputFormat, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // --debug picks the compact debug profile unless a format is forced.
    let mut tracing_config = if config.debug {
        TracingConfig::debug()
    } else {
        TracingConfig::default()
    };
    match cli.log_format {
        LogFormat::Pretty => {}
        LogFormat::Compact => {
            tracing_config = tracing_config.with_format(TracingOutputFormat::Compact);
        }
        LogFormat::Json => {
            tracing_config =
                TracingConfig::service().with_level(tracing_config.default_level);
        }
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> CliResult<MavcamConfig> {
    let mut config = match cli.config {
        Some(ref path) => MavcamConfig::load_from(path),
        None => MavcamConfig::load(),
    }
    .map_err(CliError::Config)?;

    config.apply_cli(cli);
    Ok(config)
}

async fn run(cli: Cli, config: MavcamConfig) -> CliResult<()> {
    match cli.command {
        None | Some(Command::Run) => commands::bridge::run(&config).await.map(|_| ()),
        Some(Command::CameraSim) => commands::camera_sim::run(&config).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump { json } => commands::config::dump(&config, json),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
