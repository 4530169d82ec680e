//! Configuration commands.

use crate::config::MavcamConfig;
use crate::error::{CliError, CliResult};

/// Dump the effective configuration to stdout.
pub fn dump(config: &MavcamConfig, json: bool) -> CliResult<()> {
    if json {
        let json_str = serde_json::to_string_pretty(config)
            .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
        println!("{}", json_str);
        return Ok(());
    }

    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", MavcamConfig::default_path().display());
    println!("{}", toml_str);

    Ok(())
}

/// Show the configuration file path.
pub fn path() -> CliResult<()> {
    let config_path = MavcamConfig::default_path();
    println!("config: {}", config_path.display());
    Ok(())
}
