//! CLI configuration.
//!
//! Settings live in an optional `config.toml` at
//! `~/.config/mavcam/config.toml` by default. Command-line flags override the
//! file, and the merged result is turned into a [`BridgeConfig`].
//!
//! ```toml
//! [link]
//! device = "/dev/ttyACM0:57600"
//! protocol_version = "v2.0"
//!
//! [camera]
//! socket_name = "mavlink2cam"
//! reconnect_interval_secs = 1
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mavcam_bridge::{
    BridgeConfig, DEFAULT_COMPONENT_ID, DEFAULT_PROTOCOL_VERSION, DEFAULT_SYSTEM_ID, Endpoint,
};
use mavcam_protocol::DEFAULT_CHANNEL_NAME;

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Configuration for the mavcam CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MavcamConfig {
    /// Debug mode.
    pub debug: bool,

    /// Flight-controller link settings.
    pub link: LinkSettings,

    /// Camera channel settings.
    pub camera: CameraSettings,
}

/// Flight-controller link settings.
///
/// At most one of `url`, `device` and `sitl` should be set; `url` wins, then
/// `device`, then `sitl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Serial device, optionally with `:baud`.
    pub device: Option<String>,

    /// Full MAVLink address.
    pub url: Option<String>,

    /// Use the local simulator endpoint.
    pub sitl: bool,

    /// `v1.0` or `v2.0`.
    pub protocol_version: String,

    pub system_id: u8,

    pub component_id: u8,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            device: None,
            url: None,
            sitl: false,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            system_id: DEFAULT_SYSTEM_ID,
            component_id: DEFAULT_COMPONENT_ID,
        }
    }
}

impl LinkSettings {
    /// Resolves the configured endpoint.
    pub fn endpoint(&self) -> CliResult<Endpoint> {
        let endpoint = if let Some(ref url) = self.url {
            Endpoint::new(url.as_str())?
        } else if let Some(ref device) = self.device {
            Endpoint::serial_device(device)?
        } else if self.sitl {
            Endpoint::sitl()
        } else {
            Endpoint::default()
        };
        Ok(endpoint)
    }
}

/// Camera channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Abstract socket name shared with the camera process.
    pub socket_name: String,

    /// Seconds between connection attempts (minimum 1).
    pub reconnect_interval_secs: u64,

    /// Requests that may queue behind the outstanding one.
    pub request_queue_depth: usize,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            socket_name: DEFAULT_CHANNEL_NAME.to_string(),
            reconnect_interval_secs: 1,
            request_queue_depth: 16,
        }
    }
}

impl MavcamConfig {
    /// Loads configuration from the default path, if the file exists.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mavcam")
    }

    /// Applies command-line overrides.
    ///
    /// A link flag on the command line replaces every link selection from the
    /// file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if cli.debug {
            self.debug = true;
        }

        if cli.device.is_some() || cli.url.is_some() || cli.sitl {
            self.link.device = cli.device.clone();
            self.link.url = cli.url.clone();
            self.link.sitl = cli.sitl;
        }
        if let Some(ref version) = cli.protocol_version {
            self.link.protocol_version = version.clone();
        }
        if let Some(ref name) = cli.socket_name {
            self.camera.socket_name = name.clone();
        }
    }

    /// Builds the bridge configuration.
    pub fn to_bridge_config(&self) -> CliResult<BridgeConfig> {
        if self.camera.socket_name.is_empty() {
            return Err(CliError::Config("camera socket_name must not be empty".into()));
        }

        Ok(BridgeConfig::new(self.link.endpoint()?)
            .with_channel_name(self.camera.socket_name.clone())
            .with_identity(self.link.system_id, self.link.component_id)
            .with_protocol_version(self.link.protocol_version.clone())
            .with_reconnect_interval(Duration::from_secs(self.camera.reconnect_interval_secs))
            .with_request_queue_depth(self.camera.request_queue_depth))
    }
}
