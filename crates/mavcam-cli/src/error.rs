//! CLI error types.

use std::fmt;

use mavcam_bridge::{BridgeError, IpcError, LinkError};

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// Bridge failure.
    Bridge(BridgeError),
    /// Camera simulator failure.
    Camera(IpcError),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Bridge(err) => write!(f, "bridge error: {}", err),
            Self::Camera(err) => write!(f, "camera simulator error: {}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bridge(err) => Some(err),
            Self::Camera(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<BridgeError> for CliError {
    fn from(err: BridgeError) -> Self {
        Self::Bridge(err)
    }
}

impl From<IpcError> for CliError {
    fn from(err: IpcError) -> Self {
        Self::Camera(err)
    }
}

impl From<LinkError> for CliError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::InvalidEndpoint(msg) => Self::Config(format!("invalid endpoint: {}", msg)),
            other => Self::Bridge(BridgeError::Link(other)),
        }
    }
}
