//! Bridge error types.

use std::io;
use thiserror::Error;

/// Result type for camera channel operations.
pub type IpcResult<T> = Result<T, IpcError>;

/// Result type for MAVLink link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors on the camera channel.
#[derive(Debug, Error)]
pub enum IpcError {
    /// Nobody is listening on the channel name.
    #[error("camera channel refused connection: {name}")]
    ConnectionRefused { name: String },

    /// The channel name does not exist.
    #[error("camera channel not found: {name}")]
    NotFound { name: String },

    /// The peer went away.
    #[error("camera channel closed")]
    ChannelClosed,

    /// The channel name is already bound by another process.
    #[error("camera channel name already in use: {name}")]
    AddressInUse { name: String },

    /// Malformed record.
    #[error("Protocol error: {0}")]
    Protocol(#[from] mavcam_protocol::ProtocolError),

    /// Any other socket failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl IpcError {
    /// Maps a `connect` failure onto the channel taxonomy.
    pub fn from_connect(name: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused { name: name.into() },
            io::ErrorKind::NotFound => Self::NotFound { name: name.into() },
            _ => Self::Io(err),
        }
    }

    /// Maps a `send`/`recv` failure, folding peer hang-ups into `ChannelClosed`.
    pub fn from_transfer(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::NotConnected => Self::ChannelClosed,
            _ => Self::Io(err),
        }
    }
}

/// Errors on the MAVLink link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The serial device or network endpoint cannot be opened.
    #[error("cannot open MAVLink endpoint {endpoint}: {source}")]
    Device {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Endpoint descriptor could not be parsed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A frame could not be written.
    #[error("failed to send MAVLink message: {0}")]
    Send(String),

    /// Any other IO failure (receive thread spawn, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LinkError {
    /// Creates a device error.
    pub fn device(endpoint: impl Into<String>, source: io::Error) -> Self {
        Self::Device {
            endpoint: endpoint.into(),
            source,
        }
    }
}

/// Errors that stop the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Camera channel failure.
    #[error("camera channel: {0}")]
    Ipc(#[from] IpcError),

    /// MAVLink link failure.
    #[error("MAVLink link: {0}")]
    Link(#[from] LinkError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl BridgeError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
