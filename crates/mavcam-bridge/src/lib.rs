//! MAVLink ↔ camera bridge.
//!
//! This crate connects one flight controller to one camera-control process:
//! - [`ipc`]: the seqpacket camera channel (bridge side)
//! - [`link`]: the MAVLink link and its inbound event stream
//! - [`translator`]: pure MAVLink ↔ camera record mapping
//! - [`engine`]: strict request/response alternation over the channel
//! - [`supervisor`]: startup sequencing and lifecycle
//! - [`camera_server`] and [`camera_sim`]: the camera side, for bench use
//!
//! # Example
//!
//! ```rust,no_run
//! use mavcam_bridge::{
//!     BridgeConfig, Endpoint, MavlinkOpener, SeqpacketConnector, SignalHandler, Supervisor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig::new(Endpoint::sitl());
//!     let connector = SeqpacketConnector::new(config.channel_name.clone());
//!     let supervisor = Supervisor::new(config, connector, MavlinkOpener);
//!
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!     let exit = supervisor.run(signals.shutdown_handle()).await?;
//!     println!("bridge stopped: {exit:?}");
//!     Ok(())
//! }
//! ```

pub mod camera_server;
pub mod camera_sim;
pub mod config;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod link;
pub mod signals;
pub mod supervisor;
pub mod translator;

#[cfg(test)]
mod testing;

pub use camera_server::{CameraConnection, CameraServer};
pub use camera_sim::{SIM_FAILURE, SimulatedCamera};
pub use config::{
    BridgeConfig, DEFAULT_COMPONENT_ID, DEFAULT_PROTOCOL_VERSION, DEFAULT_SYSTEM_ID,
    MIN_RECONNECT_INTERVAL,
};
pub use engine::{BridgeEngine, EngineExit};
pub use error::{BridgeError, BridgeResult, IpcError, IpcResult, LinkError, LinkResult};
pub use ipc::{CameraChannel, ChannelConnector, SeqpacketChannel, SeqpacketConnector};
pub use link::{
    DEFAULT_BAUD, Endpoint, LinkEvent, LinkOpener, MavlinkLink, MavlinkOpener, OpenedLink,
    WireLink, select_protocol_version,
};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};
pub use supervisor::{BridgeState, Supervisor};
