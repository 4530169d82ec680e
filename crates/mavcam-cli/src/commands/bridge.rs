//! Bridge command: runs the bridge in the foreground.
//!
//! Wires the signal handler, the seqpacket connector and the MAVLink opener
//! into a [`Supervisor`] and blocks until the bridge terminates.

use tracing::info;

use mavcam_bridge::{
    EngineExit, MavlinkOpener, SeqpacketConnector, SignalHandler, Supervisor,
};

use crate::config::MavcamConfig;
use crate::error::CliResult;

/// Runs the bridge until the link closes, the camera hangs up or a signal
/// arrives.
///
/// Every one of those endings is a normal exit; only startup failures are
/// errors.
pub async fn run(config: &MavcamConfig) -> CliResult<EngineExit> {
    let bridge_config = config.to_bridge_config()?;

    info!(
        endpoint = %bridge_config.endpoint,
        channel = %bridge_config.channel_name,
        protocol = %bridge_config.protocol_version,
        "Starting bridge"
    );

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener();

    let connector = SeqpacketConnector::new(bridge_config.channel_name.clone());
    let supervisor = Supervisor::new(bridge_config, connector, MavlinkOpener);

    let exit = supervisor.run(signal_handler.shutdown_handle()).await?;
    match exit {
        EngineExit::LinkClosed => info!("FCU link closed, bridge stopped"),
        EngineExit::ChannelClosed => info!("Camera server hung up, bridge stopped"),
        EngineExit::Shutdown => info!("Bridge shut down"),
    }
    Ok(exit)
}
