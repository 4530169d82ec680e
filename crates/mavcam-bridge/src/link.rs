//! MAVLink link to the flight controller.
//!
//! The `mavlink` crate owns framing, CRC and the physical transport. This
//! module adds the bridge's identity (system/component id and sequence
//! numbers), protocol-version selection, and inbound delivery: a dedicated
//! receive thread decodes frames and queues them as [`LinkEvent`]s for a
//! single consumer, so inbound handling is serialized.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use mavlink::common::MavMessage;
use mavlink::error::MessageReadError;
use mavlink::{MavConnection, MavHeader, MavlinkVersion, Message};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::BridgeConfig;
use crate::error::{LinkError, LinkResult};

/// Baud rate used when a serial device is given without one.
pub const DEFAULT_BAUD: u32 = 57600;

const SCHEMES: &[&str] = &["serial", "udpin", "udpout", "udpbcast", "tcpin", "tcpout"];

/// A MAVLink connection address in `mavlink::connect` syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    /// Validates a full address such as `udpin:0.0.0.0:14550`.
    pub fn new(address: impl Into<String>) -> LinkResult<Self> {
        let address = address.into();
        let valid = address
            .split_once(':')
            .is_some_and(|(scheme, rest)| SCHEMES.contains(&scheme) && !rest.is_empty());
        if !valid {
            return Err(LinkError::InvalidEndpoint(format!(
                "{address:?} (expected one of {} followed by ':')",
                SCHEMES.join(", ")
            )));
        }
        Ok(Self(address))
    }

    /// Builds a serial endpoint from `path` or `path:baud`.
    pub fn serial_device(device: &str) -> LinkResult<Self> {
        let (path, baud) = match device.rsplit_once(':') {
            Some((path, baud)) => {
                let baud = baud.parse::<u32>().map_err(|_| {
                    LinkError::InvalidEndpoint(format!("bad baud rate in {device:?}"))
                })?;
                (path, baud)
            }
            None => (device, DEFAULT_BAUD),
        };
        if path.is_empty() {
            return Err(LinkError::InvalidEndpoint("empty serial device path".into()));
        }
        Ok(Self(format!("serial:{path}:{baud}")))
    }

    /// Local simulator (SITL) endpoint.
    pub fn sitl() -> Self {
        Self("udpin:127.0.0.1:14540".to_string())
    }

    /// Returns the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self(format!("serial:/dev/ttyUSB0:{DEFAULT_BAUD}"))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a configured version string onto a MAVLink version.
///
/// Unknown strings fall back to MAVLink 1 with a warning.
pub fn select_protocol_version(requested: &str) -> MavlinkVersion {
    match requested {
        "v1.0" => MavlinkVersion::V1,
        "v2.0" => MavlinkVersion::V2,
        other => {
            warn!(
                requested = %other,
                "Unknown FCU protocol, expected \"v1.0\" or \"v2.0\"; using v1.0"
            );
            MavlinkVersion::V1
        }
    }
}

/// Something that happened on the inbound side of the link.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A fully decoded message.
    Message {
        header: MavHeader,
        message: MavMessage,
    },
    /// The link is gone. Always the last event.
    Closed { reason: String },
}

/// Outbound half of the flight-controller link.
pub trait WireLink: Send + Sync + 'static {
    /// Sends one message. There is no delivery confirmation.
    fn send(&self, message: &MavMessage) -> LinkResult<()>;
}

/// An open link together with its inbound event stream.
pub struct OpenedLink<L> {
    pub link: Arc<L>,
    pub events: mpsc::Receiver<LinkEvent>,
}

/// Opens the flight-controller link during startup.
pub trait LinkOpener: Send + Sync {
    type Link: WireLink;

    /// Opens the link, selects the protocol version and starts inbound delivery.
    fn open(&self, config: &BridgeConfig) -> LinkResult<OpenedLink<Self::Link>>;
}

/// Opens real [`MavlinkLink`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MavlinkOpener;

impl LinkOpener for MavlinkOpener {
    type Link = MavlinkLink;

    fn open(&self, config: &BridgeConfig) -> LinkResult<OpenedLink<MavlinkLink>> {
        let mut link = MavlinkLink::open(&config.endpoint, config.system_id, config.component_id)?;
        link.set_protocol_version(&config.protocol_version);

        let link = Arc::new(link);
        let events = link.spawn_receiver(config.event_queue_depth)?;
        Ok(OpenedLink { link, events })
    }
}

/// Link backed by a `mavlink` crate connection.
pub struct MavlinkLink {
    connection: Box<dyn MavConnection<MavMessage> + Send + Sync>,
    endpoint: Endpoint,
    system_id: u8,
    component_id: u8,
    sequence: AtomicU8,
}

impl MavlinkLink {
    /// Opens the serial device or network endpoint.
    pub fn open(endpoint: &Endpoint, system_id: u8, component_id: u8) -> LinkResult<Self> {
        let connection = mavlink::connect::<MavMessage>(endpoint.as_str())
            .map_err(|e| LinkError::device(endpoint.as_str(), e))?;

        info!(
            endpoint = %endpoint,
            system_id,
            component_id,
            "Connected to FCU"
        );

        Ok(Self {
            connection,
            endpoint: endpoint.clone(),
            system_id,
            component_id,
            sequence: AtomicU8::new(0),
        })
    }

    /// Selects framing for outbound messages.
    pub fn set_protocol_version(&mut self, requested: &str) -> MavlinkVersion {
        let version = select_protocol_version(requested);
        self.connection.set_protocol_version(version);
        debug!(endpoint = %self.endpoint, ?version, "Protocol version selected");
        version
    }

    /// Starts the receive thread.
    ///
    /// The thread blocks in `recv` and ends after queueing
    /// [`LinkEvent::Closed`] or once the receiver is dropped.
    pub fn spawn_receiver(self: &Arc<Self>, depth: usize) -> LinkResult<mpsc::Receiver<LinkEvent>> {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let link = Arc::clone(self);

        std::thread::Builder::new()
            .name("mavlink-rx".to_string())
            .spawn(move || link.receive_loop(tx))?;

        Ok(rx)
    }

    fn receive_loop(&self, tx: mpsc::Sender<LinkEvent>) {
        loop {
            match self.connection.recv() {
                Ok((header, message)) => {
                    trace!(
                        system_id = header.system_id,
                        component_id = header.component_id,
                        message_id = message.message_id(),
                        "Inbound message"
                    );
                    if tx.blocking_send(LinkEvent::Message { header, message }).is_err() {
                        debug!("Inbound consumer gone, stopping receive thread");
                        return;
                    }
                }
                Err(MessageReadError::Io(e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock
                            | std::io::ErrorKind::TimedOut
                            | std::io::ErrorKind::Interrupted
                    ) => {}
                Err(MessageReadError::Io(e)) => {
                    let _ = tx.blocking_send(LinkEvent::Closed {
                        reason: e.to_string(),
                    });
                    return;
                }
                Err(e) => {
                    debug!(error = %e, "Discarding undecodable frame");
                }
            }
        }
    }

    fn next_header(&self) -> MavHeader {
        MavHeader {
            system_id: self.system_id,
            component_id: self.component_id,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl WireLink for MavlinkLink {
    fn send(&self, message: &MavMessage) -> LinkResult<()> {
        self.connection
            .send(&self.next_header(), message)
            .map(|_| ())
            .map_err(|e| LinkError::Send(e.to_string()))
    }
}
