//! Bridge configuration.

use std::time::Duration;

use mavcam_protocol::DEFAULT_CHANNEL_NAME;

use crate::link::Endpoint;

/// MAVLink system id of the flight controller and of this bridge.
pub const DEFAULT_SYSTEM_ID: u8 = 1;

/// `MAV_COMP_ID_CAMERA`.
pub const DEFAULT_COMPONENT_ID: u8 = 100;

/// Protocol version selected when none is configured.
pub const DEFAULT_PROTOCOL_VERSION: &str = "v2.0";

/// Shortest camera reconnect interval accepted.
pub const MIN_RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Abstract socket name of the camera channel.
    pub channel_name: String,

    /// Flight-controller endpoint.
    pub endpoint: Endpoint,

    /// Local MAVLink system id.
    pub system_id: u8,

    /// Local MAVLink component id.
    pub component_id: u8,

    /// Requested MAVLink protocol version (`v1.0` or `v2.0`).
    pub protocol_version: String,

    /// Wait between camera connect attempts.
    pub reconnect_interval: Duration,

    /// Camera requests that may queue behind the outstanding one.
    pub request_queue_depth: usize,

    /// Inbound MAVLink messages buffered between the receive thread and the
    /// dispatcher.
    pub event_queue_depth: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            endpoint: Endpoint::default(),
            system_id: DEFAULT_SYSTEM_ID,
            component_id: DEFAULT_COMPONENT_ID,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            reconnect_interval: MIN_RECONNECT_INTERVAL,
            request_queue_depth: 16,
            event_queue_depth: 64,
        }
    }
}

impl BridgeConfig {
    /// Creates a configuration for the given endpoint.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Default::default()
        }
    }

    /// Builder: set the camera channel name.
    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    /// Builder: set the MAVLink identity.
    pub fn with_identity(mut self, system_id: u8, component_id: u8) -> Self {
        self.system_id = system_id;
        self.component_id = component_id;
        self
    }

    /// Builder: set the protocol version string.
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Builder: set the reconnect interval, clamped to at least one second.
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval.max(MIN_RECONNECT_INTERVAL);
        self
    }

    /// Builder: set the request queue depth (at least 1).
    pub fn with_request_queue_depth(mut self, depth: usize) -> Self {
        self.request_queue_depth = depth.max(1);
        self
    }
}
