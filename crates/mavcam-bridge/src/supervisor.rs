//! Startup sequencing and lifecycle.
//!
//! ```text
//! Idle → ConnectingIpc → Initializing → ConnectingLink → Running → Terminated
//! ```
//!
//! The camera channel is retried until it connects. The link is opened only
//! after the camera answered INITIALIZE, and a link that cannot be opened is
//! fatal.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use mavcam_protocol::CameraRequest;

use crate::config::BridgeConfig;
use crate::engine::{BridgeEngine, EngineExit};
use crate::error::{BridgeResult, IpcError, LinkError};
use crate::ipc::{CameraChannel, ChannelConnector};
use crate::link::LinkOpener;
use crate::signals::ShutdownHandle;

/// Lifecycle state of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    ConnectingIpc,
    Initializing,
    ConnectingLink,
    Running,
    Terminated,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ConnectingIpc => "connecting-ipc",
            Self::Initializing => "initializing",
            Self::ConnectingLink => "connecting-link",
            Self::Running => "running",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Drives one bridge run from startup to termination.
pub struct Supervisor<K, O> {
    config: BridgeConfig,
    connector: K,
    opener: Arc<O>,
    state: watch::Sender<BridgeState>,
}

impl<K: ChannelConnector, O: LinkOpener + 'static> Supervisor<K, O> {
    pub fn new(config: BridgeConfig, connector: K, opener: O) -> Self {
        let (state, _) = watch::channel(BridgeState::Idle);
        Self {
            config,
            connector,
            opener: Arc::new(opener),
            state,
        }
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<BridgeState> {
        self.state.subscribe()
    }

    /// Returns the current state.
    pub fn state(&self) -> BridgeState {
        *self.state.borrow()
    }

    /// Runs the bridge.
    ///
    /// Returns how the engine stopped, or an error if the link could not be
    /// opened or the camera channel failed.
    pub async fn run(&self, shutdown: ShutdownHandle) -> BridgeResult<EngineExit> {
        let result = self.run_inner(&shutdown).await;
        self.transition(BridgeState::Terminated);
        result
    }

    async fn run_inner(&self, shutdown: &ShutdownHandle) -> BridgeResult<EngineExit> {
        self.transition(BridgeState::ConnectingIpc);
        let Some(mut channel) = self.connect_camera(shutdown).await else {
            return Ok(EngineExit::Shutdown);
        };

        self.transition(BridgeState::Initializing);
        if let Some(exit) = self.initialize(&mut channel, shutdown).await? {
            return Ok(exit);
        }

        self.transition(BridgeState::ConnectingLink);
        // Opening a serial device or TCP endpoint blocks.
        let opener = Arc::clone(&self.opener);
        let config = self.config.clone();
        let opened = tokio::task::spawn_blocking(move || opener.open(&config))
            .await
            .map_err(|e| LinkError::Io(io::Error::other(e)))
            .and_then(|opened| opened)
            .inspect_err(|e| {
                error!(endpoint = %self.config.endpoint, error = %e, "Cannot open FCU link");
            })?;

        self.transition(BridgeState::Running);
        BridgeEngine::new(channel, opened.link)
            .with_request_queue_depth(self.config.request_queue_depth)
            .run(opened.events, shutdown.wait())
            .await
    }

    /// Connects the camera channel, retrying every `reconnect_interval`.
    ///
    /// Returns `None` if shutdown completes first.
    async fn connect_camera(&self, shutdown: &ShutdownHandle) -> Option<K::Channel> {
        let channel_name = &self.config.channel_name;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match self.connector.connect().await {
                Ok(channel) => {
                    info!(channel = %channel_name, attempts, "Connected to camera server");
                    return Some(channel);
                }
                Err(e) if attempts == 1 => {
                    warn!(
                        channel = %channel_name,
                        error = %e,
                        retry_in = ?self.config.reconnect_interval,
                        "Cannot connect camera server, retrying"
                    );
                }
                Err(e) => {
                    debug!(
                        channel = %channel_name,
                        error = %e,
                        attempts,
                        "Camera server still unavailable"
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_interval) => {}
                _ = shutdown.wait().wait() => {
                    info!("Shutdown requested while waiting for camera server");
                    return None;
                }
            }
        }
    }

    /// Sends INITIALIZE and waits for its response.
    ///
    /// A non-zero result is logged and startup continues.
    async fn initialize(
        &self,
        channel: &mut K::Channel,
        shutdown: &ShutdownHandle,
    ) -> BridgeResult<Option<EngineExit>> {
        let request = CameraRequest::initialize();
        match channel.send_request(&request).await {
            Ok(()) => {}
            Err(IpcError::ChannelClosed) => return Ok(Some(EngineExit::ChannelClosed)),
            Err(e) => return Err(e.into()),
        }

        let response = tokio::select! {
            response = channel.receive_response() => response,
            _ = shutdown.wait().wait() => return Ok(Some(EngineExit::Shutdown)),
        };

        match response {
            Ok(Some(response)) if response.is_success() => {
                info!("Camera initialized");
            }
            Ok(Some(response)) => {
                warn!(
                    result = response.result,
                    "Camera initialization reported failure, continuing"
                );
            }
            Ok(None) => {
                info!("Camera server hung up during initialization");
                return Ok(Some(EngineExit::ChannelClosed));
            }
            Err(IpcError::Protocol(e)) => {
                warn!(error = %e, "Malformed initialization response, continuing");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(None)
    }

    fn transition(&self, next: BridgeState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Bridge state");
        }
    }
}
