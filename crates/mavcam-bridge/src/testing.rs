//! In-process doubles for the camera channel and the MAVLink link.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mavlink::MavHeader;
use mavlink::common::MavMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use mavcam_protocol::{CameraRequest, CameraResponse};

use crate::camera_sim::SimulatedCamera;
use crate::error::{IpcError, IpcResult, LinkResult};
use crate::ipc::CameraChannel;
use crate::link::{LinkEvent, WireLink};

/// One observed channel operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOp {
    Write(String),
    Read(String),
}

/// Channel whose far end is a task. Records every write and read.
pub struct MockChannel {
    requests: mpsc::UnboundedSender<CameraRequest>,
    responses: mpsc::UnboundedReceiver<CameraResponse>,
    log: Arc<Mutex<Vec<ChannelOp>>>,
    outstanding: bool,
    overlapped: Arc<Mutex<bool>>,
}

/// Observer for a [`MockChannel`] after it has been moved into the engine.
#[derive(Clone)]
pub struct ChannelRecorder {
    log: Arc<Mutex<Vec<ChannelOp>>>,
    overlapped: Arc<Mutex<bool>>,
}

impl ChannelRecorder {
    pub fn ops(&self) -> Vec<ChannelOp> {
        self.log.lock().unwrap().clone()
    }

    /// True if a request was written while another was unanswered.
    pub fn overlapped(&self) -> bool {
        *self.overlapped.lock().unwrap()
    }
}

impl CameraChannel for MockChannel {
    async fn send_request(&mut self, request: &CameraRequest) -> IpcResult<()> {
        if self.outstanding {
            *self.overlapped.lock().unwrap() = true;
        }
        self.outstanding = true;
        self.log
            .lock()
            .unwrap()
            .push(ChannelOp::Write(request.command.to_string()));
        self.requests
            .send(request.clone())
            .map_err(|_| IpcError::ChannelClosed)
    }

    async fn receive_response(&mut self) -> IpcResult<Option<CameraResponse>> {
        let response = self.responses.recv().await;
        if let Some(response) = &response {
            self.outstanding = false;
            self.log
                .lock()
                .unwrap()
                .push(ChannelOp::Read(response.command.to_string()));
        }
        Ok(response)
    }
}

/// Camera end of a [`MockChannel`].
pub struct MockCameraEnd {
    pub requests: mpsc::UnboundedReceiver<CameraRequest>,
    pub responses: mpsc::UnboundedSender<CameraResponse>,
}

/// Creates a channel with a manually driven camera end.
pub fn mock_channel() -> (MockChannel, MockCameraEnd, ChannelRecorder) {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = mpsc::unbounded_channel();
    let log = Arc::new(Mutex::new(Vec::new()));
    let overlapped = Arc::new(Mutex::new(false));

    let channel = MockChannel {
        requests: req_tx,
        responses: resp_rx,
        log: Arc::clone(&log),
        outstanding: false,
        overlapped: Arc::clone(&overlapped),
    };
    let end = MockCameraEnd {
        requests: req_rx,
        responses: resp_tx,
    };
    (channel, end, ChannelRecorder { log, overlapped })
}

/// Creates a channel answered by a [`SimulatedCamera`] after `delay`.
pub fn simulated_channel(
    delay: Duration,
) -> (MockChannel, ChannelRecorder, JoinHandle<SimulatedCamera>) {
    let (channel, mut end, recorder) = mock_channel();
    let camera = tokio::spawn(async move {
        let mut camera = SimulatedCamera::new();
        while let Some(request) = end.requests.recv().await {
            tokio::time::sleep(delay).await;
            if end.responses.send(camera.handle(&request)).is_err() {
                break;
            }
        }
        camera
    });
    (channel, recorder, camera)
}

/// Link that records outbound messages.
#[derive(Default)]
pub struct RecordingLink {
    sent: Mutex<Vec<MavMessage>>,
}

impl RecordingLink {
    pub fn sent(&self) -> Vec<MavMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Waits until at least `count` messages went out.
    pub async fn wait_for(&self, count: usize) -> Vec<MavMessage> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let sent = self.sent();
                if sent.len() >= count {
                    return sent;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for outbound messages")
    }
}

impl WireLink for RecordingLink {
    fn send(&self, message: &MavMessage) -> LinkResult<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Wraps a message as an inbound event from `system_id`.
pub fn inbound(system_id: u8, message: MavMessage) -> LinkEvent {
    LinkEvent::Message {
        header: MavHeader {
            system_id,
            component_id: 1,
            sequence: 0,
        },
        message,
    }
}
