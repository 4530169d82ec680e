//! The running bridge.
//!
//! Two tasks cooperate:
//! - the dispatcher drains inbound link events, echoes heartbeats directly
//!   and queues camera requests in arrival order;
//! - the engine loop owns the camera channel and alternates strictly: write
//!   one request, wait for its response, translate, send, then take the next
//!   request.
//!
//! Because only the engine loop touches the channel and it never writes
//! while a response is pending, responses pair with requests by order alone.

use std::sync::Arc;

use mavlink::Message;
use mavlink::common::MavMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use mavcam_protocol::{CameraRequest, CameraResponse};

use crate::error::{BridgeResult, IpcError, IpcResult};
use crate::ipc::CameraChannel;
use crate::link::{LinkEvent, WireLink};
use crate::signals::ShutdownSignal;
use crate::translator::{heartbeat_echo, inbound_to_requests, response_to_outbound};

/// Why the engine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExit {
    /// The flight-controller link closed.
    LinkClosed,
    /// The camera process hung up.
    ChannelClosed,
    /// Shutdown was requested.
    Shutdown,
}

enum Step {
    Request(CameraRequest),
    Response(IpcResult<Option<CameraResponse>>),
    Stop(EngineExit),
}

/// Request/response engine over one camera channel and one link.
pub struct BridgeEngine<C, L> {
    channel: C,
    link: Arc<L>,
    request_queue_depth: usize,
    exchanges: u64,
}

impl<C: CameraChannel, L: WireLink> BridgeEngine<C, L> {
    pub fn new(channel: C, link: Arc<L>) -> Self {
        Self {
            channel,
            link,
            request_queue_depth: 16,
            exchanges: 0,
        }
    }

    /// Sets how many requests may wait behind the outstanding one.
    pub fn with_request_queue_depth(mut self, depth: usize) -> Self {
        self.request_queue_depth = depth.max(1);
        self
    }

    /// Runs until the link closes, the camera hangs up or shutdown completes.
    ///
    /// Malformed camera records are logged and skipped. Other channel
    /// failures end the run with an error.
    pub async fn run(
        mut self,
        events: mpsc::Receiver<LinkEvent>,
        shutdown: ShutdownSignal,
    ) -> BridgeResult<EngineExit> {
        let (request_tx, mut requests) = mpsc::channel(self.request_queue_depth);
        let mut dispatcher = spawn_dispatcher(Arc::clone(&self.link), events, request_tx);

        let shutdown = shutdown.wait();
        tokio::pin!(shutdown);

        info!("Bridge running");

        let outcome = loop {
            let step = tokio::select! {
                biased;
                _ = &mut shutdown => Step::Stop(EngineExit::Shutdown),
                _ = &mut dispatcher => Step::Stop(EngineExit::LinkClosed),
                request = requests.recv() => match request {
                    Some(request) => Step::Request(request),
                    None => Step::Stop(EngineExit::LinkClosed),
                },
                response = self.channel.receive_response() => Step::Response(response),
            };

            let response = match step {
                Step::Stop(exit) => break Ok(exit),
                Step::Response(response) => {
                    if let Ok(Some(response)) = &response {
                        warn!(%response, "Unsolicited camera response");
                    }
                    response
                }
                Step::Request(request) => {
                    debug!(%request, "Camera request");
                    match self.channel.send_request(&request).await {
                        Ok(()) => {}
                        Err(IpcError::ChannelClosed) => break Ok(EngineExit::ChannelClosed),
                        Err(e) => break Err(e.into()),
                    }

                    let awaited = tokio::select! {
                        biased;
                        _ = &mut shutdown => Err(EngineExit::Shutdown),
                        _ = &mut dispatcher => Err(EngineExit::LinkClosed),
                        response = self.channel.receive_response() => Ok(response),
                    };
                    match awaited {
                        Ok(response) => response,
                        Err(exit) => break Ok(exit),
                    }
                }
            };

            match response {
                Ok(Some(response)) => self.forward(&response).await,
                Ok(None) => break Ok(EngineExit::ChannelClosed),
                Err(IpcError::Protocol(e)) => {
                    warn!(error = %e, "Dropping malformed camera record");
                }
                Err(e) => break Err(e.into()),
            }
        };

        dispatcher.abort();

        match &outcome {
            Ok(exit) => info!(?exit, exchanges = self.exchanges, "Bridge stopped"),
            Err(e) => error!(error = %e, exchanges = self.exchanges, "Bridge failed"),
        }
        outcome
    }

    async fn forward(&mut self, response: &CameraResponse) {
        self.exchanges += 1;
        debug!(%response, "Camera response");
        for message in response_to_outbound(response) {
            send(&self.link, message).await;
        }
    }
}

fn spawn_dispatcher<L: WireLink>(
    link: Arc<L>,
    mut events: mpsc::Receiver<LinkEvent>,
    requests: mpsc::Sender<CameraRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                LinkEvent::Message { header, message } => {
                    if let Some(echo) = heartbeat_echo(&header, &message) {
                        send(&link, echo).await;
                    }
                    for request in inbound_to_requests(&message) {
                        if requests.send(request).await.is_err() {
                            return;
                        }
                    }
                }
                LinkEvent::Closed { reason } => {
                    info!(%reason, "FCU link closed");
                    return;
                }
            }
        }
        info!("FCU link event stream ended");
    })
}

/// Writes one message on the blocking pool; serial and TCP writes block.
async fn send<L: WireLink>(link: &Arc<L>, message: MavMessage) {
    let message_id = message.message_id();
    let link = Arc::clone(link);
    match tokio::task::spawn_blocking(move || link.send(&message)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, message_id, "Outbound message lost"),
        Err(e) => warn!(error = %e, message_id, "Outbound send task failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mavlink::common::{
        CAMERA_TRIGGER_DATA, COMMAND_LONG_DATA, HEARTBEAT_DATA, MavCmd, PARAM_EXT_REQUEST_LIST_DATA,
        PARAM_EXT_REQUEST_READ_DATA, PARAM_EXT_SET_DATA,
    };

    use super::*;
    use crate::signals::ShutdownHandle;
    use crate::testing::{
        ChannelOp, RecordingLink, inbound, mock_channel, simulated_channel,
    };
    use mavcam_protocol::{CAMERA_PARAMETERS, Identifier, PARAM_TYPE_UINT8};

    fn param_id(name: &str) -> [u8; 16] {
        let mut field = [0u8; 16];
        field[..name.len()].copy_from_slice(name.as_bytes());
        field
    }

    fn set_iso(value: u8) -> MavMessage {
        let mut param_value = [0u8; 128];
        param_value[0] = value;
        MavMessage::PARAM_EXT_SET(PARAM_EXT_SET_DATA {
            param_id: param_id("ISO"),
            param_value,
            ..Default::default()
        })
    }

    fn read_iso() -> MavMessage {
        MavMessage::PARAM_EXT_REQUEST_READ(PARAM_EXT_REQUEST_READ_DATA {
            param_id: param_id("ISO"),
            param_index: -1,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn request_list_is_answered_in_catalog_order_without_overlap() {
        let (channel, recorder, _camera) = simulated_channel(Duration::from_millis(2));
        let link = Arc::new(RecordingLink::default());
        let (events_tx, events) = mpsc::channel(16);
        let shutdown = ShutdownHandle::new();

        let engine = tokio::spawn(
            BridgeEngine::new(channel, Arc::clone(&link)).run(events, shutdown.wait()),
        );

        events_tx
            .send(inbound(
                1,
                MavMessage::PARAM_EXT_REQUEST_LIST(PARAM_EXT_REQUEST_LIST_DATA::default()),
            ))
            .await
            .unwrap();

        let sent = link.wait_for(CAMERA_PARAMETERS.len()).await;
        shutdown.trigger();
        assert_eq!(engine.await.unwrap().unwrap(), EngineExit::Shutdown);

        for (index, message) in sent.iter().enumerate() {
            let MavMessage::PARAM_EXT_VALUE(value) = message else {
                panic!("expected PARAM_EXT_VALUE, got {message:?}");
            };
            assert_eq!(value.param_id, param_id(CAMERA_PARAMETERS[index]));
            assert_eq!(value.param_index, index as u16);
        }

        assert!(!recorder.overlapped());
        let ops = recorder.ops();
        assert_eq!(ops.len(), 2 * CAMERA_PARAMETERS.len());
        for (pair, name) in ops.chunks(2).zip(CAMERA_PARAMETERS) {
            assert_eq!(pair[0], ChannelOp::Write(name.to_string()));
            assert_eq!(pair[1], ChannelOp::Read(name.to_string()));
        }
    }

    #[tokio::test]
    async fn set_then_read_reports_new_value() {
        let (channel, recorder, _camera) = simulated_channel(Duration::from_millis(1));
        let link = Arc::new(RecordingLink::default());
        let (events_tx, events) = mpsc::channel(16);
        let shutdown = ShutdownHandle::new();

        let engine = tokio::spawn(
            BridgeEngine::new(channel, Arc::clone(&link)).run(events, shutdown.wait()),
        );

        events_tx.send(inbound(1, set_iso(200))).await.unwrap();
        events_tx.send(inbound(1, read_iso())).await.unwrap();

        let sent = link.wait_for(2).await;
        shutdown.trigger();
        engine.await.unwrap().unwrap();

        let MavMessage::PARAM_EXT_ACK(ack) = &sent[0] else {
            panic!("expected PARAM_EXT_ACK, got {:?}", sent[0]);
        };
        assert_eq!(ack.param_result, mavlink::common::ParamAck::PARAM_ACK_ACCEPTED);

        let MavMessage::PARAM_EXT_VALUE(value) = &sent[1] else {
            panic!("expected PARAM_EXT_VALUE, got {:?}", sent[1]);
        };
        assert_eq!(value.param_value[0], 200);
        assert!(!recorder.overlapped());
    }

    #[tokio::test]
    async fn heartbeat_is_echoed_while_camera_is_busy() {
        let (channel, mut end, _recorder) = mock_channel();
        let link = Arc::new(RecordingLink::default());
        let (events_tx, events) = mpsc::channel(16);
        let shutdown = ShutdownHandle::new();

        let engine = tokio::spawn(
            BridgeEngine::new(channel, Arc::clone(&link)).run(events, shutdown.wait()),
        );

        events_tx
            .send(inbound(
                1,
                MavMessage::CAMERA_TRIGGER(CAMERA_TRIGGER_DATA::default()),
            ))
            .await
            .unwrap();
        let pending = end.requests.recv().await.unwrap();

        events_tx
            .send(inbound(1, MavMessage::HEARTBEAT(HEARTBEAT_DATA::default())))
            .await
            .unwrap();
        let sent = link.wait_for(1).await;
        let [MavMessage::HEARTBEAT(echo)] = sent.as_slice() else {
            panic!("expected a heartbeat echo, got {sent:?}");
        };
        assert_eq!(echo.base_mode.bits(), 0);

        end.responses
            .send(CameraResponse::reply_to(&pending, 0))
            .unwrap();
        let sent = link.wait_for(2).await;
        assert!(matches!(sent[1], MavMessage::CAMERA_IMAGE_CAPTURED(_)));

        shutdown.trigger();
        engine.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn second_request_waits_for_first_response() {
        let (channel, mut end, recorder) = mock_channel();
        let link = Arc::new(RecordingLink::default());
        let (events_tx, events) = mpsc::channel(16);
        let shutdown = ShutdownHandle::new();

        let engine = tokio::spawn(
            BridgeEngine::new(channel, Arc::clone(&link)).run(events, shutdown.wait()),
        );

        let capture = MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
            command: MavCmd::MAV_CMD_IMAGE_START_CAPTURE,
            ..Default::default()
        });
        events_tx.send(inbound(1, capture)).await.unwrap();
        events_tx.send(inbound(1, read_iso())).await.unwrap();

        let first = end.requests.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(end.requests.try_recv().is_err());

        end.responses
            .send(CameraResponse::reply_to(&first, 0))
            .unwrap();
        let second = end.requests.recv().await.unwrap();
        assert_eq!(second.command, "ISO");
        end.responses
            .send(CameraResponse::reply_to(&second, 0).with_param_type(PARAM_TYPE_UINT8))
            .unwrap();

        let sent = link.wait_for(2).await;
        assert!(matches!(sent[0], MavMessage::COMMAND_ACK(_)));
        assert!(matches!(sent[1], MavMessage::PARAM_EXT_VALUE(_)));
        assert!(!recorder.overlapped());

        shutdown.trigger();
        engine.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unsolicited_response_is_forwarded() {
        let (channel, end, _recorder) = mock_channel();
        let link = Arc::new(RecordingLink::default());
        let (_events_tx, events) = mpsc::channel(16);
        let shutdown = ShutdownHandle::new();

        let engine = tokio::spawn(
            BridgeEngine::new(channel, Arc::clone(&link)).run(events, shutdown.wait()),
        );

        let request = CameraRequest::get(Identifier::new("ISO").unwrap(), PARAM_TYPE_UINT8);
        end.responses
            .send(CameraResponse::reply_to(&request, 0).with_value(9))
            .unwrap();

        let sent = link.wait_for(1).await;
        assert!(matches!(sent[0], MavMessage::PARAM_EXT_VALUE(_)));

        shutdown.trigger();
        engine.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn camera_hangup_stops_engine() {
        let (channel, end, _recorder) = mock_channel();
        let link = Arc::new(RecordingLink::default());
        let (_events_tx, events) = mpsc::channel(16);

        drop(end);
        let exit = BridgeEngine::new(channel, link)
            .run(events, ShutdownHandle::new().wait())
            .await
            .unwrap();
        assert_eq!(exit, EngineExit::ChannelClosed);
    }

    #[tokio::test]
    async fn link_close_stops_engine() {
        let (channel, _end, _recorder) = mock_channel();
        let link = Arc::new(RecordingLink::default());
        let (events_tx, events) = mpsc::channel(16);

        events_tx
            .send(LinkEvent::Closed {
                reason: "serial unplugged".into(),
            })
            .await
            .unwrap();

        let exit = BridgeEngine::new(channel, link)
            .run(events, ShutdownHandle::new().wait())
            .await
            .unwrap();
        assert_eq!(exit, EngineExit::LinkClosed);
    }

    #[tokio::test]
    async fn shutdown_while_awaiting_response() {
        let (channel, mut end, _recorder) = mock_channel();
        let link = Arc::new(RecordingLink::default());
        let (events_tx, events) = mpsc::channel(16);
        let shutdown = ShutdownHandle::new();

        let engine = tokio::spawn(
            BridgeEngine::new(channel, Arc::clone(&link)).run(events, shutdown.wait()),
        );

        events_tx.send(inbound(1, read_iso())).await.unwrap();
        end.requests.recv().await.unwrap();
        shutdown.trigger();

        assert_eq!(engine.await.unwrap().unwrap(), EngineExit::Shutdown);
        assert!(link.sent().is_empty());
    }

    /// Link whose writes wait for the test to release them.
    struct GatedLink {
        gate: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
        released: std::sync::Mutex<Vec<bool>>,
    }

    impl WireLink for GatedLink {
        fn send(&self, _message: &MavMessage) -> crate::error::LinkResult<()> {
            let gate = self.gate.lock().unwrap();
            let released = gate.recv_timeout(Duration::from_secs(2)).is_ok();
            self.released.lock().unwrap().push(released);
            Ok(())
        }
    }

    #[tokio::test]
    async fn blocked_link_write_does_not_stall_runtime() {
        let (channel, _end, _recorder) = mock_channel();
        let (release, gate) = std::sync::mpsc::channel();
        let link = Arc::new(GatedLink {
            gate: std::sync::Mutex::new(gate),
            released: std::sync::Mutex::new(Vec::new()),
        });
        let (events_tx, events) = mpsc::channel(16);
        let shutdown = ShutdownHandle::new();

        let engine = tokio::spawn(
            BridgeEngine::new(channel, Arc::clone(&link)).run(events, shutdown.wait()),
        );

        events_tx
            .send(inbound(1, MavMessage::HEARTBEAT(HEARTBEAT_DATA::default())))
            .await
            .unwrap();

        // Only reachable while the write is parked off the runtime thread.
        tokio::time::sleep(Duration::from_millis(50)).await;
        release.send(()).unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while link.released.lock().unwrap().is_empty() {
            assert!(tokio::time::Instant::now() < deadline, "write never finished");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(*link.released.lock().unwrap(), vec![true]);

        shutdown.trigger();
        engine.await.unwrap().unwrap();
    }
}
