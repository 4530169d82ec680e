//! Camera channel: the bridge side of the local seqpacket socket.
//!
//! The channel is a Linux `SOCK_SEQPACKET` socket bound in the abstract
//! namespace, so it has no filesystem presence and disappears with its owner.
//! Seqpacket keeps record boundaries: one `send` is one `recv` on the other
//! end, never split and never merged with its neighbour.

use std::future::Future;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};

use nix::sys::socket::{
    AddressFamily, MsgFlags, SockFlag, SockType, UnixAddr, connect, recv, send, socket,
};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tracing::{debug, trace};

use mavcam_protocol::{
    CameraRequest, CameraResponse, RESPONSE_RECORD_SIZE, decode_response, encode_request,
};

use crate::error::{IpcError, IpcResult};

/// The bridge's view of the camera channel.
///
/// Implementations must keep whole records: `send_request` writes exactly one
/// record and `receive_response` yields exactly one. `receive_response` must be
/// cancel-safe, because the engine polls it inside `select!` while idle.
pub trait CameraChannel: Send + 'static {
    /// Writes one request record.
    fn send_request(&mut self, request: &CameraRequest) -> impl Future<Output = IpcResult<()>> + Send;

    /// Waits for one response record.
    ///
    /// Returns `Ok(None)` when the camera process has ended the session.
    fn receive_response(&mut self) -> impl Future<Output = IpcResult<Option<CameraResponse>>> + Send;
}

/// Opens camera channels. Used by the supervisor's retry loop.
pub trait ChannelConnector: Send + Sync {
    type Channel: CameraChannel;

    /// Makes one connection attempt.
    fn connect(&self) -> impl Future<Output = IpcResult<Self::Channel>> + Send;
}

/// A non-blocking seqpacket socket registered with the tokio reactor.
pub struct SeqpacketSocket {
    fd: AsyncFd<OwnedFd>,
}

impl SeqpacketSocket {
    /// Creates a non-blocking, close-on-exec seqpacket socket.
    pub(crate) fn open() -> io::Result<OwnedFd> {
        Ok(socket(
            AddressFamily::Unix,
            SockType::SeqPacket,
            SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC,
            None,
        )?)
    }

    /// Wraps an already connected, non-blocking socket.
    pub(crate) fn from_fd(fd: OwnedFd) -> io::Result<Self> {
        Ok(Self {
            fd: AsyncFd::with_interest(fd, Interest::READABLE | Interest::WRITABLE)?,
        })
    }

    /// Sends one record.
    pub async fn send_record(&self, record: &[u8]) -> io::Result<()> {
        loop {
            let mut guard = self.fd.writable().await?;
            match guard.try_io(|inner| {
                Ok(send(
                    inner.get_ref().as_raw_fd(),
                    record,
                    MsgFlags::MSG_NOSIGNAL,
                )?)
            }) {
                Ok(Ok(written)) if written == record.len() => return Ok(()),
                Ok(Ok(written)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short record write: {written} of {} bytes", record.len()),
                    ));
                }
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => continue,
            }
        }
    }

    /// Receives one record into `buf`, returning its length.
    ///
    /// A length of zero means the peer closed the connection. Cancel-safe:
    /// nothing is consumed until the socket is readable.
    pub async fn recv_record(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;
            match guard.try_io(|inner| {
                Ok(recv(
                    inner.get_ref().as_raw_fd(),
                    buf,
                    MsgFlags::MSG_TRUNC,
                )?)
            }) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

/// Builds the abstract address for a channel name.
pub(crate) fn abstract_addr(name: &str) -> io::Result<UnixAddr> {
    Ok(UnixAddr::new_abstract(name.as_bytes())?)
}

/// Camera channel over an abstract seqpacket socket.
pub struct SeqpacketChannel {
    socket: SeqpacketSocket,
    name: String,
}

impl SeqpacketChannel {
    /// Connects to the camera process listening on `name`.
    pub async fn connect(name: &str) -> IpcResult<Self> {
        let fd = SeqpacketSocket::open()?;
        let addr = abstract_addr(name)?;

        debug!(channel = %name, "Connecting to camera channel");
        connect(fd.as_raw_fd(), &addr)
            .map_err(|e| IpcError::from_connect(name, io::Error::from(e)))?;

        Ok(Self {
            socket: SeqpacketSocket::from_fd(fd)?,
            name: name.to_string(),
        })
    }
}

impl CameraChannel for SeqpacketChannel {
    async fn send_request(&mut self, request: &CameraRequest) -> IpcResult<()> {
        let record = encode_request(request);
        self.socket
            .send_record(&record)
            .await
            .map_err(IpcError::from_transfer)?;
        trace!(channel = %self.name, %request, "Request written");
        Ok(())
    }

    async fn receive_response(&mut self) -> IpcResult<Option<CameraResponse>> {
        // MSG_TRUNC reports the real datagram size, so oversized records are
        // detected instead of silently cut.
        let mut buf = [0u8; RESPONSE_RECORD_SIZE];
        let len = match self.socket.recv_record(&mut buf).await {
            Ok(0) => return Ok(None),
            Ok(len) => len,
            Err(e) => match IpcError::from_transfer(e) {
                IpcError::ChannelClosed => return Ok(None),
                other => return Err(other),
            },
        };

        let record = &buf[..len.min(RESPONSE_RECORD_SIZE)];
        if len != RESPONSE_RECORD_SIZE {
            return Err(mavcam_protocol::ProtocolError::RecordSize {
                expected: RESPONSE_RECORD_SIZE,
                received: len,
            }
            .into());
        }

        let response = decode_response(record)?;
        trace!(channel = %self.name, %response, "Response read");
        Ok(Some(response))
    }
}

/// Connects [`SeqpacketChannel`]s to a fixed channel name.
#[derive(Debug, Clone)]
pub struct SeqpacketConnector {
    name: String,
}

impl SeqpacketConnector {
    /// Creates a connector for the given channel name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ChannelConnector for SeqpacketConnector {
    type Channel = SeqpacketChannel;

    async fn connect(&self) -> IpcResult<SeqpacketChannel> {
        SeqpacketChannel::connect(&self.name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_server::CameraServer;
    use mavcam_protocol::{Action, Identifier};

    fn unique_name(tag: &str) -> String {
        format!("mavcam-test-{}-{}", tag, std::process::id())
    }

    #[tokio::test]
    async fn connect_without_listener_is_refused() {
        let result = SeqpacketChannel::connect(&unique_name("nobody")).await;
        assert!(matches!(result, Err(IpcError::ConnectionRefused { .. })));
    }

    #[tokio::test]
    async fn request_response_exchange() {
        let name = unique_name("exchange");
        let server = CameraServer::bind(&name).unwrap();

        let camera = tokio::spawn(async move {
            let mut conn = server.accept().await.unwrap();
            let request = conn.read_request().await.unwrap().unwrap();
            assert_eq!(request.command, "ISO");
            assert_eq!(request.action, Action::Get);
            let response = CameraResponse::reply_to(&request, 0).with_value(200);
            conn.write_response(&response).await.unwrap();
        });

        let mut channel = SeqpacketChannel::connect(&name).await.unwrap();
        let request = CameraRequest::get(Identifier::new("ISO").unwrap(), 1);
        channel.send_request(&request).await.unwrap();

        let response = channel.receive_response().await.unwrap().unwrap();
        assert_eq!(response.command, "ISO");
        assert_eq!(response.value, 200);

        camera.await.unwrap();
    }

    #[tokio::test]
    async fn peer_hangup_reads_as_closed() {
        let name = unique_name("hangup");
        let server = CameraServer::bind(&name).unwrap();

        let camera = tokio::spawn(async move {
            let conn = server.accept().await.unwrap();
            drop(conn);
        });

        let mut channel = SeqpacketChannel::connect(&name).await.unwrap();
        camera.await.unwrap();

        assert!(channel.receive_response().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn records_keep_their_boundaries() {
        let name = unique_name("boundaries");
        let server = CameraServer::bind(&name).unwrap();

        let camera = tokio::spawn(async move {
            let mut conn = server.accept().await.unwrap();
            for value in [1u8, 2, 3] {
                let request = CameraRequest::get(Identifier::new("ISO").unwrap(), 1);
                let response = CameraResponse::reply_to(&request, 0).with_value(value);
                conn.write_response(&response).await.unwrap();
            }
        });

        let mut channel = SeqpacketChannel::connect(&name).await.unwrap();
        camera.await.unwrap();

        for expected in [1u8, 2, 3] {
            let response = channel.receive_response().await.unwrap().unwrap();
            assert_eq!(response.value, expected);
        }
        assert!(channel.receive_response().await.unwrap().is_none());
    }
}
