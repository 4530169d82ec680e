//! Camera side of the seqpacket channel.
//!
//! The camera-control process owns the channel name: it binds and listens,
//! and the bridge connects. [`CameraServer`] provides that half for the
//! simulator and for tests.

use std::future::Future;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use nix::sys::socket::{Backlog, SockFlag, accept4, bind, listen};
use tokio::io::unix::AsyncFd;
use tracing::{debug, error, info};

use mavcam_protocol::{
    CameraRequest, CameraResponse, ProtocolError, REQUEST_RECORD_SIZE, decode_request,
    encode_response,
};

use crate::error::{IpcError, IpcResult};
use crate::ipc::{SeqpacketSocket, abstract_addr};

/// Listening end of the camera channel.
pub struct CameraServer {
    name: String,
    listener: AsyncFd<OwnedFd>,
}

impl CameraServer {
    /// Binds the abstract channel name and starts listening.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn bind(name: &str) -> IpcResult<Self> {
        let fd = SeqpacketSocket::open()?;
        let addr = abstract_addr(name)?;

        bind(fd.as_raw_fd(), &addr).map_err(|e| match e {
            nix::errno::Errno::EADDRINUSE => IpcError::AddressInUse { name: name.into() },
            other => IpcError::Io(other.into()),
        })?;
        listen(&fd, Backlog::new(10).map_err(io::Error::from)?).map_err(io::Error::from)?;

        info!(channel = %name, "Camera channel listening");

        Ok(Self {
            name: name.to_string(),
            listener: AsyncFd::new(fd)?,
        })
    }

    /// Returns the channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accepts a single bridge connection.
    pub async fn accept(&self) -> IpcResult<CameraConnection> {
        loop {
            let mut guard = self.listener.readable().await?;
            let accepted = guard.try_io(|inner| {
                Ok(accept4(
                    inner.get_ref().as_raw_fd(),
                    SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC,
                )?)
            });

            match accepted {
                Ok(Ok(raw)) => {
                    // SAFETY: accept4 returned a fresh descriptor that nothing else owns.
                    let fd = unsafe { OwnedFd::from_raw_fd(raw) };
                    debug!(channel = %self.name, "Accepted bridge connection");
                    return Ok(CameraConnection {
                        socket: SeqpacketSocket::from_fd(fd)?,
                    });
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_would_block) => continue,
            }
        }
    }

    /// Serves bridge connections one after another until `shutdown` completes.
    ///
    /// The handler owns each connection until the bridge disconnects; only
    /// then is the next bridge accepted.
    pub async fn run_until_shutdown<F, Fut, S>(&self, mut handler: F, shutdown: S) -> IpcResult<()>
    where
        F: FnMut(CameraConnection) -> Fut,
        Fut: Future<Output = IpcResult<()>>,
        S: Future<Output = ()>,
    {
        tokio::select! {
            result = self.serve(&mut handler) => result,
            _ = shutdown => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    }

    async fn serve<F, Fut>(&self, handler: &mut F) -> IpcResult<()>
    where
        F: FnMut(CameraConnection) -> Fut,
        Fut: Future<Output = IpcResult<()>>,
    {
        loop {
            let connection = self.accept().await?;
            if let Err(e) = handler(connection).await {
                error!(channel = %self.name, error = %e, "Bridge session failed");
            }
            info!(channel = %self.name, "Bridge disconnected");
        }
    }
}

/// One accepted bridge connection.
pub struct CameraConnection {
    socket: SeqpacketSocket,
}

impl CameraConnection {
    /// Reads one request record.
    ///
    /// Returns `Ok(None)` once the bridge has disconnected.
    pub async fn read_request(&mut self) -> IpcResult<Option<CameraRequest>> {
        let mut buf = [0u8; REQUEST_RECORD_SIZE];
        let len = match self.socket.recv_record(&mut buf).await {
            Ok(0) => return Ok(None),
            Ok(len) => len,
            Err(e) => match IpcError::from_transfer(e) {
                IpcError::ChannelClosed => return Ok(None),
                other => return Err(other),
            },
        };

        if len != REQUEST_RECORD_SIZE {
            return Err(ProtocolError::RecordSize {
                expected: REQUEST_RECORD_SIZE,
                received: len,
            }
            .into());
        }

        Ok(Some(decode_request(&buf)?))
    }

    /// Writes one response record.
    pub async fn write_response(&mut self, response: &CameraResponse) -> IpcResult<()> {
        self.socket
            .send_record(&encode_response(response))
            .await
            .map_err(IpcError::from_transfer)
    }
}
