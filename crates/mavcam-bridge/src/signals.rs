//! Stop requests.
//!
//! A stop is a latched `watch<bool>`: once set it stays set, and every
//! [`ShutdownHandle`] clone observes it. SIGTERM and SIGINT set it through
//! [`SignalHandler`]; tests set it directly.

use std::sync::Arc;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Shared stop flag.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Latches the stop flag.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Future side of the flag, for `select!` arms.
    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.rx.clone(),
        }
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Completes once the flag is set.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // The handle keeps a sender alive, so a closed channel means nobody
        // can ever stop us; park instead of reporting a stop.
        if self.rx.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Turns SIGTERM/SIGINT into a stop request.
#[derive(Default)]
pub struct SignalHandler {
    handle: ShutdownHandle,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the task that waits for the first termination signal.
    ///
    /// Must run inside the runtime.
    pub fn spawn_listener(&self) {
        let handle = self.handle.clone();

        tokio::spawn(async move {
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "Cannot listen for SIGTERM");
                    return;
                }
            };
            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "Cannot listen for SIGINT");
                    return;
                }
            };

            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            info!(signal = name, "Stopping");
            handle.trigger();
            debug!("Signal listener done");
        });
    }

    /// Handle tied to this handler's signals.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }
}
