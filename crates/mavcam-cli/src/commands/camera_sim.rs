//! Camera simulator command.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use mavcam_bridge::{CameraServer, SignalHandler, SimulatedCamera};

use crate::config::MavcamConfig;
use crate::error::CliResult;

/// Serves the camera channel with a [`SimulatedCamera`] until a signal
/// arrives. Parameter values persist across bridge sessions.
pub async fn run(config: &MavcamConfig) -> CliResult<()> {
    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener();

    let server = CameraServer::bind(&config.camera.socket_name)?;
    let camera = Arc::new(Mutex::new(SimulatedCamera::new()));

    let shutdown = signal_handler.shutdown_handle();
    server
        .run_until_shutdown(
            |connection| {
                let camera = Arc::clone(&camera);
                async move { camera.lock().await.serve(connection).await }
            },
            shutdown.wait().wait(),
        )
        .await?;

    info!(captures = camera.lock().await.captures(), "Camera simulator stopped");
    Ok(())
}
