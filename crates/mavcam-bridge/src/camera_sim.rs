//! In-memory camera for bench work without camera hardware.

use tracing::{debug, info, warn};

use mavcam_protocol::{
    Action, CAMERA_PARAMETERS, CameraRequest, CameraResponse, PARAM_TYPE_UINT8, parameter_index,
};

use crate::camera_server::CameraConnection;
use crate::error::IpcResult;

/// Result code for requests the simulator cannot satisfy.
pub const SIM_FAILURE: i32 = -1;

/// Answers camera requests from a parameter table seeded with the catalog.
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    values: [u8; CAMERA_PARAMETERS.len()],
    captures: u32,
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCamera {
    /// Creates a camera with every parameter at zero.
    pub fn new() -> Self {
        Self {
            values: [0; CAMERA_PARAMETERS.len()],
            captures: 0,
        }
    }

    /// Returns the stored value of a catalog parameter.
    pub fn value(&self, name: &str) -> Option<u8> {
        parameter_index(name).map(|i| self.values[i as usize])
    }

    /// Number of captures taken so far.
    pub fn captures(&self) -> u32 {
        self.captures
    }

    /// Produces the response for one request.
    pub fn handle(&mut self, request: &CameraRequest) -> CameraResponse {
        match request.action {
            Action::Initialize => CameraResponse::reply_to(request, 0),
            Action::Get => match parameter_index(request.command.as_str()) {
                Some(index) => CameraResponse::reply_to(request, 0)
                    .with_value(self.values[index as usize])
                    .with_param_type(PARAM_TYPE_UINT8)
                    .with_param_index(index),
                None => {
                    warn!(parameter = %request.command, "Unknown parameter");
                    CameraResponse::reply_to(request, SIM_FAILURE)
                }
            },
            Action::Set => match parameter_index(request.command.as_str()) {
                Some(index) => {
                    self.values[index as usize] = request.value;
                    CameraResponse::reply_to(request, 0).with_param_index(index)
                }
                None => {
                    warn!(parameter = %request.command, "Unknown parameter");
                    CameraResponse::reply_to(request, SIM_FAILURE)
                }
            },
            Action::Trigger => {
                self.captures += 1;
                info!(trigger = %request.command, captures = self.captures, "Capture");
                CameraResponse::reply_to(request, 0)
            }
        }
    }

    /// Serves one bridge session until it disconnects.
    pub async fn serve(&mut self, mut connection: CameraConnection) -> IpcResult<()> {
        while let Some(request) = connection.read_request().await? {
            debug!(%request, "Camera request");
            let response = self.handle(&request);
            connection.write_response(&response).await?;
        }
        Ok(())
    }
}
