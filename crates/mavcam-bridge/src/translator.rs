//! MAVLink ↔ camera record translation.
//!
//! Pure functions, no I/O. Inbound MAVLink messages become zero or more
//! [`CameraRequest`]s; each [`CameraResponse`] becomes zero or one outbound
//! MAVLink message.

use mavlink::MavHeader;
use mavlink::common::{
    CAMERA_IMAGE_CAPTURED_DATA, COMMAND_ACK_DATA, HEARTBEAT_DATA, MavAutopilot, MavCmd,
    MavMessage, MavModeFlag, MavParamExtType, MavResult, MavState, MavType, PARAM_EXT_ACK_DATA,
    PARAM_EXT_VALUE_DATA, ParamAck,
};
use num_traits::FromPrimitive;
use tracing::{debug, warn};

use mavcam_protocol::{
    Action, CAMERA_PARAMETERS, CameraRequest, CameraResponse, Identifier, PARAM_TYPE_UINT8,
    REPORTED_PARAMETER_COUNT, SURVEY_TRIGGER, TEST_IMAGE_TRIGGER,
};

/// System id whose heartbeats are echoed.
pub const FLIGHT_CONTROLLER_SYSTEM_ID: u8 = 1;

/// `camera_id` reported in `CAMERA_IMAGE_CAPTURED`.
pub const CAMERA_ID: u8 = 1;

/// `progress` reported in `COMMAND_ACK` for captures.
pub const CAPTURE_PROGRESS_DONE: u8 = 100;

/// Index in `PARAM_EXT_REQUEST_READ` meaning "look up by name".
const READ_BY_NAME: i16 = -1;

/// Returns the heartbeat to send back for an inbound heartbeat, if any.
///
/// Only heartbeats from system 1 are answered, with a zeroed heartbeat.
pub fn heartbeat_echo(header: &MavHeader, message: &MavMessage) -> Option<MavMessage> {
    match message {
        MavMessage::HEARTBEAT(_) if header.system_id == FLIGHT_CONTROLLER_SYSTEM_ID => {
            Some(MavMessage::HEARTBEAT(zeroed_heartbeat()))
        }
        _ => None,
    }
}

// `HEARTBEAT_DATA::default()` reports SAFETY_ARMED; every field here is zero.
fn zeroed_heartbeat() -> HEARTBEAT_DATA {
    HEARTBEAT_DATA {
        custom_mode: 0,
        mavtype: MavType::MAV_TYPE_GENERIC,
        autopilot: MavAutopilot::MAV_AUTOPILOT_GENERIC,
        base_mode: MavModeFlag::empty(),
        system_status: MavState::MAV_STATE_UNINIT,
        mavlink_version: 0,
    }
}

/// Translates one inbound MAVLink message into camera requests.
///
/// Messages the bridge does not handle produce nothing.
pub fn inbound_to_requests(message: &MavMessage) -> Vec<CameraRequest> {
    match message {
        MavMessage::CAMERA_TRIGGER(trigger) => {
            debug!(seq = trigger.seq, "Survey trigger");
            vec![CameraRequest::trigger(SURVEY_TRIGGER)]
        }
        MavMessage::COMMAND_LONG(command) if command.command == MavCmd::MAV_CMD_IMAGE_START_CAPTURE => {
            // The command code rides in param_index so the ack can name it.
            let code = command.command as u16;
            vec![CameraRequest::trigger(TEST_IMAGE_TRIGGER).with_param_index(code)]
        }
        MavMessage::PARAM_EXT_REQUEST_LIST(_) => CAMERA_PARAMETERS
            .iter()
            .map(|name| CameraRequest::get(Identifier::truncated(name), PARAM_TYPE_UINT8))
            .collect(),
        MavMessage::PARAM_EXT_REQUEST_READ(read) => {
            if read.param_index != READ_BY_NAME {
                warn!(
                    param_index = read.param_index,
                    "Reading camera parameters by index is unsupported"
                );
                return Vec::new();
            }
            match param_name(&read.param_id) {
                Some(name) => vec![CameraRequest::get(name, PARAM_TYPE_UINT8)],
                None => Vec::new(),
            }
        }
        MavMessage::PARAM_EXT_SET(set) => {
            let Some(name) = param_name(&set.param_id) else {
                return Vec::new();
            };
            if set.param_type != MavParamExtType::MAV_PARAM_EXT_TYPE_UINT8 {
                warn!(
                    parameter = %name,
                    param_type = ?set.param_type,
                    "Camera parameters are UINT8, sending the first value byte"
                );
            }
            vec![CameraRequest::set(name, set.param_value[0], PARAM_TYPE_UINT8)]
        }
        _ => Vec::new(),
    }
}

/// Translates one camera response into outbound MAVLink messages.
pub fn response_to_outbound(response: &CameraResponse) -> Vec<MavMessage> {
    match response.action {
        Action::Get => vec![MavMessage::PARAM_EXT_VALUE(PARAM_EXT_VALUE_DATA {
            param_count: REPORTED_PARAMETER_COUNT,
            param_index: response.param_index,
            param_id: param_id_field(&response.command),
            param_value: param_value_field(response.value),
            param_type: param_type(response.param_type),
        })],
        Action::Set => {
            let param_result = if response.is_success() {
                ParamAck::PARAM_ACK_ACCEPTED
            } else {
                ParamAck::PARAM_ACK_FAILED
            };
            vec![MavMessage::PARAM_EXT_ACK(PARAM_EXT_ACK_DATA {
                param_id: param_id_field(&response.command),
                param_value: param_value_field(response.value),
                param_type: param_type(response.param_type),
                param_result,
            })]
        }
        Action::Trigger if response.command == SURVEY_TRIGGER => {
            vec![MavMessage::CAMERA_IMAGE_CAPTURED(CAMERA_IMAGE_CAPTURED_DATA {
                camera_id: CAMERA_ID,
                image_index: 0,
                capture_result: i8::from(response.is_success()),
                ..Default::default()
            })]
        }
        Action::Trigger if response.command == TEST_IMAGE_TRIGGER => {
            let Some(command) = MavCmd::from_u16(response.param_index) else {
                warn!(
                    code = response.param_index,
                    "Capture response carries an unknown command code, dropping ack"
                );
                return Vec::new();
            };
            let result = if response.is_success() {
                MavResult::MAV_RESULT_ACCEPTED
            } else {
                MavResult::MAV_RESULT_FAILED
            };
            vec![MavMessage::COMMAND_ACK(COMMAND_ACK_DATA {
                command,
                result,
                progress: CAPTURE_PROGRESS_DONE,
                ..Default::default()
            })]
        }
        _ => {
            debug!(%response, "No MAVLink message for response");
            Vec::new()
        }
    }
}

fn param_name(param_id: &[u8]) -> Option<Identifier> {
    match Identifier::from_c_bytes(param_id, "param_id") {
        Ok(name) => Some(name),
        Err(e) => {
            warn!(error = %e, "Ignoring parameter request with unreadable name");
            None
        }
    }
}

fn param_type(raw: u8) -> MavParamExtType {
    MavParamExtType::from_u8(raw).unwrap_or_else(|| {
        warn!(param_type = raw, "Unknown parameter type from camera, reporting UINT8");
        MavParamExtType::MAV_PARAM_EXT_TYPE_UINT8
    })
}

// A full 16-byte name is valid MAVLink and carries no terminator.
fn param_id_field(name: &Identifier) -> [u8; 16] {
    let mut field = [0u8; 16];
    let bytes = name.as_str().as_bytes();
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

fn param_value_field(value: u8) -> [u8; 128] {
    let mut field = [0u8; 128];
    field[0] = value;
    field
}
