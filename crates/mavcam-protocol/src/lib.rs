//! Camera IPC records for mavcam.
//!
//! The bridge and the camera-control process talk over a local
//! `SOCK_SEQPACKET` socket in the abstract namespace. Each datagram carries
//! exactly one fixed-size record:
//! - bridge → camera: [`CameraRequest`], [`REQUEST_RECORD_SIZE`] bytes
//! - camera → bridge: [`CameraResponse`], [`RESPONSE_RECORD_SIZE`] bytes
//!
//! There is no correlation id. The camera answers requests strictly in order,
//! one response per request, and the bridge never has more than one request
//! outstanding.
//!
//! # Example
//!
//! ```rust
//! use mavcam_protocol::{CameraRequest, Identifier, decode_request, encode_request};
//!
//! let request = CameraRequest::get(Identifier::new("ISO").unwrap(), 1);
//! let record = encode_request(&request);
//! let decoded = decode_request(&record).unwrap();
//! assert_eq!(decoded.command, "ISO");
//! ```

mod error;
mod ident;
mod params;
mod record;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use ident::{Identifier, MAX_IDENTIFIER_LEN, TEXT_FIELD_LEN};
pub use params::{
    CAMERA_PARAMETERS, PARAM_TYPE_UINT8, REPORTED_PARAMETER_COUNT, parameter_index,
};
pub use record::{
    REQUEST_RECORD_SIZE, RESPONSE_RECORD_SIZE, decode_request, decode_response, encode_request,
    encode_response,
};
pub use types::{
    Action, CameraRequest, CameraResponse, INITIALIZE_COMMAND, SURVEY_TRIGGER, TEST_IMAGE_TRIGGER,
};

/// Well-known abstract socket name shared by the bridge and the camera process.
pub const DEFAULT_CHANNEL_NAME: &str = "mavlink2cam";
