//! Fixed-layout record codec for the camera channel.
//!
//! Records are not length-prefixed: the channel preserves message boundaries,
//! so one datagram carries exactly one record and both ends agree on its size.
//! Integers are little-endian and padding bytes are zero.
//!
//! ```text
//! request (216 bytes)                  response (224 bytes)
//! +-----+-----------------------+      +-----+-----------------------+
//! |   0 | command [100]         |      |   0 | command [100]         |
//! | 100 | action  [100]         |      | 100 | action  [100]         |
//! | 200 | value        u8       |      | 200 | value        u8       |
//! | 201 | param_type   u8       |      | 204 | result       i32      |
//! | 202 | param_index  u16      |      | 208 | param_type   u8       |
//! | 208 | timestamp    i64 (us) |      | 210 | param_index  u16      |
//! +-----+-----------------------+      | 216 | timestamp    i64 (us) |
//!                                      +-----+-----------------------+
//! ```

use chrono::{DateTime, Utc};

use crate::error::{ProtocolError, ProtocolResult};
use crate::ident::{Identifier, TEXT_FIELD_LEN};
use crate::types::{Action, CameraRequest, CameraResponse};

/// Size of an encoded [`CameraRequest`].
pub const REQUEST_RECORD_SIZE: usize = 216;

/// Size of an encoded [`CameraResponse`].
pub const RESPONSE_RECORD_SIZE: usize = 224;

const COMMAND: usize = 0;
const ACTION: usize = COMMAND + TEXT_FIELD_LEN;
const VALUE: usize = ACTION + TEXT_FIELD_LEN;

mod request_layout {
    pub const PARAM_TYPE: usize = 201;
    pub const PARAM_INDEX: usize = 202;
    pub const TIMESTAMP: usize = 208;
}

mod response_layout {
    pub const RESULT: usize = 204;
    pub const PARAM_TYPE: usize = 208;
    pub const PARAM_INDEX: usize = 210;
    pub const TIMESTAMP: usize = 216;
}

/// Encodes a request into its fixed-size record.
pub fn encode_request(request: &CameraRequest) -> [u8; REQUEST_RECORD_SIZE] {
    use request_layout::*;

    let mut buf = [0u8; REQUEST_RECORD_SIZE];
    write_text(&mut buf, COMMAND, &request.command);
    write_text(&mut buf, ACTION, &Identifier::truncated(request.action.as_str()));
    buf[VALUE] = request.value;
    buf[PARAM_TYPE] = request.param_type;
    buf[PARAM_INDEX..PARAM_INDEX + 2].copy_from_slice(&request.param_index.to_le_bytes());
    buf[TIMESTAMP..TIMESTAMP + 8].copy_from_slice(&request.timestamp.timestamp_micros().to_le_bytes());
    buf
}

/// Decodes a request record.
pub fn decode_request(data: &[u8]) -> ProtocolResult<CameraRequest> {
    use request_layout::*;

    check_size(data, REQUEST_RECORD_SIZE)?;
    Ok(CameraRequest {
        command: read_text(data, COMMAND, "command")?,
        action: read_action(data)?,
        value: data[VALUE],
        param_type: data[PARAM_TYPE],
        param_index: read_u16(data, PARAM_INDEX),
        timestamp: read_timestamp(data, TIMESTAMP),
    })
}

/// Encodes a response into its fixed-size record.
pub fn encode_response(response: &CameraResponse) -> [u8; RESPONSE_RECORD_SIZE] {
    use response_layout::*;

    let mut buf = [0u8; RESPONSE_RECORD_SIZE];
    write_text(&mut buf, COMMAND, &response.command);
    write_text(&mut buf, ACTION, &Identifier::truncated(response.action.as_str()));
    buf[VALUE] = response.value;
    buf[RESULT..RESULT + 4].copy_from_slice(&response.result.to_le_bytes());
    buf[PARAM_TYPE] = response.param_type;
    buf[PARAM_INDEX..PARAM_INDEX + 2].copy_from_slice(&response.param_index.to_le_bytes());
    buf[TIMESTAMP..TIMESTAMP + 8]
        .copy_from_slice(&response.timestamp.timestamp_micros().to_le_bytes());
    buf
}

/// Decodes a response record.
pub fn decode_response(data: &[u8]) -> ProtocolResult<CameraResponse> {
    use response_layout::*;

    check_size(data, RESPONSE_RECORD_SIZE)?;
    let mut result = [0u8; 4];
    result.copy_from_slice(&data[RESULT..RESULT + 4]);

    Ok(CameraResponse {
        command: read_text(data, COMMAND, "command")?,
        action: read_action(data)?,
        value: data[VALUE],
        result: i32::from_le_bytes(result),
        param_type: data[PARAM_TYPE],
        param_index: read_u16(data, PARAM_INDEX),
        timestamp: read_timestamp(data, TIMESTAMP),
    })
}

fn check_size(data: &[u8], expected: usize) -> ProtocolResult<()> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyRecord);
    }
    if data.len() != expected {
        return Err(ProtocolError::RecordSize {
            expected,
            received: data.len(),
        });
    }
    Ok(())
}

fn write_text(buf: &mut [u8], offset: usize, text: &Identifier) {
    text.write_to(&mut buf[offset..offset + TEXT_FIELD_LEN]);
}

fn read_text(data: &[u8], offset: usize, field: &'static str) -> ProtocolResult<Identifier> {
    Identifier::from_c_bytes(&data[offset..offset + TEXT_FIELD_LEN], field)
}

fn read_action(data: &[u8]) -> ProtocolResult<Action> {
    read_text(data, ACTION, "action")?.as_str().parse()
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_timestamp(data: &[u8], offset: usize) -> DateTime<Utc> {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[offset..offset + 8]);
    DateTime::from_timestamp_micros(i64::from_le_bytes(raw)).unwrap_or(DateTime::UNIX_EPOCH)
}
