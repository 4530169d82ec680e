//! Camera request and response types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::ProtocolError;
use crate::ident::Identifier;

/// Command name of the startup handshake.
pub const INITIALIZE_COMMAND: &str = "INITIALIZE";

/// Command name of a survey capture requested with `CAMERA_TRIGGER`.
pub const SURVEY_TRIGGER: &str = "TRIGGER_SURVEY";

/// Command name of a single capture requested with `MAV_CMD_IMAGE_START_CAPTURE`.
pub const TEST_IMAGE_TRIGGER: &str = "TRIGGER_TEST_IMAGE";

/// What the camera process is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Initialize,
    Get,
    Set,
    Trigger,
}

impl Action {
    /// Returns the on-wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "INITIALIZE",
            Self::Get => "GET",
            Self::Set => "SET",
            Self::Trigger => "TRIGGER",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIALIZE" => Ok(Self::Initialize),
            "GET" => Ok(Self::Get),
            "SET" => Ok(Self::Set),
            "TRIGGER" => Ok(Self::Trigger),
            other => Err(ProtocolError::UnknownAction(other.to_string())),
        }
    }
}

/// A request from the bridge to the camera process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraRequest {
    /// Parameter or trigger name.
    pub command: Identifier,
    /// Requested action.
    pub action: Action,
    /// Parameter value for SET.
    pub value: u8,
    /// MAVLink parameter type tag.
    pub param_type: u8,
    /// Parameter index, or the MAVLink command code for test-image triggers.
    pub param_index: u16,
    /// Creation time. Informational only.
    pub timestamp: DateTime<Utc>,
}

impl CameraRequest {
    /// Creates a request with zeroed payload fields, stamped now.
    pub fn new(command: Identifier, action: Action) -> Self {
        Self {
            command,
            action,
            value: 0,
            param_type: 0,
            param_index: 0,
            timestamp: Utc::now(),
        }
    }

    /// The startup handshake.
    pub fn initialize() -> Self {
        Self::new(Identifier::truncated(INITIALIZE_COMMAND), Action::Initialize)
    }

    /// Read one parameter.
    pub fn get(name: Identifier, param_type: u8) -> Self {
        Self {
            param_type,
            ..Self::new(name, Action::Get)
        }
    }

    /// Write one parameter.
    pub fn set(name: Identifier, value: u8, param_type: u8) -> Self {
        Self {
            value,
            param_type,
            ..Self::new(name, Action::Set)
        }
    }

    /// Fire a named capture.
    pub fn trigger(command: &str) -> Self {
        Self::new(Identifier::truncated(command), Action::Trigger)
    }

    /// Builder: set the parameter index.
    #[must_use]
    pub fn with_param_index(mut self, param_index: u16) -> Self {
        self.param_index = param_index;
        self
    }
}

impl fmt::Display for CameraRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} value={} type={} index={}",
            self.action, self.command, self.value, self.param_type, self.param_index
        )
    }
}

/// The camera process's answer to a [`CameraRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraResponse {
    pub command: Identifier,
    pub action: Action,
    pub value: u8,
    /// 0 on success, anything else is a failure.
    pub result: i32,
    pub param_type: u8,
    pub param_index: u16,
    pub timestamp: DateTime<Utc>,
}

impl CameraResponse {
    /// Builds a response that mirrors the request fields.
    pub fn reply_to(request: &CameraRequest, result: i32) -> Self {
        Self {
            command: request.command.clone(),
            action: request.action,
            value: request.value,
            result,
            param_type: request.param_type,
            param_index: request.param_index,
            timestamp: Utc::now(),
        }
    }

    /// Builder: set the reported value.
    #[must_use]
    pub fn with_value(mut self, value: u8) -> Self {
        self.value = value;
        self
    }

    /// Builder: set the parameter type.
    #[must_use]
    pub fn with_param_type(mut self, param_type: u8) -> Self {
        self.param_type = param_type;
        self
    }

    /// Builder: set the parameter index.
    #[must_use]
    pub fn with_param_index(mut self, param_index: u16) -> Self {
        self.param_index = param_index;
        self
    }

    /// Returns true if the camera reported success.
    pub fn is_success(&self) -> bool {
        self.result == 0
    }
}

impl fmt::Display for CameraResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} value={} type={} index={} result={}",
            self.action, self.command, self.value, self.param_type, self.param_index, self.result
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_spelling_roundtrips() {
        for action in [Action::Initialize, Action::Get, Action::Set, Action::Trigger] {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert_eq!(
            "get".parse::<Action>(),
            Err(ProtocolError::UnknownAction("get".into()))
        );
    }

    #[test]
    fn initialize_request_shape() {
        let request = CameraRequest::initialize();
        assert_eq!(request.command, INITIALIZE_COMMAND);
        assert_eq!(request.action, Action::Initialize);
        assert_eq!(request.value, 0);
    }

    #[test]
    fn reply_mirrors_request() {
        let request = CameraRequest::set(Identifier::new("ISO").unwrap(), 7, 1).with_param_index(2);
        let response = CameraResponse::reply_to(&request, 0);
        assert_eq!(response.command, "ISO");
        assert_eq!(response.action, Action::Set);
        assert_eq!(response.value, 7);
        assert_eq!(response.param_type, 1);
        assert_eq!(response.param_index, 2);
        assert!(response.is_success());
        assert!(!CameraResponse::reply_to(&request, -1).is_success());
    }

    #[test]
    fn request_summary() {
        let request = CameraRequest::get(Identifier::new("ISO").unwrap(), 1).with_param_index(1);
        insta::assert_snapshot!(request.to_string(), @"GET ISO value=0 type=1 index=1");
    }

    #[test]
    fn response_summary() {
        let request = CameraRequest::trigger(SURVEY_TRIGGER);
        let response = CameraResponse::reply_to(&request, 3);
        insta::assert_snapshot!(
            response.to_string(),
            @"TRIGGER TRIGGER_SURVEY value=0 type=0 index=0 result=3"
        );
    }
}
