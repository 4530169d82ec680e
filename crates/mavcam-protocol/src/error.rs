//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while building or decoding camera records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Identifier does not fit in its fixed-size text field.
    #[error("identifier too long: {len} bytes (max: {max})")]
    IdentifierTooLong { len: usize, max: usize },

    /// Identifier contains an interior NUL byte.
    #[error("identifier contains a NUL byte")]
    InteriorNul,

    /// Record length does not match the fixed layout.
    #[error("bad record size: expected {expected} bytes, got {received}")]
    RecordSize { expected: usize, received: usize },

    /// Zero-length record.
    #[error("empty record")]
    EmptyRecord,

    /// Text field fills its whole buffer without a terminating NUL.
    #[error("unterminated text in field `{field}`")]
    UnterminatedText { field: &'static str },

    /// Text field is not valid UTF-8.
    #[error("invalid text in field `{field}`")]
    InvalidText { field: &'static str },

    /// Action field holds something other than INITIALIZE/GET/SET/TRIGGER.
    #[error("unknown action: {0:?}")]
    UnknownAction(String),
}
