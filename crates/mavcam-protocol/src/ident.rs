//! Bounded identifiers stored in fixed-size, NUL-terminated text fields.

use std::fmt;
use std::str::FromStr;

use crate::error::{ProtocolError, ProtocolResult};

/// Size of each text field in a camera record.
pub const TEXT_FIELD_LEN: usize = 100;

/// Longest identifier that still leaves room for the terminating NUL.
pub const MAX_IDENTIFIER_LEN: usize = TEXT_FIELD_LEN - 1;

/// A parameter or command name that is guaranteed to fit a record text field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Creates an identifier, rejecting names that would not fit the field.
    pub fn new(name: impl Into<String>) -> ProtocolResult<Self> {
        let name = name.into();
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(ProtocolError::IdentifierTooLong {
                len: name.len(),
                max: MAX_IDENTIFIER_LEN,
            });
        }
        if name.contains('\0') {
            return Err(ProtocolError::InteriorNul);
        }
        Ok(Self(name))
    }

    /// Creates an identifier, cutting the name at the first NUL and at the
    /// last character boundary that fits.
    pub fn truncated(name: &str) -> Self {
        let name = name.split('\0').next().unwrap_or_default();
        let mut end = name.len().min(MAX_IDENTIFIER_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        Self(name[..end].to_string())
    }

    /// Decodes a NUL-terminated (or NUL-padded) C string, as found in MAVLink
    /// `param_id` arrays and camera records.
    pub fn from_c_bytes(bytes: &[u8], field: &'static str) -> ProtocolResult<Self> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        if end > MAX_IDENTIFIER_LEN {
            return Err(ProtocolError::UnterminatedText { field });
        }
        let text =
            std::str::from_utf8(&bytes[..end]).map_err(|_| ProtocolError::InvalidText { field })?;
        Ok(Self(text.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the empty identifier.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies the identifier into a zeroed text field.
    ///
    /// Bytes beyond `field.len()` are dropped; callers pass full-size fields.
    pub fn write_to(&self, field: &mut [u8]) {
        field.fill(0);
        let bytes = self.0.as_bytes();
        let len = bytes.len().min(field.len().saturating_sub(1));
        field[..len].copy_from_slice(&bytes[..len]);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
