//! Control-server opcodes.
//!
//! Every message on the control link is an envelope `{ "op": <u8>, "d": {...} }`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// OpCode
// ============================================================================

/// Opcodes understood by the relay.
///
/// | Value | Name | Direction |
/// |-------|------|-----------|
/// | 0 | `Hello` | Server → Relay |
/// | 1 | `Identify` | Relay → Server |
/// | 2 | `Identified` | Server → Relay |
/// | 3 | `IdentifyFailed` | Server → Relay |
/// | 6 | `Request` | Relay → Server |
/// | 7 | `RequestResponse` | Server → Relay |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// First message sent by the server after the socket opens.
    Hello = 0,
    /// Client identification, optionally with an authentication string.
    Identify = 1,
    /// Identification accepted.
    Identified = 2,
    /// Identification rejected.
    IdentifyFailed = 3,
    /// RPC request.
    Request = 6,
    /// RPC response.
    RequestResponse = 7,
}

impl OpCode {
    /// Maps a wire value to an opcode.
    ///
    /// Returns `None` for opcodes the relay does not handle.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Hello),
            1 => Some(Self::Identify),
            2 => Some(Self::Identified),
            3 => Some(Self::IdentifyFailed),
            6 => Some(Self::Request),
            7 => Some(Self::RequestResponse),
            _ => None,
        }
    }

    /// Returns the wire value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hello => "Hello",
            Self::Identify => "Identify",
            Self::Identified => "Identified",
            Self::IdentifyFailed => "IdentifyFailed",
            Self::Request => "Request",
            Self::RequestResponse => "RequestResponse",
        };
        write!(f, "{name}({})", self.as_u8())
    }
}

// ============================================================================
// Tests
// ============================================================================
