//! Opcode envelopes.
//!
//! Wraps handshake and RPC payloads in `{ "op", "d" }` and classifies
//! incoming text by opcode.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

use super::handshake::{Hello, Identified, Identify, IdentifyFailed};
use super::opcode::OpCode;
use super::request::{Request, RequestResponse};

// ============================================================================
// Envelope
// ============================================================================

#[derive(Serialize)]
struct OutgoingEnvelope<'a, T: Serialize> {
    op: u8,
    d: &'a T,
}

#[derive(Deserialize)]
struct IncomingEnvelope {
    op: u8,
    #[serde(default)]
    d: Value,
}

// ============================================================================
// ClientMessage
// ============================================================================

/// Messages the relay sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Opcode 1.
    Identify(Identify),
    /// Opcode 6.
    Request(Request),
}

impl ClientMessage {
    /// Returns the opcode of this message.
    #[inline]
    #[must_use]
    pub const fn op(&self) -> OpCode {
        match self {
            Self::Identify(_) => OpCode::Identify,
            Self::Request(_) => OpCode::Request,
        }
    }

    /// Serializes into an `{op, d}` JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let op = self.op().as_u8();
        let json = match self {
            Self::Identify(d) => serde_json::to_string(&OutgoingEnvelope { op, d })?,
            Self::Request(d) => serde_json::to_string(&OutgoingEnvelope { op, d })?,
        };
        Ok(json)
    }
}

impl From<Identify> for ClientMessage {
    fn from(value: Identify) -> Self {
        Self::Identify(value)
    }
}

impl From<Request> for ClientMessage {
    fn from(value: Request) -> Self {
        Self::Request(value)
    }
}

// ============================================================================
// ServerMessage
// ============================================================================

/// Messages the relay receives.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Opcode 0.
    Hello(Hello),
    /// Opcode 2.
    Identified(Identified),
    /// Opcode 3.
    IdentifyFailed(IdentifyFailed),
    /// Opcode 7.
    RequestResponse(RequestResponse),
    /// Any opcode the relay does not act on.
    Unhandled {
        /// Raw opcode.
        op: u8,
    },
}

impl ServerMessage {
    /// Parses a text frame from the control server.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not an `{op, d}` envelope
    /// - [`Error::Protocol`] if `d` does not match the opcode's payload
    pub fn parse(text: &str) -> Result<Self> {
        let envelope: IncomingEnvelope = serde_json::from_str(text)?;
        let op = envelope.op;

        let Some(opcode) = OpCode::from_u8(op) else {
            return Ok(Self::Unhandled { op });
        };

        let message = match opcode {
            OpCode::Hello => Self::Hello(payload(opcode, envelope.d)?),
            OpCode::Identified => Self::Identified(payload(opcode, envelope.d)?),
            OpCode::IdentifyFailed => Self::IdentifyFailed(payload(opcode, envelope.d)?),
            OpCode::RequestResponse => Self::RequestResponse(payload(opcode, envelope.d)?),
            OpCode::Identify | OpCode::Request => Self::Unhandled { op },
        };

        Ok(message)
    }
}

fn payload<T: for<'de> Deserialize<'de>>(opcode: OpCode, d: Value) -> Result<T> {
    // Identified/IdentifyFailed may arrive with an empty or missing `d`.
    let d = if d.is_null() { Value::Object(Default::default()) } else { d };
    serde_json::from_value(d)
        .map_err(|e| Error::protocol(format!("malformed {opcode} payload: {e}")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::identifiers::RequestId;
    use crate::protocol::RequestType;

    #[test]
    fn test_identify_envelope() {
        let json = ClientMessage::from(Identify::new(1)).to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            json!({ "op": 1, "d": { "rpcVersion": 1, "eventSubscriptions": 0 } })
        );
    }

    #[test]
    fn test_request_envelope() {
        let request = Request::new(RequestType::GetRecordStatus, RequestId::new("r1"));
        let json = ClientMessage::from(request).to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            json!({ "op": 6, "d": { "requestType": "GetRecordStatus", "requestId": "r1" } })
        );
    }

    #[test]
    fn test_parse_hello() {
        let message = ServerMessage::parse(r#"{"op":0,"d":{"rpcVersion":1}}"#).unwrap();
        assert!(matches!(message, ServerMessage::Hello(h) if h.rpc_version == 1));
    }

    #[test]
    fn test_parse_identified_without_payload() {
        let message = ServerMessage::parse(r#"{"op":2}"#).unwrap();
        assert_eq!(message, ServerMessage::Identified(Identified::default()));
    }

    #[test]
    fn test_parse_identify_failed() {
        let message = ServerMessage::parse(r#"{"op":3,"d":{"error":"bad auth"}}"#).unwrap();
        assert!(
            matches!(message, ServerMessage::IdentifyFailed(f) if f.error.as_deref() == Some("bad auth"))
        );
    }

    #[test]
    fn test_parse_request_response() {
        let text = r#"{"op":7,"d":{"requestType":"GetInputList","requestId":"q","responseData":{"inputs":[]}}}"#;
        let ServerMessage::RequestResponse(response) = ServerMessage::parse(text).unwrap() else {
            panic!("expected RequestResponse");
        };
        assert_eq!(response.request_id, RequestId::new("q"));
        assert_eq!(response.array_len("inputs"), Some(0));
    }

    #[test]
    fn test_parse_unhandled_opcode() {
        let message = ServerMessage::parse(r#"{"op":5,"d":{"eventType":"x"}}"#).unwrap();
        assert_eq!(message, ServerMessage::Unhandled { op: 5 });
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(ServerMessage::parse("nope"), Err(Error::Json(_))));
        assert!(matches!(
            ServerMessage::parse(r#"{"op":7,"d":{"requestId":1}}"#),
            Err(Error::Protocol { .. })
        ));
    }
}
