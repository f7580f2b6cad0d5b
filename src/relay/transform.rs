//! Captured frame → `BroadcastCustomMessage` transformation.
//!
//! Frames from the monitored tab are expected to use the channel
//! multiplexing convention `[joinRef, ref, topic, event, payload]`.
//! Only `topic`, `event` and `payload` are relayed.
//!
//! # Output
//!
//! ```json
//! {
//!   "requestType": "BroadcastCustomMessage",
//!   "requestId": "<fresh>",
//!   "requestData": {
//!     "realm": "obs-frame-relay",
//!     "data": {
//!       "eventType": "websocketFrame",
//!       "eventData": { "channel": "...", "event": "...", "payload": ... }
//!     }
//!   }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::identifiers::RequestId;
use crate::protocol::{Request, RequestType};

// ============================================================================
// Constants
// ============================================================================

/// Realm tag identifying relayed broadcasts.
pub const BROADCAST_REALM: &str = "obs-frame-relay";

/// Event type tag for relayed frames.
pub const BROADCAST_EVENT_TYPE: &str = "websocketFrame";

/// Minimum number of elements in a multiplexed frame.
pub const MIN_FRAME_ELEMENTS: usize = 5;

const TOPIC_INDEX: usize = 2;
const EVENT_INDEX: usize = 3;
const PAYLOAD_INDEX: usize = 4;

// ============================================================================
// TransformError
// ============================================================================

/// Why a frame was not relayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// Payload is not JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    /// Payload is JSON but not an array.
    #[error("payload is not a JSON array")]
    NotAnArray,

    /// Array has fewer than [`MIN_FRAME_ELEMENTS`] elements.
    #[error("frame has {len} elements, expected at least {MIN_FRAME_ELEMENTS}")]
    TooShort {
        /// Actual element count.
        len: usize,
    },
}

// ============================================================================
// BroadcastFrame
// ============================================================================

/// The relayed part of a captured frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastFrame {
    /// Element 2 (topic).
    pub channel: Value,
    /// Element 3 (event name).
    pub event: Value,
    /// Element 4 (payload).
    pub payload: Value,
}

impl BroadcastFrame {
    /// Extracts the relayed elements from a captured payload string.
    ///
    /// # Errors
    ///
    /// See [`TransformError`].
    pub fn parse(raw: &str) -> Result<Self, TransformError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| TransformError::InvalidJson(e.to_string()))?;

        let Value::Array(mut elements) = value else {
            return Err(TransformError::NotAnArray);
        };

        if elements.len() < MIN_FRAME_ELEMENTS {
            return Err(TransformError::TooShort {
                len: elements.len(),
            });
        }

        Ok(Self {
            payload: elements[PAYLOAD_INDEX].take(),
            event: elements[EVENT_INDEX].take(),
            channel: elements[TOPIC_INDEX].take(),
        })
    }

    /// Returns the fields merged into the request payload.
    #[must_use]
    pub fn request_fields(&self) -> Map<String, Value> {
        let fields = json!({
            "requestData": {
                "realm": BROADCAST_REALM,
                "data": {
                    "eventType": BROADCAST_EVENT_TYPE,
                    "eventData": self,
                }
            }
        });

        match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Builds the broadcast request with the given id.
    #[must_use]
    pub fn into_request(self, request_id: RequestId) -> Request {
        let fields = self.request_fields();
        Request {
            request_type: RequestType::BroadcastCustomMessage,
            request_id,
            fields,
        }
    }
}

/// Parses a captured payload and builds its broadcast request.
///
/// # Errors
///
/// See [`TransformError`].
pub fn transform_frame(raw: &str, request_id: RequestId) -> Result<Request, TransformError> {
    BroadcastFrame::parse(raw).map(|frame| frame.into_request(request_id))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_lobby_frame() {
        let request = transform_frame(
            r#"["1","2","room:lobby","new_msg","hello"]"#,
            RequestId::new("id1"),
        )
        .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "requestType": "BroadcastCustomMessage",
                "requestId": "id1",
                "requestData": {
                    "realm": BROADCAST_REALM,
                    "data": {
                        "eventType": BROADCAST_EVENT_TYPE,
                        "eventData": {
                            "channel": "room:lobby",
                            "event": "new_msg",
                            "payload": "hello"
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_structured_payload_is_kept() {
        let frame = BroadcastFrame::parse(
            r#"[null,"7","room:1","msg",{"body":"hi","n":[1,2]},"extra"]"#,
        )
        .unwrap();
        assert_eq!(frame.payload, json!({ "body": "hi", "n": [1, 2] }));
        assert_eq!(frame.channel, json!("room:1"));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            BroadcastFrame::parse("not json"),
            Err(TransformError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_not_array() {
        assert_eq!(
            BroadcastFrame::parse(r#"{"topic":"x"}"#),
            Err(TransformError::NotAnArray)
        );
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            BroadcastFrame::parse(r#"["1","2","room:lobby","new_msg"]"#),
            Err(TransformError::TooShort { len: 4 })
        );
    }

    proptest! {
        #[test]
        fn prop_short_arrays_rejected(items in proptest::collection::vec(any::<i64>(), 0..MIN_FRAME_ELEMENTS)) {
            let raw = serde_json::to_string(&items).unwrap();
            prop_assert_eq!(
                BroadcastFrame::parse(&raw),
                Err(TransformError::TooShort { len: items.len() })
            );
        }

        #[test]
        fn prop_string_elements_relayed(
            topic in "[a-z:]{1,16}",
            event in "[a-z_]{1,16}",
            body in ".*",
        ) {
            let raw = serde_json::to_string(&json!(["j", "r", topic, event, body])).unwrap();
            let frame = BroadcastFrame::parse(&raw).unwrap();
            prop_assert_eq!(frame.channel, json!(topic));
            prop_assert_eq!(frame.event, json!(event));
            prop_assert_eq!(frame.payload, json!(body));
        }
    }
}
