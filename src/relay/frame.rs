//! Captured frame events from the monitored tab.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// FrameDirection
// ============================================================================

/// Which way the captured frame travelled on the monitored tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameDirection {
    /// Sent by the page.
    Sent,
    /// Received by the page.
    Received,
}

// ============================================================================
// FrameEvent
// ============================================================================

/// One captured WebSocket frame.
///
/// # Format
///
/// ```json
/// { "direction": "received", "payload": "[\"1\",\"2\",\"room:lobby\",\"new_msg\",\"hi\"]" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEvent {
    /// Frame direction.
    pub direction: FrameDirection,

    /// Frame text. Missing for binary or truncated captures.
    #[serde(default)]
    pub payload: Option<String>,
}

impl FrameEvent {
    /// A frame received by the page.
    #[inline]
    #[must_use]
    pub fn received(payload: impl Into<String>) -> Self {
        Self {
            direction: FrameDirection::Received,
            payload: Some(payload.into()),
        }
    }

    /// A frame sent by the page.
    #[inline]
    #[must_use]
    pub fn sent(payload: impl Into<String>) -> Self {
        Self {
            direction: FrameDirection::Sent,
            payload: Some(payload.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_without_payload() {
        let event: FrameEvent = serde_json::from_str(r#"{"direction":"sent"}"#).unwrap();
        assert_eq!(event.direction, FrameDirection::Sent);
        assert!(event.payload.is_none());
    }

    #[test]
    fn test_constructors() {
        assert_eq!(FrameEvent::received("x").direction, FrameDirection::Received);
        assert_eq!(FrameEvent::sent("y").payload.as_deref(), Some("y"));
    }
}
