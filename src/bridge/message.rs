//! Presentation-facing message shapes.
//!
//! | Message | Direction | Shape |
//! |---------|-----------|-------|
//! | `getStatus` | UI → Core | `{ "action": "getStatus" }` |
//! | `connectObs` | UI → Core | `{ "action": "connectObs" }` |
//! | `disconnectObs` | UI → Core | `{ "action": "disconnectObs" }` |
//! | reply | Core → UI | snapshot, or `{ "success": bool }` |
//! | `statusUpdate` | Core → UI | `{ "action": "statusUpdate", ...snapshot }` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::status::StatusSnapshot;

// ============================================================================
// BridgeCommand
// ============================================================================

/// Command from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BridgeCommand {
    /// Pull the current status.
    GetStatus,
    /// Open the control link.
    ConnectObs,
    /// Close the control link.
    DisconnectObs,
}

// ============================================================================
// BridgeReply
// ============================================================================

/// Acknowledgement for connect/disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Whether the command did what was asked.
    pub success: bool,
}

/// Reply to a [`BridgeCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeReply {
    /// Reply to `getStatus`.
    Status(StatusSnapshot),
    /// Reply to `connectObs` / `disconnectObs`.
    Ack(Ack),
}

impl BridgeReply {
    /// Creates an acknowledgement reply.
    #[inline]
    #[must_use]
    pub const fn ack(success: bool) -> Self {
        Self::Ack(Ack { success })
    }
}

// ============================================================================
// Notification
// ============================================================================

/// Push message to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Notification {
    /// Status changed.
    StatusUpdate(StatusSnapshot),
}

// ============================================================================
// Tests
// ============================================================================
