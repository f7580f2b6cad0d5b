//! Status data model.
//!
//! Serialized field names follow the settings/popup JSON shape
//! (`connectionStatus`, `messageStats`, `obsStats`).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Endpoint / LinkStatus
// ============================================================================

/// The two endpoints whose status is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Endpoint {
    /// The monitored tab's captured traffic.
    FrameSource,
    /// The control-server socket.
    ControlLink,
}

/// Status of one endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// No socket.
    #[default]
    Disconnected,
    /// Dial in progress.
    Connecting,
    /// Socket open.
    Connected,
    /// Handshake accepted.
    Authenticated,
    /// Handshake rejected.
    AuthFailed,
    /// Transport error.
    Error,
}

impl LinkStatus {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
            Self::AuthFailed => "auth_failed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Endpoint → status map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    /// Captured-traffic status.
    pub frame_source: LinkStatus,
    /// Control-server status.
    pub control_link: LinkStatus,
}

impl ConnectionStatus {
    /// Returns the status of `endpoint`.
    #[inline]
    #[must_use]
    pub const fn get(&self, endpoint: Endpoint) -> LinkStatus {
        match endpoint {
            Endpoint::FrameSource => self.frame_source,
            Endpoint::ControlLink => self.control_link,
        }
    }

    /// Sets the status of `endpoint`, returning `true` if it changed.
    pub fn set(&mut self, endpoint: Endpoint, status: LinkStatus) -> bool {
        let slot = match endpoint {
            Endpoint::FrameSource => &mut self.frame_source,
            Endpoint::ControlLink => &mut self.control_link,
        };
        if *slot == status {
            return false;
        }
        *slot = status;
        true
    }
}

// ============================================================================
// MessageStats
// ============================================================================

/// Traffic counters.
///
/// Independent tallies; no relation between them is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStats {
    /// Frames received by the monitored tab.
    pub received: u64,
    /// Broadcasts handed to the control link.
    pub forwarded: u64,
    /// Frames sent by the monitored tab.
    pub sent: u64,
    /// Frames dropped (malformed, or link not open).
    pub lost: u64,
}

/// Selects one [`MessageStats`] counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Frame received by the monitored page.
    Received,
    /// Broadcast queued to the control server.
    Forwarded,
    /// Frame sent by the monitored page.
    Sent,
    /// Frame that could not be forwarded.
    Lost,
}

impl MessageStats {
    /// Increments one counter.
    pub fn increment(&mut self, counter: Counter) {
        let slot = match counter {
            Counter::Received => &mut self.received,
            Counter::Forwarded => &mut self.forwarded,
            Counter::Sent => &mut self.sent,
            Counter::Lost => &mut self.lost,
        };
        *slot = slot.saturating_add(1);
    }
}

// ============================================================================
// ControlStats
// ============================================================================

/// Control-server state as reported by the status queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlStats {
    /// Number of scenes.
    pub scenes: u64,
    /// Number of inputs.
    pub sources: u64,
    /// Stream output active.
    pub streaming: bool,
    /// Record output active.
    pub recording: bool,
}

/// A single-field change to [`ControlStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlUpdate {
    /// Scene count from `GetSceneList`.
    Scenes(u64),
    /// Input count from `GetInputList`.
    Sources(u64),
    /// Stream output state.
    Streaming(bool),
    /// Record output state.
    Recording(bool),
}

impl ControlStats {
    /// Applies `update`, returning `true` if the value changed.
    pub fn apply(&mut self, update: ControlUpdate) -> bool {
        let before = *self;
        match update {
            ControlUpdate::Scenes(n) => self.scenes = n,
            ControlUpdate::Sources(n) => self.sources = n,
            ControlUpdate::Streaming(on) => self.streaming = on,
            ControlUpdate::Recording(on) => self.recording = on,
        }
        before != *self
    }
}

// ============================================================================
// StatusSnapshot
// ============================================================================

/// Full observable state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Endpoint statuses.
    pub connection_status: ConnectionStatus,
    /// Traffic counters.
    pub message_stats: MessageStats,
    /// Control-server stats.
    pub obs_stats: ControlStats,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_connection_status_set_reports_change() {
        let mut status = ConnectionStatus::default();
        assert!(status.set(Endpoint::ControlLink, LinkStatus::Connecting));
        assert!(!status.set(Endpoint::ControlLink, LinkStatus::Connecting));
        assert_eq!(status.get(Endpoint::ControlLink), LinkStatus::Connecting);
        assert_eq!(status.get(Endpoint::FrameSource), LinkStatus::Disconnected);
    }

    #[test]
    fn test_control_stats_apply() {
        let mut stats = ControlStats::default();
        assert!(stats.apply(ControlUpdate::Scenes(3)));
        assert!(!stats.apply(ControlUpdate::Scenes(3)));
        assert!(stats.apply(ControlUpdate::Recording(true)));
        assert_eq!(stats.scenes, 3);
        assert!(stats.recording);
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut snapshot = StatusSnapshot::default();
        snapshot.connection_status.control_link = LinkStatus::AuthFailed;
        snapshot.message_stats.increment(Counter::Lost);

        let value = serde_json::to_value(snapshot).unwrap();
        assert_eq!(
            value,
            json!({
                "connectionStatus": { "frameSource": "disconnected", "controlLink": "auth_failed" },
                "messageStats": { "received": 0, "forwarded": 0, "sent": 0, "lost": 1 },
                "obsStats": { "scenes": 0, "sources": 0, "streaming": false, "recording": false }
            })
        );
    }
}
