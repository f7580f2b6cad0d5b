//! Handshake message types.
//!
//! The handshake runs `Hello` → `Identify` → `Identified` (or `IdentifyFailed`).
//!
//! # Format
//!
//! Hello (server → relay):
//! ```json
//! {
//!   "op": 0,
//!   "d": {
//!     "obsWebSocketVersion": "5.1.0",
//!     "rpcVersion": 1,
//!     "authentication": { "challenge": "...", "salt": "..." }
//!   }
//! }
//! ```
//!
//! Identify (relay → server):
//! ```json
//! { "op": 1, "d": { "rpcVersion": 1, "eventSubscriptions": 0 } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Constants
// ============================================================================

/// RPC version sent when the server's version is unknown.
pub const DEFAULT_RPC_VERSION: u32 = 1;

// ============================================================================
// Hello
// ============================================================================

/// Payload of the server's `Hello` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    /// Server plugin version string.
    #[serde(default)]
    pub obs_web_socket_version: Option<String>,

    /// Latest RPC version the server supports.
    #[serde(default = "default_rpc_version")]
    pub rpc_version: u32,

    /// Present when the server requires a password.
    #[serde(default)]
    pub authentication: Option<AuthChallenge>,
}

fn default_rpc_version() -> u32 {
    DEFAULT_RPC_VERSION
}

/// Password challenge carried in `Hello`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthChallenge {
    /// Per-session challenge.
    pub challenge: String,
    /// Per-password salt.
    pub salt: String,
}

impl AuthChallenge {
    /// Computes the authentication string for `password`.
    ///
    /// `base64(sha256(base64(sha256(password + salt)) + challenge))`
    #[must_use]
    pub fn respond(&self, password: &str) -> String {
        let secret = STANDARD.encode(Sha256::digest(format!("{password}{}", self.salt)));
        STANDARD.encode(Sha256::digest(format!("{secret}{}", self.challenge)))
    }
}

// ============================================================================
// Identify
// ============================================================================

/// Payload of the relay's `Identify` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    /// RPC version the relay speaks.
    pub rpc_version: u32,

    /// Computed authentication string, if the server asked for one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,

    /// Event subscription bitmask. The relay subscribes to nothing.
    pub event_subscriptions: u32,
}

impl Identify {
    /// Identify without authentication.
    #[inline]
    #[must_use]
    pub const fn new(rpc_version: u32) -> Self {
        Self {
            rpc_version,
            authentication: None,
            event_subscriptions: 0,
        }
    }

    /// Builds the reply to a `Hello`.
    ///
    /// Uses the server's RPC version and answers its challenge when both a
    /// challenge and a password are present.
    #[must_use]
    pub fn for_hello(hello: &Hello, password: Option<&str>) -> Self {
        let authentication = match (&hello.authentication, password) {
            (Some(challenge), Some(password)) => Some(challenge.respond(password)),
            _ => None,
        };

        Self {
            rpc_version: hello.rpc_version,
            authentication,
            event_subscriptions: 0,
        }
    }
}

// ============================================================================
// Identified / IdentifyFailed
// ============================================================================

/// Payload of `Identified`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identified {
    /// RPC version the server settled on.
    #[serde(default)]
    pub negotiated_rpc_version: Option<u32>,
}

/// Payload of `IdentifyFailed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdentifyFailed {
    /// Reason given by the server.
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
