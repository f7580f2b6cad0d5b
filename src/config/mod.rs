//! Relay configuration.
//!
//! Use [`RelayConfig::builder()`] for a validated configuration, or
//! [`RelayConfig::from_settings`] to start from stored extension settings.
//!
//! # Example
//!
//! ```no_run
//! use obs_frame_relay::{HandshakeMode, RelayConfig};
//!
//! # fn example() -> obs_frame_relay::Result<()> {
//! let config = RelayConfig::builder()
//!     .forward_url("ws://localhost:4455")
//!     .password("hunter2")
//!     .handshake(HandshakeMode::AwaitHello)
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent builder with validation |
//! | `settings` | Stored settings JSON shape |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent configuration builder.
pub mod builder;

/// Stored settings shape.
pub mod settings;

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::protocol::DEFAULT_RPC_VERSION;

pub use builder::RelayConfigBuilder;
pub use settings::StoredSettings;

// ============================================================================
// Constants
// ============================================================================

/// Control-server URL used when none is configured.
pub const DEFAULT_FORWARD_URL: &str = "ws://localhost:4455";

// ============================================================================
// HandshakeMode
// ============================================================================

/// When the relay sends `Identify`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HandshakeMode {
    /// Identify as soon as the socket opens, ignoring `Hello`.
    #[default]
    IdentifyOnOpen,
    /// Wait for `Hello`, then identify with its RPC version and answer
    /// its password challenge.
    AwaitHello,
}

// ============================================================================
// RelayConfig
// ============================================================================

/// Validated relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Control-server WebSocket URL (`ws://` or `wss://`).
    pub forward_url: String,
    /// Control-server password.
    pub password: Option<String>,
    /// Handshake variant.
    pub handshake: HandshakeMode,
    /// RPC version sent in identify-on-open mode.
    pub rpc_version: u32,
}

impl RelayConfig {
    /// Creates a new builder.
    #[inline]
    #[must_use]
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::new()
    }

    /// Builds a configuration from stored extension settings.
    ///
    /// # Errors
    ///
    /// Same as [`RelayConfigBuilder::build`].
    pub fn from_settings(settings: StoredSettings) -> Result<Self> {
        RelayConfigBuilder::new().settings(settings).build()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            forward_url: DEFAULT_FORWARD_URL.to_string(),
            password: None,
            handshake: HandshakeMode::default(),
            rpc_version: DEFAULT_RPC_VERSION,
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
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.forward_url, DEFAULT_FORWARD_URL);
        assert_eq!(config.handshake, HandshakeMode::IdentifyOnOpen);
        assert_eq!(config.rpc_version, 1);
        assert!(config.password.is_none());
    }

    #[test]
    fn test_from_settings() {
        let settings: StoredSettings =
            serde_json::from_str(r#"{"forwardUrl":"ws://10.0.0.2:4444","wsPassword":"pw"}"#)
                .unwrap();
        let config = RelayConfig::from_settings(settings).unwrap();
        assert_eq!(config.forward_url, "ws://10.0.0.2:4444");
        assert_eq!(config.password.as_deref(), Some("pw"));
    }
}
