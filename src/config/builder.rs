//! Builder pattern for relay configuration.
//!
//! Provides a fluent API for configuring and validating [`RelayConfig`].

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};
use crate::protocol::DEFAULT_RPC_VERSION;

use super::settings::StoredSettings;
use super::{DEFAULT_FORWARD_URL, HandshakeMode, RelayConfig};

// ============================================================================
// RelayConfigBuilder
// ============================================================================

/// Builder for [`RelayConfig`].
///
/// Use [`RelayConfig::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct RelayConfigBuilder {
    forward_url: Option<String>,
    password: Option<String>,
    handshake: HandshakeMode,
    rpc_version: Option<u32>,
}

// ============================================================================
// RelayConfigBuilder Implementation
// ============================================================================

impl RelayConfigBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the control-server URL.
    #[inline]
    #[must_use]
    pub fn forward_url(mut self, url: impl Into<String>) -> Self {
        self.forward_url = Some(url.into());
        self
    }

    /// Sets the control-server password.
    #[inline]
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the handshake variant.
    #[inline]
    #[must_use]
    pub fn handshake(mut self, mode: HandshakeMode) -> Self {
        self.handshake = mode;
        self
    }

    /// Sets the RPC version used in identify-on-open mode.
    #[inline]
    #[must_use]
    pub fn rpc_version(mut self, version: u32) -> Self {
        self.rpc_version = Some(version);
        self
    }

    /// Applies stored settings. Unset or empty fields keep their defaults.
    #[must_use]
    pub fn settings(mut self, settings: StoredSettings) -> Self {
        if let Some(url) = settings.forward_url.filter(|u| !u.trim().is_empty()) {
            self.forward_url = Some(url);
        }
        if let Some(password) = settings.ws_password {
            self.password = Some(password);
        }
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the URL does not parse
    /// - [`Error::Config`] if the URL scheme is not `ws` or `wss`
    /// - [`Error::Config`] if the RPC version is 0
    pub fn build(self) -> Result<RelayConfig> {
        let forward_url = self.validate_url()?;
        let rpc_version = self.rpc_version.unwrap_or(DEFAULT_RPC_VERSION);
        if rpc_version == 0 {
            return Err(Error::config("RPC version must be at least 1"));
        }

        Ok(RelayConfig {
            forward_url,
            password: self.password.filter(|p| !p.is_empty()),
            handshake: self.handshake,
            rpc_version,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl RelayConfigBuilder {
    fn validate_url(&self) -> Result<String> {
        let raw = self
            .forward_url
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_FORWARD_URL);

        let url = Url::parse(raw)?;
        match url.scheme() {
            "ws" | "wss" => Ok(raw.to_string()),
            other => Err(Error::config(format!(
                "forward URL must use ws:// or wss://, got {other}://"
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
