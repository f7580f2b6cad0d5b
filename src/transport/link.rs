//! The control link: at most one [`Session`] to the control server.
//!
//! # Example
//!
//! ```no_run
//! use obs_frame_relay::{ControlLink, RelayConfig, StatusAggregator};
//!
//! # async fn example() -> obs_frame_relay::Result<()> {
//! let link = ControlLink::new(RelayConfig::default(), StatusAggregator::new());
//! link.connect().await?;
//!
//! let response = link.send_request("GetSceneList", None).await?;
//! println!("{:?}", response.response_data);
//!
//! link.disconnect().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::connect_async;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{RequestResponse, RequestType};
use crate::relay::BroadcastFrame;
use crate::status::{Counter, Endpoint, LinkStatus, StatusAggregator};

use super::session::{HandshakeState, Session};

// ============================================================================
// ControlLink
// ============================================================================

/// Owner of the connection to the control server.
///
/// `connect` and `disconnect` are serialized; requests and forwards only
/// take a short read lock on the current session.
pub struct ControlLink {
    config: RwLock<RelayConfig>,
    aggregator: Arc<StatusAggregator>,
    session: RwLock<Option<Session>>,
    /// Serializes `connect`/`disconnect` across the dial `.await`.
    dial: AsyncMutex<()>,
    sockets_opened: AtomicU64,
}

impl ControlLink {
    /// Creates a disconnected link.
    #[must_use]
    pub fn new(config: RelayConfig, aggregator: Arc<StatusAggregator>) -> Self {
        Self {
            config: RwLock::new(config),
            aggregator,
            session: RwLock::new(None),
            dial: AsyncMutex::new(()),
            sockets_opened: AtomicU64::new(0),
        }
    }

    /// Returns the status aggregator this link reports into.
    #[inline]
    #[must_use]
    pub fn aggregator(&self) -> &Arc<StatusAggregator> {
        &self.aggregator
    }

    /// Returns a copy of the current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> RelayConfig {
        self.config.read().clone()
    }

    /// Replaces the configuration used by the next `connect`.
    pub fn set_config(&self, config: RelayConfig) {
        debug!(forward_url = %config.forward_url, "Control link configuration updated");
        *self.config.write() = config;
    }

    /// Returns `true` if a session has an open socket.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session.read().as_ref().is_some_and(Session::is_open)
    }

    /// Returns the current session's handshake progress.
    #[inline]
    #[must_use]
    pub fn handshake_state(&self) -> Option<HandshakeState> {
        self.session.read().as_ref().map(Session::handshake_state)
    }

    /// Returns the number of requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.session.read().as_ref().map_or(0, Session::pending_count)
    }

    /// Returns how many sockets this link has opened.
    #[inline]
    #[must_use]
    pub fn sockets_opened(&self) -> u64 {
        self.sockets_opened.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Connection Lifecycle
    // ========================================================================

    /// Opens a session to the configured URL.
    ///
    /// Does nothing if a session already has an open socket. A session left
    /// behind by a transport error or remote close is replaced.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the socket cannot be opened
    /// - [`Error::WebSocket`] if the initial `Identify` cannot be sent
    pub async fn connect(&self) -> Result<()> {
        let _dial = self.dial.lock().await;

        if let Some(stale) = self.session.read().as_ref() {
            if stale.is_open() {
                debug!("Already connected to control server");
                return Ok(());
            }
            stale.shutdown();
        }
        *self.session.write() = None;

        let config = self.config();
        info!(url = %config.forward_url, "Connecting to control server");
        self.aggregator
            .update_status(Endpoint::ControlLink, LinkStatus::Connecting);

        let ws_stream = match connect_async(config.forward_url.as_str()).await {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                error!(url = %config.forward_url, error = %e, "Failed to connect to control server");
                self.aggregator
                    .update_status(Endpoint::ControlLink, LinkStatus::Error);
                return Err(Error::connection(e.to_string()));
            }
        };

        self.sockets_opened.fetch_add(1, Ordering::Relaxed);

        let session = match Session::open(ws_stream, &config, Arc::clone(&self.aggregator)).await
        {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Failed to start control session");
                self.aggregator
                    .update_status(Endpoint::ControlLink, LinkStatus::Error);
                return Err(e);
            }
        };

        info!("Control server socket open");
        *self.session.write() = Some(session);
        Ok(())
    }

    /// Closes the session's socket.
    ///
    /// Zeroes control stats and marks the link `disconnected`. Returns
    /// `false` (and changes nothing) if no socket was open.
    pub async fn disconnect(&self) -> bool {
        let _dial = self.dial.lock().await;

        let Some(session) = self.session.write().take() else {
            debug!("Control link is not connected");
            return false;
        };

        if session.is_closed() {
            debug!("Control link socket already closed");
            return false;
        }

        session.shutdown();
        self.aggregator.reset_control();
        self.aggregator
            .update_status(Endpoint::ControlLink, LinkStatus::Disconnected);

        info!("Disconnected from control server");
        true
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Sends a request and waits for its response.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no socket is open
    /// - [`Error::Protocol`] if `data` is not a JSON object
    /// - [`Error::ConnectionClosed`] if the socket closes first
    pub async fn send_request(
        &self,
        request_type: impl Into<RequestType>,
        data: Option<Value>,
    ) -> Result<RequestResponse> {
        let request_type = request_type.into();
        let session = self.session.read().clone();

        match session {
            Some(session) => session.send_request(request_type, data).await,
            None => {
                error!(%request_type, "Control link is not connected");
                Err(Error::NotConnected)
            }
        }
    }

    /// Transforms a captured frame and forwards it as a broadcast.
    ///
    /// Counts `forwarded` when the broadcast is queued, `lost` when the
    /// frame is malformed or no socket is open. Returns `true` if queued.
    pub fn forward_frame(&self, payload: &str) -> bool {
        let frame = match BroadcastFrame::parse(payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                self.aggregator.increment(Counter::Lost);
                return false;
            }
        };

        let session = self.session.read().clone();
        let queued = session.is_some_and(|session| {
            session.forward(frame.into_request(RequestId::generate()))
        });

        if queued {
            self.aggregator.increment(Counter::Forwarded);
        } else {
            warn!("Control link not connected, frame not forwarded");
            self.aggregator.increment(Counter::Lost);
        }
        queued
    }
}

// ============================================================================
// Tests
// ============================================================================
