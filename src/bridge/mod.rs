//! Command surface between the extension's UI/settings and the core.
//!
//! A [`Bridge`] owns the [`StatusAggregator`] and [`ControlLink`], accepts
//! presentation commands and captured frames, and pushes
//! [`Notification`]s to subscribers.
//!
//! # Example
//!
//! ```no_run
//! use obs_frame_relay::{Bridge, BridgeCommand, FrameEvent, RelayConfig};
//!
//! # async fn example() -> obs_frame_relay::Result<()> {
//! let bridge = Bridge::new(RelayConfig::default());
//! bridge.on_notification(|notification| {
//!     println!("{}", serde_json::to_string(&notification)?);
//!     Ok(())
//! });
//!
//! bridge.handle_command(BridgeCommand::ConnectObs).await;
//! bridge.handle_frame(FrameEvent::received(r#"["1","2","room:lobby","new_msg","hi"]"#));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Presentation-facing message shapes.
pub mod message;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{RelayConfig, StoredSettings};
use crate::error::Result;
use crate::identifiers::ListenerId;
use crate::relay::{FrameDirection, FrameEvent};
use crate::status::{Counter, Endpoint, LinkStatus, StatusAggregator, StatusSnapshot};
use crate::transport::ControlLink;

pub use message::{Ack, BridgeCommand, BridgeReply, Notification};

// ============================================================================
// Bridge
// ============================================================================

/// Entry point for the extension glue.
pub struct Bridge {
    aggregator: Arc<StatusAggregator>,
    link: ControlLink,
}

impl Bridge {
    /// Creates a bridge with a disconnected control link.
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        let aggregator = StatusAggregator::new();
        let link = ControlLink::new(config, Arc::clone(&aggregator));
        Self { aggregator, link }
    }

    /// Returns the control link.
    #[inline]
    #[must_use]
    pub fn link(&self) -> &ControlLink {
        &self.link
    }

    /// Returns the status aggregator.
    #[inline]
    #[must_use]
    pub fn aggregator(&self) -> &Arc<StatusAggregator> {
        &self.aggregator
    }

    /// Returns the current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        self.aggregator.snapshot()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Executes a presentation command.
    ///
    /// Failures are logged and reported as `{ "success": false }`.
    pub async fn handle_command(&self, command: BridgeCommand) -> BridgeReply {
        debug!(?command, "Bridge command");

        match command {
            BridgeCommand::GetStatus => BridgeReply::Status(self.aggregator.snapshot()),

            BridgeCommand::ConnectObs => match self.link.connect().await {
                Ok(()) => BridgeReply::ack(true),
                Err(e) => {
                    warn!(error = %e, "connectObs failed");
                    BridgeReply::ack(false)
                }
            },

            BridgeCommand::DisconnectObs => {
                self.link.disconnect().await;
                BridgeReply::ack(true)
            }
        }
    }

    /// Parses a JSON command, executes it and returns the JSON reply.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if `raw` is not a known command.
    pub async fn handle_message(&self, raw: &str) -> Result<String> {
        let command: BridgeCommand = serde_json::from_str(raw)?;
        let reply = self.handle_command(command).await;
        Ok(serde_json::to_string(&reply)?)
    }

    /// Applies new settings for the next connect.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings do not validate; the
    /// previous configuration is kept.
    pub fn apply_settings(&self, settings: StoredSettings) -> Result<()> {
        let current = self.link.config();
        let config = RelayConfig::builder()
            .handshake(current.handshake)
            .rpc_version(current.rpc_version)
            .settings(settings)
            .build()?;
        self.link.set_config(config);
        Ok(())
    }

    // ========================================================================
    // Frame Source
    // ========================================================================

    /// Ingests one captured frame.
    ///
    /// Counts it, marks the frame source `connected`, and forwards received
    /// frames over the control link.
    pub fn handle_frame(&self, event: FrameEvent) {
        let counter = match event.direction {
            FrameDirection::Received => Counter::Received,
            FrameDirection::Sent => Counter::Sent,
        };
        self.aggregator.increment(counter);
        self.aggregator
            .update_status(Endpoint::FrameSource, LinkStatus::Connected);

        let Some(payload) = event.payload else {
            warn!(direction = ?event.direction, "Captured frame has no payload");
            return;
        };

        if event.direction == FrameDirection::Received {
            self.link.forward_frame(&payload);
        }
    }

    /// Records a frame source status change (attach, detach, failure).
    pub fn set_frame_source_status(&self, status: LinkStatus) {
        self.aggregator.update_status(Endpoint::FrameSource, status);
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Registers a `statusUpdate` sink.
    pub fn on_notification<F>(&self, sink: F) -> ListenerId
    where
        F: Fn(Notification) -> Result<()> + Send + Sync + 'static,
    {
        self.aggregator
            .subscribe(Box::new(move |snapshot| sink(Notification::StatusUpdate(*snapshot))))
    }

    /// Removes a sink registered with [`Bridge::on_notification`].
    pub fn remove_notification(&self, id: ListenerId) -> bool {
        self.aggregator.unsubscribe(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
