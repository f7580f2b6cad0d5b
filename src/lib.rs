//! OBS Frame Relay - relay captured WebSocket frames to an OBS control server.
//!
//! This library is the core of a browser-extension bridge: frames captured
//! on a monitored tab are transformed into `BroadcastCustomMessage`
//! requests and sent over an OBS WebSocket v5-style control link.
//!
//! # Architecture
//!
//! ```text
//! Frame Source ──► Bridge ──► ControlLink ──► Session ──► control server
//!                    │             │
//!                    └──► StatusAggregator ◄──┘
//!                              │
//!                              └──► statusUpdate listeners (UI)
//! ```
//!
//! Key design principles:
//!
//! - At most one [`Session`] per [`ControlLink`]; only its event loop
//!   touches the socket
//! - Requests are correlated by request id through a pending map, with no
//!   timeout
//! - All shared state lives in the [`StatusAggregator`], which notifies
//!   listeners on change only
//!
//! # Quick Start
//!
//! ```no_run
//! use obs_frame_relay::{Bridge, BridgeCommand, FrameEvent, RelayConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = RelayConfig::builder()
//!         .forward_url("ws://localhost:4455")
//!         .build()?;
//!     let bridge = Bridge::new(config);
//!
//!     bridge.handle_command(BridgeCommand::ConnectObs).await;
//!     bridge.handle_frame(FrameEvent::received(
//!         r#"["1","2","room:lobby","new_msg",{"body":"hi"}]"#,
//!     ));
//!
//!     println!("{:?}", bridge.status());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Presentation commands, frame ingest, notifications |
//! | [`config`] | Relay configuration and stored settings |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Control-server message types |
//! | [`relay`] | Captured frames and broadcast transformation |
//! | [`status`] | Aggregated connection status and stats |
//! | [`transport`] | Control-link session and event loop |

// ============================================================================
// Modules
// ============================================================================

/// Presentation commands, frame ingest, notifications.
pub mod bridge;

/// Relay configuration.
///
/// Use [`RelayConfig::builder()`] to create a validated configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Control-server protocol message types.
pub mod protocol;

/// Captured frames and broadcast transformation.
pub mod relay;

/// Aggregated status.
pub mod status;

/// Control-link transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{Ack, Bridge, BridgeCommand, BridgeReply, Notification};

// Configuration types
pub use config::{
    DEFAULT_FORWARD_URL, HandshakeMode, RelayConfig, RelayConfigBuilder, StoredSettings,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ListenerId, RequestId};

// Relay types
pub use relay::{BroadcastFrame, FrameDirection, FrameEvent, TransformError, transform_frame};

// Status types
pub use status::{
    ConnectionStatus, ControlStats, Endpoint, LinkStatus, MessageStats, StatusAggregator,
    StatusSnapshot,
};

// Transport types
pub use transport::{ControlLink, HandshakeState, Session};
