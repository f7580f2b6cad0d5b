//! WebSocket transport to the control server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  ControlLink    │                              │  Control server │
//! │                 │         WebSocket            │  (OBS v5)       │
//! │  Session        │─────────────────────────────►│                 │
//! │  → event loop   │      ws://localhost:4455     │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `ControlLink::connect` - Dial, send `Identify`, spawn event loop
//! 2. `Identified` - Link `authenticated`, four status queries issued
//! 3. `ControlLink::send_request` / `forward_frame` - RPC traffic
//! 4. `ControlLink::disconnect` - Close socket, zero control stats
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `link` | Singleton session owner and public API |
//! | `router` | Response → control stats |
//! | `session` | Socket, handshake and event loop |

// ============================================================================
// Submodules
// ============================================================================

/// Singleton session owner.
pub mod link;

/// Response routing.
pub mod router;

/// Socket, handshake and event loop.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use link::ControlLink;
pub use router::route_response;
pub use session::{HandshakeState, Session};
