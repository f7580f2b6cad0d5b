//! Control-server protocol message types.
//!
//! This module defines the OBS WebSocket v5-style messages exchanged
//! between the relay and the control server.
//!
//! # Protocol Overview
//!
//! | Message | Opcode | Direction | Purpose |
//! |---------|--------|-----------|---------|
//! | `Hello` | 0 | Server → Relay | Announce RPC version, auth challenge |
//! | `Identify` | 1 | Relay → Server | Identify, optionally authenticate |
//! | `Identified` | 2 | Server → Relay | Handshake complete |
//! | `IdentifyFailed` | 3 | Server → Relay | Handshake rejected |
//! | `Request` | 6 | Relay → Server | RPC request |
//! | `RequestResponse` | 7 | Server → Relay | RPC response |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `handshake` | Hello / Identify payloads and auth |
//! | `message` | `{op, d}` envelopes |
//! | `opcode` | Opcode values |
//! | `request` | Request and RequestResponse payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Handshake payloads.
pub mod handshake;

/// Opcode envelopes.
pub mod message;

/// Opcode values.
pub mod opcode;

/// Request and RequestResponse payloads.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use handshake::{AuthChallenge, DEFAULT_RPC_VERSION, Hello, Identified, Identify, IdentifyFailed};
pub use message::{ClientMessage, ServerMessage};
pub use opcode::OpCode;
pub use request::{Request, RequestResponse, RequestStatus, RequestType};
