//! Observable relay status.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `aggregator` | Single-writer state with change-gated listeners |
//! | `types` | Status, counters, control stats, snapshot |

// ============================================================================
// Submodules
// ============================================================================

/// Shared state and listener fan-out.
pub mod aggregator;

/// Status data model.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use aggregator::{StatusAggregator, StatusListener};
pub use types::{
    ConnectionStatus, ControlStats, ControlUpdate, Counter, Endpoint, LinkStatus, MessageStats,
    StatusSnapshot,
};
