//! Frame capture input and broadcast transformation.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Captured frame events |
//! | `transform` | Frame → `BroadcastCustomMessage` request |

// ============================================================================
// Submodules
// ============================================================================

/// Captured frame events.
pub mod frame;

/// Frame → broadcast request.
pub mod transform;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{FrameDirection, FrameEvent};
pub use transform::{
    BROADCAST_EVENT_TYPE, BROADCAST_REALM, BroadcastFrame, MIN_FRAME_ELEMENTS, TransformError,
    transform_frame,
};
