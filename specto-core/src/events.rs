//! Event types broadcast to embedding surfaces.
//!
//! ## Streams
//!
//! | Event | Subscription |
//! |-------|--------------|
//! | `OverlayTextEvent` | `SpectoEngine::subscribe_overlay` |
//! | `EngineStatusEvent` | `SpectoEngine::subscribe_status` |
//! | `FrameActivityEvent` | `SpectoEngine::subscribe_activity` |
//!
//! The overlay stream is the single designated path to the display
//! surface: whatever renders text on screen should consume it from one
//! place and nowhere else.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Overlay refresh events
// ---------------------------------------------------------------------------

/// Emitted by the display throttler on every tick — including ticks where
/// the text has not changed since the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayTextEvent {
    /// Monotonically increasing tick sequence number.
    pub seq: u64,
    /// The overlay text at tick time. May be empty.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Frame activity events
// ---------------------------------------------------------------------------

/// Emitted by the pipeline for each classified frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameActivityEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// Wall-clock time the classifier call took, in milliseconds.
    pub classify_ms: f32,
    /// Labels that survived windowing and thresholding.
    pub labels_kept: usize,
    /// Whether this frame's result was written to the overlay slot.
    /// False for classifier errors and empty result batches.
    pub updated: bool,
}

// ---------------------------------------------------------------------------
// Engine status events
// ---------------------------------------------------------------------------

/// Emitted when the engine state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatusEvent {
    pub status: EngineStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Current state of the Specto engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Engine created but `start()` not yet called.
    Idle,
    /// Warming up the classifier (loading weights, dummy forward pass).
    WarmingUp,
    /// Actively consuming frames and refreshing the overlay.
    Running,
    /// Capture stopped; engine may be restarted.
    Stopped,
    /// Unrecoverable error — restart required.
    Error,
}
