//! # specto-core
//!
//! Reusable live camera-classification overlay engine.
//!
//! ## Architecture
//!
//! ```text
//! Camera → FrameSource → SPSC frame ring (late frames dropped)
//!                              │
//!                   pipeline (spawn_blocking)
//!                              │
//!                  ImageClassifier::classify
//!                              │
//!              rank / threshold / format → DisplaySlot
//!                              │
//!        throttler (250 ms tick) → broadcast::Sender<OverlayTextEvent>
//! ```
//!
//! The capture thread never blocks on classification: a frame arriving
//! while the pipeline is busy is dropped at the ring. The overlay refresh
//! rate is fixed by the throttler, not by the frame rate.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod capture;
pub mod classify;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
pub mod overlay;

// Convenience re-exports for downstream crates
pub use capture::{CameraEvent, CaptureFormat, FrameSource, SyntheticCamera};
pub use classify::{stub::StubClassifier, Classification, ClassifierHandle, ImageClassifier};
pub use engine::{EngineConfig, SpectoEngine};
pub use error::SpectoError;
pub use events::{EngineStatus, EngineStatusEvent, FrameActivityEvent, OverlayTextEvent};
pub use frame::{CameraIntrinsics, PixelFormat, VideoFrame};
pub use overlay::DisplaySlot;

#[cfg(feature = "onnx")]
pub use classify::{OnnxClassifier, OnnxClassifierConfig};
