//! Frame capture seam.
//!
//! # Design constraints
//!
//! Real capture backends deliver frames from an OS-owned callback thread
//! with its own affinity rules. A `FrameSource` therefore owns its own
//! delivery context: the engine hands it the ring producer and the shared
//! running flag, and from then on the source pushes frames on its own
//! thread until the flag drops. The delivery path **must not** block on
//! the pipeline — a full ring means the pipeline is still busy with the
//! previous frame, and the incoming frame is dropped (the
//! discard-late-frames policy), never queued behind it.
//!
//! Orientation is the source's problem: frames arrive already fixed to
//! the display orientation, and the pipeline never rotates.

pub mod device;
pub mod synthetic;

pub use synthetic::SyntheticCamera;

use std::sync::{atomic::AtomicBool, Arc};

use crossbeam_channel::Receiver;

use crate::error::Result;
use crate::frame::ring::FrameProducer;

/// Negotiated capture parameters, reported once the device is open.
#[derive(Debug, Clone)]
pub struct CaptureFormat {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Nominal delivery rate. Actual delivery is bursty; the ring's drop
    /// policy absorbs the difference.
    pub frames_per_second: f32,
}

/// Camera lifecycle notifications, observed by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    Connected,
    Disconnected,
}

/// Contract for capture backends.
pub trait FrameSource: Send + 'static {
    /// Open the device and begin pushing frames into `frames`.
    ///
    /// Delivery continues on the source's own thread until `running`
    /// becomes false. Blocks only long enough to confirm the device is
    /// usable, then returns the negotiated format.
    ///
    /// # Errors
    /// `SpectoError::NoCameraDevice` when no usable device exists,
    /// `SpectoError::CameraDevice` for backend failures.
    fn open(&mut self, frames: FrameProducer, running: Arc<AtomicBool>) -> Result<CaptureFormat>;

    /// Lifecycle event stream for this source. The receiver may be taken
    /// before `open` is called.
    fn events(&self) -> Receiver<CameraEvent>;

    /// Release the device and join any delivery thread. Called after the
    /// pipeline has exited; must be idempotent.
    fn close(&mut self);
}
