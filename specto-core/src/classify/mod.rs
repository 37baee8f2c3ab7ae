//! Image classifier abstraction.
//!
//! The `ImageClassifier` trait decouples the pipeline from any specific
//! backend (stub luma bands, ONNX ResNet/MobileNet exports, remote
//! accelerators, etc.).
//!
//! `&mut self` on `classify` intentionally expresses that backends are
//! stateful — session scratch buffers, warmed caches, etc. All mutation is
//! therefore serialised through `ClassifierHandle`'s `parking_lot::Mutex`.

pub mod stub;

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::{OnnxClassifier, OnnxClassifierConfig};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::frame::{CameraIntrinsics, VideoFrame};

/// One labeled prediction for a frame.
///
/// Immutable once produced; discarded after the overlay string is
/// rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Model-defined taxonomy label.
    pub identifier: String,
    /// Confidence in [0.0, 1.0].
    pub confidence: f32,
}

impl Classification {
    pub fn new(identifier: impl Into<String>, confidence: f32) -> Self {
        Self {
            identifier: identifier.into(),
            confidence,
        }
    }
}

/// Contract for classification backends.
pub trait ImageClassifier: Send + 'static {
    /// One-time warm-up: load weights, build sessions, run a dummy forward
    /// pass to populate caches. Called once at engine startup.
    ///
    /// # Errors
    /// Returns an error if model files are missing or corrupt.
    fn warm_up(&mut self) -> Result<()>;

    /// Classify one decoded frame.
    ///
    /// # Parameters
    /// - `frame`: Decoded image buffer. Implementations may convert pixel
    ///   layout and crop/scale internally.
    /// - `intrinsics`: Optional calibration hint, forwarded unmodified
    ///   from the capture source. Absence must not fail the call.
    ///
    /// # Returns
    /// A batch of classifications ordered by **descending confidence** —
    /// that ordering is part of this contract and the pipeline never
    /// re-sorts. May be empty when the backend produced no observations.
    fn classify(
        &mut self,
        frame: &VideoFrame,
        intrinsics: Option<&CameraIntrinsics>,
    ) -> Result<Vec<Classification>>;

    /// Reset any internal state (e.g. between capture sessions).
    fn reset(&mut self);
}

/// Thread-safe reference-counted handle to any `ImageClassifier` implementor.
///
/// Uses `parking_lot::Mutex` for non-poisoning on panic and a cheaper
/// uncontended lock than `std::sync::Mutex`.
#[derive(Clone)]
pub struct ClassifierHandle(pub Arc<Mutex<dyn ImageClassifier>>);

impl ClassifierHandle {
    /// Wrap any `ImageClassifier` in a `ClassifierHandle`.
    pub fn new<C: ImageClassifier>(classifier: C) -> Self {
        Self(Arc::new(Mutex::new(classifier)))
    }
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierHandle").finish_non_exhaustive()
    }
}
