//! Lock-free SPSC ring for decoded frames.
//!
//! Uses `ringbuf::HeapRb<VideoFrame>` so the capture thread hands whole
//! frames to the pipeline without a lock. The capacity is deliberately
//! tiny: one frame under classification plus one pending. A producer that
//! finds the ring full drops the incoming frame — that is the
//! discard-late-frames capture policy, chosen over backlogging so the
//! overlay tracks the live scene instead of a growing queue.

use ringbuf::{traits::Split, HeapRb};

pub use ringbuf::traits::{Consumer, Producer};

use crate::frame::VideoFrame;

/// Type alias for the producer half — held by the capture thread.
pub type FrameProducer = ringbuf::HeapProd<VideoFrame>;

/// Type alias for the consumer half — held by the pipeline thread.
pub type FrameConsumer = ringbuf::HeapCons<VideoFrame>;

/// One in flight plus one pending; later arrivals are late frames.
pub const RING_CAPACITY: usize = 2;

/// Create a matched producer/consumer pair backed by a heap-allocated ring.
pub fn create_frame_ring() -> (FrameProducer, FrameConsumer) {
    HeapRb::<VideoFrame>::new(RING_CAPACITY).split()
}
