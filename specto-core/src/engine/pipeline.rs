//! Blocking classification pipeline loop.
//!
//! ## Pipeline stages (per iteration)
//!
//! ```text
//! 1. Pop one frame from the SPSC ring (or sleep briefly when empty)
//! 2. Skip malformed frames (buffer/dimension mismatch) — a no-op, not an error
//! 3. Classify under the ClassifierHandle lock (+ intrinsics pass-through)
//! 4. Outcome split:
//!    a. Error        → log, count, overlay untouched
//!    b. Empty batch  → log, count, overlay untouched
//!    c. Batch        → window + threshold + format → DisplaySlot publish
//! 5. Broadcast a FrameActivityEvent for the frame
//! ```
//!
//! The slot publish is gated on the running flag: a classification that
//! completes after `stop()` is discarded, never displayed.
//!
//! This entire loop runs in `spawn_blocking`, keeping the Tokio async
//! executor free for the embedding surface's I/O.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::time::Instant;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    capture::{CameraEvent, CaptureFormat},
    classify::ClassifierHandle,
    engine::EngineConfig,
    events::{EngineStatus, EngineStatusEvent, FrameActivityEvent},
    frame::ring::{Consumer, FrameConsumer},
    frame::VideoFrame,
    overlay::{format::ranked_labels, DisplaySlot},
};

pub struct PipelineDiagnostics {
    pub frames_in: AtomicUsize,
    pub frames_malformed: AtomicUsize,
    pub classify_calls: AtomicUsize,
    pub classify_errors: AtomicUsize,
    pub empty_batches: AtomicUsize,
    pub overlay_writes: AtomicUsize,
    pub labels_kept: AtomicUsize,
    /// Written by the display throttler, not the pipeline.
    pub ticks_fired: AtomicUsize,
}

impl Default for PipelineDiagnostics {
    fn default() -> Self {
        Self {
            frames_in: AtomicUsize::new(0),
            frames_malformed: AtomicUsize::new(0),
            classify_calls: AtomicUsize::new(0),
            classify_errors: AtomicUsize::new(0),
            empty_batches: AtomicUsize::new(0),
            overlay_writes: AtomicUsize::new(0),
            labels_kept: AtomicUsize::new(0),
            ticks_fired: AtomicUsize::new(0),
        }
    }
}

impl PipelineDiagnostics {
    pub fn reset(&self) {
        self.frames_in.store(0, Ordering::Relaxed);
        self.frames_malformed.store(0, Ordering::Relaxed);
        self.classify_calls.store(0, Ordering::Relaxed);
        self.classify_errors.store(0, Ordering::Relaxed);
        self.empty_batches.store(0, Ordering::Relaxed);
        self.overlay_writes.store(0, Ordering::Relaxed);
        self.labels_kept.store(0, Ordering::Relaxed);
        self.ticks_fired.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            classify_calls: self.classify_calls.load(Ordering::Relaxed),
            classify_errors: self.classify_errors.load(Ordering::Relaxed),
            empty_batches: self.empty_batches.load(Ordering::Relaxed),
            overlay_writes: self.overlay_writes.load(Ordering::Relaxed),
            labels_kept: self.labels_kept.load(Ordering::Relaxed),
            ticks_fired: self.ticks_fired.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsSnapshot {
    pub frames_in: usize,
    pub frames_malformed: usize,
    pub classify_calls: usize,
    pub classify_errors: usize,
    pub empty_batches: usize,
    pub overlay_writes: usize,
    pub labels_kept: usize,
    pub ticks_fired: usize,
}

/// All context the pipeline needs, passed as one struct so the closure stays tidy.
pub struct PipelineContext {
    pub config: EngineConfig,
    pub classifier: ClassifierHandle,
    pub consumer: FrameConsumer,
    pub camera_events: Receiver<CameraEvent>,
    pub running: Arc<AtomicBool>,
    pub slot: DisplaySlot,
    pub status_tx: broadcast::Sender<EngineStatusEvent>,
    pub activity_tx: broadcast::Sender<FrameActivityEvent>,
    pub status: Arc<Mutex<EngineStatus>>,
    pub seq: Arc<AtomicU64>,
    pub capture_format: CaptureFormat,
    pub diagnostics: Arc<PipelineDiagnostics>,
}

/// Sleep when the ring is empty (avoids busy-wait burning a core). Well
/// under one frame interval at any realistic capture rate.
const SLEEP_EMPTY_MS: u64 = 2;

/// What one frame's classification did to the overlay.
enum ClassifyOutcome {
    Updated { labels_kept: usize },
    NoResults,
    Failed,
}

/// Run the blocking pipeline until `ctx.running` becomes false.
pub fn run(mut ctx: PipelineContext) {
    info!(
        width = ctx.capture_format.width,
        height = ctx.capture_format.height,
        fps = ctx.capture_format.frames_per_second,
        "pipeline started"
    );

    loop {
        // ── 0. Check running flag ─────────────────────────────────────────
        if !ctx.running.load(Ordering::Relaxed) {
            break;
        }

        // ── 1. Camera lifecycle notifications ─────────────────────────────
        while let Ok(event) = ctx.camera_events.try_recv() {
            match event {
                CameraEvent::Connected => debug!("capture source connected"),
                CameraEvent::Disconnected => {
                    warn!("capture source disconnected — overlay frozen until frames resume");
                    let _ = ctx.status_tx.send(EngineStatusEvent {
                        status: *ctx.status.lock(),
                        detail: Some("camera disconnected; awaiting frames".into()),
                    });
                }
            }
        }

        // ── 2. Pop one frame ──────────────────────────────────────────────
        let Some(frame) = ctx.consumer.try_pop() else {
            std::thread::sleep(std::time::Duration::from_millis(SLEEP_EMPTY_MS));
            continue;
        };

        ctx.diagnostics.frames_in.fetch_add(1, Ordering::Relaxed);

        // ── 3. Malformed frames are a skip, not an error ──────────────────
        if !frame.is_well_formed() {
            ctx.diagnostics
                .frames_malformed
                .fetch_add(1, Ordering::Relaxed);
            debug!(
                len = frame.pixels.len(),
                width = frame.width,
                height = frame.height,
                "skipping malformed frame"
            );
            continue;
        }

        // ── 4. Classify and publish ───────────────────────────────────────
        classify_frame(&mut ctx, &frame);
    }

    let snap = ctx.diagnostics.snapshot();
    info!(
        frames_in = snap.frames_in,
        frames_malformed = snap.frames_malformed,
        classify_calls = snap.classify_calls,
        classify_errors = snap.classify_errors,
        empty_batches = snap.empty_batches,
        overlay_writes = snap.overlay_writes,
        labels_kept = snap.labels_kept,
        "pipeline stopped — diagnostics"
    );
}

/// Classify one frame and, on success, swap the overlay text.
fn classify_frame(ctx: &mut PipelineContext, frame: &VideoFrame) -> ClassifyOutcome {
    ctx.diagnostics
        .classify_calls
        .fetch_add(1, Ordering::Relaxed);

    let started = Instant::now();
    let result = {
        let mut classifier = ctx.classifier.0.lock();
        classifier.classify(frame, frame.intrinsics.as_ref())
    };
    let classify_ms = started.elapsed().as_secs_f32() * 1_000.0;

    let outcome = match result {
        Err(e) => {
            ctx.diagnostics
                .classify_errors
                .fetch_add(1, Ordering::Relaxed);
            error!(error = %e, "classification error — overlay left unchanged");
            ClassifyOutcome::Failed
        }
        Ok(batch) if batch.is_empty() => {
            ctx.diagnostics
                .empty_batches
                .fetch_add(1, Ordering::Relaxed);
            info!("classifier returned no observations — overlay left unchanged");
            ClassifyOutcome::NoResults
        }
        Ok(batch) => {
            let lines = ranked_labels(
                &batch,
                ctx.config.result_window,
                ctx.config.confidence_threshold,
            );
            let labels_kept = lines.len();
            let text = lines.join("\n");

            // A result landing after stop() belongs to a dead session.
            if ctx.running.load(Ordering::Relaxed) {
                ctx.slot.publish(text);
                ctx.diagnostics
                    .overlay_writes
                    .fetch_add(1, Ordering::Relaxed);
                ctx.diagnostics
                    .labels_kept
                    .fetch_add(labels_kept, Ordering::Relaxed);
                debug!(labels_kept, batch_len = batch.len(), "overlay text swapped");
                ClassifyOutcome::Updated { labels_kept }
            } else {
                debug!("discarding classification that completed after stop");
                ClassifyOutcome::Failed
            }
        }
    };

    let seq = ctx.seq.fetch_add(1, Ordering::Relaxed);
    let (labels_kept, updated) = match &outcome {
        ClassifyOutcome::Updated { labels_kept } => (*labels_kept, true),
        _ => (0, false),
    };
    let _ = ctx.activity_tx.send(FrameActivityEvent {
        seq,
        classify_ms,
        labels_kept,
        updated,
    });

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;
    use std::time::{Duration, Instant};

    use tokio::sync::broadcast::error::TryRecvError;

    use crate::capture::CaptureFormat;
    use crate::classify::{Classification, ImageClassifier};
    use crate::error::{Result, SpectoError};
    use crate::frame::ring::{create_frame_ring, Producer};
    use crate::frame::{CameraIntrinsics, PixelFormat};

    /// Scripted classifier: one step per classified frame, `Empty` once
    /// the script is exhausted.
    enum ScriptStep {
        Batch(Vec<Classification>),
        Empty,
        Fail,
    }

    struct ScriptedClassifier {
        script: Vec<ScriptStep>,
        idx: usize,
        resets: Arc<AtomicUsize>,
        saw_intrinsics: Arc<AtomicUsize>,
    }

    impl ScriptedClassifier {
        fn new(script: Vec<ScriptStep>) -> Self {
            Self {
                script,
                idx: 0,
                resets: Arc::new(AtomicUsize::new(0)),
                saw_intrinsics: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ImageClassifier for ScriptedClassifier {
        fn warm_up(&mut self) -> Result<()> {
            Ok(())
        }

        fn classify(
            &mut self,
            _frame: &VideoFrame,
            intrinsics: Option<&CameraIntrinsics>,
        ) -> Result<Vec<Classification>> {
            if intrinsics.is_some() {
                self.saw_intrinsics.fetch_add(1, Ordering::Relaxed);
            }
            let step = self.script.get(self.idx).unwrap_or(&ScriptStep::Empty);
            self.idx += 1;
            match step {
                ScriptStep::Batch(batch) => Ok(batch.clone()),
                ScriptStep::Empty => Ok(vec![]),
                ScriptStep::Fail => Err(SpectoError::Classification(
                    "intentional test failure".into(),
                )),
            }
        }

        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn test_frame() -> VideoFrame {
        VideoFrame::new(vec![100; 8 * 8 * 3], 8, 8, PixelFormat::Rgb8)
            .with_intrinsics(CameraIntrinsics::ideal(8, 8))
    }

    fn malformed_frame() -> VideoFrame {
        VideoFrame::new(vec![0; 5], 8, 8, PixelFormat::Rgb8)
    }

    fn test_format() -> CaptureFormat {
        CaptureFormat {
            width: 8,
            height: 8,
            frames_per_second: 30.0,
        }
    }

    struct TestRig {
        ctx: PipelineContext,
        activity_rx: broadcast::Receiver<FrameActivityEvent>,
        running: Arc<AtomicBool>,
        slot: DisplaySlot,
        diagnostics: Arc<PipelineDiagnostics>,
    }

    fn rig(classifier: ScriptedClassifier, consumer: FrameConsumer) -> TestRig {
        let (status_tx, _) = broadcast::channel(8);
        let (activity_tx, activity_rx) = broadcast::channel(16);
        let running = Arc::new(AtomicBool::new(true));
        let slot = DisplaySlot::new();
        let diagnostics = Arc::new(PipelineDiagnostics::default());

        let ctx = PipelineContext {
            config: EngineConfig::default(),
            classifier: ClassifierHandle::new(classifier),
            consumer,
            camera_events: crossbeam_channel::unbounded().1,
            running: Arc::clone(&running),
            slot: slot.clone(),
            status_tx,
            activity_tx,
            status: Arc::new(Mutex::new(EngineStatus::Running)),
            seq: Arc::new(AtomicU64::new(0)),
            capture_format: test_format(),
            diagnostics: Arc::clone(&diagnostics),
        };

        TestRig {
            ctx,
            activity_rx,
            running,
            slot,
            diagnostics,
        }
    }

    fn recv_activity_with_timeout(
        rx: &mut broadcast::Receiver<FrameActivityEvent>,
        timeout: Duration,
    ) -> FrameActivityEvent {
        let start = Instant::now();
        loop {
            match rx.try_recv() {
                Ok(ev) => return ev,
                Err(TryRecvError::Empty) => {
                    if start.elapsed() >= timeout {
                        panic!("timed out waiting for activity event");
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Closed) => panic!("activity channel closed unexpectedly"),
            }
        }
    }

    #[test]
    fn batch_swaps_the_overlay_and_reports_activity() {
        let (mut producer, consumer) = create_frame_ring();
        assert!(producer.try_push(test_frame()).is_ok(), "push frame");

        let classifier = ScriptedClassifier::new(vec![ScriptStep::Batch(vec![
            Classification::new("dog", 0.90),
            Classification::new("wolf", 0.40),
            Classification::new("fox", 0.20),
        ])]);
        let saw_intrinsics = Arc::clone(&classifier.saw_intrinsics);
        let mut rig = rig(classifier, consumer);

        let running = Arc::clone(&rig.running);
        let ctx = rig.ctx;
        let handle = thread::spawn(move || run(ctx));

        let event = recv_activity_with_timeout(&mut rig.activity_rx, Duration::from_secs(1));
        running.store(false, Ordering::SeqCst);
        handle.join().expect("pipeline thread panicked");

        assert!(event.updated);
        assert_eq!(event.labels_kept, 2);
        assert_eq!(&*rig.slot.snapshot(), "dog 90%\nwolf 40%");
        assert_eq!(saw_intrinsics.load(Ordering::Relaxed), 1);
        assert_eq!(rig.diagnostics.snapshot().overlay_writes, 1);
    }

    #[test]
    fn error_and_empty_results_leave_the_overlay_unchanged() {
        let (mut producer, consumer) = create_frame_ring();
        assert!(producer.try_push(test_frame()).is_ok(), "push frame 1");
        assert!(producer.try_push(test_frame()).is_ok(), "push frame 2");

        let classifier = ScriptedClassifier::new(vec![ScriptStep::Fail, ScriptStep::Empty]);
        let mut rig = rig(classifier, consumer);
        rig.slot.publish("cat 75%".to_string());

        let running = Arc::clone(&rig.running);
        let ctx = rig.ctx;
        let handle = thread::spawn(move || run(ctx));

        let first = recv_activity_with_timeout(&mut rig.activity_rx, Duration::from_secs(1));
        let second = recv_activity_with_timeout(&mut rig.activity_rx, Duration::from_secs(1));
        running.store(false, Ordering::SeqCst);
        handle.join().expect("pipeline thread panicked");

        assert!(!first.updated);
        assert!(!second.updated);
        assert_eq!(&*rig.slot.snapshot(), "cat 75%");

        let snap = rig.diagnostics.snapshot();
        assert_eq!(snap.classify_errors, 1);
        assert_eq!(snap.empty_batches, 1);
        assert_eq!(snap.overlay_writes, 0);
    }

    #[test]
    fn all_filtered_batch_overwrites_previous_text_with_empty() {
        let (mut producer, consumer) = create_frame_ring();
        assert!(producer.try_push(test_frame()).is_ok(), "push frame");

        let classifier = ScriptedClassifier::new(vec![ScriptStep::Batch(vec![
            Classification::new("a", 0.25),
            Classification::new("b", 0.20),
            Classification::new("c", 0.15),
            Classification::new("d", 0.10),
            Classification::new("e", 0.05),
        ])]);
        let mut rig = rig(classifier, consumer);
        rig.slot.publish("dog 90%".to_string());

        let running = Arc::clone(&rig.running);
        let ctx = rig.ctx;
        let handle = thread::spawn(move || run(ctx));

        let event = recv_activity_with_timeout(&mut rig.activity_rx, Duration::from_secs(1));
        running.store(false, Ordering::SeqCst);
        handle.join().expect("pipeline thread panicked");

        assert!(event.updated);
        assert_eq!(event.labels_kept, 0);
        assert_eq!(&*rig.slot.snapshot(), "");
    }

    #[test]
    fn malformed_frames_are_skipped_without_a_classify_call() {
        let (mut producer, consumer) = create_frame_ring();
        assert!(producer.try_push(malformed_frame()).is_ok(), "push bad");
        assert!(producer.try_push(test_frame()).is_ok(), "push good");

        let classifier = ScriptedClassifier::new(vec![ScriptStep::Batch(vec![
            Classification::new("bright scene", 0.8),
        ])]);
        let mut rig = rig(classifier, consumer);

        let running = Arc::clone(&rig.running);
        let ctx = rig.ctx;
        let handle = thread::spawn(move || run(ctx));

        let event = recv_activity_with_timeout(&mut rig.activity_rx, Duration::from_secs(1));
        running.store(false, Ordering::SeqCst);
        handle.join().expect("pipeline thread panicked");

        assert!(event.updated);
        let snap = rig.diagnostics.snapshot();
        assert_eq!(snap.frames_in, 2);
        assert_eq!(snap.frames_malformed, 1);
        assert_eq!(snap.classify_calls, 1);
        assert_eq!(&*rig.slot.snapshot(), "bright scene 80%");
    }

    #[test]
    fn activity_seq_increments_across_frames() {
        let (mut producer, consumer) = create_frame_ring();
        assert!(producer.try_push(test_frame()).is_ok(), "push frame 1");
        assert!(producer.try_push(test_frame()).is_ok(), "push frame 2");

        let classifier = ScriptedClassifier::new(vec![ScriptStep::Empty, ScriptStep::Empty]);
        let mut rig = rig(classifier, consumer);

        let running = Arc::clone(&rig.running);
        let ctx = rig.ctx;
        let handle = thread::spawn(move || run(ctx));

        let first = recv_activity_with_timeout(&mut rig.activity_rx, Duration::from_secs(1));
        let second = recv_activity_with_timeout(&mut rig.activity_rx, Duration::from_secs(1));
        running.store(false, Ordering::SeqCst);
        handle.join().expect("pipeline thread panicked");

        assert_eq!(first.seq, 0);
        assert_eq!(second.seq, 1);
    }
}
