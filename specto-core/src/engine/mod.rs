//! `SpectoEngine` — top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! SpectoEngine::new()
//!     └─► warm_up()          → classifier loaded, status = WarmingUp → Idle
//!         └─► start(source)  → camera open, pipeline + throttler spawned,
//!             │                status = Running
//!             └─► stop()     → running=false, both loops exit, status = Stopped
//! ```
//!
//! `start()`/`stop()` are idempotent: calling them in the wrong state returns
//! an error rather than panicking.
//!
//! ## Threading
//!
//! Capture backends bind their delivery context to the thread that opened
//! the device, so the `FrameSource` is opened *inside* the `spawn_blocking`
//! closure that then runs the pipeline, and is closed on that same thread
//! after the pipeline exits. A sync channel propagates open-device errors
//! back to the `start()` caller. The display throttler runs on a second
//! blocking task and shares nothing with the pipeline but the slot, the
//! running flag, and the diagnostics counters.

pub mod pipeline;
pub mod throttle;

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::info;

use crate::{
    capture::{CaptureFormat, FrameSource},
    classify::ClassifierHandle,
    error::{Result, SpectoError},
    events::{EngineStatus, EngineStatusEvent, FrameActivityEvent, OverlayTextEvent},
    frame::ring::create_frame_ring,
    overlay::{DisplaySlot, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_RESULT_WINDOW},
};

/// Broadcast channel capacity: 256 events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// Configuration for `SpectoEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wall-clock period of the overlay refresh. Default: 250 ms —
    /// classifications arrive per frame, far faster than a person reads.
    pub tick_interval: Duration,
    /// Minimum confidence a classification must exceed (strictly) to be
    /// displayed. Default: 0.25.
    pub confidence_threshold: f32,
    /// How many top batch entries are considered for display. Default: 5.
    pub result_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            result_window: DEFAULT_RESULT_WINDOW,
        }
    }
}

/// The top-level engine handle.
///
/// `SpectoEngine` is `Send + Sync` — all fields use interior mutability.
/// Wrap in `Arc<SpectoEngine>` to share between the embedding surface and
/// event-forwarding async tasks.
pub struct SpectoEngine {
    config: EngineConfig,
    classifier: ClassifierHandle,
    /// `true` while capture, pipeline and throttler are active.
    running: Arc<AtomicBool>,
    /// Canonical status (written atomically via Mutex, read from commands).
    status: Arc<Mutex<EngineStatus>>,
    /// The shared overlay text cell.
    slot: DisplaySlot,
    /// Broadcast sender for throttled overlay refreshes.
    overlay_tx: broadcast::Sender<OverlayTextEvent>,
    /// Broadcast sender for status events.
    status_tx: broadcast::Sender<EngineStatusEvent>,
    /// Broadcast sender for per-frame activity events.
    activity_tx: broadcast::Sender<FrameActivityEvent>,
    /// Monotonically increasing frame-event sequence counter.
    seq: Arc<AtomicU64>,
    /// Shared pipeline/throttler diagnostics counters.
    diagnostics: Arc<pipeline::PipelineDiagnostics>,
}

impl SpectoEngine {
    /// Create a new engine. Does not start capturing — call `warm_up()`
    /// then `start(source)`.
    pub fn new(config: EngineConfig, classifier: ClassifierHandle) -> Self {
        let (overlay_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (activity_tx, _) = broadcast::channel(BROADCAST_CAP);
        let diagnostics = Arc::new(pipeline::PipelineDiagnostics::default());

        Self {
            config,
            classifier,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(EngineStatus::Idle)),
            slot: DisplaySlot::new(),
            overlay_tx,
            status_tx,
            activity_tx,
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics,
        }
    }

    /// Warm up the classifier (load weights, run a dummy forward pass).
    ///
    /// Call once at application startup, before `start()`.
    pub fn warm_up(&self) -> Result<()> {
        self.set_status(EngineStatus::WarmingUp, None);
        info!("warming up classifier");
        self.classifier.0.lock().warm_up()?;
        self.set_status(EngineStatus::Idle, None);
        info!("classifier ready");
        Ok(())
    }

    /// Start frame capture, the classification pipeline and the display
    /// throttler.
    ///
    /// Blocks until the capture device is confirmed open (or fails), then
    /// returns. Both loops continue on background blocking threads.
    ///
    /// # Errors
    /// - `SpectoError::AlreadyRunning` if already started.
    /// - `SpectoError::NoCameraDevice` / `SpectoError::CameraDevice` on
    ///   device errors.
    pub fn start(&self, source: Box<dyn FrameSource>) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SpectoError::AlreadyRunning);
        }

        self.diagnostics.reset();
        self.classifier.0.lock().reset();
        self.slot.publish(String::new());
        self.running.store(true, Ordering::SeqCst);
        self.set_status(EngineStatus::Running, None);

        let (producer, consumer) = create_frame_ring();

        // Clone all Arc-wrapped state before moving into the closure.
        let config = self.config.clone();
        let classifier = self.classifier.clone();
        let running = Arc::clone(&self.running);
        let slot = self.slot.clone();
        let status_tx = self.status_tx.clone();
        let activity_tx = self.activity_tx.clone();
        let status = Arc::clone(&self.status);
        let seq = Arc::clone(&self.seq);
        let diagnostics = Arc::clone(&self.diagnostics);

        // Sync channel: pipeline thread signals open success/failure to
        // start(). Carries the negotiated capture format on success.
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<CaptureFormat>>();

        tokio::task::spawn_blocking(move || {
            let mut source = source;
            let camera_events = source.events();

            // ── Open the capture device on THIS thread ───────────────────
            let capture_format = match source.open(producer, Arc::clone(&running)) {
                Ok(format) => {
                    let _ = open_tx.send(Ok(format.clone()));
                    format
                }
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            };

            // ── Run pipeline ─────────────────────────────────────────────
            pipeline::run(pipeline::PipelineContext {
                config,
                classifier,
                consumer,
                camera_events,
                running,
                slot,
                status_tx,
                activity_tx,
                status,
                seq,
                capture_format,
                diagnostics,
            });

            // Device released on this thread, after the pipeline exits.
            source.close();
        });

        // Block start() until the device open is confirmed.
        match open_rx.recv() {
            Ok(Ok(format)) => {
                info!(
                    width = format.width,
                    height = format.height,
                    fps = format.frames_per_second,
                    "engine started — classifying"
                );

                let throttle_ctx = throttle::ThrottleContext {
                    interval: self.config.tick_interval,
                    slot: self.slot.clone(),
                    overlay_tx: self.overlay_tx.clone(),
                    running: Arc::clone(&self.running),
                    diagnostics: Arc::clone(&self.diagnostics),
                };
                tokio::task::spawn_blocking(move || throttle::run(throttle_ctx));

                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                self.set_status(EngineStatus::Error, Some(e.to_string()));
                Err(e)
            }
            Err(_) => {
                // Channel closed before a message was sent — spawn_blocking panicked?
                self.running.store(false, Ordering::SeqCst);
                self.set_status(EngineStatus::Error, Some("pipeline failed to start".into()));
                Err(SpectoError::Other(anyhow::anyhow!(
                    "pipeline task died unexpectedly"
                )))
            }
        }
    }

    /// Stop capture, the pipeline and the throttler.
    ///
    /// # Errors
    /// - `SpectoError::NotRunning` if not currently running.
    pub fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(SpectoError::NotRunning);
        }

        self.running.store(false, Ordering::SeqCst);
        self.set_status(EngineStatus::Stopped, None);
        info!("engine stop requested");
        Ok(())
    }

    /// Current engine status (snapshot).
    pub fn status(&self) -> EngineStatus {
        *self.status.lock()
    }

    /// Current overlay text, read directly from the shared slot. Polling
    /// surfaces should prefer `subscribe_overlay`, which is already
    /// throttled.
    pub fn overlay_snapshot(&self) -> Arc<str> {
        self.slot.snapshot()
    }

    /// Subscribe to throttled overlay refreshes — the single designated
    /// feed for whatever renders the text on screen.
    pub fn subscribe_overlay(&self) -> broadcast::Receiver<OverlayTextEvent> {
        self.overlay_tx.subscribe()
    }

    /// Subscribe to status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<EngineStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Subscribe to per-frame classification activity events.
    pub fn subscribe_activity(&self) -> broadcast::Receiver<FrameActivityEvent> {
        self.activity_tx.subscribe()
    }

    /// Snapshot of pipeline/throttler counters for observability.
    pub fn diagnostics_snapshot(&self) -> pipeline::DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn set_status(&self, new_status: EngineStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(EngineStatusEvent {
            status: new_status,
            detail,
        });
    }
}
