//! Fixed-interval overlay republisher.
//!
//! Classifications land far faster than a person can read; republishing
//! the overlay on a fixed wall-clock tick keeps the on-screen text legible
//! regardless of frame rate. Each tick performs exactly one slot read and
//! one broadcast publish — no diffing, an unchanged value is republished.
//!
//! ## Cadence
//!
//! - First tick fires one full interval after start, never immediately.
//! - Ticks follow a fixed schedule (`next += interval`). After a stall the
//!   schedule re-anchors instead of bursting missed ticks.
//! - The running flag is polled at sub-interval granularity, so stop
//!   latency stays well under one tick and no tick fires after teardown.
//!
//! The throttler never mutates the slot; the pipeline is the only writer.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::engine::pipeline::PipelineDiagnostics;
use crate::events::OverlayTextEvent;
use crate::overlay::DisplaySlot;

/// Upper bound on one running-flag poll sleep.
const POLL_SLICE: Duration = Duration::from_millis(10);

/// All context the throttler needs.
pub struct ThrottleContext {
    pub interval: Duration,
    pub slot: DisplaySlot,
    pub overlay_tx: broadcast::Sender<OverlayTextEvent>,
    pub running: Arc<AtomicBool>,
    pub diagnostics: Arc<PipelineDiagnostics>,
}

/// Run the blocking tick loop until `ctx.running` becomes false.
pub fn run(ctx: ThrottleContext) {
    info!(interval_ms = ctx.interval.as_millis() as u64, "display throttler started");

    let mut seq = 0u64;
    let mut next_tick = Instant::now() + ctx.interval;

    loop {
        // Sleep up to the tick in small slices so stop() is prompt.
        loop {
            if !ctx.running.load(Ordering::Relaxed) {
                info!(ticks = seq, "display throttler stopped");
                return;
            }
            let now = Instant::now();
            if now >= next_tick {
                break;
            }
            std::thread::sleep((next_tick - now).min(POLL_SLICE));
        }

        let text = ctx.slot.snapshot();
        let _ = ctx.overlay_tx.send(OverlayTextEvent {
            seq,
            text: text.to_string(),
        });
        ctx.diagnostics.ticks_fired.fetch_add(1, Ordering::Relaxed);
        debug!(seq, chars = text.len(), "overlay tick");
        seq += 1;

        next_tick += ctx.interval;
        let now = Instant::now();
        if next_tick <= now {
            // Host stalled past a whole tick; re-anchor rather than burst.
            next_tick = now + ctx.interval;
        }
    }
}
