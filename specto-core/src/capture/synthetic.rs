//! `SyntheticCamera` — in-tree capture source producing a moving test
//! pattern.
//!
//! Used in demos and tests so the capture → overlay path can run without
//! camera hardware. The pattern's overall brightness sweeps over time,
//! which keeps brightness-derived classifications changing on screen, and
//! a light sprinkle of sensor noise keeps frames from being bit-identical.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use rand::Rng;
use tracing::debug;

use crate::capture::{device::CameraInfo, CameraEvent, CaptureFormat, FrameSource};
use crate::error::{Result, SpectoError};
use crate::frame::ring::{FrameProducer, Producer};
use crate::frame::{CameraIntrinsics, PixelFormat, VideoFrame};

/// Brightness sweep period, in delivered frames.
const SWEEP_FRAMES: u64 = 120;

/// Noisy pixels per frame.
const NOISE_PIXELS: usize = 64;

pub struct SyntheticCamera {
    width: u32,
    height: u32,
    frames_per_second: f32,
    events_tx: Sender<CameraEvent>,
    events_rx: Receiver<CameraEvent>,
    handle: Option<JoinHandle<()>>,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, frames_per_second: f32) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            width,
            height,
            frames_per_second,
            events_tx,
            events_rx,
            handle: None,
        }
    }

    /// Enumeration entry for this device, for selection heuristics.
    pub fn info() -> CameraInfo {
        CameraInfo {
            name: "Synthetic Back Camera".to_string(),
            is_default: true,
            is_rear_facing: true,
            is_recommended: false,
        }
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(640, 480, 30.0)
    }
}

impl FrameSource for SyntheticCamera {
    fn open(&mut self, mut frames: FrameProducer, running: Arc<AtomicBool>) -> Result<CaptureFormat> {
        if self.handle.is_some() {
            return Err(SpectoError::CameraDevice("source already open".into()));
        }

        let (width, height) = (self.width, self.height);
        let interval = Duration::from_secs_f32(1.0 / self.frames_per_second.max(1.0));
        let events_tx = self.events_tx.clone();

        let handle = thread::Builder::new()
            .name("specto-synthetic-camera".into())
            .spawn(move || {
                let _ = events_tx.send(CameraEvent::Connected);
                let mut rng = rand::thread_rng();
                let mut tick = 0u64;
                let mut dropped = 0u64;

                while running.load(Ordering::Relaxed) {
                    let frame = render_pattern(width, height, tick, &mut rng)
                        .with_intrinsics(CameraIntrinsics::ideal(width, height));

                    // Full ring means the pipeline is still on the previous
                    // frame — this one is late and gets dropped.
                    if frames.try_push(frame).is_err() {
                        dropped += 1;
                        if dropped % 30 == 1 {
                            debug!(dropped, "late frame dropped — pipeline busy");
                        }
                    }

                    tick += 1;
                    thread::sleep(interval);
                }

                debug!(delivered = tick, dropped, "synthetic delivery thread exiting");
            })
            .map_err(|e| SpectoError::CameraDevice(e.to_string()))?;

        self.handle = Some(handle);
        Ok(CaptureFormat {
            width,
            height,
            frames_per_second: self.frames_per_second,
        })
    }

    fn events(&self) -> Receiver<CameraEvent> {
        self.events_rx.clone()
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Diagonal gradient scrolling with `tick`, with the whole frame's
/// brightness breathing over a `SWEEP_FRAMES` period.
fn render_pattern(width: u32, height: u32, tick: u64, rng: &mut impl Rng) -> VideoFrame {
    let sweep = (tick % SWEEP_FRAMES) as f32 / SWEEP_FRAMES as f32;
    // Triangle wave 0 → 1 → 0 across the sweep period.
    let level = 1.0 - (2.0 * sweep - 1.0).abs();

    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            let diag = ((x + y + tick as u32 * 4) % 256) as f32 / 255.0;
            let value = (diag * level * 255.0) as u8;
            pixels.extend_from_slice(&[value, value, value.saturating_add(16)]);
        }
    }

    for _ in 0..NOISE_PIXELS.min(pixels.len()) {
        let idx = rng.gen_range(0..pixels.len());
        pixels[idx] = rng.gen();
    }

    VideoFrame::new(pixels, width, height, PixelFormat::Rgb8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ring::{create_frame_ring, Consumer};
    use std::time::Instant;

    #[test]
    fn delivers_well_formed_frames_until_stopped() {
        let (producer, mut consumer) = create_frame_ring();
        let running = Arc::new(AtomicBool::new(true));

        let mut camera = SyntheticCamera::new(32, 24, 120.0);
        let events = camera.events();
        let format = camera
            .open(producer, Arc::clone(&running))
            .expect("open synthetic camera");
        assert_eq!(format.width, 32);
        assert_eq!(format.height, 24);

        // First frame should land well within a second at 120 fps.
        let deadline = Instant::now() + Duration::from_secs(1);
        let frame = loop {
            if let Some(frame) = consumer.try_pop() {
                break frame;
            }
            assert!(Instant::now() < deadline, "no frame delivered in time");
            thread::sleep(Duration::from_millis(2));
        };

        assert!(frame.is_well_formed());
        assert!(frame.intrinsics.is_some());
        assert_eq!(
            events.recv_timeout(Duration::from_millis(200)),
            Ok(CameraEvent::Connected)
        );

        running.store(false, Ordering::SeqCst);
        camera.close();
    }

    #[test]
    fn reopening_without_close_is_an_error() {
        let (producer, _consumer) = create_frame_ring();
        let (producer2, _consumer2) = create_frame_ring();
        let running = Arc::new(AtomicBool::new(true));

        let mut camera = SyntheticCamera::new(8, 8, 60.0);
        camera
            .open(producer, Arc::clone(&running))
            .expect("first open");
        let err = camera.open(producer2, Arc::clone(&running)).unwrap_err();
        assert!(matches!(err, SpectoError::CameraDevice(_)));

        running.store(false, Ordering::SeqCst);
        camera.close();
    }

    #[test]
    fn brightness_sweeps_across_the_period() {
        let mut rng = rand::thread_rng();
        let dark = render_pattern(16, 16, 0, &mut rng);
        let mid = render_pattern(16, 16, SWEEP_FRAMES / 2, &mut rng);

        let mean = |f: &VideoFrame| {
            f.pixels.iter().map(|&b| b as u64).sum::<u64>() as f64 / f.pixels.len() as f64
        };
        assert!(mean(&mid) > mean(&dark) + 10.0);
    }
}
