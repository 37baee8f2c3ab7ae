//! Specto console host.
//!
//! Wires a synthetic camera and a classifier backend into the engine,
//! forwards throttled overlay refreshes to the terminal, and shuts the
//! session down cleanly on ctrl-c.

mod display;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use specto_core::capture::device::select_camera;
use specto_core::{
    ClassifierHandle, EngineConfig, SpectoEngine, StubClassifier, SyntheticCamera,
};

use crate::display::ConsoleSurface;
use crate::settings::AppSettings;

fn settings_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("specto.settings.json"))
}

fn engine_config(settings: &AppSettings) -> EngineConfig {
    EngineConfig {
        tick_interval: Duration::from_millis(settings.tick_interval_ms),
        confidence_threshold: settings.confidence_threshold,
        result_window: settings.result_window,
    }
}

#[cfg(feature = "onnx")]
fn build_classifier(settings: &AppSettings) -> ClassifierHandle {
    use specto_core::{OnnxClassifier, OnnxClassifierConfig};

    match (&settings.model_path, &settings.labels_path) {
        (Some(model), Some(labels)) => {
            info!(model = %model.display(), "using ONNX classifier");
            ClassifierHandle::new(OnnxClassifier::new(OnnxClassifierConfig::new(model, labels)))
        }
        _ => {
            info!("no model configured — using stub classifier");
            ClassifierHandle::new(StubClassifier::new())
        }
    }
}

#[cfg(not(feature = "onnx"))]
fn build_classifier(settings: &AppSettings) -> ClassifierHandle {
    if settings.model_path.is_some() {
        warn!("modelPath is set but this build lacks the onnx feature — using stub classifier");
    }
    ClassifierHandle::new(StubClassifier::new())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = settings_path();
    let settings = AppSettings::load_or_default(&path);
    if !path.exists() {
        if let Err(e) = settings.save(&path) {
            warn!(path = %path.display(), error = %e, "could not write default settings file");
        }
    }
    info!(path = %path.display(), ?settings, "settings loaded");

    // Only the synthetic device ships in-tree; selection still runs the
    // real preference path and surfaces device-unavailable errors.
    let camera_info = select_camera(vec![SyntheticCamera::info()])
        .context("no usable camera device")?;
    info!(camera = camera_info.name.as_str(), "camera selected");

    let engine = Arc::new(SpectoEngine::new(
        engine_config(&settings),
        build_classifier(&settings),
    ));

    engine.warm_up().context("classifier warm-up failed")?;

    let mut overlay_rx = engine.subscribe_overlay();
    let mut status_rx = engine.subscribe_status();

    let camera = SyntheticCamera::new(
        settings.camera_width,
        settings.camera_height,
        settings.camera_fps,
    );
    engine
        .start(Box::new(camera))
        .context("failed to start capture")?;

    let mut surface = ConsoleSurface::new();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("ctrl-c received — shutting down");
                break;
            }
            event = overlay_rx.recv() => match event {
                Ok(refresh) => surface.render(&refresh.text, refresh.seq),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "overlay consumer lagged — stale refreshes skipped");
                }
                Err(RecvError::Closed) => break,
            },
            event = status_rx.recv() => match event {
                Ok(status) => {
                    if let Some(detail) = status.detail {
                        info!(status = ?status.status, detail, "engine status");
                    } else {
                        info!(status = ?status.status, "engine status");
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
        }
    }

    engine.stop().context("engine stop failed")?;

    let snap = engine.diagnostics_snapshot();
    info!(
        frames_in = snap.frames_in,
        classify_calls = snap.classify_calls,
        classify_errors = snap.classify_errors,
        empty_batches = snap.empty_batches,
        overlay_writes = snap.overlay_writes,
        ticks_fired = snap.ticks_fired,
        "session diagnostics"
    );

    Ok(())
}
