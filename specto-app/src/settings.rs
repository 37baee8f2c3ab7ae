//! Persistent application settings (JSON file next to the binary or at a
//! caller-supplied path).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    /// Overlay refresh period in milliseconds.
    pub tick_interval_ms: u64,
    /// Minimum confidence (strict) for a label to be displayed.
    pub confidence_threshold: f32,
    /// How many top batch entries are considered for display.
    pub result_window: usize,
    /// Synthetic camera frame width.
    pub camera_width: u32,
    /// Synthetic camera frame height.
    pub camera_height: u32,
    /// Synthetic camera nominal frame rate.
    pub camera_fps: f32,
    /// Classifier model file. When unset (or the build lacks the `onnx`
    /// feature) the stub classifier is used.
    pub model_path: Option<PathBuf>,
    /// Labels file for the model, one label per line.
    pub labels_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            confidence_threshold: 0.25,
            result_window: 5,
            camera_width: 640,
            camera_height: 480,
            camera_fps: 30.0,
            model_path: None,
            labels_path: None,
        }
    }
}

impl AppSettings {
    /// Clamp every field into a sane range. Applied after every load so a
    /// hand-edited file cannot wedge the pipeline.
    pub fn normalize(&mut self) {
        self.tick_interval_ms = self.tick_interval_ms.clamp(50, 5_000);
        self.confidence_threshold = self.confidence_threshold.clamp(0.0, 1.0);
        self.result_window = self.result_window.clamp(1, 25);
        self.camera_width = self.camera_width.clamp(16, 4_096);
        self.camera_height = self.camera_height.clamp(16, 4_096);
        self.camera_fps = self.camera_fps.clamp(1.0, 240.0);
    }

    /// Load settings from `path`, falling back to defaults when the file
    /// is missing or unreadable. A malformed file is reported and replaced
    /// by defaults rather than aborting startup.
    pub fn load_or_default(path: &Path) -> Self {
        let mut settings = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<AppSettings>(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "settings file malformed — using defaults");
                    AppSettings::default()
                }
            },
            Err(_) => AppSettings::default(),
        };
        settings.normalize();
        settings
    }

    /// Write the settings to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let raw = serde_json::to_string_pretty(self).expect("settings always serialize");
        fs::write(path, raw)
    }
}
