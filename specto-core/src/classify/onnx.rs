//! ImageNet-style classification backend via the `ort` crate.
//!
//! Targets single-graph classifier exports (ResNet-50, MobileNet, and
//! friends): one image input `[1,3,S,S]`, one score output `[1,N]`.
//! Input and output names are resolved from session metadata at warm-up,
//! so zoo exports with differing names load without configuration.
//!
//! ## Preprocessing
//!
//! | Step       | Value                              |
//! |------------|------------------------------------|
//! | Crop       | largest centered square            |
//! | Resize     | `input_size`² (default 224), bilinear |
//! | Layout     | NCHW, RGB                          |
//! | Normalize  | ImageNet mean/std per channel      |
//!
//! Graphs that emit raw logits get a softmax before ranking; graphs that
//! already emit probabilities are ranked as-is.

use std::path::PathBuf;

use image::{imageops, DynamicImage, RgbImage};
use ndarray::Array4;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use crate::classify::{Classification, ImageClassifier};
use crate::error::{Result, SpectoError};
use crate::frame::crop::center_square;
use crate::frame::{CameraIntrinsics, PixelFormat, VideoFrame};

/// Per-channel normalization constants the common ImageNet exports were
/// trained with.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone)]
pub struct OnnxClassifierConfig {
    /// Path to the classifier `.onnx` file.
    pub model_path: PathBuf,
    /// Path to the labels file, one taxonomy label per line, line index =
    /// class index.
    pub labels_path: PathBuf,
    /// Side length of the square model input. Default: 224.
    pub input_size: u32,
    /// How many ranked entries a batch carries. Downstream windowing and
    /// thresholding narrow further; this only bounds the batch itself.
    pub ranked_limit: usize,
    /// Intra-op threads for the session. Default: 2.
    pub intra_threads: usize,
}

impl OnnxClassifierConfig {
    pub fn new(model_path: impl Into<PathBuf>, labels_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            labels_path: labels_path.into(),
            input_size: 224,
            ranked_limit: 16,
            intra_threads: 2,
        }
    }
}

pub struct OnnxClassifier {
    config: OnnxClassifierConfig,
    session: Option<Session>,
    labels: Vec<String>,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    pub fn new(config: OnnxClassifierConfig) -> Self {
        Self {
            config,
            session: None,
            labels: Vec::new(),
            input_name: String::new(),
            output_name: String::new(),
        }
    }

    fn create_session(&self) -> Result<Session> {
        SessionBuilder::new()
            .map_err(|e| SpectoError::ModelSession(e.to_string()))?
            .with_intra_threads(self.config.intra_threads.clamp(1, 32))
            .map_err(|e| SpectoError::ModelSession(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::All)
            .map_err(|e| SpectoError::ModelSession(e.to_string()))?
            .commit_from_file(&self.config.model_path)
            .map_err(|e| SpectoError::ModelSession(e.to_string()))
    }

    /// Crop, resize and normalize one frame into an NCHW tensor.
    fn preprocess(&self, frame: &VideoFrame) -> Result<Array4<f32>> {
        let rgb = frame_to_rgb(frame)?;

        let region = center_square(rgb.width(), rgb.height());
        let cropped = imageops::crop_imm(&rgb, region.x, region.y, region.side, region.side)
            .to_image();

        let size = self.config.input_size;
        let resized = DynamicImage::ImageRgb8(cropped)
            .resize_exact(size, size, imageops::FilterType::Triangle)
            .to_rgb8();

        let tensor =
            Array4::from_shape_fn((1, 3, size as usize, size as usize), |(_, c, y, x)| {
                let value = resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
                (value - MEAN[c]) / STD[c]
            });

        Ok(tensor)
    }
}

impl ImageClassifier for OnnxClassifier {
    fn warm_up(&mut self) -> Result<()> {
        if !self.config.model_path.exists() {
            return Err(SpectoError::ModelNotFound {
                path: self.config.model_path.clone(),
            });
        }

        let raw_labels = std::fs::read_to_string(&self.config.labels_path)?;
        self.labels = raw_labels
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if self.labels.is_empty() {
            return Err(SpectoError::ModelSession(format!(
                "labels file {:?} contains no labels",
                self.config.labels_path
            )));
        }
        info!(labels = self.labels.len(), "labels loaded");

        info!("loading classifier from {:?}", self.config.model_path);
        let session = self.create_session()?;

        self.input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| SpectoError::ModelSession("graph declares no inputs".into()))?;
        self.output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| SpectoError::ModelSession("graph declares no outputs".into()))?;
        info!(
            input = self.input_name.as_str(),
            output = self.output_name.as_str(),
            "classifier graph bound"
        );

        self.session = Some(session);

        // Dummy forward pass to populate weight and allocator caches.
        let size = self.config.input_size as usize;
        let dummy = Array4::<f32>::zeros((1, 3, size, size));
        let dummy_val = Value::from_array(dummy)
            .map_err(|e: ort::Error| SpectoError::ModelSession(e.to_string()))?;
        let session = self.session.as_mut().unwrap();
        session
            .run(ort::inputs![self.input_name.as_str() => dummy_val])
            .map_err(|e| SpectoError::ModelSession(e.to_string()))?;

        info!("classifier warm-up complete");
        Ok(())
    }

    fn classify(
        &mut self,
        frame: &VideoFrame,
        intrinsics: Option<&CameraIntrinsics>,
    ) -> Result<Vec<Classification>> {
        if self.session.is_none() {
            return Err(SpectoError::ModelSession(
                "model not loaded — call warm_up()".into(),
            ));
        }

        if let Some(hint) = intrinsics {
            // Plain classifier graphs take no calibration input; the hint
            // is recorded so downstream graphs that do can pick it up.
            debug!(fx = hint.fx, fy = hint.fy, "calibration hint present");
        }

        let tensor = self.preprocess(frame)?;
        let input_val = Value::from_array(tensor)
            .map_err(|e: ort::Error| SpectoError::ModelSession(e.to_string()))?;

        // SAFETY: checked is_none() above.
        let session = self.session.as_mut().unwrap();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_val])
            .map_err(|e| SpectoError::ModelSession(e.to_string()))?;
        let (_, scores) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| SpectoError::ModelSession(e.to_string()))?;

        let probabilities = if is_probability_vector(scores) {
            scores.to_vec()
        } else {
            softmax(scores)
        };

        Ok(rank_scores(
            &probabilities,
            &self.labels,
            self.config.ranked_limit,
        ))
    }

    fn reset(&mut self) {
        debug!("OnnxClassifier::reset");
    }
}

/// Decode a frame buffer into an owned RGB image.
fn frame_to_rgb(frame: &VideoFrame) -> Result<RgbImage> {
    let rgb_pixels = match frame.format {
        PixelFormat::Rgb8 => frame.pixels.clone(),
        PixelFormat::Bgra8 => frame
            .pixels
            .chunks_exact(4)
            .flat_map(|bgra| [bgra[2], bgra[1], bgra[0]])
            .collect(),
    };

    RgbImage::from_raw(frame.width, frame.height, rgb_pixels).ok_or_else(|| {
        SpectoError::Classification(format!(
            "frame buffer does not match {}x{} {:?}",
            frame.width, frame.height, frame.format
        ))
    })
}

/// True when the scores already look like a probability distribution.
fn is_probability_vector(scores: &[f32]) -> bool {
    if scores.iter().any(|s| !(0.0..=1.0).contains(s)) {
        return false;
    }
    let sum: f32 = scores.iter().sum();
    (sum - 1.0).abs() < 1e-2
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Rank class scores descending and label them. Class indices without a
/// label line are dropped rather than surfaced as raw indices.
fn rank_scores(probabilities: &[f32], labels: &[String], limit: usize) -> Vec<Classification> {
    let mut indices: Vec<usize> = (0..probabilities.len()).collect();
    indices.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));

    indices
        .into_iter()
        .filter_map(|idx| {
            labels
                .get(idx)
                .map(|label| Classification::new(label.clone(), probabilities[idx]))
        })
        .take(limit)
        .collect()
}
