//! Ranked-label overlay formatting.
//!
//! ## Algorithm
//!
//! 1. Take the top `window` entries of the batch. Batches arrive ordered
//!    by descending confidence (classifier contract) and are never
//!    re-sorted here.
//! 2. Keep entries whose confidence is strictly above `threshold`; a
//!    confidence equal to the threshold is excluded. Entries with a
//!    non-finite confidence are dropped outright.
//! 3. Render each kept entry as `"<identifier> <pct>%"` and join with a
//!    newline, preserving order. Zero kept entries render as the empty
//!    string — which deliberately *overwrites* any previous overlay text.

use crate::classify::Classification;

/// How many top entries of a batch are considered for display.
pub const DEFAULT_RESULT_WINDOW: usize = 5;

/// Minimum confidence a classification must exceed to be displayed.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Confidence as a whole display percentage.
///
/// Rounds half away from zero (`f32::round`): 0.8765 → 88, 0.255 → 26.
/// Note that `format!` with a `.0` precision would round half to even
/// instead, so the rounding happens here, once, and the formatter prints
/// an integer.
pub fn confidence_percent(confidence: f32) -> i32 {
    (confidence * 100.0).round() as i32
}

/// One formatted overlay line per kept entry, in batch order.
pub fn ranked_labels(batch: &[Classification], window: usize, threshold: f32) -> Vec<String> {
    batch
        .iter()
        .take(window)
        .filter(|c| c.confidence.is_finite() && c.confidence > threshold)
        .map(|c| format!("{} {}%", c.identifier, confidence_percent(c.confidence)))
        .collect()
}

/// The complete overlay string for one classification batch.
pub fn render_overlay(batch: &[Classification], window: usize, threshold: f32) -> String {
    ranked_labels(batch, window, threshold).join("\n")
}
