//! Camera device enumeration and selection heuristics.

/// Metadata about a camera device.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Human-readable device name reported by the backend.
    pub name: String,
    /// Whether this is the system default camera.
    pub is_default: bool,
    /// Heuristic flag for rear-facing / environment cameras.
    pub is_rear_facing: bool,
    /// Heuristic recommendation for the best live-scene camera.
    pub is_recommended: bool,
}

const REAR_KEYWORDS: &[&str] = &[
    "back",
    "rear",
    "environment",
    "wide angle",
    "wide-angle",
    "world",
];

const VIRTUAL_KEYWORDS: &[&str] = &[
    "virtual",
    "loopback",
    "obs",
    "screen capture",
    "desktop",
    "snap camera",
    "droidcam",
];

const SCENE_POSITIVE_KEYWORDS: &[&str] = &[
    "camera",
    "webcam",
    "usb",
    "integrated",
    "hd",
    "uvc",
    "capture",
];

/// Best-effort heuristic for rear-facing / environment camera names.
pub fn is_rear_facing_name(name: &str) -> bool {
    let lowered = name.trim().to_ascii_lowercase();
    REAR_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Best-effort heuristic for virtual/synthetic relay devices that do not
/// see the real scene.
pub fn is_virtual_like_name(name: &str) -> bool {
    let lowered = name.trim().to_ascii_lowercase();
    VIRTUAL_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Score a device name for likely live-scene quality/intent.
///
/// Higher is better. Rear-facing wide-angle devices are preferred, virtual
/// relay devices strongly deprioritized.
pub fn camera_preference_score(name: &str) -> i32 {
    let lowered = name.trim().to_ascii_lowercase();
    let mut score = 0;
    if !is_virtual_like_name(&lowered) {
        score += 8;
    } else {
        score -= 16;
    }
    if is_rear_facing_name(&lowered) {
        score += 6;
    }
    if SCENE_POSITIVE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        score += 4;
    }
    if lowered.contains("default") {
        score += 1;
    }
    score
}

/// Pick the best camera from an enumeration, marking it recommended.
///
/// Returns `SpectoError::NoCameraDevice` when the list is empty — the one
/// setup-time failure this pipeline surfaces and cannot recover from.
pub fn select_camera(mut cameras: Vec<CameraInfo>) -> crate::error::Result<CameraInfo> {
    let best = cameras
        .iter()
        .enumerate()
        .max_by_key(|(_, c)| {
            camera_preference_score(&c.name) + if c.is_default { 2 } else { 0 }
        })
        .map(|(idx, _)| idx)
        .ok_or(crate::error::SpectoError::NoCameraDevice)?;

    let mut chosen = cameras.swap_remove(best);
    chosen.is_recommended = true;
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, is_default: bool) -> CameraInfo {
        CameraInfo {
            name: name.to_string(),
            is_default,
            is_rear_facing: is_rear_facing_name(name),
            is_recommended: false,
        }
    }

    #[test]
    fn detects_rear_facing_names() {
        assert!(is_rear_facing_name("Back Wide Angle Camera"));
        assert!(is_rear_facing_name("Rear Camera"));
        assert!(!is_rear_facing_name("Front Camera"));
    }

    #[test]
    fn scores_rear_camera_above_virtual_relay() {
        let rear = camera_preference_score("Back Wide Angle Camera");
        let virt = camera_preference_score("OBS Virtual Camera");
        assert!(rear > virt);
    }

    #[test]
    fn selection_prefers_the_rear_device() {
        let chosen = select_camera(vec![
            info("Front Camera", true),
            info("Back Wide Angle Camera", false),
            info("OBS Virtual Camera", false),
        ])
        .expect("a camera");
        assert_eq!(chosen.name, "Back Wide Angle Camera");
        assert!(chosen.is_recommended);
    }

    #[test]
    fn empty_enumeration_is_device_unavailable() {
        let err = select_camera(vec![]).unwrap_err();
        assert!(matches!(err, crate::error::SpectoError::NoCameraDevice));
    }
}
