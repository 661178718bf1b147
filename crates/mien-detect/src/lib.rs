//! SeetaFace funnel-cascade detector behind the core's [`FaceDetector`] seam.
//!
//! Wraps `rustface` with two sensitivity profiles: a strict one for
//! registration and a lax one for recognition, mirroring the two cascade
//! parameter sets the pipelines expect.

use mien_core::detector::{DetectError, DetectionProfile, FaceDetector};
use mien_core::region::Region;
use rustface::ImageData;
use std::path::Path;
use std::sync::Mutex;

/// Cascade tuning for one sensitivity profile.
#[derive(Debug, Clone, Copy)]
struct ProfileParams {
    min_face_size: u32,
    score_thresh: f64,
    pyramid_scale_factor: f32,
    slide_window_step: u32,
}

impl ProfileParams {
    /// Strict keeps the cascade's conservative score cutoff and a coarse
    /// pyramid; lax lowers the cutoff and scans a finer pyramid to surface
    /// more candidates at the cost of false positives.
    fn for_profile(profile: DetectionProfile) -> Self {
        match profile {
            DetectionProfile::Strict => Self {
                min_face_size: 20,
                score_thresh: 4.0,
                pyramid_scale_factor: 0.8,
                slide_window_step: 4,
            },
            DetectionProfile::Lax => Self {
                min_face_size: 20,
                score_thresh: 2.0,
                pyramid_scale_factor: 0.9,
                slide_window_step: 4,
            },
        }
    }
}

/// Face detector backed by a SeetaFace frontal-face model file.
pub struct SeetaDetector {
    // rustface's detect() needs &mut; the mutex presents the &self trait face
    inner: Mutex<Box<dyn rustface::Detector>>,
}

impl std::fmt::Debug for SeetaDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeetaDetector").finish_non_exhaustive()
    }
}

impl SeetaDetector {
    /// Load the cascade model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, DetectError> {
        if !model_path.exists() {
            return Err(DetectError::ModelNotFound(model_path.display().to_string()));
        }
        let path = model_path
            .to_str()
            .ok_or_else(|| DetectError::Failed("non-UTF-8 model path".to_string()))?;
        let detector =
            rustface::create_detector(path).map_err(|e| DetectError::Failed(e.to_string()))?;
        tracing::info!(path, "cascade model loaded");
        Ok(Self { inner: Mutex::new(detector) })
    }
}

impl FaceDetector for SeetaDetector {
    fn detect(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        profile: DetectionProfile,
    ) -> Result<Vec<Region>, DetectError> {
        let expected = (width as usize) * (height as usize);
        if gray.len() < expected {
            return Err(DetectError::Failed(format!(
                "grayscale buffer too small: expected {expected} bytes, got {}",
                gray.len()
            )));
        }

        let params = ProfileParams::for_profile(profile);
        let mut detector = self
            .inner
            .lock()
            .map_err(|_| DetectError::Failed("detector mutex poisoned".to_string()))?;
        detector.set_min_face_size(params.min_face_size);
        detector.set_score_thresh(params.score_thresh);
        detector.set_pyramid_scale_factor(params.pyramid_scale_factor);
        detector.set_slide_window_step(params.slide_window_step, params.slide_window_step);

        let image = ImageData::new(gray, width, height);
        let faces = detector.detect(&image);

        let mut regions = Vec::with_capacity(faces.len());
        for face in &faces {
            let bbox = face.bbox();
            match clamp_to_image(bbox.x(), bbox.y(), bbox.width(), bbox.height(), width, height) {
                Some(region) => regions.push(region),
                None => tracing::debug!(
                    x = bbox.x(),
                    y = bbox.y(),
                    w = bbox.width(),
                    h = bbox.height(),
                    "dropping detection entirely outside the image"
                ),
            }
        }
        tracing::debug!(count = regions.len(), ?profile, "detection complete");
        Ok(regions)
    }
}

/// Clip a possibly-offscreen cascade box into image bounds. Returns `None`
/// if nothing of it remains inside the image.
fn clamp_to_image(
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    image_width: u32,
    image_height: u32,
) -> Option<Region> {
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    if x0 >= image_width || y0 >= image_height {
        return None;
    }
    // shrink by whatever was clipped off the top/left
    let clipped_x = (x0 as i64 - x as i64) as u32;
    let clipped_y = (y0 as i64 - y as i64) as u32;
    let width = width.saturating_sub(clipped_x).min(image_width - x0);
    let height = height.saturating_sub(clipped_y).min(image_height - y0);
    if width == 0 || height == 0 {
        return None;
    }
    Some(Region::new(x0, y0, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_is_untouched() {
        let r = clamp_to_image(10, 20, 30, 40, 100, 100).unwrap();
        assert_eq!(r, Region::new(10, 20, 30, 40));
    }

    #[test]
    fn test_clamp_negative_origin_shrinks_box() {
        // 10 columns clipped off the left, 5 rows off the top
        let r = clamp_to_image(-10, -5, 30, 40, 100, 100).unwrap();
        assert_eq!(r, Region::new(0, 0, 20, 35));
    }

    #[test]
    fn test_clamp_overhanging_right_bottom() {
        let r = clamp_to_image(90, 95, 30, 30, 100, 100).unwrap();
        assert_eq!(r, Region::new(90, 95, 10, 5));
    }

    #[test]
    fn test_clamp_fully_outside_is_dropped() {
        assert!(clamp_to_image(120, 0, 30, 30, 100, 100).is_none());
        assert!(clamp_to_image(-50, 0, 30, 30, 100, 100).is_none());
    }

    #[test]
    fn test_missing_model_file() {
        let err = SeetaDetector::load(Path::new("/nonexistent/model.bin")).unwrap_err();
        assert!(matches!(err, DetectError::ModelNotFound(_)));
    }

    #[test]
    fn test_lax_profile_is_more_permissive() {
        let strict = ProfileParams::for_profile(DetectionProfile::Strict);
        let lax = ProfileParams::for_profile(DetectionProfile::Lax);
        assert!(lax.score_thresh < strict.score_thresh);
        assert!(lax.pyramid_scale_factor > strict.pyramid_scale_factor);
    }
}
