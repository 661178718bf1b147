//! Face template extraction.
//!
//! Crops a detected region out of a grayscale frame, resizes it to a fixed
//! canonical square with bilinear interpolation, and flattens it row-major
//! into the raw-pixel template vector used for matching.

use crate::region::Region;
use thiserror::Error;

/// Canonical side length of the resized face crop. The template length is
/// the square of this (100 → 10,000 elements). Registration and recognition
/// must use the same side for distances to be meaningful.
pub const DEFAULT_FACE_SIDE: u32 = 100;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid region {x},{y} {width}x{height} for {image_width}x{image_height} image")]
    InvalidRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("grayscale buffer too small: expected {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
}

/// Converts a face region into a fixed-length pixel template.
///
/// Deterministic: identical frame and region always yield the identical
/// vector.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    side: u32,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self { side: DEFAULT_FACE_SIDE }
    }
}

impl FeatureExtractor {
    pub fn with_side(side: u32) -> Self {
        Self { side }
    }

    /// Length of the vectors this extractor produces.
    pub fn vector_len(&self) -> usize {
        (self.side * self.side) as usize
    }

    /// Crop `region` out of the row-major grayscale buffer and resample it
    /// to the canonical square.
    pub fn extract(
        &self,
        gray: &[u8],
        image_width: u32,
        image_height: u32,
        region: &Region,
    ) -> Result<Vec<u8>, ExtractError> {
        if region.is_degenerate() || !region.fits_within(image_width, image_height) {
            return Err(ExtractError::InvalidRegion {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                image_width,
                image_height,
            });
        }
        let expected = (image_width as usize) * (image_height as usize);
        if gray.len() < expected {
            return Err(ExtractError::BufferTooSmall { expected, actual: gray.len() });
        }

        Ok(self.resample(gray, image_width as usize, region))
    }

    /// Bilinear resample of the region into a side×side output.
    fn resample(&self, gray: &[u8], stride: usize, region: &Region) -> Vec<u8> {
        let side = self.side as usize;
        let rx = region.x as usize;
        let ry = region.y as usize;
        let rw = region.width as usize;
        let rh = region.height as usize;

        let scale_x = rw as f32 / side as f32;
        let scale_y = rh as f32 / side as f32;

        let mut out = vec![0u8; side * side];

        for y in 0..side {
            let src_y = (y as f32 + 0.5) * scale_y - 0.5;
            let y0 = (src_y.floor() as i32).clamp(0, rh as i32 - 1) as usize;
            let y1 = (y0 + 1).min(rh - 1);
            let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

            for x in 0..side {
                let src_x = (x as f32 + 0.5) * scale_x - 0.5;
                let x0 = (src_x.floor() as i32).clamp(0, rw as i32 - 1) as usize;
                let x1 = (x0 + 1).min(rw - 1);
                let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

                let tl = gray[(ry + y0) * stride + rx + x0] as f32;
                let tr = gray[(ry + y0) * stride + rx + x1] as f32;
                let bl = gray[(ry + y1) * stride + rx + x0] as f32;
                let br = gray[(ry + y1) * stride + rx + x1] as f32;

                let val = tl * (1.0 - fx) * (1.0 - fy)
                    + tr * fx * (1.0 - fy)
                    + bl * (1.0 - fx) * fy
                    + br * fx * fy;

                out[y * side + x] = val.round().clamp(0.0, 255.0) as u8;
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame with a deterministic per-pixel pattern.
    fn patterned_frame(width: usize, height: usize) -> Vec<u8> {
        (0..width * height).map(|i| (i * 7 % 256) as u8).collect()
    }

    #[test]
    fn test_extract_is_deterministic() {
        let frame = patterned_frame(64, 64);
        let region = Region::new(8, 8, 40, 48);
        let extractor = FeatureExtractor::default();

        let a = extractor.extract(&frame, 64, 64, &region).unwrap();
        let b = extractor.extract(&frame, 64, 64, &region).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extract_output_length() {
        let frame = patterned_frame(64, 64);
        let region = Region::new(0, 0, 64, 64);

        let out = FeatureExtractor::default().extract(&frame, 64, 64, &region).unwrap();
        assert_eq!(out.len(), 100 * 100);

        let out = FeatureExtractor::with_side(32).extract(&frame, 64, 64, &region).unwrap();
        assert_eq!(out.len(), 32 * 32);
    }

    #[test]
    fn test_extract_identity_when_region_matches_side() {
        // A region exactly side×side maps source pixels 1:1.
        let frame = patterned_frame(120, 120);
        let region = Region::new(10, 15, 100, 100);
        let out = FeatureExtractor::default().extract(&frame, 120, 120, &region).unwrap();

        for y in 0..100usize {
            for x in 0..100usize {
                assert_eq!(out[y * 100 + x], frame[(15 + y) * 120 + 10 + x]);
            }
        }
    }

    #[test]
    fn test_extract_uniform_stays_uniform() {
        let frame = vec![173u8; 50 * 30];
        let region = Region::new(3, 2, 40, 25);
        let out = FeatureExtractor::default().extract(&frame, 50, 30, &region).unwrap();
        assert!(out.iter().all(|&p| p == 173));
    }

    #[test]
    fn test_extract_rejects_degenerate_region() {
        let frame = patterned_frame(32, 32);
        let extractor = FeatureExtractor::default();

        let zero_width = Region::new(0, 0, 0, 10);
        assert!(matches!(
            extractor.extract(&frame, 32, 32, &zero_width),
            Err(ExtractError::InvalidRegion { .. })
        ));

        let zero_height = Region::new(0, 0, 10, 0);
        assert!(matches!(
            extractor.extract(&frame, 32, 32, &zero_height),
            Err(ExtractError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn test_extract_rejects_out_of_bounds_region() {
        let frame = patterned_frame(32, 32);
        let region = Region::new(20, 20, 20, 20);
        assert!(matches!(
            FeatureExtractor::default().extract(&frame, 32, 32, &region),
            Err(ExtractError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn test_extract_rejects_short_buffer() {
        let frame = vec![0u8; 10];
        let region = Region::new(0, 0, 32, 32);
        assert!(matches!(
            FeatureExtractor::default().extract(&frame, 32, 32, &region),
            Err(ExtractError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_downsample_averages_neighborhood() {
        // 2x2 region of [0, 255; 0, 255] resampled to 1x1 samples the
        // region center, blending all four pixels equally.
        let frame = vec![0, 255, 0, 255];
        let region = Region::new(0, 0, 2, 2);
        let out = FeatureExtractor::with_side(1).extract(&frame, 2, 2, &region).unwrap();
        assert_eq!(out, vec![128]);
    }
}
