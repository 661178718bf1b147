use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle identifying a candidate face location within an
/// image, in pixel coordinates with the origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Heuristic placeholder region covering the center 50%×50% of an image:
    /// origin at (w/4, h/4), size (w/2, h/2), integer division.
    ///
    /// Substituted when detection finds nothing, so low-quality imagery still
    /// flows through registration and recognition instead of erroring out.
    pub fn centered_half(image_width: u32, image_height: u32) -> Self {
        Self {
            x: image_width / 4,
            y: image_height / 4,
            width: image_width / 2,
            height: image_height / 2,
        }
    }

    /// A region with zero width or height cannot be cropped.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the region lies entirely within an image of the given size.
    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.x as u64 + self.width as u64 <= image_width as u64
            && self.y as u64 + self.height as u64 <= image_height as u64
    }
}
