//! Detector seam.
//!
//! Face detection is an external capability: given a grayscale frame, produce
//! candidate regions. The core consumes the regions and is agnostic to the
//! detector implementation behind the trait.

use crate::region::Region;
use thiserror::Error;

/// Detection sensitivity profile.
///
/// `Strict` trades recall for precision and is used for registration, where a
/// false positive would enroll a non-face template. `Lax` favors finding more
/// candidates and is used for recognition and presence checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionProfile {
    Strict,
    Lax,
}

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("detector model not found: {0}")]
    ModelNotFound(String),
    #[error("detection failed: {0}")]
    Failed(String),
}

/// Produces candidate face regions for a grayscale frame.
///
/// Implementations must be stable across repeated calls on identical input;
/// no ordering guarantee beyond that is assumed.
pub trait FaceDetector {
    fn detect(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        profile: DetectionProfile,
    ) -> Result<Vec<Region>, DetectError>;
}
