//! Registration, recognition, and presence pipelines.
//!
//! Each pipeline is a thin orchestrator over the detector and store seams:
//! decode → detect → extract → persist/match. One pipeline instance serves
//! one invocation; there is no shared mutable state between invocations.

use crate::detector::{DetectError, DetectionProfile, FaceDetector};
use crate::extractor::{ExtractError, FeatureExtractor, DEFAULT_FACE_SIDE};
use crate::matcher::{Matcher, NearestNeighbor, DEFAULT_MATCH_THRESHOLD};
use crate::region::Region;
use crate::store::{FaceStore, StoreError, StoredFace};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("could not decode image payload: {0}")]
    Decode(String),
    #[error("face name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Tunables shared by the registration and recognition pipelines. Both sides
/// must agree on `face_side` for stored and query templates to be comparable.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub face_side: u32,
    pub match_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            face_side: DEFAULT_FACE_SIDE,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// One face found in a query image, in detector output order.
#[derive(Debug, Clone, Serialize)]
pub struct RecognizedFace {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

/// Result of a presence check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacePresence {
    pub face_detected: bool,
}

/// Decoded single-channel frame.
struct GrayFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

/// Decode an encoded image payload (PNG/JPEG/...) into a grayscale frame.
fn decode_grayscale(image_bytes: &[u8]) -> Result<GrayFrame, PipelineError> {
    if image_bytes.is_empty() {
        return Err(PipelineError::Decode("empty image payload".to_string()));
    }
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| PipelineError::Decode(e.to_string()))?;
    let gray = decoded.to_luma8();
    let (width, height) = gray.dimensions();
    Ok(GrayFrame { data: gray.into_raw(), width, height })
}

/// Detected regions, or the synthesized center region when detection came up
/// empty. The fallback is flagged at call time — it is a heuristic
/// placeholder, not a true detection.
fn regions_or_fallback(regions: Vec<Region>, width: u32, height: u32) -> Vec<Region> {
    if regions.is_empty() {
        let fallback = Region::centered_half(width, height);
        tracing::warn!(
            x = fallback.x,
            y = fallback.y,
            w = fallback.width,
            h = fallback.height,
            "no face detected; substituting heuristic center region"
        );
        vec![fallback]
    } else {
        regions
    }
}

/// Enrolls one face per image under a caller-supplied name.
pub struct Registration<D, S> {
    detector: D,
    store: S,
    extractor: FeatureExtractor,
}

impl<D: FaceDetector, S: FaceStore> Registration<D, S> {
    pub fn new(detector: D, store: S, config: PipelineConfig) -> Self {
        Self {
            detector,
            store,
            extractor: FeatureExtractor::with_side(config.face_side),
        }
    }

    /// Detect with the strict profile, extract a template from the first
    /// region, and persist it. Additional detected faces are ignored.
    pub fn register(&self, image_bytes: &[u8], name: &str) -> Result<StoredFace, PipelineError> {
        if name.trim().is_empty() {
            return Err(PipelineError::EmptyName);
        }

        let frame = decode_grayscale(image_bytes)?;
        let detected = self.detector.detect(
            &frame.data,
            frame.width,
            frame.height,
            DetectionProfile::Strict,
        )?;
        if detected.len() > 1 {
            tracing::debug!(ignored = detected.len() - 1, "ignoring extra detected faces");
        }
        let regions = regions_or_fallback(detected, frame.width, frame.height);
        let region = regions[0];

        let encoding = self
            .extractor
            .extract(&frame.data, frame.width, frame.height, &region)?;
        let stored = self.store.store(name, &encoding)?;

        tracing::info!(id = stored.id, name, "face registered");
        Ok(stored)
    }
}

/// Matches every face in a query image against the stored records.
pub struct Recognition<D, S> {
    detector: D,
    store: S,
    extractor: FeatureExtractor,
    matcher: NearestNeighbor,
    threshold: f32,
}

impl<D: FaceDetector, S: FaceStore> Recognition<D, S> {
    pub fn new(detector: D, store: S, config: PipelineConfig) -> Self {
        Self {
            detector,
            store,
            extractor: FeatureExtractor::with_side(config.face_side),
            matcher: NearestNeighbor,
            threshold: config.match_threshold,
        }
    }

    /// Detect with the lax profile and match each region against a single
    /// snapshot of the stored records, loaded once per call so every region
    /// sees the same state.
    ///
    /// Output order is detector output order. A region the extractor rejects
    /// is skipped with a warning; the call continues.
    pub fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<RecognizedFace>, PipelineError> {
        let frame = decode_grayscale(image_bytes)?;
        let detected =
            self.detector
                .detect(&frame.data, frame.width, frame.height, DetectionProfile::Lax)?;
        let regions = regions_or_fallback(detected, frame.width, frame.height);

        let gallery = self.store.all_records()?;
        tracing::debug!(regions = regions.len(), known = gallery.len(), "matching regions");

        let mut faces = Vec::with_capacity(regions.len());
        for region in &regions {
            let encoding =
                match self.extractor.extract(&frame.data, frame.width, frame.height, region) {
                    Ok(encoding) => encoding,
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping region");
                        continue;
                    }
                };

            let result = self.matcher.best_match(&encoding, &gallery, self.threshold);
            tracing::info!(name = %result.name, distance = ?result.distance, "region matched");

            faces.push(RecognizedFace {
                name: result.name,
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                confidence: result.confidence,
            });
        }

        Ok(faces)
    }
}

/// Answers "does this image contain a face at all". Reuses the detector
/// only; no store access, no fallback region.
pub struct PresenceCheck<D> {
    detector: D,
}

impl<D: FaceDetector> PresenceCheck<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn check(&self, image_bytes: &[u8]) -> Result<FacePresence, PipelineError> {
        let frame = decode_grayscale(image_bytes)?;
        let regions =
            self.detector
                .detect(&frame.data, frame.width, frame.height, DetectionProfile::Lax)?;
        Ok(FacePresence { face_detected: !regions.is_empty() })
    }
}
