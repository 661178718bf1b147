//! Nearest-neighbor template matching.
//!
//! Compares a query template against every stored record by Euclidean
//! distance and applies the acceptance threshold. Linear in the number of
//! records; no indexing is used or needed at the scale this runs at.

use crate::store::FaceRecord;

/// Name reported when no stored face is close enough.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Maximum L2 distance for a comparison to count as a positive match.
///
/// Empirically chosen for 10,000-dimensional 0–255 pixel templates; a
/// tunable constant, not derived from anything.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 20_000.0;

/// Result of matching one query template against the stored records.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Matched name, or [`UNKNOWN_NAME`].
    pub name: String,
    /// See [`confidence_score`] for the formula and its limits.
    pub confidence: f32,
    /// Minimum distance over all comparable records; `None` when nothing
    /// was comparable.
    pub distance: Option<f32>,
    /// Id of the accepted record; `None` for an unknown face.
    pub record_id: Option<i64>,
}

impl MatchResult {
    fn unknown() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            confidence: 0.0,
            distance: None,
            record_id: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.record_id.is_some()
    }
}

/// Strategy for matching a query template against stored records.
pub trait Matcher {
    fn best_match(&self, probe: &[u8], gallery: &[FaceRecord], threshold: f32) -> MatchResult;
}

/// Exhaustive nearest-neighbor matcher over Euclidean distance.
///
/// Acceptance is strict less-than: a minimum distance exactly equal to the
/// threshold is reported as unknown. Ties are broken by the first record
/// encountered in the supplied order.
pub struct NearestNeighbor;

impl Matcher for NearestNeighbor {
    fn best_match(&self, probe: &[u8], gallery: &[FaceRecord], threshold: f32) -> MatchResult {
        if gallery.is_empty() {
            return MatchResult::unknown();
        }

        let mut best: Option<(usize, f32)> = None;
        for (i, record) in gallery.iter().enumerate() {
            if record.encoding.len() != probe.len() {
                tracing::warn!(
                    id = record.id,
                    expected = probe.len(),
                    actual = record.encoding.len(),
                    "skipping record with mismatched template length"
                );
                continue;
            }
            let dist = euclidean_distance(probe, &record.encoding);
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((i, dist)),
            }
        }

        let Some((idx, min_distance)) = best else {
            // every record was length-mismatched
            return MatchResult::unknown();
        };

        let confidence = confidence_score(min_distance);
        if min_distance < threshold {
            MatchResult {
                name: gallery[idx].name.clone(),
                confidence,
                distance: Some(min_distance),
                record_id: Some(gallery[idx].id),
            }
        } else {
            MatchResult {
                name: UNKNOWN_NAME.to_string(),
                confidence,
                distance: Some(min_distance),
                record_id: None,
            }
        }
    }
}

/// L2 distance over pixel templates, widened to f32 per element.
fn euclidean_distance(a: &[u8], b: &[u8]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&p, &q)| {
            let d = p as f32 - q as f32;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// `clamp(1 - distance, 0, 1)`, carried over from the original design.
///
/// Known limitation: the formula is dimensionally inconsistent with an L2
/// distance over pixel templates (distances routinely run in the thousands),
/// so it saturates at 0.0 for anything but a near-duplicate. Kept for
/// compatibility; changing it is a versioned behavior change, not a fix.
fn confidence_score(distance: f32) -> f32 {
    (1.0 - distance).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, name: &str, encoding: Vec<u8>) -> FaceRecord {
        FaceRecord { id, name: name.to_string(), encoding }
    }

    #[test]
    fn test_empty_gallery_is_unknown() {
        let result = NearestNeighbor.best_match(&[1, 2, 3], &[], DEFAULT_MATCH_THRESHOLD);
        assert_eq!(result.name, UNKNOWN_NAME);
        assert_eq!(result.confidence, 0.0);
        assert!(result.distance.is_none());
        assert!(!result.is_match());
    }

    #[test]
    fn test_exact_match_has_zero_distance() {
        let gallery = vec![record(1, "alice", vec![10, 20, 30])];
        let result = NearestNeighbor.best_match(&[10, 20, 30], &gallery, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(result.name, "alice");
        assert_eq!(result.distance, Some(0.0));
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.record_id, Some(1));
    }

    #[test]
    fn test_nearest_record_wins() {
        let gallery = vec![
            record(1, "far", vec![200, 200, 200]),
            record(2, "near", vec![10, 20, 33]),
        ];
        let result = NearestNeighbor.best_match(&[10, 20, 30], &gallery, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(result.name, "near");
        assert_eq!(result.record_id, Some(2));
    }

    #[test]
    fn test_threshold_boundary_rejects() {
        // distance == threshold must be reported unknown (strict less-than)
        let gallery = vec![record(1, "alice", vec![0, 0])];
        let probe = [3, 4]; // distance 5.0
        let result = NearestNeighbor.best_match(&probe, &gallery, 5.0);
        assert_eq!(result.name, UNKNOWN_NAME);
        assert_eq!(result.distance, Some(5.0));
        assert!(!result.is_match());

        let result = NearestNeighbor.best_match(&probe, &gallery, 5.0 + f32::EPSILON * 8.0);
        assert_eq!(result.name, "alice");
    }

    #[test]
    fn test_tie_broken_by_first_encountered() {
        let gallery = vec![
            record(7, "first", vec![10, 20, 30]),
            record(8, "second", vec![10, 20, 30]),
        ];
        let result = NearestNeighbor.best_match(&[10, 20, 30], &gallery, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(result.record_id, Some(7));
        assert_eq!(result.name, "first");
    }

    #[test]
    fn test_mismatched_length_is_skipped() {
        let gallery = vec![
            record(1, "short", vec![10, 20]),
            record(2, "fits", vec![10, 20, 35]),
        ];
        let result = NearestNeighbor.best_match(&[10, 20, 30], &gallery, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(result.name, "fits");
        assert_eq!(result.record_id, Some(2));
    }

    #[test]
    fn test_all_mismatched_is_unknown() {
        let gallery = vec![record(1, "short", vec![10, 20])];
        let result = NearestNeighbor.best_match(&[10, 20, 30], &gallery, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(result.name, UNKNOWN_NAME);
        assert!(result.distance.is_none());
    }

    #[test]
    fn test_unknown_still_reports_distance() {
        let gallery = vec![record(1, "alice", vec![0, 0, 0])];
        let result = NearestNeighbor.best_match(&[255, 255, 255], &gallery, 10.0);
        assert_eq!(result.name, UNKNOWN_NAME);
        let dist = result.distance.unwrap();
        assert!((dist - (3.0f32).sqrt() * 255.0).abs() < 1e-2);
    }

    #[test]
    fn test_confidence_saturates() {
        // The 1 - distance formula only leaves the floor for sub-unit
        // distances; anything realistic pins confidence at 0.0.
        assert_eq!(confidence_score(0.0), 1.0);
        assert_eq!(confidence_score(0.25), 0.75);
        assert_eq!(confidence_score(1.0), 0.0);
        assert_eq!(confidence_score(18_000.0), 0.0);
    }

    #[test]
    fn test_match_below_threshold_keeps_saturated_confidence() {
        let gallery = vec![record(1, "alice", vec![0, 10])];
        let result = NearestNeighbor.best_match(&[0, 20], &gallery, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(result.name, "alice");
        assert_eq!(result.distance, Some(10.0));
        // accepted, but the carried-over formula still reports 0.0
        assert_eq!(result.confidence, 0.0);
    }
}
