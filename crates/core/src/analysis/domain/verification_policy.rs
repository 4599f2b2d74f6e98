use crate::analysis::domain::analysis::{FaceVerification, VerificationStatus};
use crate::shared::face_box::FaceBox;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.4;
pub const DEFAULT_STRONG_MATCH_THRESHOLD: f64 = 0.55;

/// Turns the cosine similarity between a live embedding and a student's
/// reference into a verification verdict.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VerificationPolicy {
    match_threshold: f64,
    strong_threshold: f64,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            strong_threshold: DEFAULT_STRONG_MATCH_THRESHOLD,
        }
    }
}

impl VerificationPolicy {
    /// `strong_threshold` must not be below `match_threshold`; callers
    /// validate this before construction.
    pub fn new(match_threshold: f64, strong_threshold: f64) -> Self {
        debug_assert!(strong_threshold >= match_threshold);
        Self {
            match_threshold,
            strong_threshold,
        }
    }

    pub fn evaluate(&self, similarity: f64, face: FaceBox, student_name: &str) -> FaceVerification {
        let (status, text) = if similarity >= self.strong_threshold {
            (VerificationStatus::Match, "Identity verified (high confidence)")
        } else if similarity >= self.match_threshold {
            (VerificationStatus::Match, "Identity verified (medium confidence)")
        } else {
            (VerificationStatus::NoMatch, "Identity not verified")
        };

        FaceVerification {
            face_verification: status,
            verification_text: text,
            confidence: similarity.clamp(0.0, 1.0),
            face_distance: Some(1.0 - similarity),
            face_detected: true,
            face_coordinates: Some(face),
            student_name: Some(student_name.to_string()),
        }
    }
}
