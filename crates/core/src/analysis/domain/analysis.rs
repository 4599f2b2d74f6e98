//! Typed engine outputs, one variant family per analysis kind.
//!
//! Field names follow the JSON shape the monitoring dashboard consumes.

use serde::Serialize;

use crate::shared::face_box::FaceBox;

/// What an engine produced for one job.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Analysis {
    AiDetection(AiDetection),
    FaceVerification(FaceVerification),
    Gaze(GazeReading),
    Enrollment(Enrollment),
}

impl Analysis {
    pub fn confidence(&self) -> f64 {
        match self {
            Analysis::AiDetection(a) => a.confidence,
            Analysis::FaceVerification(v) => v.confidence,
            Analysis::Gaze(g) => g.confidence,
            Analysis::Enrollment(_) => 1.0,
        }
    }

    pub fn face_detected(&self) -> bool {
        match self {
            Analysis::AiDetection(a) => a.face_coordinates.is_some(),
            Analysis::FaceVerification(v) => v.face_detected,
            Analysis::Gaze(g) => g.face_detected,
            Analysis::Enrollment(e) => e.face_count > 0,
        }
    }

    /// Label under which the outcome is counted in the stats.
    pub fn verdict_label(&self) -> &'static str {
        match self {
            Analysis::AiDetection(a) => a.ai_detection.label(),
            Analysis::FaceVerification(v) => v.face_verification.label(),
            Analysis::Gaze(g) => g.gaze_direction.label(),
            Analysis::Enrollment(_) => "enrolled",
        }
    }
}

// ---------------------------------------------------------------------------
// AI-generated face detection
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AiVerdict {
    Real,
    Fake,
    NoFace,
}

impl AiVerdict {
    /// Classifier class index → verdict (0 real, 1 fake).
    pub fn from_class(class: usize) -> Option<Self> {
        match class {
            0 => Some(AiVerdict::Real),
            1 => Some(AiVerdict::Fake),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AiVerdict::Real => "real",
            AiVerdict::Fake => "fake",
            AiVerdict::NoFace => "no_face",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            AiVerdict::Real => "Real person",
            AiVerdict::Fake => "AI generated",
            AiVerdict::NoFace => "No face detected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AiDetection {
    pub ai_detection: AiVerdict,
    pub ai_text: &'static str,
    pub confidence: f64,
    pub face_coordinates: Option<FaceBox>,
}

impl AiDetection {
    pub fn classified(verdict: AiVerdict, confidence: f64, face: FaceBox) -> Self {
        Self {
            ai_detection: verdict,
            ai_text: verdict.text(),
            confidence,
            face_coordinates: Some(face),
        }
    }

    pub fn no_face() -> Self {
        Self {
            ai_detection: AiVerdict::NoFace,
            ai_text: AiVerdict::NoFace.text(),
            confidence: 0.0,
            face_coordinates: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Identity verification
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Match,
    NoMatch,
    NoFace,
    NotRegistered,
}

impl VerificationStatus {
    pub fn label(self) -> &'static str {
        match self {
            VerificationStatus::Match => "match",
            VerificationStatus::NoMatch => "no_match",
            VerificationStatus::NoFace => "no_face",
            VerificationStatus::NotRegistered => "not_registered",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceVerification {
    pub face_verification: VerificationStatus,
    pub verification_text: &'static str,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_distance: Option<f64>,
    #[serde(skip)]
    pub face_detected: bool,
    pub face_coordinates: Option<FaceBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
}

impl FaceVerification {
    pub fn no_face() -> Self {
        Self {
            face_verification: VerificationStatus::NoFace,
            verification_text: "No face detected in frame",
            confidence: 0.0,
            face_distance: None,
            face_detected: false,
            face_coordinates: None,
            student_name: None,
        }
    }

    pub fn not_registered(face_detected: bool) -> Self {
        Self {
            face_verification: VerificationStatus::NotRegistered,
            verification_text: "Student not registered",
            confidence: 0.0,
            face_distance: None,
            face_detected,
            face_coordinates: None,
            student_name: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Gaze direction
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeDirection {
    Blinking,
    Right,
    Left,
    Center,
    Unknown,
}

impl GazeDirection {
    pub fn label(self) -> &'static str {
        match self {
            GazeDirection::Blinking => "blinking",
            GazeDirection::Right => "right",
            GazeDirection::Left => "left",
            GazeDirection::Center => "center",
            GazeDirection::Unknown => "unknown",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            GazeDirection::Blinking => "Blinking",
            GazeDirection::Right => "Looking right",
            GazeDirection::Left => "Looking left",
            GazeDirection::Center => "Looking center",
            GazeDirection::Unknown => "Cannot detect gaze",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Pupils {
    pub left: Option<[f64; 2]>,
    pub right: Option<[f64; 2]>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GazeRatios {
    pub horizontal: Option<f64>,
    pub vertical: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GazeReading {
    pub gaze_direction: GazeDirection,
    pub gaze_text: &'static str,
    pub confidence: f64,
    pub pupils: Pupils,
    pub ratios: GazeRatios,
    #[serde(skip)]
    pub face_detected: bool,
}

// ---------------------------------------------------------------------------
// Reference enrollment
// ---------------------------------------------------------------------------

/// Reference embedding computed for a student's registration photo.
///
/// `face_count == 0` means the photo showed no face and `embedding` is empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Enrollment {
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub face_count: usize,
    pub face_coordinates: Option<FaceBox>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ai_detection_serializes_dashboard_fields() {
        let a = Analysis::AiDetection(AiDetection::classified(
            AiVerdict::Fake,
            0.75,
            FaceBox::new(1, 2, 3, 4),
        ));
        let value = serde_json::to_value(&a).unwrap();
        assert_eq!(value["ai_detection"], "fake");
        assert_eq!(value["ai_text"], "AI generated");
        assert_eq!(value["confidence"], 0.75);
        assert_eq!(value["face_coordinates"]["width"], 3);
        assert!(a.face_detected());
        assert_eq!(a.verdict_label(), "fake");
    }

    #[test]
    fn test_ai_no_face_has_null_coordinates() {
        let a = Analysis::AiDetection(AiDetection::no_face());
        let value = serde_json::to_value(&a).unwrap();
        assert_eq!(value["ai_detection"], "no_face");
        assert_eq!(value["face_coordinates"], serde_json::Value::Null);
        assert!(!a.face_detected());
    }

    #[test]
    fn test_verification_omits_absent_distance_and_name() {
        let v = Analysis::FaceVerification(FaceVerification::no_face());
        let value = serde_json::to_value(&v).unwrap();
        assert_eq!(value["face_verification"], "no_face");
        assert!(value.get("face_distance").is_none());
        assert!(value.get("student_name").is_none());
        assert!(value.get("face_detected").is_none());
    }

    #[test]
    fn test_gaze_reading_shape() {
        let g = Analysis::Gaze(GazeReading {
            gaze_direction: GazeDirection::Left,
            gaze_text: GazeDirection::Left.text(),
            confidence: 0.5,
            pupils: Pupils {
                left: Some([10.0, 20.0]),
                right: None,
            },
            ratios: GazeRatios {
                horizontal: Some(0.7),
                vertical: None,
            },
            face_detected: true,
        });
        let value = serde_json::to_value(&g).unwrap();
        assert_eq!(value["gaze_direction"], "left");
        assert_eq!(value["pupils"], json!({"left": [10.0, 20.0], "right": null}));
        assert_eq!(value["ratios"]["horizontal"], 0.7);
    }

    #[test]
    fn test_ai_verdict_from_class() {
        assert_eq!(AiVerdict::from_class(0), Some(AiVerdict::Real));
        assert_eq!(AiVerdict::from_class(1), Some(AiVerdict::Fake));
        assert_eq!(AiVerdict::from_class(2), None);
    }
}
