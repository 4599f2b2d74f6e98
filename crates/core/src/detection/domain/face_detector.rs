use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// One detected face.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceDetection {
    pub bbox: FaceBox,
    pub confidence: f64,
    pub landmarks: Option<FaceLandmarks>,
}

/// Domain interface for face detection.
///
/// Implementations hold inference sessions that must not be used from two
/// threads at once, hence `&mut self`.
pub trait FaceDetector: Send {
    /// Detected faces, largest first.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>>;
}

/// Picks the face with the largest box area.
pub fn largest_face(faces: &[FaceDetection]) -> Option<&FaceDetection> {
    faces.iter().max_by_key(|f| f.bbox.area())
}
