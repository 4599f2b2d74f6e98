use crate::analysis::domain::analysis::{GazeDirection, GazeRatios, GazeReading, Pupils};
use crate::detection::domain::face_detector::FaceDetection;

pub const DEFAULT_RIGHT_THRESHOLD: f64 = 0.35;
pub const DEFAULT_LEFT_THRESHOLD: f64 = 0.65;

/// Classifies gaze direction from the landmarks of one detected face.
///
/// The horizontal ratio places the nose between the eyes; a low ratio
/// means the subject looks to their right, a high one to their left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GazeEstimator {
    right_threshold: f64,
    left_threshold: f64,
}

impl Default for GazeEstimator {
    fn default() -> Self {
        Self {
            right_threshold: DEFAULT_RIGHT_THRESHOLD,
            left_threshold: DEFAULT_LEFT_THRESHOLD,
        }
    }
}

impl GazeEstimator {
    pub fn new(right_threshold: f64, left_threshold: f64) -> Self {
        debug_assert!(right_threshold < left_threshold);
        Self {
            right_threshold,
            left_threshold,
        }
    }

    pub fn estimate(&self, face: Option<&FaceDetection>) -> GazeReading {
        let Some(face) = face else {
            return reading(GazeDirection::Unknown, Pupils::default(), GazeRatios::default(), false);
        };
        let Some(landmarks) = face.landmarks.as_ref() else {
            return reading(GazeDirection::Blinking, Pupils::default(), GazeRatios::default(), true);
        };

        let pupils = Pupils {
            left: landmarks.left_eye().map(|(x, y)| [x, y]),
            right: landmarks.right_eye().map(|(x, y)| [x, y]),
        };
        let ratios = GazeRatios {
            horizontal: landmarks.horizontal_ratio(),
            vertical: landmarks.vertical_ratio(),
        };

        let direction = if pupils.left.is_none() && pupils.right.is_none() {
            GazeDirection::Blinking
        } else {
            match ratios.horizontal {
                Some(r) if r <= self.right_threshold => GazeDirection::Right,
                Some(r) if r >= self.left_threshold => GazeDirection::Left,
                Some(_) => GazeDirection::Center,
                None => GazeDirection::Unknown,
            }
        };
        reading(direction, pupils, ratios, true)
    }
}

fn reading(
    direction: GazeDirection,
    pupils: Pupils,
    ratios: GazeRatios,
    face_detected: bool,
) -> GazeReading {
    let visible_eyes = pupils.left.is_some() as u8 + pupils.right.is_some() as u8;
    let confidence = match visible_eyes {
        2 => 1.0,
        1 => 0.5,
        _ => 0.0,
    };
    GazeReading {
        gaze_direction: direction,
        gaze_text: direction.text(),
        confidence,
        pupils,
        ratios,
        face_detected,
    }
}
