pub mod ai_detection_analyzer;
pub mod face_verification_analyzer;
pub mod gaze_analyzer;
