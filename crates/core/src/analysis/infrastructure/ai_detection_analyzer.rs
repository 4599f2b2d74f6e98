use crate::analysis::domain::analysis::{AiDetection, AiVerdict, Analysis};
use crate::analysis::domain::frame_analyzer::{FrameAnalyzer, Job, Task};
use crate::detection::domain::face_classifier::FaceClassifier;
use crate::detection::domain::face_detector::{largest_face, FaceDetector};

/// Classifies the largest face in a frame as a real person or AI generated.
pub struct AiDetectionAnalyzer {
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn FaceClassifier>,
}

impl AiDetectionAnalyzer {
    pub fn new(detector: Box<dyn FaceDetector>, classifier: Box<dyn FaceClassifier>) -> Self {
        Self {
            detector,
            classifier,
        }
    }
}

impl FrameAnalyzer for AiDetectionAnalyzer {
    fn analyze(&mut self, job: &Job) -> Result<Analysis, Box<dyn std::error::Error>> {
        if job.task != Task::Analyze {
            return Err("AI detection does not support enrollment".into());
        }

        let faces = self.detector.detect(&job.frame)?;
        let Some(face) = largest_face(&faces) else {
            return Ok(Analysis::AiDetection(AiDetection::no_face()));
        };
        let Some(crop) = job.frame.crop(&face.bbox) else {
            return Ok(Analysis::AiDetection(AiDetection::no_face()));
        };

        let score = self.classifier.classify(&crop)?;
        let verdict = AiVerdict::from_class(score.class)
            .ok_or_else(|| format!("Classifier returned unknown class {}", score.class))?;
        log::debug!(
            "Student {}: {} ({:.2})",
            job.student_id,
            verdict.label(),
            score.probability
        );
        Ok(Analysis::AiDetection(AiDetection::classified(
            verdict,
            score.probability,
            face.bbox,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_classifier::ClassScore;
    use crate::detection::domain::face_detector::tests::FixedDetector;
    use crate::detection::domain::face_detector::FaceDetection;
    use crate::shared::face_box::FaceBox;
    use crate::shared::frame::Frame;

    struct FixedClassifier(ClassScore);

    impl FaceClassifier for FixedClassifier {
        fn classify(&mut self, _crop: &Frame) -> Result<ClassScore, Box<dyn std::error::Error>> {
            Ok(self.0)
        }
    }

    fn face(x: i32, size: i32) -> FaceDetection {
        FaceDetection {
            bbox: FaceBox::new(x, 4, size, size),
            confidence: 0.9,
            landmarks: None,
        }
    }

    fn job(task: Task) -> Job {
        Job::new("s-1", Frame::new(vec![100; 64 * 64 * 3], 64, 64, 3), task)
    }

    fn analyzer(faces: Vec<FaceDetection>, class: usize, probability: f64) -> AiDetectionAnalyzer {
        AiDetectionAnalyzer::new(
            Box::new(FixedDetector(faces)),
            Box::new(FixedClassifier(ClassScore { class, probability })),
        )
    }

    #[test]
    fn test_no_face() {
        let result = analyzer(vec![], 0, 0.9).analyze(&job(Task::Analyze)).unwrap();
        assert_eq!(result, Analysis::AiDetection(AiDetection::no_face()));
    }

    #[test]
    fn test_fake_verdict_uses_largest_face() {
        let result = analyzer(vec![face(0, 10), face(20, 30)], 1, 0.8)
            .analyze(&job(Task::Analyze))
            .unwrap();
        let Analysis::AiDetection(detection) = result else {
            panic!("wrong variant");
        };
        assert_eq!(detection.ai_detection, AiVerdict::Fake);
        assert_eq!(detection.confidence, 0.8);
        assert_eq!(detection.face_coordinates, Some(FaceBox::new(20, 4, 30, 30)));
    }

    #[test]
    fn test_face_outside_frame_is_no_face() {
        let result = analyzer(vec![face(500, 20)], 0, 0.9)
            .analyze(&job(Task::Analyze))
            .unwrap();
        assert!(!result.face_detected());
    }

    #[test]
    fn test_unknown_class_is_error() {
        assert!(analyzer(vec![face(0, 20)], 5, 0.9)
            .analyze(&job(Task::Analyze))
            .is_err());
    }

    #[test]
    fn test_enrollment_is_rejected() {
        assert!(analyzer(vec![face(0, 20)], 0, 0.9)
            .analyze(&job(Task::Enroll))
            .is_err());
    }
}
