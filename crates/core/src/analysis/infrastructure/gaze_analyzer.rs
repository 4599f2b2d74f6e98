use crate::analysis::domain::analysis::Analysis;
use crate::analysis::domain::frame_analyzer::{FrameAnalyzer, Job, Task};
use crate::analysis::domain::gaze_estimator::GazeEstimator;
use crate::detection::domain::face_detector::{largest_face, FaceDetector};

pub struct GazeAnalyzer {
    detector: Box<dyn FaceDetector>,
    estimator: GazeEstimator,
}

impl GazeAnalyzer {
    pub fn new(detector: Box<dyn FaceDetector>, estimator: GazeEstimator) -> Self {
        Self {
            detector,
            estimator,
        }
    }
}

impl FrameAnalyzer for GazeAnalyzer {
    fn analyze(&mut self, job: &Job) -> Result<Analysis, Box<dyn std::error::Error>> {
        if job.task != Task::Analyze {
            return Err("Gaze tracking does not support enrollment".into());
        }
        let faces = self.detector.detect(&job.frame)?;
        let reading = self.estimator.estimate(largest_face(&faces));
        Ok(Analysis::Gaze(reading))
    }
}
