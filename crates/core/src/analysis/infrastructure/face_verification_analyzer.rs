use std::sync::Arc;

use crate::analysis::domain::analysis::{Analysis, Enrollment, FaceVerification};
use crate::analysis::domain::frame_analyzer::{FrameAnalyzer, Job, Task};
use crate::analysis::domain::verification_policy::VerificationPolicy;
use crate::detection::domain::face_detector::{largest_face, FaceDetector};
use crate::detection::domain::face_embedder::FaceEmbedder;
use crate::detection::infrastructure::math::cosine_similarity;
use crate::registry::student_registry::StudentRegistry;

/// Compares the largest face in a frame against the student's registered
/// reference embedding. Also computes references for enrollment jobs.
pub struct FaceVerificationAnalyzer {
    detector: Box<dyn FaceDetector>,
    embedder: Box<dyn FaceEmbedder>,
    registry: Arc<StudentRegistry>,
    policy: VerificationPolicy,
}

impl FaceVerificationAnalyzer {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        embedder: Box<dyn FaceEmbedder>,
        registry: Arc<StudentRegistry>,
        policy: VerificationPolicy,
    ) -> Self {
        Self {
            detector,
            embedder,
            registry,
            policy,
        }
    }

    fn verify(&mut self, job: &Job) -> Result<Analysis, Box<dyn std::error::Error>> {
        // Registration can be withdrawn between admission and this point.
        let Some(reference) = self.registry.get(&job.student_id) else {
            return Ok(Analysis::FaceVerification(FaceVerification::not_registered(false)));
        };

        let faces = self.detector.detect(&job.frame)?;
        let Some(face) = largest_face(&faces) else {
            return Ok(Analysis::FaceVerification(FaceVerification::no_face()));
        };
        let Some(crop) = job.frame.crop(&face.bbox) else {
            return Ok(Analysis::FaceVerification(FaceVerification::no_face()));
        };

        let embedding = self.embedder.embed(&crop)?;
        let similarity = cosine_similarity(&embedding, &reference.embedding);
        let verdict = self.policy.evaluate(similarity, face.bbox, &reference.name);
        log::info!(
            "Student {}: {} (similarity {similarity:.3})",
            job.student_id,
            verdict.face_verification.label()
        );
        Ok(Analysis::FaceVerification(verdict))
    }

    fn enroll(&mut self, job: &Job) -> Result<Analysis, Box<dyn std::error::Error>> {
        let faces = self.detector.detect(&job.frame)?;
        let crop = largest_face(&faces).and_then(|f| Some((f.bbox, job.frame.crop(&f.bbox)?)));
        let Some((bbox, crop)) = crop else {
            return Ok(Analysis::Enrollment(Enrollment {
                embedding: Vec::new(),
                face_count: 0,
                face_coordinates: None,
            }));
        };
        if faces.len() > 1 {
            log::warn!(
                "Reference image for student {} has {} faces; enrolling the largest",
                job.student_id,
                faces.len()
            );
        }

        Ok(Analysis::Enrollment(Enrollment {
            embedding: self.embedder.embed(&crop)?,
            face_count: faces.len(),
            face_coordinates: Some(bbox),
        }))
    }
}

impl FrameAnalyzer for FaceVerificationAnalyzer {
    fn analyze(&mut self, job: &Job) -> Result<Analysis, Box<dyn std::error::Error>> {
        match job.task {
            Task::Analyze => self.verify(job),
            Task::Enroll => self.enroll(job),
        }
    }
}
