use std::time::Instant;

use crate::analysis::domain::analysis::Analysis;
use crate::shared::frame::Frame;

/// What a job asks the engine to do with its frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    /// Produce the service's verdict for a monitoring frame.
    Analyze,
    /// Compute a reference embedding from a registration photo.
    Enroll,
}

/// One submitted analysis request paired with its decoded frame.
#[derive(Debug)]
pub struct Job {
    pub student_id: String,
    pub frame: Frame,
    pub task: Task,
    pub submitted_at: Instant,
}

impl Job {
    pub fn new(student_id: impl Into<String>, frame: Frame, task: Task) -> Self {
        Self {
            student_id: student_id.into(),
            frame,
            task,
            submitted_at: Instant::now(),
        }
    }
}

/// Domain interface for an analysis engine.
///
/// Engines wrap inference sessions that are neither reentrant nor safe to
/// share, hence `&mut self` and only `Send`. The dispatcher guarantees a
/// single job at a time per engine.
pub trait FrameAnalyzer: Send {
    fn analyze(&mut self, job: &Job) -> Result<Analysis, Box<dyn std::error::Error>>;
}
