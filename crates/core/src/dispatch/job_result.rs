use crate::analysis::domain::analysis::Analysis;

/// Outcome of one submitted job.
#[derive(Clone, Debug, PartialEq)]
pub enum JobResult {
    Success(Analysis),
    /// Frame rejected before dispatch; no engine was touched.
    ValidationFailure(String),
    /// The engine returned an error or panicked.
    EngineFailure(String),
    /// No engine became available within the admission budget.
    PoolTimeout,
    /// The caller stopped waiting; a claimed job still finishes in the
    /// background and returns its engine.
    AnalysisTimeout,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success(_))
    }
}
