use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::analysis::domain::analysis::{Analysis, FaceVerification};
use crate::analysis::domain::frame_analyzer::{Job, Task};
use crate::dispatch::dispatcher::{Dispatcher, Engine};
use crate::dispatch::job_result::JobResult;
use crate::registry::student_registry::{RegistryError, StudentRecord, StudentRegistry};
use crate::service::report::{
    timestamp, AnalysisReport, FrameSize, HealthReport, RegistrationReport, StatsReport,
    StudentsReport,
};
use crate::service::service_kind::ServiceKind;
use crate::shared::constants::{DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_POOL_TIMEOUT_SECS};
use crate::stats::stats_registry::StatsRegistry;
use crate::validation::frame_validator::{self, ValidatedFrame, ValidationError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Service overloaded: no analysis worker available, retry later")]
    PoolTimeout,
    #[error("Service overloaded: analysis timed out, retry later")]
    AnalysisTimeout,
    #[error("Analysis failed: {0}")]
    Engine(String),
    #[error("No face found in reference image")]
    NoFaceInReference,
    #[error("The {0} service keeps no student registry")]
    RegistryUnsupported(ServiceKind),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ServiceError {
    /// Overload errors are worth retrying; everything else is not.
    pub fn is_overload(&self) -> bool {
        matches!(self, ServiceError::PoolTimeout | ServiceError::AnalysisTimeout)
    }
}

/// Startup configuration of one service instance.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceConfig {
    pub kind: ServiceKind,
    pub workers: usize,
    pub pool_timeout: Duration,
    pub job_timeout: Duration,
}

impl ServiceConfig {
    pub fn new(kind: ServiceKind, workers: usize) -> Self {
        Self {
            kind,
            workers,
            pool_timeout: Duration::from_secs(DEFAULT_POOL_TIMEOUT_SECS),
            job_timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
        }
    }
}

/// Top-level context of a running service: owns the dispatcher, the stats
/// and the student registry, and turns requests into reports.
///
/// All request methods block until their job finishes or times out.
pub struct AnalysisService {
    config: ServiceConfig,
    dispatcher: Dispatcher,
    stats: Arc<StatsRegistry>,
    registry: Arc<StudentRegistry>,
}

impl AnalysisService {
    /// Builds `config.workers` engines with `build_engine` and starts the
    /// dispatcher. Fails if any engine cannot be built.
    pub fn start<F>(config: ServiceConfig, mut build_engine: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: FnMut(usize, &Arc<StudentRegistry>) -> Result<Engine, Box<dyn std::error::Error>>,
    {
        if config.workers == 0 {
            return Err("At least one worker is required".into());
        }

        let registry = Arc::new(StudentRegistry::new());
        let engines = (0..config.workers)
            .map(|index| build_engine(index, &registry))
            .collect::<Result<Vec<_>, _>>()?;

        let stats = Arc::new(StatsRegistry::new());
        let dispatcher = Dispatcher::new(engines, Arc::clone(&stats));
        log::info!(
            "{} ready: {} workers, pool timeout {:?}, job timeout {:?}",
            config.kind.display_name(),
            config.workers,
            config.pool_timeout,
            config.job_timeout
        );

        Ok(Self {
            config,
            dispatcher,
            stats,
            registry,
        })
    }

    pub fn kind(&self) -> ServiceKind {
        self.config.kind
    }

    pub fn analyze(&self, student_id: &str, frame_data: &str) -> Result<AnalysisReport, ServiceError> {
        if student_id.trim().is_empty() {
            return Err(ServiceError::MissingField("studentId"));
        }
        let validated = self.validate(student_id, frame_data)?;
        let frame_size = frame_size(&validated);

        if self.config.kind.uses_registry() && !self.registry.contains(student_id) {
            log::info!("Student {student_id} is not registered");
            self.stats.record_verdict("not_registered");
            let analysis = Analysis::FaceVerification(FaceVerification::not_registered(false));
            return Ok(AnalysisReport::new(student_id, analysis, frame_size));
        }

        let analysis = self.run(student_id, validated, Task::Analyze)?;
        Ok(AnalysisReport::new(student_id, analysis, frame_size))
    }

    /// Stores a reference embedding for `student_id`, replacing any
    /// previous one.
    pub fn register(
        &self,
        student_id: &str,
        student_name: Option<&str>,
        image_data: &str,
    ) -> Result<RegistrationReport, ServiceError> {
        self.require_registry()?;
        if student_id.trim().is_empty() {
            return Err(ServiceError::MissingField("studentId"));
        }
        let validated = self.validate(student_id, image_data)?;

        let enrollment = match self.run(student_id, validated, Task::Enroll)? {
            Analysis::Enrollment(enrollment) => enrollment,
            other => {
                return Err(ServiceError::Engine(format!(
                    "Expected an enrollment, engine produced {}",
                    other.verdict_label()
                )))
            }
        };
        if enrollment.face_count == 0 {
            return Err(ServiceError::NoFaceInReference);
        }

        let name = match student_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Student {student_id}"),
        };
        let replaced = self.registry.register(
            student_id,
            StudentRecord {
                name: name.clone(),
                embedding: enrollment.embedding,
            },
        )?;
        log::info!(
            "{} student {student_id} ({name})",
            if replaced { "Re-registered" } else { "Registered" }
        );

        Ok(RegistrationReport {
            success: true,
            message: format!("Student {name} registered successfully"),
            student_id: student_id.to_string(),
            student_name: name,
            face_detected: true,
            face_count: enrollment.face_count,
            face_coordinates: enrollment.face_coordinates,
            timestamp: timestamp(),
        })
    }

    pub fn students(&self) -> Result<StudentsReport, ServiceError> {
        self.require_registry()?;
        let students = self.registry.list();
        Ok(StudentsReport {
            success: true,
            total_registered: students.len(),
            students,
        })
    }

    /// Returns the removed student's name.
    pub fn remove_student(&self, student_id: &str) -> Result<String, ServiceError> {
        self.require_registry()?;
        let record = self.registry.remove(student_id)?;
        log::info!("Removed student {student_id}");
        Ok(record.name)
    }

    /// Returns how many students were removed.
    pub fn clear_students(&self) -> Result<usize, ServiceError> {
        self.require_registry()?;
        let removed = self.registry.clear();
        log::info!("Cleared {removed} registered students");
        Ok(removed)
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            service: self.config.kind.display_name(),
            available_workers: self.dispatcher.available_workers(),
            max_workers: self.dispatcher.max_workers(),
            registered_students: self.registry_size(),
            timestamp: timestamp(),
        }
    }

    pub fn stats(&self) -> StatsReport {
        StatsReport {
            service: self.config.kind.display_name(),
            stats: self.stats.snapshot(),
            available_workers: self.dispatcher.available_workers(),
            max_workers: self.dispatcher.max_workers(),
            students_registered: self.registry_size(),
        }
    }

    fn validate(&self, student_id: &str, frame_data: &str) -> Result<ValidatedFrame, ServiceError> {
        frame_validator::validate(frame_data).map_err(|e| {
            log::warn!("Rejected frame from student {student_id}: {e}");
            self.stats.record_corrupted_frame();
            ServiceError::Validation(e)
        })
    }

    fn run(&self, student_id: &str, validated: ValidatedFrame, task: Task) -> Result<Analysis, ServiceError> {
        let job = Job::new(student_id, validated.frame, task);
        match self
            .dispatcher
            .submit(job, self.config.pool_timeout, self.config.job_timeout)
        {
            JobResult::Success(analysis) => Ok(analysis),
            JobResult::PoolTimeout => Err(ServiceError::PoolTimeout),
            JobResult::AnalysisTimeout => Err(ServiceError::AnalysisTimeout),
            JobResult::EngineFailure(reason) | JobResult::ValidationFailure(reason) => {
                Err(ServiceError::Engine(reason))
            }
        }
    }

    fn require_registry(&self) -> Result<(), ServiceError> {
        if self.config.kind.uses_registry() {
            Ok(())
        } else {
            Err(ServiceError::RegistryUnsupported(self.config.kind))
        }
    }

    fn registry_size(&self) -> Option<usize> {
        self.config.kind.uses_registry().then(|| self.registry.len())
    }
}

fn frame_size(validated: &ValidatedFrame) -> FrameSize {
    FrameSize {
        width: validated.frame.width(),
        height: validated.frame.height(),
    }
}
