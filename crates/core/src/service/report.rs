//! JSON response bodies.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::analysis::domain::analysis::Analysis;
use crate::registry::student_registry::StudentSummary;
use crate::shared::face_box::FaceBox;
use crate::stats::stats_registry::StatsSnapshot;

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub success: bool,
    #[serde(flatten)]
    pub analysis: Analysis,
    pub face_detected: bool,
    #[serde(rename = "studentId")]
    pub student_id: String,
    pub timestamp: String,
    pub frame_size: FrameSize,
}

impl AnalysisReport {
    pub fn new(student_id: &str, analysis: Analysis, frame_size: FrameSize) -> Self {
        Self {
            success: true,
            face_detected: analysis.face_detected(),
            analysis,
            student_id: student_id.to_string(),
            timestamp: timestamp(),
            frame_size,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegistrationReport {
    pub success: bool,
    pub message: String,
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(rename = "studentName")]
    pub student_name: String,
    pub face_detected: bool,
    pub face_count: usize,
    pub face_coordinates: Option<FaceBox>,
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub available_workers: usize,
    pub max_workers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_students: Option<usize>,
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatsReport {
    pub service: &'static str,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub available_workers: usize,
    pub max_workers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students_registered: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudentsReport {
    pub success: bool,
    pub students: Vec<StudentSummary>,
    pub total_registered: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessageReport {
    pub success: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorReport {
    pub success: bool,
    pub error: String,
}

impl ErrorReport {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}
