use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// The analysis a service instance offers. Each kind runs as its own
/// process with its own engine pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    AiDetection,
    FaceVerification,
    Gaze,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [
        ServiceKind::AiDetection,
        ServiceKind::FaceVerification,
        ServiceKind::Gaze,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::AiDetection => "ai-detection",
            ServiceKind::FaceVerification => "face-verification",
            ServiceKind::Gaze => "gaze",
        }
    }

    /// Human-readable name reported by `/health`.
    pub fn display_name(self) -> &'static str {
        match self {
            ServiceKind::AiDetection => "AI Detection Service",
            ServiceKind::FaceVerification => "Face Recognition Service",
            ServiceKind::Gaze => "Gaze Tracking Service",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            ServiceKind::Gaze => 5000,
            ServiceKind::AiDetection => 5001,
            ServiceKind::FaceVerification => 5002,
        }
    }

    /// Whether the service keeps a student registry and exposes its routes.
    pub fn uses_registry(self) -> bool {
        self == ServiceKind::FaceVerification
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                format!("unknown service kind '{s}' (expected ai-detection, face-verification or gaze)")
            })
    }
}
