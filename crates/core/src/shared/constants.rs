pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Shortest `frameData` string accepted before any decoding is attempted.
pub const MIN_FRAME_DATA_LENGTH: usize = 100;

/// Decoded payloads smaller than this are treated as corrupt.
pub const MIN_DECODED_BYTES: usize = 100;

/// Both frame dimensions must be at least this many pixels.
pub const MIN_FRAME_DIMENSION: u32 = 32;

pub const DEFAULT_POOL_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 30;

/// Request bodies above this size are rejected before decoding (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Upper bound on the default worker count derived from available cores.
pub const MAX_DEFAULT_WORKERS: usize = 4;
