pub mod arcface_embedder;
pub mod authenticity_classifier;
pub mod execution_provider;
pub mod math;
pub mod onnx_yolo_detector;
