use crate::shared::frame::Frame;

/// Class index and its softmax probability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassScore {
    pub class: usize,
    pub probability: f64,
}

/// Domain interface for classifying a face crop.
pub trait FaceClassifier: Send {
    fn classify(&mut self, crop: &Frame) -> Result<ClassScore, Box<dyn std::error::Error>>;
}
