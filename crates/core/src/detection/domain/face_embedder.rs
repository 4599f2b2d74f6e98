use crate::shared::frame::Frame;

/// Domain interface for identity embeddings of a face crop.
pub trait FaceEmbedder: Send {
    /// Returns an L2-normalized embedding vector.
    fn embed(&mut self, crop: &Frame) -> Result<Vec<f32>, Box<dyn std::error::Error>>;
}
