/// Binary real/AI-generated face classifier via ONNX Runtime.
///
/// Expects a model taking a `[1, 3, S, S]` ImageNet-normalized crop and
/// producing `[1, 2]` logits, class 0 = real, class 1 = fake.
use std::path::Path;

use crate::detection::domain::face_classifier::{ClassScore, FaceClassifier};
use crate::shared::frame::Frame;

use super::execution_provider;
use super::math::softmax;

const DEFAULT_INPUT_SIZE: u32 = 224;
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

pub struct AuthenticityClassifier {
    session: ort::session::Session,
    input_size: u32,
}

impl AuthenticityClassifier {
    pub fn new(model_path: &Path, intra_threads: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let session = execution_provider::open_session(model_path, intra_threads)?;
        let input_size = execution_provider::input_size(&session).unwrap_or(DEFAULT_INPUT_SIZE);
        Ok(Self {
            session,
            input_size,
        })
    }
}

impl FaceClassifier for AuthenticityClassifier {
    fn classify(&mut self, crop: &Frame) -> Result<ClassScore, Box<dyn std::error::Error>> {
        let tensor = preprocess(crop, self.input_size as usize);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let logits = outputs[0].try_extract_array::<f32>()?;
        let logits = logits.as_slice().ok_or("Cannot get logits slice")?;
        best_class(logits).ok_or_else(|| "Classifier produced no logits".into())
    }
}

fn best_class(logits: &[f32]) -> Option<ClassScore> {
    softmax(logits)
        .into_iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(class, probability)| ClassScore { class, probability })
}

/// Nearest-neighbour resize to `size`², scale to 0..1, ImageNet normalize, NCHW.
fn preprocess(crop: &Frame, size: usize) -> ndarray::Array4<f32> {
    let src_w = crop.width() as usize;
    let src_h = crop.height() as usize;
    let src = crop.as_ndarray();

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));
    if src_w == 0 || src_h == 0 {
        return tensor;
    }

    for y in 0..size {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / size as f64) as usize).min(src_h - 1);
        for x in 0..size {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / size as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                let v = src[[src_y, src_x, c]] as f32 / 255.0;
                tensor[[0, c, y, x]] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_best_class_picks_highest_logit() {
        let score = best_class(&[0.1, 2.0]).unwrap();
        assert_eq!(score.class, 1);
        assert!(score.probability > 0.8);
    }

    #[test]
    fn test_best_class_equal_logits_is_half() {
        let score = best_class(&[1.0, 1.0]).unwrap();
        assert_relative_eq!(score.probability, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_best_class_empty_is_none() {
        assert!(best_class(&[]).is_none());
    }

    #[test]
    fn test_preprocess_applies_imagenet_normalization() {
        let crop = Frame::new(vec![255u8; 8 * 8 * 3], 8, 8, 3);
        let tensor = preprocess(&crop, 16);
        assert_eq!(tensor.shape(), &[1, 3, 16, 16]);
        assert!((tensor[[0, 0, 0, 0]] - (1.0 - 0.485) / 0.229).abs() < 1e-4);
        assert!((tensor[[0, 2, 15, 15]] - (1.0 - 0.406) / 0.225).abs() < 1e-4);
    }
}
