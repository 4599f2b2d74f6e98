use ndarray::ArrayView3;

use crate::shared::face_box::FaceBox;

/// A decoded camera frame: contiguous RGB bytes in row-major order.
///
/// Produced by the frame validator; engines treat it as read-only input.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels inside `face` into a new frame.
    ///
    /// The box is clamped to the frame first; returns `None` when nothing
    /// of it lies inside the frame.
    pub fn crop(&self, face: &FaceBox) -> Option<Frame> {
        let clamped = face.clamp_to(self.width, self.height)?;
        let x0 = clamped.x as usize;
        let y0 = clamped.y as usize;
        let w = clamped.width as usize;
        let h = clamped.height as usize;
        let c = self.channels as usize;
        let stride = self.width as usize * c;

        let mut data = Vec::with_capacity(w * h * c);
        for row in y0..y0 + h {
            let start = row * stride + x0 * c;
            data.extend_from_slice(&self.data[start..start + w * c]);
        }
        Some(Frame::new(data, w as u32, h as u32, self.channels))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
