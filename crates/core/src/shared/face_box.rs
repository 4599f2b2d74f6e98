use serde::Serialize;

/// Axis-aligned face bounding box in frame pixel coordinates.
///
/// Serialized as the `face_coordinates` object of analysis responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from `(x1, y1, x2, y2)` detector corners, rounding
    /// outward-in to whole pixels.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let x = x1.round() as i32;
        let y = y1.round() as i32;
        Self {
            x,
            y,
            width: (x2.round() as i32 - x).max(0),
            height: (y2.round() as i32 - y).max(0),
        }
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersection of the box with a `frame_w` × `frame_h` frame, or `None`
    /// when they do not overlap.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<FaceBox> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.x + self.width).min(frame_w as i32);
        let y2 = (self.y + self.height).min(frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(FaceBox::new(x1, y1, x2 - x1, y2 - y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_corners_rounds_to_pixels() {
        let b = FaceBox::from_corners(10.4, 20.6, 50.5, 80.2);
        assert_eq!(b, FaceBox::new(10, 21, 41, 59));
    }

    #[test]
    fn test_from_corners_inverted_gives_empty_box() {
        let b = FaceBox::from_corners(50.0, 50.0, 40.0, 40.0);
        assert_eq!(b.area(), 0);
    }

    #[rstest]
    #[case(FaceBox::new(10, 10, 20, 20), Some(FaceBox::new(10, 10, 20, 20)))]
    #[case(FaceBox::new(-5, -5, 20, 20), Some(FaceBox::new(0, 0, 15, 15)))]
    #[case(FaceBox::new(90, 40, 20, 20), Some(FaceBox::new(90, 40, 10, 10)))]
    #[case(FaceBox::new(100, 0, 10, 10), None)]
    #[case(FaceBox::new(10, 10, 0, 10), None)]
    fn test_clamp_to(#[case] input: FaceBox, #[case] expected: Option<FaceBox>) {
        assert_eq!(input.clamp_to(100, 50), expected);
    }

    #[test]
    fn test_serializes_as_face_coordinates() {
        let json = serde_json::to_value(FaceBox::new(1, 2, 3, 4)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"x": 1, "y": 2, "width": 3, "height": 4})
        );
    }
}
