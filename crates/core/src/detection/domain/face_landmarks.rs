//! 5-point face landmarks as produced by the YOLO pose face model.
//!
//! Order: left eye, right eye, nose, left mouth corner, right mouth corner,
//! where left/right are image sides, not the subject's.

const LEFT_EYE: usize = 0;
const RIGHT_EYE: usize = 1;
const NOSE: usize = 2;
const LEFT_MOUTH: usize = 3;
const RIGHT_MOUTH: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    /// Points with x <= 0 are treated as invisible.
    points: [(f64, f64); 5],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); 5]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); 5] {
        &self.points
    }

    pub fn has_visible(&self) -> bool {
        self.points.iter().any(|(x, _)| *x > 0.0)
    }

    pub fn left_eye(&self) -> Option<(f64, f64)> {
        self.visible(LEFT_EYE)
    }

    pub fn right_eye(&self) -> Option<(f64, f64)> {
        self.visible(RIGHT_EYE)
    }

    /// Nose position between the eyes: 0.0 at the image-left eye, 1.0 at
    /// the image-right eye, 0.5 for a frontal face.
    ///
    /// `None` when the nose or either eye is invisible, or the eyes share
    /// an x coordinate.
    pub fn horizontal_ratio(&self) -> Option<f64> {
        let nose = self.visible(NOSE)?;
        let left = self.visible(LEFT_EYE)?;
        let right = self.visible(RIGHT_EYE)?;

        let span = right.0 - left.0;
        if span.abs() <= f64::EPSILON {
            return None;
        }
        Some((nose.0 - left.0) / span)
    }

    /// Nose position between the eye line and the mouth line: 0.0 at the
    /// eyes, 1.0 at the mouth.
    pub fn vertical_ratio(&self) -> Option<f64> {
        let nose = self.visible(NOSE)?;
        let eye_y = (self.visible(LEFT_EYE)?.1 + self.visible(RIGHT_EYE)?.1) / 2.0;
        let mouth_y = (self.visible(LEFT_MOUTH)?.1 + self.visible(RIGHT_MOUTH)?.1) / 2.0;

        let span = mouth_y - eye_y;
        if span.abs() <= f64::EPSILON {
            return None;
        }
        Some((nose.1 - eye_y) / span)
    }

    fn visible(&self, index: usize) -> Option<(f64, f64)> {
        let point = self.points[index];
        (point.0 > 0.0).then_some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn frontal_landmarks() -> FaceLandmarks {
        FaceLandmarks::new([
            (440.0, 350.0), // left_eye
            (560.0, 350.0), // right_eye
            (500.0, 420.0), // nose (centered)
            (460.0, 490.0), // left_mouth
            (540.0, 490.0), // right_mouth
        ])
    }

    #[test]
    fn test_has_visible_all_visible() {
        assert!(frontal_landmarks().has_visible());
    }

    #[test]
    fn test_has_visible_none_visible() {
        let lm = FaceLandmarks::new([(0.0, 0.0); 5]);
        assert!(!lm.has_visible());
    }

    #[test]
    fn test_eye_accessors_hide_invisible_points() {
        let mut pts = *frontal_landmarks().points();
        pts[LEFT_EYE] = (0.0, 0.0);
        let lm = FaceLandmarks::new(pts);
        assert_eq!(lm.left_eye(), None);
        assert_eq!(lm.right_eye(), Some((560.0, 350.0)));
    }

    #[test]
    fn test_horizontal_ratio_frontal_is_half() {
        assert_relative_eq!(frontal_landmarks().horizontal_ratio().unwrap(), 0.5);
    }

    #[test]
    fn test_horizontal_ratio_nose_near_left_eye() {
        let mut pts = *frontal_landmarks().points();
        pts[NOSE] = (464.0, 420.0);
        let lm = FaceLandmarks::new(pts);
        // (464 - 440) / 120 = 0.2
        assert_relative_eq!(lm.horizontal_ratio().unwrap(), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_vertical_ratio_frontal_is_half() {
        // eyes at 350, mouth at 490, nose at 420 → 70 / 140
        assert_relative_eq!(frontal_landmarks().vertical_ratio().unwrap(), 0.5);
    }

    #[rstest]
    #[case::nose_invisible(NOSE)]
    #[case::left_eye_invisible(LEFT_EYE)]
    #[case::right_eye_invisible(RIGHT_EYE)]
    fn test_horizontal_ratio_missing_landmark_is_none(#[case] hidden: usize) {
        let mut pts = *frontal_landmarks().points();
        pts[hidden] = (0.0, 0.0);
        assert_eq!(FaceLandmarks::new(pts).horizontal_ratio(), None);
    }

    #[test]
    fn test_vertical_ratio_missing_mouth_is_none() {
        let mut pts = *frontal_landmarks().points();
        pts[RIGHT_MOUTH] = (0.0, 0.0);
        assert_eq!(FaceLandmarks::new(pts).vertical_ratio(), None);
    }

    #[test]
    fn test_horizontal_ratio_zero_eye_span() {
        let lm = FaceLandmarks::new([
            (100.0, 100.0),
            (100.0, 100.0),
            (150.0, 100.0),
            (100.0, 150.0),
            (100.0, 150.0),
        ]);
        assert_eq!(lm.horizontal_ratio(), None);
    }
}
