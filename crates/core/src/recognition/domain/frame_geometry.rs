use crate::shared::bounding_box::{BoundingBox, DisplaySpace, WorkingSpace};

/// Maps boxes found on the downscaled working frame back onto the
/// native-resolution display frame.
///
/// Built fresh for every frame: source resolution is not assumed constant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameGeometry {
    scale_factor: f64,
}

impl FrameGeometry {
    /// `scale_factor = display_width / working_width`.
    ///
    /// A zero working width (nothing was resized) degrades to identity.
    pub fn new(display_width: u32, working_width: u32) -> Self {
        let scale_factor = if working_width == 0 {
            1.0
        } else {
            display_width as f64 / working_width as f64
        };
        Self { scale_factor }
    }

    #[cfg(test)]
    fn from_scale(scale_factor: f64) -> Self {
        Self { scale_factor }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Multiplies each coordinate by the scale factor and floors to whole pixels.
    pub fn rescale(&self, b: &BoundingBox<WorkingSpace>) -> BoundingBox<DisplaySpace> {
        BoundingBox::new(
            self.scale(b.top),
            self.scale(b.right),
            self.scale(b.bottom),
            self.scale(b.left),
        )
    }

    pub fn rescale_all(&self, boxes: &[BoundingBox<WorkingSpace>]) -> Vec<BoundingBox<DisplaySpace>> {
        boxes.iter().map(|b| self.rescale(b)).collect()
    }

    fn scale(&self, coordinate: i32) -> i32 {
        (coordinate as f64 * self.scale_factor).floor() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn working(top: i32, right: i32, bottom: i32, left: i32) -> BoundingBox<WorkingSpace> {
        BoundingBox::new(top, right, bottom, left)
    }

    fn display(top: i32, right: i32, bottom: i32, left: i32) -> BoundingBox<DisplaySpace> {
        BoundingBox::new(top, right, bottom, left)
    }

    #[test]
    fn test_scale_factor_is_display_over_working() {
        assert_relative_eq!(FrameGeometry::new(1400, 700).scale_factor(), 2.0);
        assert_relative_eq!(FrameGeometry::new(640, 700).scale_factor(), 640.0 / 700.0);
    }

    #[test]
    fn test_doubles_box_when_display_is_twice_working() {
        let g = FrameGeometry::new(1400, 700);
        assert_eq!(g.rescale(&working(10, 20, 30, 40)), display(20, 40, 60, 80));
    }

    #[test]
    fn test_unit_scale_is_identity() {
        let g = FrameGeometry::new(700, 700);
        assert_eq!(g.rescale(&working(13, 251, 99, 7)), display(13, 251, 99, 7));
    }

    #[rstest]
    #[case::fractional_up(1.5, working(3, 5, 7, 1), display(4, 7, 10, 1))]
    #[case::hd_to_working(1920.0 / 700.0, working(100, 200, 300, 50), display(274, 548, 822, 137))]
    #[case::downscale(0.5, working(11, 21, 31, 41), display(5, 10, 15, 20))]
    fn test_rescale_floors_each_coordinate(
        #[case] scale: f64,
        #[case] input: BoundingBox<WorkingSpace>,
        #[case] expected: BoundingBox<DisplaySpace>,
    ) {
        assert_eq!(FrameGeometry::from_scale(scale).rescale(&input), expected);
    }

    #[test]
    fn test_rescale_all_preserves_order() {
        let g = FrameGeometry::new(1400, 700);
        let out = g.rescale_all(&[working(1, 2, 3, 4), working(5, 6, 7, 8)]);
        assert_eq!(out, vec![display(2, 4, 6, 8), display(10, 12, 14, 16)]);
    }

    #[test]
    fn test_zero_working_width_is_identity() {
        assert_relative_eq!(FrameGeometry::new(640, 0).scale_factor(), 1.0);
    }
}
