use crate::geometry::{Size, SizeBounds};

/// width / height of the widget: width is 60% of height
pub const WIDGET_ASPECT_RATIO: f64 = 3.0 / 5.0;

/// Maps a candidate width or height onto the nearest size that keeps the
/// fixed aspect ratio and stays inside the bounds.
///
/// Clamping the derived dimension can push the other one out of its bounds,
/// so both directions clamp and re-derive twice. A single pass is not enough.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatioSolver {
    ratio: f64,
    bounds: SizeBounds,
}

impl AspectRatioSolver {
    pub fn new(bounds: SizeBounds) -> Self {
        Self::with_ratio(WIDGET_ASPECT_RATIO, bounds)
    }

    pub fn with_ratio(ratio: f64, bounds: SizeBounds) -> Self {
        Self { ratio, bounds }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn bounds(&self) -> SizeBounds {
        self.bounds
    }

    pub fn solve_from_width(&self, candidate: i32) -> Size {
        let b = &self.bounds;

        let width = clamp(candidate, b.min_width, b.max_width);
        let height = clamp(self.height_for(width), b.min_height, b.max_height);
        let width = clamp(self.width_for(height), b.min_width, b.max_width);
        let height = self.height_for(width);

        Size::new(width, height)
    }

    pub fn solve_from_height(&self, candidate: i32) -> Size {
        let b = &self.bounds;

        let height = clamp(candidate, b.min_height, b.max_height);
        let width = clamp(self.width_for(height), b.min_width, b.max_width);
        let height = clamp(self.height_for(width), b.min_height, b.max_height);
        let width = self.width_for(height);

        Size::new(width, height)
    }

    fn height_for(&self, width: i32) -> i32 {
        (f64::from(width) / self.ratio).round() as i32
    }

    fn width_for(&self, height: i32) -> i32 {
        (f64::from(height) * self.ratio).round() as i32
    }
}

// never panics on inverted bounds, unlike Ord::clamp
fn clamp(value: i32, min: i32, max: i32) -> i32 {
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver() -> AspectRatioSolver {
        AspectRatioSolver::new(SizeBounds::new(210, 540, 350, 900))
    }

    fn ratio_millis(size: Size) -> i64 {
        (f64::from(size.width) / f64::from(size.height) * 1000.0).round() as i64
    }

    #[test]
    fn test_width_sweep_stays_in_bounds_and_ratio() {
        let solver = solver();
        let expected = (WIDGET_ASPECT_RATIO * 1000.0).round() as i64;

        for candidate in 0..=10_000 {
            let size = solver.solve_from_width(candidate);
            assert!(solver.bounds().contains(size), "{candidate} -> {size:?}");
            assert!(
                (ratio_millis(size) - expected).abs() <= 1,
                "{candidate} -> {size:?}"
            );
        }
    }

    #[test]
    fn test_height_sweep_stays_in_bounds_and_ratio() {
        let solver = solver();
        let expected = (WIDGET_ASPECT_RATIO * 1000.0).round() as i64;

        for candidate in 0..=10_000 {
            let size = solver.solve_from_height(candidate);
            assert!(solver.bounds().contains(size), "{candidate} -> {size:?}");
            assert!((ratio_millis(size) - expected).abs() <= 1);
        }
    }

    #[test]
    fn test_solver_is_idempotent_on_own_output() {
        let solver = solver();
        for candidate in (0..=2_000).step_by(7) {
            let once = solver.solve_from_width(candidate);
            assert_eq!(solver.solve_from_width(once.width), once);

            let once = solver.solve_from_height(candidate);
            assert_eq!(solver.solve_from_height(once.height), once);
        }
    }

    #[test]
    fn test_default_size_is_exact() {
        let solver = solver();
        assert_eq!(solver.solve_from_width(300), Size::new(300, 500));
        assert_eq!(solver.solve_from_height(500), Size::new(300, 500));
    }

    #[test]
    fn test_clamps_to_min_and_max() {
        let solver = solver();
        assert_eq!(solver.solve_from_width(0), Size::new(210, 350));
        assert_eq!(solver.solve_from_width(-40), Size::new(210, 350));
        assert_eq!(solver.solve_from_width(10_000), Size::new(540, 900));
        assert_eq!(solver.solve_from_height(100_000), Size::new(540, 900));
    }

    #[test]
    fn test_second_pass_repairs_width_bound() {
        // max height is the binding constraint: 500 wide would need 833 tall
        let solver = AspectRatioSolver::new(SizeBounds::new(100, 600, 100, 700));
        let size = solver.solve_from_width(500);
        assert_eq!(size, Size::new(420, 700));
        assert!(solver.bounds().contains(size));
    }
}
