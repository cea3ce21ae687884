use crate::aspect::AspectRatioSolver;
use crate::geometry::{Point, WindowGeometry};
use crate::host::WindowHost;
use serde::Deserialize;
use tracing::warn;

/// Which bottom corner the grip sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GripSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSession {
    pub side: GripSide,
    pub start_pointer: Point,
    pub start_width: i32,
    pub start_height: i32,
    // a left grip keeps this edge still while the left edge moves
    pub start_right: i32,
    pub start_y: i32,
}

#[derive(Debug, Default)]
pub struct ResizeController {
    session: Option<ResizeSession>,
}

impl ResizeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn on_grip_press(&mut self, side: GripSide, pointer: Point, current: WindowGeometry) {
        self.session = Some(ResizeSession {
            side,
            start_pointer: pointer,
            start_width: current.width,
            start_height: current.height,
            start_right: current.right_edge(),
            start_y: current.y,
        });
    }

    /// Only horizontal motion counts; height always comes from the solver.
    /// Returns the geometry applied to the window.
    pub fn on_grip_drag<H: WindowHost>(
        &mut self,
        host: &mut H,
        solver: &AspectRatioSolver,
        pointer: Point,
        current: WindowGeometry,
    ) -> Option<WindowGeometry> {
        let session = self.session?;
        let delta_x = pointer.x - session.start_pointer.x;

        let candidate = match session.side {
            GripSide::Left => session.start_width - delta_x,
            GripSide::Right => session.start_width + delta_x,
        };
        let size = solver.solve_from_width(candidate);

        let result = match session.side {
            GripSide::Left => {
                let next = WindowGeometry::new(
                    size.width,
                    size.height,
                    session.start_right - size.width,
                    session.start_y,
                );
                host.set_geometry(next).map(|()| next)
            }
            GripSide::Right => {
                let next = WindowGeometry::from_parts(size, current.origin());
                host.set_size(size).map(|()| next)
            }
        };

        match result {
            Ok(next) => Some(next),
            Err(e) => {
                warn!("[resize] failed to apply grip resize: {}", e);
                None
            }
        }
    }

    /// Returns the session that ended, if any.
    pub fn on_grip_release(&mut self) -> Option<ResizeSession> {
        self.session.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Size, SizeBounds};
    use crate::host::fake::FakeHost;

    fn solver() -> AspectRatioSolver {
        AspectRatioSolver::new(SizeBounds::new(210, 330, 350, 550))
    }

    #[test]
    fn test_right_grip_grows_in_place_within_max() {
        let start = WindowGeometry::new(300, 500, 40, 60);
        let mut host = FakeHost::at(start);
        let mut resize = ResizeController::new();

        resize.on_grip_press(GripSide::Right, Point::new(340, 560), start);
        let next = resize
            .on_grip_drag(&mut host, &solver(), Point::new(390, 560), start)
            .expect("session active");

        // 350 wide is past the 330 max
        assert_eq!(next, WindowGeometry::new(330, 550, 40, 60));
        assert_eq!(host.geometry, next);
        assert!(next.width <= solver().bounds().max_width);
    }

    #[test]
    fn test_vertical_motion_is_ignored() {
        let start = WindowGeometry::new(300, 500, 0, 0);
        let mut host = FakeHost::at(start);
        let mut resize = ResizeController::new();

        resize.on_grip_press(GripSide::Right, Point::new(300, 500), start);
        let next = resize.on_grip_drag(&mut host, &solver(), Point::new(300, 900), start);
        assert_eq!(next.map(|g| g.size()), Some(Size::new(300, 500)));
    }

    #[test]
    fn test_left_grip_keeps_right_edge_fixed() {
        let start = WindowGeometry::new(300, 500, 100, 80);
        let mut host = FakeHost::at(start);
        let mut resize = ResizeController::new();

        resize.on_grip_press(GripSide::Left, Point::new(100, 580), start);
        let next = resize
            .on_grip_drag(&mut host, &solver(), Point::new(70, 590), start)
            .expect("session active");

        assert_eq!(next.size(), Size::new(330, 550));
        assert_eq!(next.right_edge(), start.right_edge());
        assert_eq!(next.y, 80);
        assert_eq!(host.geometry, next);
    }

    #[test]
    fn test_drag_without_press_does_nothing() {
        let start = WindowGeometry::new(300, 500, 0, 0);
        let mut host = FakeHost::at(start);
        let mut resize = ResizeController::new();

        assert!(resize
            .on_grip_drag(&mut host, &solver(), Point::new(10, 10), start)
            .is_none());
        assert!(host.size_calls.is_empty());
        assert!(resize.on_grip_release().is_none());
    }
}
