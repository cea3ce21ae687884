use crate::geometry::Point;
use crate::host::{HostError, WindowHost};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    /// context-menu button, never drags
    Secondary,
    Other(u16),
}

impl PointerButton {
    // DOM MouseEvent.button numbering
    pub fn from_dom(button: u16) -> Self {
        match button {
            0 => Self::Primary,
            1 => Self::Middle,
            2 => Self::Secondary,
            other => Self::Other(other),
        }
    }

    pub fn starts_drag(self) -> bool {
        matches!(self, Self::Primary | Self::Middle)
    }
}

/// What a pointer press on the draggable area turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// not ours, let the content have it
    Ignored,
    /// swallowed so no context menu opens
    Suppressed,
    /// the window manager owns the gesture now
    NativeMove,
    /// manual tracking until release
    Tracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    pub start_pointer: Point,
    pub start_origin: Point,
}

impl DragSession {
    fn offset(&self) -> Point {
        self.start_pointer - self.start_origin
    }
}

#[derive(Debug)]
pub struct DragController {
    enabled: bool,
    session: Option<DragSession>,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}

impl DragController {
    pub fn new() -> Self {
        Self {
            enabled: true,
            session: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<DragSession> {
        self.session
    }

    /// Disabling also drops a gesture in flight.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled && self.session.take().is_some() {
            debug!("[drag] session dropped, dragging disabled");
        }
    }

    /// `origin` is the window's top-left corner at press time.
    pub fn on_pointer_down<H: WindowHost>(
        &mut self,
        host: &mut H,
        button: PointerButton,
        pointer: Point,
        origin: Point,
    ) -> PressOutcome {
        if button == PointerButton::Secondary {
            return PressOutcome::Suppressed;
        }
        if !self.enabled || !button.starts_drag() {
            return PressOutcome::Ignored;
        }

        match host.begin_interactive_move() {
            Ok(()) => {
                debug!("[drag] native move started");
                PressOutcome::NativeMove
            }
            Err(e) => {
                if !matches!(e, HostError::Unsupported(_)) {
                    warn!("[drag] native move failed, tracking manually: {}", e);
                }
                self.session = Some(DragSession {
                    start_pointer: pointer,
                    start_origin: origin,
                });
                PressOutcome::Tracking
            }
        }
    }

    /// Returns the new window origin while a session is active.
    pub fn on_pointer_move<H: WindowHost>(&mut self, host: &mut H, pointer: Point) -> Option<Point> {
        let session = self.session?;
        let origin = pointer - session.offset();
        if let Err(e) = host.set_position(origin) {
            warn!("[drag] failed to move window: {}", e);
        }
        Some(origin)
    }

    /// Ends the session whatever the button. Returns the session that ended, if any.
    pub fn on_pointer_up(&mut self, _button: PointerButton) -> Option<DragSession> {
        self.session.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WindowGeometry;
    use crate::host::fake::FakeHost;

    fn host_at(x: i32, y: i32) -> FakeHost {
        FakeHost::at(WindowGeometry::new(300, 500, x, y))
    }

    #[test]
    fn test_manual_drag_preserves_offset() {
        let mut host = host_at(50, 50);
        let mut drag = DragController::new();

        let outcome = drag.on_pointer_down(
            &mut host,
            PointerButton::Primary,
            Point::new(100, 100),
            Point::new(50, 50),
        );
        assert_eq!(outcome, PressOutcome::Tracking);

        let origin = drag.on_pointer_move(&mut host, Point::new(130, 100));
        assert_eq!(origin, Some(Point::new(80, 50)));
        assert_eq!(host.geometry.origin(), Point::new(80, 50));

        assert!(drag.on_pointer_up(PointerButton::Primary).is_some());
        assert!(!drag.is_active());
    }

    #[test]
    fn test_native_move_preferred() {
        let mut host = host_at(50, 50);
        host.native_move = true;
        let mut drag = DragController::new();

        let outcome = drag.on_pointer_down(
            &mut host,
            PointerButton::Middle,
            Point::new(100, 100),
            Point::new(50, 50),
        );
        assert_eq!(outcome, PressOutcome::NativeMove);
        assert_eq!(host.moves_started, 1);
        assert!(!drag.is_active());
        assert_eq!(drag.on_pointer_move(&mut host, Point::new(300, 300)), None);
    }

    #[test]
    fn test_secondary_button_never_drags() {
        let mut host = host_at(0, 0);
        let mut drag = DragController::new();

        let outcome = drag.on_pointer_down(
            &mut host,
            PointerButton::Secondary,
            Point::new(10, 10),
            Point::new(0, 0),
        );
        assert_eq!(outcome, PressOutcome::Suppressed);
        assert!(!drag.is_active());
    }

    #[test]
    fn test_disabled_drag_ignores_press_and_ends_session() {
        let mut host = host_at(0, 0);
        let mut drag = DragController::new();
        drag.on_pointer_down(&mut host, PointerButton::Primary, Point::new(5, 5), Point::new(0, 0));
        assert!(drag.is_active());

        drag.set_enabled(false);
        assert!(!drag.is_active());

        let outcome =
            drag.on_pointer_down(&mut host, PointerButton::Primary, Point::new(5, 5), Point::new(0, 0));
        assert_eq!(outcome, PressOutcome::Ignored);
    }

    #[test]
    fn test_release_without_session_is_noop() {
        let mut drag = DragController::new();
        assert!(drag.on_pointer_up(PointerButton::Primary).is_none());
        assert!(drag.on_pointer_up(PointerButton::Other(4)).is_none());
    }

    #[test]
    fn test_dom_button_mapping() {
        assert_eq!(PointerButton::from_dom(0), PointerButton::Primary);
        assert_eq!(PointerButton::from_dom(1), PointerButton::Middle);
        assert_eq!(PointerButton::from_dom(2), PointerButton::Secondary);
        assert!(!PointerButton::from_dom(3).starts_drag());
    }
}
