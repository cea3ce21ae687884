// windowing capabilities the chrome controller needs from a toolkit
// one adapter per toolkit; the controller never talks to a toolkit directly

use crate::geometry::{Point, ScreenArea, Size, WindowGeometry};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Unsupported by host: {0}")]
    Unsupported(&'static str),
    #[error("Window error: {0}")]
    Window(String),
}

pub trait WindowHost {
    fn position(&self) -> Result<Point, HostError>;
    fn set_position(&mut self, origin: Point) -> Result<(), HostError>;
    fn size(&self) -> Result<Size, HostError>;
    fn set_size(&mut self, size: Size) -> Result<(), HostError>;

    fn set_geometry(&mut self, geometry: WindowGeometry) -> Result<(), HostError> {
        self.set_position(geometry.origin())?;
        self.set_size(geometry.size())
    }

    /// Window-level opacity. Hosts without it return [`HostError::Unsupported`]
    /// and the controller falls back to content alpha.
    fn set_opacity(&mut self, opacity: f64) -> Result<(), HostError>;

    /// Hand the current pointer gesture to the window manager.
    /// [`HostError::Unsupported`] means the caller must track the pointer itself.
    fn begin_interactive_move(&mut self) -> Result<(), HostError>;

    fn unmaximize(&mut self) -> Result<(), HostError>;
    fn minimize(&mut self) -> Result<(), HostError>;
    fn close(&mut self) -> Result<(), HostError>;

    /// Evaluate a script inside the content surface.
    fn run_content_script(&mut self, script: &str) -> Result<(), HostError>;

    fn screen_area(&self) -> Option<ScreenArea>;
}
