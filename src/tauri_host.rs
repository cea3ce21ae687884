// tauri adapter: WindowHost over a webview window, the native badge channel
// and main-thread dispatch back into the controller

use crate::badge::{BadgeChannel, BadgeError, BadgeUpdate};
use crate::chrome::{ChromeController, UiDispatcher, UiMessage};
use crate::geometry::{Point, ScreenArea, Size, WindowGeometry};
use crate::host::{HostError, WindowHost};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, PoisonError};
use tauri::{AppHandle, Manager, PhysicalPosition, PhysicalSize, WebviewWindow};
use tracing::warn;

fn window_error(e: tauri::Error) -> HostError {
    HostError::Window(e.to_string())
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value.max(1)).unwrap_or(1)
}

pub struct TauriWindow {
    window: WebviewWindow,
}

impl TauriWindow {
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &WebviewWindow {
        &self.window
    }

    /// CSS pixels from the page to physical screen pixels.
    pub fn to_physical(&self, x: f64, y: f64) -> Result<Point, HostError> {
        let scale = self.window.scale_factor().map_err(window_error)?;
        Ok(Point::new((x * scale).round() as i32, (y * scale).round() as i32))
    }
}

impl WindowHost for TauriWindow {
    fn position(&self) -> Result<Point, HostError> {
        let position = self.window.outer_position().map_err(window_error)?;
        Ok(Point::new(position.x, position.y))
    }

    fn set_position(&mut self, origin: Point) -> Result<(), HostError> {
        self.window
            .set_position(PhysicalPosition::new(origin.x, origin.y))
            .map_err(window_error)
    }

    fn size(&self) -> Result<Size, HostError> {
        let size = self.window.inner_size().map_err(window_error)?;
        Ok(Size::new(to_i32(size.width), to_i32(size.height)))
    }

    fn set_size(&mut self, size: Size) -> Result<(), HostError> {
        self.window
            .set_size(PhysicalSize::new(to_u32(size.width), to_u32(size.height)))
            .map_err(window_error)
    }

    fn set_geometry(&mut self, geometry: WindowGeometry) -> Result<(), HostError> {
        // size first so a left-grip resize never shows the old width at the new x
        self.set_size(geometry.size())?;
        self.set_position(geometry.origin())
    }

    // webviews only do per-pixel alpha
    fn set_opacity(&mut self, _opacity: f64) -> Result<(), HostError> {
        Err(HostError::Unsupported("window opacity"))
    }

    fn begin_interactive_move(&mut self) -> Result<(), HostError> {
        self.window.start_dragging().map_err(window_error)
    }

    fn unmaximize(&mut self) -> Result<(), HostError> {
        self.window.unmaximize().map_err(window_error)
    }

    fn minimize(&mut self) -> Result<(), HostError> {
        self.window.minimize().map_err(window_error)
    }

    fn close(&mut self) -> Result<(), HostError> {
        self.window.close().map_err(window_error)
    }

    fn run_content_script(&mut self, script: &str) -> Result<(), HostError> {
        self.window.eval(script).map_err(window_error)
    }

    fn screen_area(&self) -> Option<ScreenArea> {
        let monitor = self.window.primary_monitor().ok().flatten()?;
        let position = monitor.position();
        let size = monitor.size();
        Some(ScreenArea {
            origin: Point::new(position.x, position.y),
            size: Size::new(to_i32(size.width), to_i32(size.height)),
        })
    }
}

/// Dock badge through the toolkit. Tauri takes a single optional count, so
/// visibility and count are folded together here.
pub struct NativeBadge {
    window: WebviewWindow,
    shown: Mutex<(bool, i64)>,
}

impl NativeBadge {
    pub fn new(window: WebviewWindow) -> Self {
        Self {
            window,
            shown: Mutex::new((false, 0)),
        }
    }
}

impl BadgeChannel for NativeBadge {
    fn name(&self) -> &'static str {
        "tauri-native"
    }

    fn send(&self, update: BadgeUpdate) -> BoxFuture<'_, Result<(), BadgeError>> {
        let count = {
            let mut shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(visible) = update.visible {
                shown.0 = visible;
            }
            if let Some(count) = update.count {
                shown.1 = count;
            }
            shown.0.then_some(shown.1)
        };
        let result = self
            .window
            .set_badge_count(count)
            .map_err(|e| BadgeError::Native(e.to_string()));
        Box::pin(async move { result })
    }
}

/// The native badge is only trusted where the platform has a real dock badge.
pub fn native_badge(window: &WebviewWindow) -> Option<Arc<dyn BadgeChannel>> {
    if cfg!(target_os = "macos") {
        Some(Arc::new(NativeBadge::new(window.clone())))
    } else {
        None
    }
}

/// Managed tauri state.
pub struct ShellState {
    chrome: Mutex<ChromeController<TauriWindow>>,
}

impl ShellState {
    pub fn new(chrome: ChromeController<TauriWindow>) -> Self {
        Self {
            chrome: Mutex::new(chrome),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ChromeController<TauriWindow>) -> R) -> R {
        let mut chrome = self.chrome.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut chrome)
    }
}

pub struct TauriDispatcher {
    app: AppHandle,
}

impl TauriDispatcher {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl UiDispatcher for TauriDispatcher {
    fn post(&self, message: UiMessage) {
        let app = self.app.clone();
        let posted = self.app.run_on_main_thread(move || match app.try_state::<ShellState>() {
            Some(state) => state.with(|chrome| chrome.handle_message(message)),
            None => warn!("[tauri] shell state missing, dropping {:?}", message),
        });
        if let Err(e) = posted {
            warn!("[tauri] failed to post to main thread: {}", e);
        }
    }
}
