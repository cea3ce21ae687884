// chrome controller: the widget's window manager
//
// owns the committed window geometry and routes pointer gestures, host window
// events and content commands to the drag/resize controllers, the geometry store
// and the launcher badge. runs on the UI thread; background work (notifications,
// theme probe) reports back through the UiDispatcher.

use crate::aspect::AspectRatioSolver;
use crate::badge::LauncherBadgeSync;
use crate::commands::ContentCommand;
use crate::drag::{DragController, PointerButton, PressOutcome};
use crate::geometry::{Point, Size, WindowGeometry};
use crate::host::{HostError, WindowHost};
use crate::notify::Notifier;
use crate::resize::{GripSide, ResizeController};
use crate::storage::GeometryStore;
use crate::theme::ThemeProbe;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

const WINDOW_OPACITY_RANGE: (f64, f64) = (0.1, 1.0);
const CONTENT_ALPHA_RANGE: (f64, f64) = (0.3, 1.0);

/// Results of background work, posted back to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMessage {
    DeliverColor(String),
}

/// Posts a message to the thread that owns the controller.
/// Implementations call [`ChromeController::handle_message`] there.
pub trait UiDispatcher: Send + Sync {
    fn post(&self, message: UiMessage);
}

/// Everything the controller talks to besides the window itself.
pub struct Collaborators {
    pub badge: LauncherBadgeSync,
    pub notifier: Arc<dyn Notifier>,
    pub theme: Arc<dyn ThemeProbe>,
    pub dispatcher: Arc<dyn UiDispatcher>,
    pub runtime: Handle,
}

// The host reports our own resizes back as ordinary resize events, late and
// sometimes out of order. The guard holds the sizes we asked for that have not
// been reported yet; only a report matching one of them is swallowed.
const GUARD_DEPTH: usize = 8;

#[derive(Debug, Default)]
struct ResizeGuard {
    pending: VecDeque<Size>,
}

impl ResizeGuard {
    fn engage(&mut self, target: Size) {
        if self.pending.back() == Some(&target) {
            return;
        }
        if self.pending.len() == GUARD_DEPTH {
            self.pending.pop_front();
        }
        self.pending.push_back(target);
    }

    // a match also retires every older request
    fn absorb(&mut self, reported: Size) -> bool {
        match self.pending.iter().position(|&target| target == reported) {
            Some(index) => {
                self.pending.drain(..=index);
                true
            }
            None => false,
        }
    }

    fn release(&mut self) {
        self.pending.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpacityMode {
    Window,
    /// host lacks window opacity, alpha goes to the page instead
    Content,
}

pub struct ChromeController<H: WindowHost> {
    host: H,
    solver: AspectRatioSolver,
    store: GeometryStore,
    default_size: Size,
    geometry: WindowGeometry,
    drag: DragController,
    resize: ResizeController,
    guard: ResizeGuard,
    opacity_mode: OpacityMode,
    opacity: f64,
    theme_requested: bool,
    badge: LauncherBadgeSync,
    notifier: Arc<dyn Notifier>,
    theme: Arc<dyn ThemeProbe>,
    dispatcher: Arc<dyn UiDispatcher>,
    runtime: Handle,
}

impl<H: WindowHost> ChromeController<H> {
    pub fn new(
        host: H,
        solver: AspectRatioSolver,
        store: GeometryStore,
        default_size: Size,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            badge,
            notifier,
            theme,
            dispatcher,
            runtime,
        } = collaborators;

        Self {
            host,
            solver,
            store,
            default_size,
            geometry: WindowGeometry::from_parts(default_size, Point::default()),
            drag: DragController::new(),
            resize: ResizeController::new(),
            guard: ResizeGuard::default(),
            opacity_mode: OpacityMode::Window,
            opacity: 1.0,
            theme_requested: false,
            badge,
            notifier,
            theme,
            dispatcher,
            runtime,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Last committed geometry.
    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    pub fn badge(&self) -> &LauncherBadgeSync {
        &self.badge
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn is_drag_enabled(&self) -> bool {
        self.drag.is_enabled()
    }

    // --- lifecycle ---

    /// Applies the stored geometry (or the default size, centered) and hides the badge.
    pub fn restore(&mut self) {
        let stored = self.store.load();
        let width = stored.size.map_or(self.default_size.width, |s| s.width);
        let size = self.solver.solve_from_width(width);

        let origin = stored
            .position
            .or_else(|| self.host.screen_area().map(|area| area.center(size)))
            .unwrap_or_default();
        let geometry = WindowGeometry::from_parts(size, origin);

        if self.host.size().ok() != Some(size) {
            self.guard.engage(size);
        }
        if let Err(e) = self.host.set_geometry(geometry) {
            warn!("[chrome] failed to restore geometry {:?}: {}", geometry, e);
        }
        self.geometry = geometry;
        info!("[chrome] restored {:?}", geometry);

        self.badge.reset();
    }

    /// Kicks off the theme probe after the first successful load.
    pub fn on_content_loaded(&mut self, ok: bool) {
        if !ok {
            warn!("[chrome] content failed to load");
            return;
        }
        if self.theme_requested {
            return;
        }
        self.theme_requested = true;

        let probe = self.theme.probe();
        let dispatcher = self.dispatcher.clone();
        self.runtime.spawn(async move {
            match probe.await {
                Ok(hex) => dispatcher.post(UiMessage::DeliverColor(hex)),
                Err(e) => warn!("[chrome] no theme color: {}", e),
            }
        });
    }

    pub fn handle_message(&mut self, message: UiMessage) {
        match message {
            UiMessage::DeliverColor(hex) => {
                let hex = hex.trim().trim_start_matches('#');
                if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    warn!("[chrome] ignoring malformed color {:?}", hex);
                    return;
                }
                self.run_script(&format!("receiveMessage('{hex}');"));
            }
        }
    }

    // --- content commands ---

    /// One line from the content surface; unknown lines are ignored.
    pub fn handle_content_command(&mut self, line: &str) {
        info!("[chrome] {}", line);
        match ContentCommand::parse(line) {
            Some(command) => self.apply(command),
            None => debug!("[chrome] ignoring {:?}", line),
        }
    }

    pub fn apply(&mut self, command: ContentCommand) {
        match command {
            ContentCommand::Close => {
                self.badge.set_visible(false);
                if let Err(e) = self.host.close() {
                    warn!("[chrome] close failed: {}", e);
                }
            }
            ContentCommand::Minimize => {
                if let Err(e) = self.host.minimize() {
                    warn!("[chrome] minimize failed: {}", e);
                }
            }
            ContentCommand::Reset => {
                self.badge.set_visible(false);
                let size = self.solver.solve_from_width(self.default_size.width);
                self.commit_size(size);
            }
            ContentCommand::EnableLauncher => self.badge.set_visible(true),
            ContentCommand::DisableLauncher => self.badge.set_visible(false),
            ContentCommand::EnableDrag => self.drag.set_enabled(true),
            ContentCommand::DisableDrag => self.drag.set_enabled(false),
            ContentCommand::Notify(text) => {
                let delivery = self.notifier.notify(text);
                self.runtime.spawn(async move {
                    if let Err(e) = delivery.await {
                        warn!("[chrome] notification failed: {}", e);
                    }
                });
            }
            ContentCommand::Height(height) => {
                let size = self.solver.solve_from_height(height);
                self.commit_size(size);
            }
            ContentCommand::Opacity(opacity) => self.set_opacity(opacity),
            ContentCommand::Count(count) => self.badge.set_count(count),
        }
    }

    pub fn set_opacity(&mut self, requested: f64) {
        if self.opacity_mode == OpacityMode::Window {
            let opacity = requested.clamp(WINDOW_OPACITY_RANGE.0, WINDOW_OPACITY_RANGE.1);
            match self.host.set_opacity(opacity) {
                Ok(()) => {
                    self.opacity = opacity;
                    return;
                }
                Err(HostError::Unsupported(_)) => {
                    info!("[chrome] window opacity unsupported, using content alpha");
                    self.opacity_mode = OpacityMode::Content;
                }
                Err(e) => {
                    warn!("[chrome] failed to set opacity: {}", e);
                    return;
                }
            }
        }

        let alpha = requested.clamp(CONTENT_ALPHA_RANGE.0, CONTENT_ALPHA_RANGE.1);
        self.run_script(&content_alpha_script(alpha));
        self.opacity = alpha;
    }

    // --- pointer gestures ---

    pub fn on_pointer_down(&mut self, button: PointerButton, pointer: Point) -> PressOutcome {
        let origin = self.host.position().unwrap_or(self.geometry.origin());
        self.drag.on_pointer_down(&mut self.host, button, pointer, origin)
    }

    pub fn on_pointer_move(&mut self, pointer: Point) {
        if let Some(origin) = self.drag.on_pointer_move(&mut self.host, pointer) {
            self.geometry.set_origin(origin);
        }
    }

    pub fn on_pointer_up(&mut self, button: PointerButton) {
        if self.drag.on_pointer_up(button).is_some() {
            self.persist_position();
        }
    }

    pub fn on_grip_press(&mut self, side: GripSide, pointer: Point) {
        self.resize.on_grip_press(side, pointer, self.geometry);
    }

    pub fn on_grip_drag(&mut self, pointer: Point) {
        let previous = self.geometry.size();
        if let Some(next) = self
            .resize
            .on_grip_drag(&mut self.host, &self.solver, pointer, self.geometry)
        {
            if next.size() != previous {
                self.guard.engage(next.size());
            }
            self.geometry = next;
        }
    }

    pub fn on_grip_release(&mut self) {
        if self.resize.on_grip_release().is_some() {
            self.persist_size();
            self.persist_position();
        }
        // late echoes of the gesture match the committed size and are no-ops
        self.guard.release();
    }

    // --- host window events ---

    pub fn on_host_moved(&mut self, origin: Point, maximized: bool) {
        // a maximize moves the window too; the resize half restores it
        if maximized || origin == self.geometry.origin() {
            return;
        }
        self.geometry.set_origin(origin);

        // gestures persist when they end
        if !self.drag.is_active() && !self.resize.is_active() {
            self.persist_position();
        }
    }

    pub fn on_host_resized(&mut self, size: Size, maximized: bool) {
        if maximized {
            self.reject_maximize();
            return;
        }
        if self.guard.absorb(size) {
            debug!("[chrome] absorbed resize echo {:?}", size);
            return;
        }
        if self.resize.is_active() {
            return;
        }
        if size == self.geometry.size() {
            return;
        }

        let target = self.reconcile(size);
        if target == size {
            self.geometry.set_size(size);
            self.persist_size();
        } else {
            debug!("[chrome] host resized to {:?}, locking to {:?}", size, target);
            self.commit_size(target);
        }
    }

    // whichever dimension moved more drives the other
    fn reconcile(&self, size: Size) -> Size {
        let current = self.geometry.size();
        let delta_w = (size.width - current.width).abs();
        let delta_h = (size.height - current.height).abs();
        if delta_w >= delta_h {
            self.solver.solve_from_width(size.width)
        } else {
            self.solver.solve_from_height(size.height)
        }
    }

    // no maximized state for a fixed-ratio widget; nothing is persisted
    fn reject_maximize(&mut self) {
        info!("[chrome] maximize rejected, restoring {:?}", self.geometry);
        if let Err(e) = self.host.unmaximize() {
            warn!("[chrome] unmaximize failed: {}", e);
        }
        self.guard.engage(self.geometry.size());
        if let Err(e) = self.host.set_geometry(self.geometry) {
            warn!("[chrome] failed to restore geometry: {}", e);
        }
    }

    // --- helpers ---

    fn commit_size(&mut self, size: Size) {
        if size != self.geometry.size() {
            self.guard.engage(size);
        }
        if let Err(e) = self.host.set_size(size) {
            warn!("[chrome] resize to {:?} failed: {}", size, e);
            return;
        }
        self.geometry.set_size(size);
        self.persist_size();
    }

    fn persist_size(&self) {
        if let Err(e) = self.store.save_size(self.geometry.size()) {
            warn!("[chrome] {}", e);
        }
    }

    fn persist_position(&self) {
        if let Err(e) = self.store.save_position(self.geometry.origin()) {
            warn!("[chrome] {}", e);
        }
    }

    fn run_script(&mut self, script: &str) {
        if let Err(e) = self.host.run_content_script(script) {
            warn!("[chrome] content script failed: {}", e);
        }
    }
}

fn content_alpha_script(alpha: f64) -> String {
    format!(
        "(function(){{var o={alpha:.3};if (window.setWindowAlpha) {{window.setWindowAlpha(o);}} else {{document.documentElement.style.setProperty('--window-alpha', o);}}}})();"
    )
}
