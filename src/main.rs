#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use anyhow::Context;
use std::sync::Arc;
use tokio::runtime::Handle;
use tauri::{Manager, State, WebviewUrl, WebviewWindow, WebviewWindowBuilder};
use tauri::webview::PageLoadEvent;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use typhoon_lib::aspect::{AspectRatioSolver, WIDGET_ASPECT_RATIO};
use typhoon_lib::badge::LauncherBadgeSync;
use typhoon_lib::chrome::{ChromeController, Collaborators};
use typhoon_lib::config::ChromeConfig;
use typhoon_lib::drag::PointerButton;
use typhoon_lib::geometry::{Point, Size};
use typhoon_lib::host::WindowHost;
use typhoon_lib::launcher::LauncherChannel;
use typhoon_lib::notify::DesktopNotifier;
use typhoon_lib::resize::GripSide;
use typhoon_lib::storage::GeometryStore;
use typhoon_lib::tauri_host::{native_badge, ShellState, TauriDispatcher, TauriWindow};
use typhoon_lib::theme::DesktopThemeProbe;

// pointer gestures forwarded by the page, in CSS screen pixels

#[tauri::command]
fn drag_start(button: u16, x: f64, y: f64, state: State<'_, ShellState>) -> Result<(), String> {
    state.with(|chrome| {
        let pointer = physical(chrome.host(), x, y)?;
        chrome.on_pointer_down(PointerButton::from_dom(button), pointer);
        Ok(())
    })
}

#[tauri::command]
fn drag_move(x: f64, y: f64, state: State<'_, ShellState>) -> Result<(), String> {
    state.with(|chrome| {
        let pointer = physical(chrome.host(), x, y)?;
        chrome.on_pointer_move(pointer);
        Ok(())
    })
}

#[tauri::command]
fn drag_end(button: u16, state: State<'_, ShellState>) {
    state.with(|chrome| chrome.on_pointer_up(PointerButton::from_dom(button)));
}

#[tauri::command]
fn grip_press(side: GripSide, x: f64, y: f64, state: State<'_, ShellState>) -> Result<(), String> {
    state.with(|chrome| {
        let pointer = physical(chrome.host(), x, y)?;
        chrome.on_grip_press(side, pointer);
        Ok(())
    })
}

#[tauri::command]
fn grip_drag(x: f64, y: f64, state: State<'_, ShellState>) -> Result<(), String> {
    state.with(|chrome| {
        let pointer = physical(chrome.host(), x, y)?;
        chrome.on_grip_drag(pointer);
        Ok(())
    })
}

#[tauri::command]
fn grip_release(state: State<'_, ShellState>) {
    state.with(|chrome| chrome.on_grip_release());
}

fn physical(host: &TauriWindow, x: f64, y: f64) -> Result<Point, String> {
    host.to_physical(x, y).map_err(|e| e.to_string())
}

fn with_chrome(window: &WebviewWindow, f: impl FnOnce(&mut ChromeController<TauriWindow>)) {
    match window.try_state::<ShellState>() {
        Some(state) => state.with(f),
        None => warn!("[typhoon] event before shell state was ready"),
    }
}

// bundled pages stay in the widget, everything else goes to the browser
fn is_bundled(url: &tauri::Url) -> bool {
    matches!(url.scheme(), "tauri" | "file" | "asset")
        || url.host_str() == Some("tauri.localhost")
        || (cfg!(debug_assertions) && url.host_str() == Some("localhost"))
}

fn build_window(app: &tauri::App, config: &ChromeConfig) -> anyhow::Result<WebviewWindow> {
    let size = config.default_size();
    let window = WebviewWindowBuilder::new(app, "main", WebviewUrl::App("index.html".into()))
        .title("Typhoon")
        .decorations(false)
        .transparent(true)
        .maximizable(false)
        .resizable(true)
        .visible(false)
        .inner_size(f64::from(size.width), f64::from(size.height))
        .on_document_title_changed(|window, title| {
            with_chrome(&window, |chrome| chrome.handle_content_command(&title));
        })
        .on_page_load(|window, payload| {
            if matches!(payload.event(), PageLoadEvent::Finished) {
                with_chrome(&window, |chrome| chrome.on_content_loaded(true));
            }
        })
        .on_navigation(|url| {
            if is_bundled(url) {
                return true;
            }
            info!("[typhoon] opening {} externally", url);
            if let Err(e) = tauri_plugin_opener::open_url(url.as_str(), None::<&str>) {
                warn!("[typhoon] failed to open {}: {}", url, e);
            }
            false
        })
        .build()
        .context("failed to create widget window")?;
    Ok(window)
}

fn setup(app: &mut tauri::App, config: &ChromeConfig, runtime: Handle) -> anyhow::Result<()> {
    let window = build_window(app, config)?;
    let host = TauriWindow::new(window.clone());

    let bounds = config.size_bounds(host.screen_area(), WIDGET_ASPECT_RATIO);
    info!("[typhoon] size bounds {:?}", bounds);
    let solver = AspectRatioSolver::new(bounds);

    let channel = runtime.block_on(LauncherChannel::probe(
        native_badge(&window),
        &config.app_id,
        config.launcher_uri(),
    ));
    let badge = LauncherBadgeSync::new(Arc::new(channel), config.badge.timing(), runtime.clone());

    let collaborators = Collaborators {
        badge,
        notifier: Arc::new(DesktopNotifier::new(config.app_id.clone(), config.notification.clone())),
        theme: Arc::new(DesktopThemeProbe::from_env()),
        dispatcher: Arc::new(TauriDispatcher::new(app.handle().clone())),
        runtime,
    };

    let store = GeometryStore::new(config.config_dir());
    let mut chrome = ChromeController::new(host, solver, store, config.default_size(), collaborators);
    chrome.restore();
    app.manage(ShellState::new(chrome));

    window.show().context("failed to show widget window")?;
    Ok(())
}

fn main() {
    // load .env
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_filename("../.env");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("typhoon=info,typhoon_lib=info")),
        )
        .init();

    let config = ChromeConfig::load();
    info!("[typhoon] config dir {:?}", config.config_dir());

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    let handle = runtime.handle().clone();
    tauri::async_runtime::set(handle.clone());

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(move |app| {
            setup(app, &config, handle)?;
            Ok(())
        })
        .on_window_event(|window, event| {
            let Some(state) = window.try_state::<ShellState>() else {
                return;
            };
            let maximized = window.is_maximized().unwrap_or(false);
            match event {
                tauri::WindowEvent::Moved(position) => {
                    state.with(|chrome| chrome.on_host_moved(Point::new(position.x, position.y), maximized));
                }
                tauri::WindowEvent::Resized(size) => {
                    let size = Size::new(
                        i32::try_from(size.width).unwrap_or(i32::MAX),
                        i32::try_from(size.height).unwrap_or(i32::MAX),
                    );
                    state.with(|chrome| chrome.on_host_resized(size, maximized));
                }
                _ => {}
            }
        })
        .invoke_handler(tauri::generate_handler![
            drag_start,
            drag_move,
            drag_end,
            grip_press,
            grip_drag,
            grip_release,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
