// theme color for the content surface
// wallpaper average first, the portal accent color second

use futures::future::BoxFuture;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use zbus::zvariant::{OwnedValue, Value};
use zbus::Connection;

const PORTAL_NAME: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const PORTAL_SETTINGS: &str = "org.freedesktop.portal.Settings";
const KDE_APPLETS_RC: &str = "plasma-org.kde.plasma.desktop-appletsrc";

#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("Wallpaper is not readable from a sandbox")]
    Sandboxed,
    #[error("Unsupported desktop environment: {0:?}")]
    UnsupportedDesktop(String),
    #[error("Command failed: {0}")]
    Command(String),
    #[error("No wallpaper configured")]
    NoWallpaper,
    #[error("Unsupported wallpaper format: {0:?}")]
    UnsupportedFormat(PathBuf),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),
    #[error("No accent color set")]
    NoAccent,
}

/// Produces a 6-digit hex color (no `#`) for the content surface.
pub trait ThemeProbe: Send + Sync {
    fn probe(&self) -> BoxFuture<'static, Result<String, ThemeError>>;
}

#[derive(Debug, Clone)]
pub struct DesktopThemeProbe {
    desktop: String,
    sandboxed: bool,
}

impl DesktopThemeProbe {
    pub fn new(desktop: impl Into<String>, sandboxed: bool) -> Self {
        Self {
            desktop: desktop.into().to_lowercase(),
            sandboxed,
        }
    }

    /// Reads `XDG_CURRENT_DESKTOP`; Flatpak and Snap count as sandboxed.
    pub fn from_env() -> Self {
        let sandboxed = std::env::var_os("FLATPAK_ID").is_some() || std::env::var_os("SNAP").is_some();
        Self::new(std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default(), sandboxed)
    }
}

impl ThemeProbe for DesktopThemeProbe {
    fn probe(&self) -> BoxFuture<'static, Result<String, ThemeError>> {
        let probe = self.clone();
        Box::pin(async move {
            match probe.wallpaper_color().await {
                Ok(hex) => {
                    info!("[theme] color from wallpaper: #{}", hex);
                    return Ok(hex);
                }
                Err(e) => info!("[theme] wallpaper color unavailable, trying accent: {}", e),
            }
            let hex = accent_color().await?;
            info!("[theme] color from portal accent: #{}", hex);
            Ok(hex)
        })
    }
}

impl DesktopThemeProbe {
    async fn wallpaper_color(&self) -> Result<String, ThemeError> {
        if self.sandboxed {
            return Err(ThemeError::Sandboxed);
        }
        let path = self.wallpaper_path().await?;
        info!("[theme] wallpaper path: {:?}", path);

        tokio::task::spawn_blocking(move || average_color(&path))
            .await
            .map_err(|e| ThemeError::Command(e.to_string()))?
    }

    async fn wallpaper_path(&self) -> Result<PathBuf, ThemeError> {
        if let Some((schema, key)) = gsettings_key(&self.desktop) {
            let raw = command_output("gsettings", &["get", schema, key]).await?;
            return wallpaper_from_setting(&raw);
        }
        if self.desktop.contains("xfce") {
            let monitor = primary_monitor()
                .await
                .ok_or_else(|| ThemeError::Command("no primary monitor for xfconf".to_string()))?;
            let key = xfce_backdrop_key(&monitor);
            let raw = command_output("xfconf-query", &["-c", "xfce4-desktop", "-p", &key]).await?;
            return wallpaper_from_setting(&raw);
        }
        if self.desktop.contains("kde") {
            let rc = dirs::config_dir().ok_or(ThemeError::NoWallpaper)?.join(KDE_APPLETS_RC);
            let contents = tokio::fs::read_to_string(rc).await?;
            let image = kde_wallpaper(&contents).ok_or(ThemeError::NoWallpaper)?;
            return kde_image_file(image).await;
        }
        if self.desktop.contains("lxde") || self.desktop.contains("labwc:wlroots") {
            let root = dirs::config_dir().ok_or(ThemeError::NoWallpaper)?.join("pcmanfm");
            return pcmanfm_wallpaper_path(&root).await;
        }
        Err(ThemeError::UnsupportedDesktop(self.desktop.clone()))
    }
}

fn gsettings_key(desktop: &str) -> Option<(&'static str, &'static str)> {
    if desktop.contains("gnome") {
        Some(("org.gnome.desktop.background", "picture-uri"))
    } else if desktop.contains("cinnamon") {
        Some(("org.cinnamon.desktop.background", "picture-uri"))
    } else if desktop.contains("mate") {
        Some(("org.mate.background", "picture-filename"))
    } else {
        None
    }
}

async fn command_output(program: &str, args: &[&str]) -> Result<String, ThemeError> {
    let output = tokio::process::Command::new(program).args(args).output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ThemeError::Command(format!("{program} {}: {}", args.join(" "), stderr.trim())));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

async fn primary_monitor() -> Option<String> {
    let listing = command_output("xrandr", &["--current"]).await.ok()?;
    primary_output(&listing)
}

// the output marked primary, else the first connected one
fn primary_output(listing: &str) -> Option<String> {
    let connected: Vec<&str> = listing
        .lines()
        .filter(|line| line.split_whitespace().any(|word| word == "connected"))
        .collect();
    connected
        .iter()
        .find(|line| line.split_whitespace().any(|word| word == "primary"))
        .or_else(|| connected.first())
        .and_then(|line| line.split_whitespace().next())
        .map(str::to_string)
}

fn xfce_backdrop_key(monitor: &str) -> String {
    format!("/backdrop/screen0/monitor{monitor}/workspace0/last-image")
}

/// `'file:///home/me/My%20Pictures/sky.jpg'` -> `/home/me/My Pictures/sky.jpg`
fn wallpaper_from_setting(raw: &str) -> Result<PathBuf, ThemeError> {
    let value = raw.trim().trim_matches('\'');
    let Some(location) = value.strip_prefix("file://") else {
        return if value.is_empty() {
            Err(ThemeError::NoWallpaper)
        } else {
            Ok(PathBuf::from(value))
        };
    };

    let decoded = urlencoding::decode(location).map_err(|e| ThemeError::Command(e.to_string()))?;
    if decoded.is_empty() {
        return Err(ThemeError::NoWallpaper);
    }
    Ok(PathBuf::from(decoded.into_owned()))
}

// first Image= entry of the plasma applets config
fn kde_wallpaper(contents: &str) -> Option<&str> {
    contents
        .lines()
        .find_map(|line| line.trim().strip_prefix("Image="))
        .map(str::trim)
        .filter(|image| !image.is_empty())
}

// a trailing slash names a wallpaper package; pick its first jpg/png
async fn kde_image_file(image: &str) -> Result<PathBuf, ThemeError> {
    let path = wallpaper_from_setting(image)?;
    if !image.ends_with('/') {
        return Ok(path);
    }

    let mut entries = tokio::fs::read_dir(path.join("contents").join("images")).await?;
    while let Some(entry) = entries.next_entry().await? {
        let candidate = entry.path();
        if has_extension(&candidate, &["jpg", "png"]) {
            return Ok(candidate);
        }
    }
    Err(ThemeError::NoWallpaper)
}

// ~/.config/pcmanfm/<profile>/desktop-items-<n>.conf, primary monitor's file first
async fn pcmanfm_wallpaper_path(root: &Path) -> Result<PathBuf, ThemeError> {
    let mut configs = Vec::new();
    let mut profiles = tokio::fs::read_dir(root).await?;
    while let Some(profile) = profiles.next_entry().await? {
        let Ok(mut entries) = tokio::fs::read_dir(profile.path()).await else {
            continue;
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("desktop-items-") && name.ends_with(".conf") {
                configs.push(entry.path());
            }
        }
    }
    prefer_monitor(&mut configs, primary_monitor().await.as_deref());

    for config in configs {
        let Ok(contents) = tokio::fs::read_to_string(&config).await else {
            continue;
        };
        if let Some(wallpaper) = pcmanfm_wallpaper(&contents) {
            return wallpaper_from_setting(wallpaper);
        }
    }
    Err(ThemeError::NoWallpaper)
}

fn prefer_monitor(configs: &mut [PathBuf], monitor: Option<&str>) {
    configs.sort();
    if let Some(monitor) = monitor {
        configs.sort_by_key(|path| !path.to_string_lossy().contains(monitor));
    }
}

// wallpaper= under the [*] section
fn pcmanfm_wallpaper(contents: &str) -> Option<&str> {
    let mut in_global = false;
    for line in contents.lines().map(str::trim) {
        if line.starts_with('[') {
            in_global = line == "[*]";
            continue;
        }
        if !in_global {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == "wallpaper" {
                return Some(value.trim()).filter(|v| !v.is_empty());
            }
        }
    }
    None
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

fn average_color(path: &Path) -> Result<String, ThemeError> {
    if has_extension(path, &["svg"]) {
        return Err(ThemeError::UnsupportedFormat(path.to_path_buf()));
    }
    let pixel = image::open(path)?
        .resize_exact(1, 1, FilterType::Triangle)
        .to_rgb8();
    let [r, g, b] = pixel.get_pixel(0, 0).0;
    Ok(hex_color(r, g, b))
}

async fn accent_color() -> Result<String, ThemeError> {
    let connection = Connection::session().await?;
    let reply = connection
        .call_method(
            Some(PORTAL_NAME),
            PORTAL_PATH,
            Some(PORTAL_SETTINGS),
            "Read",
            &("org.freedesktop.appearance", "accent-color"),
        )
        .await?;

    let value: OwnedValue = reply.body().deserialize()?;
    let (r, g, b) = accent_components(&value).ok_or(ThemeError::NoAccent)?;
    Ok(hex_color(channel(r), channel(g), channel(b)))
}

// portal answers (ddd), possibly wrapped in extra variants; out-of-range means unset
fn accent_components(value: &Value<'_>) -> Option<(f64, f64, f64)> {
    match value {
        Value::Value(inner) => accent_components(inner),
        Value::Structure(fields) => match fields.fields() {
            [Value::F64(r), Value::F64(g), Value::F64(b)] => {
                let in_range = [r, g, b].iter().all(|c| (0.0..=1.0).contains(*c));
                in_range.then_some((*r, *g, *b))
            }
            _ => None,
        },
        _ => None,
    }
}

fn channel(component: f64) -> u8 {
    (component * 255.0) as u8
}

fn hex_color(r: u8, g: u8, b: u8) -> String {
    format!("{r:02x}{g:02x}{b:02x}")
}
