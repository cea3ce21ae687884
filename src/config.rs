// widget configuration: defaults, optional typhoon.json, then env overrides

use crate::badge::BadgeTiming;
use crate::geometry::{ScreenArea, Size, SizeBounds};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_APP_ID: &str = "io.github.archisman_panigrahi.typhoon";
const CONFIG_FILE: &str = "typhoon.json";

// used when no monitor is known
const FALLBACK_MAX_HEIGHT: i32 = 4000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BadgeConfig {
    /// confirmation resends after the badge first becomes visible
    pub burst_ms: Vec<u64>,
    /// single reassertion after a count change on a visible badge
    pub reassert_ms: u64,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            burst_ms: vec![80, 180, 480, 1200, 2200],
            reassert_ms: 1200,
        }
    }
}

impl BadgeConfig {
    pub fn timing(&self) -> BadgeTiming {
        BadgeTiming {
            burst: self.burst_ms.iter().copied().map(Duration::from_millis).collect(),
            reassert: Duration::from_millis(self.reassert_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// shown by notification daemons as the sender name
    pub app_name: String,
    pub body: String,
    pub fallback_message: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            app_name: "Weather Alert".to_string(),
            body: "Take care and stay safe.".to_string(),
            fallback_message: "Weather alert".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeConfig {
    /// desktop file id, also names the config dir and the launcher entry
    pub app_id: String,
    pub config_dir: Option<PathBuf>,
    pub default_width: i32,
    pub default_height: i32,
    pub min_width: i32,
    pub min_height: i32,
    /// share of the monitor height the widget may grow to
    pub max_height_fraction: f64,
    pub badge: BadgeConfig,
    pub notification: NotificationConfig,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            config_dir: None,
            default_width: 300,
            default_height: 500,
            min_width: 210,
            min_height: 350,
            max_height_fraction: 0.9,
            badge: BadgeConfig::default(),
            notification: NotificationConfig::default(),
        }
    }
}

impl ChromeConfig {
    /// Defaults, then `typhoon.json` from the config dir, then `TYPHOON_*` env vars.
    /// Never fails: a bad file is logged and skipped.
    pub fn load() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());

        let path = config.config_dir().join(CONFIG_FILE);
        if path.exists() {
            match Self::from_file(&path) {
                Ok(from_file) => {
                    info!("[config] loaded {:?}", path);
                    config = from_file;
                    // env still wins over the file
                    config.apply_env(|key| std::env::var(key).ok());
                }
                Err(e) => warn!("[config] ignoring {:?}: {}", path, e),
            }
        }
        config
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(app_id) = var("TYPHOON_APP_ID").filter(|v| !v.trim().is_empty()) {
            self.app_id = app_id.trim().to_string();
        }
        if let Some(dir) = var("TYPHOON_CONFIG_DIR").filter(|v| !v.trim().is_empty()) {
            self.config_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = var("TYPHOON_BADGE_BURST_MS") {
            let parsed: Result<Vec<u64>, _> = raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(burst) => self.badge.burst_ms = burst,
                Err(e) => warn!("[config] bad TYPHOON_BADGE_BURST_MS {:?}: {}", raw, e),
            }
        }
        if let Some(raw) = var("TYPHOON_BADGE_REASSERT_MS") {
            match raw.trim().parse() {
                Ok(ms) => self.badge.reassert_ms = ms,
                Err(e) => warn!("[config] bad TYPHOON_BADGE_REASSERT_MS {:?}: {}", raw, e),
            }
        }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(&self.app_id)
        })
    }

    pub fn default_size(&self) -> Size {
        Size::new(self.default_width, self.default_height)
    }

    /// `application://<app_id>.desktop`, the id launchers match badges against
    pub fn launcher_uri(&self) -> String {
        format!("application://{}.desktop", self.app_id)
    }

    /// Max height follows the monitor; max width follows from the ratio.
    pub fn size_bounds(&self, screen: Option<ScreenArea>, ratio: f64) -> SizeBounds {
        let max_height = screen.map_or(FALLBACK_MAX_HEIGHT, |area| {
            (f64::from(area.size.height) * self.max_height_fraction) as i32
        });
        let max_width = (f64::from(max_height) * ratio) as i32;
        SizeBounds::new(self.min_width, max_width, self.min_height, max_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::WIDGET_ASPECT_RATIO;
    use crate::geometry::Point;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ChromeConfig::default();
        assert_eq!(config.default_size(), Size::new(300, 500));
        assert_eq!(
            config.launcher_uri(),
            "application://io.github.archisman_panigrahi.typhoon.desktop"
        );
        assert_eq!(config.badge.timing().burst.len(), 5);
        assert_eq!(config.badge.timing().reassert, Duration::from_millis(1200));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ChromeConfig::default();
        config.apply_env(env(&[
            ("TYPHOON_APP_ID", "org.example.widget"),
            ("TYPHOON_CONFIG_DIR", "/tmp/typhoon-test"),
            ("TYPHOON_BADGE_BURST_MS", "10, 20,30"),
            ("TYPHOON_BADGE_REASSERT_MS", "500"),
        ]));

        assert_eq!(config.app_id, "org.example.widget");
        assert_eq!(config.config_dir(), PathBuf::from("/tmp/typhoon-test"));
        assert_eq!(config.badge.burst_ms, vec![10, 20, 30]);
        assert_eq!(config.badge.reassert_ms, 500);
    }

    #[test]
    fn test_bad_env_values_keep_defaults() {
        let mut config = ChromeConfig::default();
        config.apply_env(env(&[
            ("TYPHOON_BADGE_BURST_MS", "80,soon"),
            ("TYPHOON_BADGE_REASSERT_MS", "-1"),
            ("TYPHOON_APP_ID", "  "),
        ]));
        assert_eq!(config, ChromeConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "min_width": 180, "badge": { "reassert_ms": 900 } }"#).unwrap();

        let config = ChromeConfig::from_file(&path).unwrap();
        assert_eq!(config.min_width, 180);
        assert_eq!(config.min_height, 350);
        assert_eq!(config.badge.reassert_ms, 900);
        assert_eq!(config.badge.burst_ms, BadgeConfig::default().burst_ms);
    }

    #[test]
    fn test_size_bounds_follow_screen() {
        let config = ChromeConfig::default();
        let screen = ScreenArea {
            origin: Point::new(0, 0),
            size: Size::new(1920, 1000),
        };
        let bounds = config.size_bounds(Some(screen), WIDGET_ASPECT_RATIO);
        assert_eq!(bounds, SizeBounds::new(210, 540, 350, 900));

        let headless = config.size_bounds(None, WIDGET_ASPECT_RATIO);
        assert_eq!(headless.max_height, FALLBACK_MAX_HEIGHT);
    }
}
