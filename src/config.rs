//! Runtime settings.
//!
//! Loads timing and page geometry from config.json next to the executable.
//! Every field is optional; anything missing falls back to its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Page geometry for directory-scan assembly, in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    /// Margin applied on all four sides
    pub margin_mm: f32,
}

impl Default for PageGeometry {
    /// A4 portrait with 10mm margins.
    fn default() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 10.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seconds counted down before each cursor position is sampled
    pub countdown_secs: u64,
    /// Seconds counted down before the first capture, to focus the viewer window
    pub window_select_secs: u64,
    /// Delay after each page-advance key so the viewer can render (milliseconds)
    pub shot_interval_ms: u64,
    /// Time between key-down and key-up (milliseconds)
    pub key_hold_ms: u64,
    pub scan_page: PageGeometry,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 10,
            window_select_secs: 10,
            shot_interval_ms: 2000,
            key_hold_ms: 0,
            scan_page: PageGeometry::default(),
        }
    }
}

impl AppConfig {
    pub fn shot_interval(&self) -> Duration {
        Duration::from_millis(self.shot_interval_ms)
    }

    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }

    /// All waits set to zero. Used by tests.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            countdown_secs: 0,
            window_select_secs: 0,
            shot_interval_ms: 0,
            key_hold_ms: 0,
            scan_page: PageGeometry::default(),
        }
    }
}

/// Loads configuration from `path`, returning defaults if it is absent or broken.
fn load_config(path: &Path) -> AppConfig {
    crate::log(&format!("Looking for config at: {}", path.display()));

    if !path.exists() {
        crate::log("config.json not found. Using default config.");
        return AppConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                crate::log("Config loaded from config.json");
                config
            }
            Err(e) => {
                crate::log(&format!(
                    "Failed to parse config.json: {}. Using defaults.",
                    e
                ));
                AppConfig::default()
            }
        },
        Err(e) => {
            crate::log(&format!(
                "Failed to read config.json: {}. Using defaults.",
                e
            ));
            AppConfig::default()
        }
    }
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config(&crate::paths::get_config_path()));
}

/// Returns the global configuration, or defaults if `init_config` was never called.
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}
