use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::player::Keymap;

pub const SETTINGS_FILE: &str = "settings.json";

// Main window size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    pub width: f64,
    pub height: f64,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

// App settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub last_folder: Option<String>,
    pub restore_last_folder: bool,
    pub keymap: Keymap,
    pub window: WindowSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_folder: None,
            restore_last_folder: true,
            keymap: Keymap::default(),
            window: WindowSettings::default(),
        }
    }
}

impl Settings {
    // Folder to preselect in the sidebar on startup
    pub fn startup_folder(&self) -> Option<PathBuf> {
        if !self.restore_last_folder {
            return None;
        }
        self.last_folder
            .as_ref()
            .map(PathBuf::from)
            .filter(|p| p.is_dir())
    }
}

pub fn settings_path(data_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.join(SETTINGS_FILE))
}

// Load settings from disk, falling back to defaults on any problem
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "ignoring unreadable settings: {}", e);
            Settings::default()
        }),
        Err(e) => {
            tracing::warn!(path = %path.display(), "could not read settings: {}", e);
            Settings::default()
        }
    }
}

// Save settings to disk
pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}
