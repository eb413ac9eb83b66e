//! Editor preferences and settings.
//!
//! Persistent settings that survive editor restarts, stored as TOML under
//! the platform config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};

/// Editor preferences and settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    // Assembly
    /// Run the save hook after each scene save
    pub assemble_on_save: bool,

    // Project layout
    /// Project-relative directory scanned for templates and scenes
    pub template_root: PathBuf,

    // Activity feed
    pub activity_capacity: usize,
    pub collapse_duplicates: bool,

    // Hierarchy
    pub show_marker_badges: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            assemble_on_save: true,
            template_root: PathBuf::from("assets"),
            activity_capacity: 1000,
            collapse_duplicates: true,
            show_marker_badges: true,
        }
    }
}

impl Preferences {
    /// Load preferences from a file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No preferences at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| EditorError::Config(format!("reading {:?}: {}", path, e)))?;
        let prefs = toml::from_str(&content)
            .map_err(|e| EditorError::Config(format!("parsing {:?}: {}", path, e)))?;
        log::info!("Loaded preferences from {:?}", path);
        Ok(prefs)
    }

    /// Save preferences to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EditorError::Config(format!("creating {:?}: {}", parent, e)))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| EditorError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| EditorError::Config(format!("writing {:?}: {}", path, e)))?;
        log::info!("Saved preferences to {:?}", path);
        Ok(())
    }

    /// Get the default preferences path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("stagehand");
            p.push("preferences.toml");
            p
        })
    }
}
