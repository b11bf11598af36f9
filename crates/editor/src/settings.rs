//! Editor settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::history::RemoteFailurePolicy;

/// Remote persistence backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the REST backend, without trailing slash
    pub base_url: String,
    /// Keep everything in memory instead of calling the backend
    pub use_local: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            use_local: false,
        }
    }
}

/// Defaults applied to freshly drawn features when the control panel has no value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingSettings {
    /// Extrusion height of new polygons (m)
    pub default_height: f64,
    /// Corridor width of new roads (m)
    pub default_road_width: f64,
}

impl Default for DrawingSettings {
    fn default() -> Self {
        Self {
            default_height: 10.0,
            default_road_width: 5.0,
        }
    }
}

/// Hold-to-rotate loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSettings {
    /// Degrees applied per tick
    pub step_degrees: f64,
    /// Tick period in milliseconds
    pub period_ms: u64,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            step_degrees: 2.0,
            period_ms: 16,
        }
    }
}

/// Selection highlight appearance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightSettings {
    pub highlighted_alpha: f32,
    pub normal_alpha: f32,
    pub highlighted_outline_width: f64,
    pub outline_width: f64,
    /// Added to a line's width while selected
    pub line_width_bump: f64,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            highlighted_alpha: 0.9,
            normal_alpha: 0.6,
            highlighted_outline_width: 3.0,
            outline_width: 1.0,
            line_width_bump: 3.0,
        }
    }
}

/// All editor settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub api: ApiSettings,
    pub drawing: DrawingSettings,
    pub rotation: RotationSettings,
    pub highlight: HighlightSettings,
    pub remote_failure: RemoteFailurePolicy,
}

impl EditorSettings {
    fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "footprint", "footprint-editor")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from the platform config dir, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring settings at {}: {e}", path.display());
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, EditorError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| EditorError::Settings(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| EditorError::Settings(format!("{}: {e}", path.display())))
    }

    /// Save settings to the platform config dir
    pub fn save(&self) -> Result<(), EditorError> {
        let path = Self::config_path()
            .ok_or_else(|| EditorError::Settings("no config directory".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), EditorError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| EditorError::Settings(e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| EditorError::Settings(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| EditorError::Settings(e.to_string()))
    }
}
