//! Contracts of the application shell the editor is embedded in: the control
//! panel, the name/description modal and the notice/selection sinks.

use serde::{Deserialize, Serialize};
use shared::Feature;

use crate::drawing::EditorMode;

/// Catalog type chosen in the control panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSelection {
    pub type_id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// CSS hex color of the type
    #[serde(default)]
    pub color: Option<String>,
}

/// Read access to the shell's input controls
pub trait ControlPanel {
    fn active_feature_type(&self) -> Option<CatalogSelection>;

    /// Height (polygon modes) or width (road mode) slider value
    fn active_height_or_width(&self, mode: EditorMode) -> Option<f64>;
}

/// Panel with nothing chosen; settings defaults apply
pub struct NoPanel;

impl ControlPanel for NoPanel {
    fn active_feature_type(&self) -> Option<CatalogSelection> {
        None
    }

    fn active_height_or_width(&self, _mode: EditorMode) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub name: String,
    pub description: String,
}

/// Modal that captures name and description of a new polygon
#[allow(async_fn_in_trait)]
pub trait DescriptionPrompt {
    /// `None` when the user cancels
    async fn request(&self, default_name: &str, example_source: &str) -> Option<Description>;
}

/// Accepts the default name without asking
pub struct AcceptDefaults;

impl DescriptionPrompt for AcceptDefaults {
    async fn request(&self, default_name: &str, _example_source: &str) -> Option<Description> {
        Some(Description {
            name: default_name.to_string(),
            description: shared::wire::DEFAULT_BUILDING_DESCRIPTION.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Transient user-facing message (toast)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait EditorObserver {
    fn notice(&self, _notice: &Notice) {}

    fn selection_changed(&self, _feature: Option<&Feature>) {}

    fn mode_changed(&self, _mode: EditorMode) {}
}

/// Observer that drops everything
pub struct NullObserver;

impl EditorObserver for NullObserver {}
