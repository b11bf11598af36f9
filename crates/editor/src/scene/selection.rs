//! Single selection with highlight restyling

use shared::FeatureId;
use tracing::debug;

use super::Scene;
use crate::error::EditorError;

impl Scene {
    pub fn selected(&self) -> Option<FeatureId> {
        self.selected.borrow().clone()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.borrow().as_deref() == Some(id)
    }

    /// Select a feature, restoring the previous one to its plain style first.
    ///
    /// Returns `false` when the id was already selected.
    pub fn select(&self, id: &str) -> Result<bool, EditorError> {
        if self.is_selected(id) {
            return Ok(false);
        }
        let feature = self
            .feature(id)
            .ok_or_else(|| EditorError::UnknownFeature(id.to_string()))?;

        self.clear_selection();
        *self.selected.borrow_mut() = Some(id.to_string());
        let style = self.style(&feature, true);
        self.surface.borrow_mut().set_entity_style(id, &style);
        debug!("Selected {id}");
        Ok(true)
    }

    /// Drop the selection, returning the previously selected id
    pub fn clear_selection(&self) -> Option<FeatureId> {
        let previous = self.selected.borrow_mut().take()?;
        if let Some(feature) = self.feature(&previous) {
            let style = self.style(&feature, false);
            self.surface.borrow_mut().set_entity_style(&previous, &style);
        }
        Some(previous)
    }
}
