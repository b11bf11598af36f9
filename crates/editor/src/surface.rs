//! Rendering/picking surface contract.
//!
//! The globe renderer is an external collaborator. Feature entities are
//! addressed by feature id; ephemeral drawing artifacts (preview shape, distance
//! labels) by an [`EntityHandle`] handed out by the surface.

use glam::{DVec2, DVec3};
use shared::Feature;

use crate::scene::style::EntityStyle;

/// Opaque handle of an ephemeral entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(pub u64);

/// Shape of the in-progress drawing preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    /// Filled polygon with a closed outline
    Polygon,
    /// Open polyline
    Line,
}

pub trait Surface {
    /// World point under a screen position, or `None` when nothing is hit
    fn pick_surface_point(&self, screen: DVec2) -> Option<DVec3>;

    /// Feature entity under a screen position
    fn pick_entity(&self, screen: DVec2) -> Option<String>;

    fn add_preview(&mut self, kind: PreviewKind, points: &[DVec3]) -> EntityHandle;

    fn update_preview(&mut self, handle: EntityHandle, points: &[DVec3]);

    fn add_label(&mut self, position: DVec3, text: &str) -> EntityHandle;

    fn update_label(&mut self, handle: EntityHandle, position: DVec3, text: &str);

    fn remove_entity(&mut self, handle: EntityHandle);

    /// Create or refresh the entity for a feature
    fn sync_feature(&mut self, feature: &Feature, style: &EntityStyle);

    fn remove_feature(&mut self, id: &str);

    fn set_entity_style(&mut self, id: &str, style: &EntityStyle);
}
