//! Scene: the feature store, the rendering surface's entity table, the
//! selection and the catalog, kept in step.
//!
//! Split across files:
//! - `store.rs` - FeatureStore registry
//! - `selection.rs` - select / clear with highlight restyling
//! - `style.rs` - colors and outlines

pub mod selection;
pub mod store;
pub mod style;

use std::cell::{Ref, RefCell};

use glam::{DVec2, DVec3};
use shared::{Catalog, Feature, FeatureId};
use tracing::debug;

use crate::settings::HighlightSettings;
use crate::surface::Surface;

pub use store::FeatureStore;
pub use style::{EntityStyle, Rgba};

/// Shared mutable editor state.
///
/// Every mutation writes the store first and the surface second. Borrows are
/// released before returning, so a `Scene` may be shared through `Rc` across
/// local tasks.
pub struct Scene {
    store: RefCell<FeatureStore>,
    surface: RefCell<Box<dyn Surface>>,
    selected: RefCell<Option<FeatureId>>,
    catalog: RefCell<Catalog>,
    highlight: HighlightSettings,
}

impl Scene {
    pub fn new(surface: Box<dyn Surface>, highlight: HighlightSettings) -> Self {
        Self {
            store: RefCell::new(FeatureStore::new()),
            surface: RefCell::new(surface),
            selected: RefCell::new(None),
            catalog: RefCell::new(Catalog::default()),
            highlight,
        }
    }

    /// Deep copy of a feature
    pub fn feature(&self, id: &str) -> Option<Feature> {
        self.store.borrow().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.borrow().contains(id)
    }

    pub fn store(&self) -> Ref<'_, FeatureStore> {
        self.store.borrow()
    }

    pub fn catalog(&self) -> Ref<'_, Catalog> {
        self.catalog.borrow()
    }

    /// Replace the catalog and restyle every entity against it
    pub fn set_catalog(&self, catalog: Catalog) {
        *self.catalog.borrow_mut() = catalog;
        let features: Vec<Feature> = self.store.borrow().iter().cloned().collect();
        for feature in &features {
            self.sync_visual(feature);
        }
    }

    /// Insert or overwrite a feature and sync its entity
    pub fn upsert(&self, feature: Feature) {
        self.store.borrow_mut().insert(feature.clone());
        self.sync_visual(&feature);
    }

    /// Remove a feature and its entity. A removed selection is dropped.
    pub fn remove(&self, id: &str) -> Option<Feature> {
        let removed = self.store.borrow_mut().remove(id);
        self.surface.borrow_mut().remove_feature(id);
        let mut selected = self.selected.borrow_mut();
        if selected.as_deref() == Some(id) {
            *selected = None;
        }
        removed
    }

    /// Replace a temporary id with a permanent one in store, surface and selection.
    pub fn rekey(&self, old: &str, new: &str) {
        if !self.store.borrow_mut().rekey(old, new) {
            return;
        }
        self.surface.borrow_mut().remove_feature(old);
        {
            let mut selected = self.selected.borrow_mut();
            if selected.as_deref() == Some(old) {
                *selected = Some(new.to_string());
            }
        }
        if let Some(feature) = self.feature(new) {
            self.sync_visual(&feature);
        }
        debug!("Re-keyed feature {old} -> {new}");
    }

    pub fn pick_surface_point(&self, screen: DVec2) -> Option<DVec3> {
        self.surface.borrow().pick_surface_point(screen)
    }

    pub fn pick_entity(&self, screen: DVec2) -> Option<FeatureId> {
        self.surface.borrow().pick_entity(screen)
    }

    /// Run a closure against the surface (drawing artifacts)
    pub(crate) fn with_surface<R>(&self, f: impl FnOnce(&mut dyn Surface) -> R) -> R {
        let mut surface = self.surface.borrow_mut();
        f(surface.as_mut())
    }

    fn style(&self, feature: &Feature, highlighted: bool) -> EntityStyle {
        style::style_for(feature, &self.catalog.borrow(), highlighted, &self.highlight)
    }

    fn sync_visual(&self, feature: &Feature) {
        let highlighted = self.is_selected(&feature.id);
        let style = self.style(feature, highlighted);
        self.surface.borrow_mut().sync_feature(feature, &style);
    }
}
