//! The editor facade: routes pointer and keyboard input to the drawing state
//! machine, the selection, the rotation controller and the command engine.
//!
//! Every entry point takes `&self`, so the shell can hold an `Rc<Editor>` and
//! dispatch each input event as its own local task.

use std::cell::Cell;
use std::rc::Rc;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use shared::wire::{default_building_name, DEFAULT_ROAD_DESCRIPTION};
use shared::{Catalog, CostEstimate, Feature, FeatureId, FeatureMeta, FeatureType};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{CatalogApi, FeatureApi};
use crate::collaborators::{
    ControlPanel, DescriptionPrompt, EditorObserver, NoPanel, Notice, NoticeLevel, NullObserver,
};
use crate::drawing::{CompletedShape, DrawingState, EditorMode};
use crate::error::EditorError;
use crate::geometry::Metrics;
use crate::history::{CommandEngine, EditCommand};
use crate::rotation::RotationController;
use crate::scene::Scene;
use crate::settings::{DrawingSettings, EditorSettings};
use crate::surface::Surface;

/// Example text source offered by the description modal when no type is chosen
const FALLBACK_EXAMPLE_SOURCE: &str = "Detached house";

/// A keyboard event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
}

impl KeyInput {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Self::default()
        }
    }

    pub fn ctrl(key: &str) -> Self {
        Self {
            ctrl: true,
            ..Self::new(key)
        }
    }

    pub fn ctrl_shift(key: &str) -> Self {
        Self {
            shift: true,
            ..Self::ctrl(key)
        }
    }
}

/// Attribute changes for the selected feature. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureUpdate {
    /// Catalog type id
    #[serde(default)]
    pub type_id: Option<String>,
    /// Height for polygons, width for lines
    #[serde(default)]
    pub extent: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FeatureUpdate {
    pub fn apply_to(&self, feature: &mut Feature, catalog: &Catalog) {
        if let Some(type_id) = &self.type_id {
            feature.meta.type_id = Some(type_id.clone());
            if !feature.feature_type.is_road() {
                feature.feature_type = FeatureType::Building(type_id.clone());
                if let Some(building_type) = catalog.get(type_id) {
                    feature.meta.color = Some(building_type.color.clone());
                }
            }
        }
        if let Some(extent) = self.extent {
            let extent = extent.max(0.0);
            if feature.is_polygon() {
                feature.height = extent;
            } else {
                feature.width = extent;
            }
        }
        if let Some(name) = &self.name {
            feature.meta.name = Some(name.clone());
        }
        if let Some(description) = &self.description {
            feature.meta.description = Some(description.clone());
        }
    }
}

/// Derived figures for one feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureReport {
    pub id: FeatureId,
    pub feature_type: String,
    pub geometry: &'static str,
    pub vertices: usize,
    pub name: Option<String>,
    pub metrics: Option<Metrics>,
    pub cost: Option<CostEstimate>,
}

pub struct Editor<A, P> {
    scene: Rc<Scene>,
    engine: CommandEngine<A>,
    mode: Rc<Cell<EditorMode>>,
    drawing: DrawingState,
    rotation: RotationController,
    prompt: P,
    panel: Box<dyn ControlPanel>,
    observer: Box<dyn EditorObserver>,
    defaults: DrawingSettings,
}

impl<A, P> Editor<A, P>
where
    A: FeatureApi + CatalogApi,
    P: DescriptionPrompt,
{
    pub fn new(settings: &EditorSettings, surface: Box<dyn Surface>, api: A, prompt: P) -> Self {
        let scene = Rc::new(Scene::new(surface, settings.highlight.clone()));
        let mode = Rc::new(Cell::new(EditorMode::Idle));
        Self {
            engine: CommandEngine::new(scene.clone(), api, settings.remote_failure),
            drawing: DrawingState::new(mode.clone()),
            rotation: RotationController::new(&settings.rotation),
            scene,
            mode,
            prompt,
            panel: Box::new(NoPanel),
            observer: Box::new(NullObserver),
            defaults: settings.drawing.clone(),
        }
    }

    pub fn with_panel(mut self, panel: impl ControlPanel + 'static) -> Self {
        self.panel = Box::new(panel);
        self
    }

    pub fn with_observer(mut self, observer: impl EditorObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    // ── State ─────────────────────────────────────────────────

    pub fn mode(&self) -> EditorMode {
        self.mode.get()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn api(&self) -> &A {
        self.engine.api()
    }

    pub fn selected(&self) -> Option<FeatureId> {
        self.scene.selected()
    }

    pub fn feature(&self, id: &str) -> Option<Feature> {
        self.scene.feature(id)
    }

    pub fn can_undo(&self) -> bool {
        self.engine.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.engine.can_redo()
    }

    pub fn history_counts(&self) -> (usize, usize) {
        (self.engine.undo_count(), self.engine.redo_count())
    }

    pub fn is_rotating(&self) -> bool {
        self.rotation.is_running()
    }

    pub fn rotation_ticks(&self) -> u64 {
        self.rotation.ticks()
    }

    pub fn drawing_points(&self) -> usize {
        self.drawing.point_count()
    }

    // ── Modes and pointer input ───────────────────────────────

    /// Enter a mode. Drawing artifacts are cleared; leaving `Edit` ends any
    /// rotation hold and persists it.
    pub async fn set_mode(&self, mode: EditorMode) -> Result<(), EditorError> {
        let persisted = if mode == EditorMode::Edit {
            Ok(())
        } else {
            self.halt_rotation().await
        };
        self.drawing.enter(&self.scene, mode);
        self.observer.mode_changed(mode);
        info!("Mode set to {mode:?}");
        persisted
    }

    /// Capture a point while drawing; otherwise pick a feature to select
    pub async fn pointer_click(&self, screen: DVec2) -> Result<(), EditorError> {
        if self.mode().is_drawing() {
            self.drawing.capture_point(&self.scene, screen);
            return Ok(());
        }
        match self.scene.pick_entity(screen) {
            Some(id) => self.select(&id).await,
            None => self.clear_selection().await,
        }
    }

    pub fn pointer_move(&self, screen: DVec2) {
        self.drawing.hover(&self.scene, screen);
    }

    /// Secondary button finishes the shape being drawn
    pub async fn secondary_click(&self, _screen: DVec2) -> Result<Option<FeatureId>, EditorError> {
        self.finish_drawing().await
    }

    pub async fn double_click(&self, _screen: DVec2) -> Result<Option<FeatureId>, EditorError> {
        self.finish_drawing().await
    }

    pub fn cancel_drawing(&self) {
        if self.mode().is_drawing() {
            self.drawing.cancel(&self.scene);
            self.observer.mode_changed(EditorMode::Idle);
        }
    }

    /// Turn the captured points into a feature and create it.
    ///
    /// Returns the id of the created feature, or `None` when nothing was
    /// created (not drawing, too few points, description cancelled).
    pub async fn finish_drawing(&self) -> Result<Option<FeatureId>, EditorError> {
        let shape = match self.drawing.complete(&self.scene) {
            Ok(Some(shape)) => shape,
            Ok(None) => return Ok(None),
            Err(EditorError::InsufficientPoints { required, .. }) => {
                self.observer.mode_changed(EditorMode::Idle);
                self.notify(Notice::error(format!(
                    "Not enough points: click at least {required} times"
                )));
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        self.observer.mode_changed(EditorMode::Idle);

        let Some(feature) = self.build_feature(shape).await else {
            self.notify(Notice::info("Drawing cancelled"));
            return Ok(None);
        };

        let id = self.reported(
            self.engine
                .execute_and_record(EditCommand::Create { feature })
                .await,
        )?;
        self.notify(Notice::success("Feature saved"));
        self.select(&id).await?;
        Ok(Some(id))
    }

    async fn build_feature(&self, shape: CompletedShape) -> Option<Feature> {
        let id = Uuid::new_v4().to_string();
        let selection = self.panel.active_feature_type();

        if shape.mode == EditorMode::DrawRoad {
            let width = self
                .panel
                .active_height_or_width(shape.mode)
                .unwrap_or(self.defaults.default_road_width);
            return Some(Feature {
                id,
                feature_type: FeatureType::Road,
                geometry: shape.geometry,
                height: 0.0,
                width: width.max(0.0),
                meta: FeatureMeta {
                    description: Some(DEFAULT_ROAD_DESCRIPTION.to_string()),
                    ..FeatureMeta::default()
                },
            });
        }

        let type_id = selection.as_ref().map(|s| s.type_id.clone());
        let example_source = selection
            .as_ref()
            .and_then(|s| s.label.clone())
            .or_else(|| {
                let catalog = self.scene.catalog();
                type_id
                    .as_deref()
                    .and_then(|t| catalog.get(t))
                    .map(|t| t.label_name.clone())
            })
            .unwrap_or_else(|| FALLBACK_EXAMPLE_SOURCE.to_string());
        let default_name = default_building_name(&id);

        let answer = self.prompt.request(&default_name, &example_source).await?;

        let height = self
            .panel
            .active_height_or_width(shape.mode)
            .unwrap_or(self.defaults.default_height);
        Some(Feature {
            id,
            feature_type: FeatureType::Building(type_id.clone().unwrap_or_default()),
            geometry: shape.geometry,
            height: height.max(0.0),
            width: 0.0,
            meta: FeatureMeta {
                name: Some(answer.name),
                description: Some(answer.description),
                type_id,
                color: selection.and_then(|s| s.color),
                ..FeatureMeta::default()
            },
        })
    }

    // ── Keyboard ──────────────────────────────────────────────

    pub async fn key_down(&self, input: &KeyInput) -> Result<(), EditorError> {
        let key = input.key.as_str();
        let result = match key {
            "Escape" => {
                self.cancel_drawing();
                Ok(())
            }
            "Enter" if self.mode().is_drawing() => self.finish_drawing().await.map(|_| ()),
            k if input.ctrl && k.eq_ignore_ascii_case("z") => {
                if input.shift {
                    self.redo().await.map(|_| ())
                } else {
                    self.undo().await.map(|_| ())
                }
            }
            k if input.ctrl && k.eq_ignore_ascii_case("y") => self.redo().await.map(|_| ()),
            _ => Ok(()),
        };
        self.rotation.press(key, &self.scene, &self.mode);
        result
    }

    /// Releasing a rotation key ends the hold and persists it once
    pub async fn key_up(&self, input: &KeyInput) -> Result<(), EditorError> {
        let persisted = match self.rotation.release(&input.key) {
            Some(before) => self.persist_local_edit(before).await,
            None => Ok(()),
        };
        self.rotation.resume(&self.scene, &self.mode);
        persisted
    }

    // ── Selection ─────────────────────────────────────────────

    pub async fn select(&self, id: &str) -> Result<(), EditorError> {
        if self.scene.is_selected(id) {
            return Ok(());
        }
        let persisted = self.halt_rotation().await;
        if self.scene.select(id)? {
            self.observer
                .selection_changed(self.scene.feature(id).as_ref());
        }
        persisted
    }

    pub async fn clear_selection(&self) -> Result<(), EditorError> {
        let persisted = self.halt_rotation().await;
        if self.scene.clear_selection().is_some() {
            self.observer.selection_changed(None);
        }
        persisted
    }

    // ── Edits ─────────────────────────────────────────────────

    /// Change attributes of the selected feature: applied locally, persisted
    /// once, recorded as one undo step. A failed save keeps the local change.
    pub async fn update_selected(&self, update: &FeatureUpdate) -> Result<(), EditorError> {
        let Some(id) = self.scene.selected() else {
            return Ok(());
        };
        // a hold in progress is saved as its own step before the edit
        let halted = self.halt_rotation().await;
        let updated = self.apply_update(&id, update).await;
        self.rotation.resume(&self.scene, &self.mode);
        halted.and(updated)
    }

    async fn apply_update(&self, id: &str, update: &FeatureUpdate) -> Result<(), EditorError> {
        let before = self
            .scene
            .feature(id)
            .ok_or_else(|| EditorError::UnknownFeature(id.to_string()))?;
        let mut after = before.clone();
        update.apply_to(&mut after, &self.scene.catalog());
        if after == before {
            return Ok(());
        }
        self.scene.upsert(after);
        self.persist_local_edit(before).await?;
        self.notify(Notice::success("Feature updated"));
        Ok(())
    }

    pub async fn delete_selected(&self) -> Result<Option<FeatureId>, EditorError> {
        let Some(id) = self.scene.selected() else {
            return Ok(None);
        };
        self.release_selection().await;
        let feature = self
            .scene
            .feature(&id)
            .ok_or_else(|| EditorError::UnknownFeature(id.clone()))?;
        self.reported(
            self.engine
                .execute_and_record(EditCommand::Delete { feature })
                .await,
        )?;
        self.notify(Notice::success("Feature deleted"));
        Ok(Some(id))
    }

    /// `Ok(false)` when there was nothing to undo
    pub async fn undo(&self) -> Result<bool, EditorError> {
        if self.engine.is_busy() {
            return Err(EditorError::StaleUndoRedo);
        }
        self.release_selection().await;
        let undone = self.reported(self.engine.undo().await)?;
        if let Some(kind) = undone {
            self.notify(Notice::success(format!("Undid {kind}")));
        }
        Ok(undone.is_some())
    }

    /// `Ok(false)` when there was nothing to redo
    pub async fn redo(&self) -> Result<bool, EditorError> {
        if self.engine.is_busy() {
            return Err(EditorError::StaleUndoRedo);
        }
        self.release_selection().await;
        let redone = self.reported(self.engine.redo().await)?;
        if let Some(kind) = redone {
            self.notify(Notice::success(format!("Redid {kind}")));
        }
        Ok(redone.is_some())
    }

    // ── Loading and reporting ─────────────────────────────────

    /// Fetch all persisted features into the scene
    pub async fn load_features(&self) -> Result<usize, EditorError> {
        let features = self.api().list().await.map_err(EditorError::Load)?;
        let count = features.len();
        for feature in features {
            self.scene.upsert(feature);
        }
        info!("Loaded {count} features");
        Ok(count)
    }

    /// Fetch the building-type catalog used for colors and costing
    pub async fn load_catalog(&self) -> Result<usize, EditorError> {
        let types = self
            .api()
            .building_types()
            .await
            .map_err(EditorError::Load)?;
        let count = types.len();
        self.scene.set_catalog(Catalog::new(types));
        info!("Loaded {count} building types");
        Ok(count)
    }

    pub fn report(&self, id: &str) -> Option<FeatureReport> {
        let feature = self.scene.feature(id)?;
        let metrics = Metrics::of(&feature);
        let cost = metrics.and_then(|m| {
            let catalog = self.scene.catalog();
            feature
                .feature_type
                .building_type_id()
                .and_then(|t| catalog.get(t))
                .map(|t| CostEstimate::compute(t, m.area_m2, m.volume_m3))
        });
        Some(FeatureReport {
            id: feature.id.clone(),
            feature_type: feature.feature_type.to_string(),
            geometry: feature.geometry.kind_name(),
            vertices: feature.geometry.distinct_vertices().len(),
            name: feature.meta.name.clone(),
            metrics,
            cost,
        })
    }

    // ── Internals ─────────────────────────────────────────────

    /// Clear the selection and carry on even if saving an ended hold failed.
    /// The failure is already recorded and reported.
    async fn release_selection(&self) {
        if let Err(e) = self.clear_selection().await {
            debug!("Continuing after failed rotation save: {e}");
        }
    }

    async fn halt_rotation(&self) -> Result<(), EditorError> {
        match self.rotation.halt() {
            Some(before) => self.persist_local_edit(before).await,
            None => Ok(()),
        }
    }

    /// Persist a change already applied to the scene as one update and record
    /// it. Nothing happens when the feature is unchanged or gone.
    async fn persist_local_edit(&self, before: Feature) -> Result<(), EditorError> {
        let Some(after) = self.scene.feature(&before.id) else {
            return Ok(());
        };
        if after == before {
            return Ok(());
        }
        let mut command = EditCommand::Update {
            id: before.id.clone(),
            before,
            after,
        };
        let persisted = self.engine.persist(&mut command).await;
        self.engine.record_already_applied(command);
        if let Err(e) = &persisted {
            warn!("Keeping local change: {e}");
            self.notify(Notice::error("Saving failed, change kept locally only"));
        }
        persisted
    }

    /// Surface a failed backend call to the user before handing it back
    fn reported<T>(&self, result: Result<T, EditorError>) -> Result<T, EditorError> {
        if let Err(e @ EditorError::RemoteRejected { .. }) = &result {
            self.notify(Notice::error(format!("Saving failed: {e}")));
        }
        result
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => warn!("{}", notice.message),
            NoticeLevel::Info | NoticeLevel::Success => info!("{}", notice.message),
        }
        self.observer.notice(&notice);
    }
}
