//! Headless test harness: recording surface, scripted backend, scripted
//! prompt and panel, and an editor wired to all of them.
//!
//! Screen coordinates map linearly onto lon/lat (`PIXEL_DEGREES` per pixel);
//! negative `x` is off-globe and never picks.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use glam::{DVec2, DVec3};
use shared::{BuildingType, Feature, FeatureId, Position};

use crate::api::{CatalogApi, FeatureApi};
use crate::collaborators::{
    CatalogSelection, ControlPanel, Description, DescriptionPrompt, EditorObserver, Notice,
};
use crate::drawing::EditorMode;
use crate::editor::Editor;
use crate::error::{ApiError, EditorError};
use crate::geometry::{geodetic_to_world, world_to_geodetic};
use crate::scene::{EntityStyle, FeatureStore};
use crate::settings::EditorSettings;
use crate::surface::{EntityHandle, PreviewKind, Surface};

/// Degrees of lon/lat per screen pixel
pub const PIXEL_DEGREES: f64 = 1e-5;

/// Screen position that picks the given lon/lat
pub fn screen_at(lon: f64, lat: f64) -> DVec2 {
    DVec2::new(lon / PIXEL_DEGREES, lat / PIXEL_DEGREES)
}

fn screen_to_position(screen: DVec2) -> Option<Position> {
    (screen.x >= 0.0).then(|| Position::new(screen.x * PIXEL_DEGREES, screen.y * PIXEL_DEGREES))
}

// ── Surface ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    SyncFeature { id: FeatureId, style: EntityStyle },
    RemoveFeature(FeatureId),
    SetStyle { id: FeatureId, style: EntityStyle },
    AddPreview(EntityHandle, PreviewKind),
    UpdatePreview(EntityHandle, usize),
    AddLabel(EntityHandle, String),
    UpdateLabel(EntityHandle, String),
    RemoveEntity(EntityHandle),
}

/// Everything the surface was asked to do, plus the live entity table
#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub events: Vec<SurfaceEvent>,
    pub features: HashMap<FeatureId, (Feature, EntityStyle)>,
    pub previews: BTreeMap<EntityHandle, Vec<DVec3>>,
    pub labels: BTreeMap<EntityHandle, (DVec3, String)>,
    next_handle: u64,
}

impl SurfaceLog {
    pub fn style_of(&self, id: &str) -> Option<&EntityStyle> {
        self.features.get(id).map(|(_, style)| style)
    }

    /// Preview shapes and labels still on screen
    pub fn ephemeral_count(&self) -> usize {
        self.previews.len() + self.labels.len()
    }

    pub fn sync_count(&self, id: &str) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::SyncFeature { id: synced, .. } if synced == id))
            .count()
    }

    fn handle(&mut self) -> EntityHandle {
        self.next_handle += 1;
        EntityHandle(self.next_handle)
    }
}

/// Surface that records calls into a shared [`SurfaceLog`]
pub struct RecordingSurface {
    log: Rc<RefCell<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn new() -> (Self, Rc<RefCell<SurfaceLog>>) {
        let log = Rc::new(RefCell::new(SurfaceLog::default()));
        (Self { log: log.clone() }, log)
    }
}

impl Surface for RecordingSurface {
    fn pick_surface_point(&self, screen: DVec2) -> Option<DVec3> {
        screen_to_position(screen).map(|p| geodetic_to_world(p.lon, p.lat, 0.0))
    }

    /// First feature (by id) whose bounding box contains the point
    fn pick_entity(&self, screen: DVec2) -> Option<String> {
        let p = screen_to_position(screen)?;
        let log = self.log.borrow();
        let mut hits: Vec<&String> = log
            .features
            .iter()
            .filter(|(_, (feature, _))| {
                let v = feature.geometry.vertices();
                let (min_lon, max_lon) = v
                    .iter()
                    .fold((f64::MAX, f64::MIN), |(lo, hi), q| (lo.min(q.lon), hi.max(q.lon)));
                let (min_lat, max_lat) = v
                    .iter()
                    .fold((f64::MAX, f64::MIN), |(lo, hi), q| (lo.min(q.lat), hi.max(q.lat)));
                (min_lon..=max_lon).contains(&p.lon) && (min_lat..=max_lat).contains(&p.lat)
            })
            .map(|(id, _)| id)
            .collect();
        hits.sort();
        hits.first().map(|id| id.to_string())
    }

    fn add_preview(&mut self, kind: PreviewKind, points: &[DVec3]) -> EntityHandle {
        let mut log = self.log.borrow_mut();
        let handle = log.handle();
        log.previews.insert(handle, points.to_vec());
        log.events.push(SurfaceEvent::AddPreview(handle, kind));
        handle
    }

    fn update_preview(&mut self, handle: EntityHandle, points: &[DVec3]) {
        let mut log = self.log.borrow_mut();
        log.previews.insert(handle, points.to_vec());
        log.events.push(SurfaceEvent::UpdatePreview(handle, points.len()));
    }

    fn add_label(&mut self, position: DVec3, text: &str) -> EntityHandle {
        let mut log = self.log.borrow_mut();
        let handle = log.handle();
        log.labels.insert(handle, (position, text.to_string()));
        log.events.push(SurfaceEvent::AddLabel(handle, text.to_string()));
        handle
    }

    fn update_label(&mut self, handle: EntityHandle, position: DVec3, text: &str) {
        let mut log = self.log.borrow_mut();
        log.labels.insert(handle, (position, text.to_string()));
        log.events.push(SurfaceEvent::UpdateLabel(handle, text.to_string()));
    }

    fn remove_entity(&mut self, handle: EntityHandle) {
        let mut log = self.log.borrow_mut();
        log.previews.remove(&handle);
        log.labels.remove(&handle);
        log.events.push(SurfaceEvent::RemoveEntity(handle));
    }

    fn sync_feature(&mut self, feature: &Feature, style: &EntityStyle) {
        let mut log = self.log.borrow_mut();
        log.features
            .insert(feature.id.clone(), (feature.clone(), style.clone()));
        log.events.push(SurfaceEvent::SyncFeature {
            id: feature.id.clone(),
            style: style.clone(),
        });
    }

    fn remove_feature(&mut self, id: &str) {
        let mut log = self.log.borrow_mut();
        log.features.remove(id);
        log.events.push(SurfaceEvent::RemoveFeature(id.to_string()));
    }

    fn set_entity_style(&mut self, id: &str, style: &EntityStyle) {
        let mut log = self.log.borrow_mut();
        if let Some(entry) = log.features.get_mut(id) {
            entry.1 = style.clone();
        }
        log.events.push(SurfaceEvent::SetStyle {
            id: id.to_string(),
            style: style.clone(),
        });
    }
}

// ── Backend ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    List,
    Create(Feature),
    Update(FeatureId, Feature),
    Delete(FeatureId, bool),
    BuildingTypes,
}

/// Backend double: records calls, can fail on demand, can assign permanent
/// ids, can delay responses.
#[derive(Default)]
pub struct ScriptedApi {
    calls: RefCell<Vec<ApiCall>>,
    remote: RefCell<BTreeMap<FeatureId, Feature>>,
    failures: Cell<usize>,
    id_prefix: Option<String>,
    next_id: Cell<u64>,
    latency: Cell<Option<Duration>>,
    catalog: Vec<BuildingType>,
}

impl ScriptedApi {
    /// Keeps the ids it is given
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers creates with `<prefix>-1`, `<prefix>-2`, ...
    pub fn assigning_ids(prefix: &str) -> Self {
        Self {
            id_prefix: Some(prefix.to_string()),
            ..Self::default()
        }
    }

    pub fn with_catalog(mut self, catalog: Vec<BuildingType>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Pre-populate the remote store
    pub fn seed(&self, features: impl IntoIterator<Item = Feature>) {
        let mut remote = self.remote.borrow_mut();
        for feature in features {
            remote.insert(feature.id.clone(), feature);
        }
    }

    /// Reject the next `n` calls
    pub fn fail_next(&self, n: usize) {
        self.failures.set(n);
    }

    /// Delay every response (tokio time; pause it in tests)
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.latency.set(latency);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn updates(&self) -> Vec<(FeatureId, Feature)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                ApiCall::Update(id, f) => Some((id.clone(), f.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn remote(&self) -> BTreeMap<FeatureId, Feature> {
        self.remote.borrow().clone()
    }

    async fn enter(&self, call: ApiCall) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(call);
        let fail = self.failures.get() > 0;
        if fail {
            self.failures.set(self.failures.get() - 1);
        }
        if let Some(latency) = self.latency.get() {
            tokio::time::sleep(latency).await;
        }
        if fail {
            return Err(ApiError::Rejected("injected failure".to_string()));
        }
        Ok(())
    }
}

impl FeatureApi for ScriptedApi {
    async fn list(&self) -> Result<Vec<Feature>, ApiError> {
        self.enter(ApiCall::List).await?;
        Ok(self.remote.borrow().values().cloned().collect())
    }

    async fn create(&self, feature: &Feature) -> Result<Feature, ApiError> {
        self.enter(ApiCall::Create(feature.clone())).await?;
        let mut created = feature.clone();
        if let Some(prefix) = &self.id_prefix {
            self.next_id.set(self.next_id.get() + 1);
            created.id = format!("{prefix}-{}", self.next_id.get());
        }
        self.remote
            .borrow_mut()
            .insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, feature: &Feature) -> Result<Feature, ApiError> {
        self.enter(ApiCall::Update(id.to_string(), feature.clone()))
            .await?;
        self.remote
            .borrow_mut()
            .insert(id.to_string(), feature.clone());
        Ok(feature.clone())
    }

    async fn delete(&self, id: &str, is_polygon: bool) -> Result<(), ApiError> {
        self.enter(ApiCall::Delete(id.to_string(), is_polygon))
            .await?;
        self.remote.borrow_mut().remove(id);
        Ok(())
    }
}

impl CatalogApi for ScriptedApi {
    async fn building_types(&self) -> Result<Vec<BuildingType>, ApiError> {
        self.enter(ApiCall::BuildingTypes).await?;
        Ok(self.catalog.clone())
    }
}

// ── Shell collaborators ─────────────────────────────────────────

#[derive(Default)]
struct PromptState {
    answers: VecDeque<Option<Description>>,
    requests: Vec<(String, String)>,
}

/// Prompt with queued answers; accepts the default name when the queue is empty.
/// Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedPrompt {
    state: Rc<RefCell<PromptState>>,
}

impl ScriptedPrompt {
    pub fn answer_next(&self, name: &str, description: &str) {
        self.state.borrow_mut().answers.push_back(Some(Description {
            name: name.to_string(),
            description: description.to_string(),
        }));
    }

    pub fn cancel_next(&self) {
        self.state.borrow_mut().answers.push_back(None);
    }

    /// `(default_name, example_source)` of every request so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.state.borrow().requests.clone()
    }
}

impl DescriptionPrompt for ScriptedPrompt {
    async fn request(&self, default_name: &str, example_source: &str) -> Option<Description> {
        let mut state = self.state.borrow_mut();
        state
            .requests
            .push((default_name.to_string(), example_source.to_string()));
        state.answers.pop_front().unwrap_or_else(|| {
            Some(Description {
                name: default_name.to_string(),
                description: shared::wire::DEFAULT_BUILDING_DESCRIPTION.to_string(),
            })
        })
    }
}

#[derive(Default)]
struct PanelState {
    feature_type: Option<CatalogSelection>,
    value: Option<f64>,
}

/// Control panel whose values tests set directly. Clones share state.
#[derive(Clone, Default)]
pub struct StaticPanel {
    state: Rc<RefCell<PanelState>>,
}

impl StaticPanel {
    pub fn set_type(&self, selection: Option<CatalogSelection>) {
        self.state.borrow_mut().feature_type = selection;
    }

    pub fn set_value(&self, value: Option<f64>) {
        self.state.borrow_mut().value = value;
    }
}

impl ControlPanel for StaticPanel {
    fn active_feature_type(&self) -> Option<CatalogSelection> {
        self.state.borrow().feature_type.clone()
    }

    fn active_height_or_width(&self, _mode: EditorMode) -> Option<f64> {
        self.state.borrow().value
    }
}

#[derive(Debug, Default)]
pub struct ObserverLog {
    pub notices: Vec<Notice>,
    pub selections: Vec<Option<FeatureId>>,
    pub modes: Vec<EditorMode>,
}

/// Observer that records into a shared [`ObserverLog`]. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    log: Rc<RefCell<ObserverLog>>,
}

impl RecordingObserver {
    pub fn log(&self) -> Rc<RefCell<ObserverLog>> {
        self.log.clone()
    }
}

impl EditorObserver for RecordingObserver {
    fn notice(&self, notice: &Notice) {
        self.log.borrow_mut().notices.push(notice.clone());
    }

    fn selection_changed(&self, feature: Option<&Feature>) {
        self.log
            .borrow_mut()
            .selections
            .push(feature.map(|f| f.id.clone()));
    }

    fn mode_changed(&self, mode: EditorMode) {
        self.log.borrow_mut().modes.push(mode);
    }
}

// ── Harness ─────────────────────────────────────────────────────

/// Editor wired to headless collaborators, with handles to inspect them
pub struct TestHarness {
    pub editor: Editor<ScriptedApi, ScriptedPrompt>,
    pub surface: Rc<RefCell<SurfaceLog>>,
    pub prompt: ScriptedPrompt,
    pub panel: StaticPanel,
    pub observer: Rc<RefCell<ObserverLog>>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_api(ScriptedApi::new(), &EditorSettings::default())
    }

    pub fn with_api(api: ScriptedApi, settings: &EditorSettings) -> Self {
        let (surface, surface_log) = RecordingSurface::new();
        let prompt = ScriptedPrompt::default();
        let panel = StaticPanel::default();
        let observer = RecordingObserver::default();
        let observer_log = observer.log();
        let editor = Editor::new(settings, Box::new(surface), api, prompt.clone())
            .with_panel(panel.clone())
            .with_observer(observer);
        Self {
            editor,
            surface: surface_log,
            prompt,
            panel,
            observer: observer_log,
        }
    }

    pub fn api(&self) -> &ScriptedApi {
        self.editor.api()
    }

    /// Deep copy of the feature store
    pub fn store(&self) -> FeatureStore {
        self.editor.scene().store().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.observer.borrow().notices.clone()
    }

    /// Click each lon/lat in polygon mode, then finish
    pub async fn draw_polygon(&self, lonlats: &[[f64; 2]]) -> Result<Option<FeatureId>, EditorError> {
        self.draw(EditorMode::Draw, lonlats).await
    }

    /// Click each lon/lat in road mode, then finish
    pub async fn draw_road(&self, lonlats: &[[f64; 2]]) -> Result<Option<FeatureId>, EditorError> {
        self.draw(EditorMode::DrawRoad, lonlats).await
    }

    async fn draw(
        &self,
        mode: EditorMode,
        lonlats: &[[f64; 2]],
    ) -> Result<Option<FeatureId>, EditorError> {
        self.editor.set_mode(mode).await?;
        for [lon, lat] in lonlats {
            self.editor.pointer_click(screen_at(*lon, *lat)).await?;
        }
        self.editor.finish_drawing().await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Lon/lat of a world point, rounded for comparisons
pub fn lonlat(world: DVec3) -> [f64; 2] {
    let g = world_to_geodetic(world);
    [(g.lon * 1e9).round() / 1e9, (g.lat * 1e9).round() / 1e9]
}
