//! Drawing state machine: interaction mode, in-progress point buffer and the
//! preview artifacts shown while capturing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use shared::{Geometry, Position};
use tracing::{debug, warn};

use crate::error::EditorError;
use crate::geometry::{format_distance, midpoint, segment_length, world_to_geodetic};
use crate::scene::Scene;
use crate::surface::{EntityHandle, PreviewKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorMode {
    #[default]
    Idle,
    /// Polygon capture
    Draw,
    /// Road centerline capture
    DrawRoad,
    /// Selection and rotation, no point capture
    Edit,
}

impl EditorMode {
    pub fn is_drawing(self) -> bool {
        matches!(self, EditorMode::Draw | EditorMode::DrawRoad)
    }

    /// Vertices needed before a shape can be completed
    pub fn min_points(self) -> usize {
        match self {
            EditorMode::Draw => 3,
            EditorMode::DrawRoad => 2,
            EditorMode::Idle | EditorMode::Edit => 0,
        }
    }

    fn preview_kind(self) -> Option<PreviewKind> {
        match self {
            EditorMode::Draw => Some(PreviewKind::Polygon),
            EditorMode::DrawRoad => Some(PreviewKind::Line),
            EditorMode::Idle | EditorMode::Edit => None,
        }
    }
}

/// Captured geometry, converted to geodetic coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedShape {
    pub mode: EditorMode,
    pub geometry: Geometry,
}

#[derive(Default)]
struct Capture {
    points: Vec<DVec3>,
    preview: Option<EntityHandle>,
    /// Frozen labels of committed segments
    segment_labels: Vec<EntityHandle>,
    /// Label following the cursor
    live_label: Option<EntityHandle>,
}

pub struct DrawingState {
    mode: Rc<Cell<EditorMode>>,
    capture: RefCell<Capture>,
}

impl DrawingState {
    pub fn new(mode: Rc<Cell<EditorMode>>) -> Self {
        Self {
            mode,
            capture: RefCell::new(Capture::default()),
        }
    }

    pub fn mode(&self) -> EditorMode {
        self.mode.get()
    }

    pub fn point_count(&self) -> usize {
        self.capture.borrow().points.len()
    }

    /// Switch mode. Leftover preview artifacts of the previous mode are always
    /// removed first.
    pub fn enter(&self, scene: &Scene, mode: EditorMode) {
        self.cleanup(scene);
        let previous = self.mode.replace(mode);
        if let Some(kind) = mode.preview_kind() {
            let handle = scene.with_surface(|s| s.add_preview(kind, &[]));
            self.capture.borrow_mut().preview = Some(handle);
        }
        if previous != mode {
            debug!("Mode {previous:?} -> {mode:?}");
        }
    }

    /// Abort capture without side effects on the store
    pub fn cancel(&self, scene: &Scene) {
        if self.mode().is_drawing() {
            self.enter(scene, EditorMode::Idle);
        }
    }

    /// Append the picked point under `screen`. A miss is ignored.
    pub fn capture_point(&self, scene: &Scene, screen: DVec2) -> bool {
        if !self.mode().is_drawing() {
            return false;
        }
        let point = match pick(scene, screen) {
            Ok(point) => point,
            Err(e) => {
                debug!("Ignoring click at {screen}: {e}");
                return false;
            }
        };

        let mut capture = self.capture.borrow_mut();
        if let Some(&last) = capture.points.last() {
            let (anchor, text) = segment_label(last, point);
            let handle = match capture.live_label.take() {
                Some(handle) => {
                    scene.with_surface(|s| s.update_label(handle, anchor, &text));
                    handle
                }
                None => scene.with_surface(|s| s.add_label(anchor, &text)),
            };
            capture.segment_labels.push(handle);
        }
        capture.points.push(point);
        if let Some(preview) = capture.preview {
            scene.with_surface(|s| s.update_preview(preview, &capture.points));
        }
        debug!("Captured point {}", capture.points.len());
        true
    }

    /// Live feedback: preview through the cursor and length of the open segment
    pub fn hover(&self, scene: &Scene, screen: DVec2) {
        if !self.mode().is_drawing() {
            return;
        }
        let Ok(cursor) = pick(scene, screen) else {
            return;
        };

        let mut capture = self.capture.borrow_mut();
        if let Some(preview) = capture.preview {
            let mut points = capture.points.clone();
            points.push(cursor);
            scene.with_surface(|s| s.update_preview(preview, &points));
        }
        if let Some(&last) = capture.points.last() {
            let (anchor, text) = segment_label(last, cursor);
            let live = capture.live_label;
            match live {
                Some(handle) => scene.with_surface(|s| s.update_label(handle, anchor, &text)),
                None => {
                    let handle = scene.with_surface(|s| s.add_label(anchor, &text));
                    capture.live_label = Some(handle);
                }
            }
        }
    }

    /// Finish capture and return to `Idle`.
    ///
    /// `Ok(None)` when not drawing. Too few points is an `InsufficientPoints` error;
    /// the buffer is discarded either way.
    pub fn complete(&self, scene: &Scene) -> Result<Option<CompletedShape>, EditorError> {
        let mode = self.mode();
        if !mode.is_drawing() {
            return Ok(None);
        }
        let points = std::mem::take(&mut self.capture.borrow_mut().points);
        self.enter(scene, EditorMode::Idle);

        let required = mode.min_points();
        if points.len() < required {
            warn!("Cannot finish {mode:?} with {} points", points.len());
            return Err(EditorError::InsufficientPoints {
                required,
                got: points.len(),
            });
        }

        let positions: Vec<Position> = points
            .iter()
            .map(|p| world_to_geodetic(*p).to_position())
            .collect();
        let geometry = match mode {
            EditorMode::Draw => Geometry::closed_polygon(positions),
            _ => Geometry::line(positions),
        };
        Ok(Some(CompletedShape { mode, geometry }))
    }

    fn cleanup(&self, scene: &Scene) {
        let mut capture = self.capture.borrow_mut();
        let mut handles: Vec<EntityHandle> = capture.segment_labels.drain(..).collect();
        handles.extend(capture.live_label.take());
        handles.extend(capture.preview.take());
        capture.points.clear();
        drop(capture);

        if !handles.is_empty() {
            scene.with_surface(|s| {
                for handle in handles {
                    s.remove_entity(handle);
                }
            });
        }
    }
}

fn pick(scene: &Scene, screen: DVec2) -> Result<DVec3, EditorError> {
    scene
        .pick_surface_point(screen)
        .ok_or(EditorError::PickFailure)
}

fn segment_label(a: DVec3, b: DVec3) -> (DVec3, String) {
    (midpoint(a, b), format_distance(segment_length(a, b)))
}
