//! Hold-to-rotate: a fixed-period local task rotates the selected feature
//! while exactly one direction key is held.
//!
//! Ticks touch only the scene. The remote store sees a single update per hold,
//! sent by the editor once the hold ends.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;

use shared::Feature;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::drawing::EditorMode;
use crate::geometry::rotate_about_centroid;
use crate::scene::Scene;
use crate::settings::RotationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Clockwise (negative angle)
    Left,
    /// Counter-clockwise (positive angle)
    Right,
}

impl Direction {
    pub fn of_key(key: &str) -> Option<Self> {
        match key {
            "a" | "A" | "ArrowLeft" => Some(Direction::Left),
            "d" | "D" | "ArrowRight" => Some(Direction::Right),
            _ => None,
        }
    }

    fn sign(self) -> f64 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

pub fn is_rotation_key(key: &str) -> bool {
    Direction::of_key(key).is_some()
}

/// Aborts the tick task when dropped
struct TickTask(JoinHandle<()>);

impl TickTask {
    fn is_running(&self) -> bool {
        !self.0.is_finished()
    }
}

impl Drop for TickTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct RotationController {
    held: RefCell<BTreeSet<String>>,
    task: RefCell<Option<TickTask>>,
    direction: Cell<Option<Direction>>,
    /// Feature as it was before the current hold started
    pending: RefCell<Option<Feature>>,
    step_degrees: f64,
    period: Duration,
    ticks: Rc<Cell<u64>>,
}

impl RotationController {
    pub fn new(settings: &RotationSettings) -> Self {
        Self {
            held: RefCell::new(BTreeSet::new()),
            task: RefCell::new(None),
            direction: Cell::new(None),
            pending: RefCell::new(None),
            step_degrees: settings.step_degrees,
            period: Duration::from_millis(settings.period_ms.max(1)),
            ticks: Rc::new(Cell::new(0)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .borrow()
            .as_ref()
            .map(TickTask::is_running)
            .unwrap_or(false)
    }

    /// Rotation steps applied since the controller was created
    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }

    /// Key pressed: start, redirect or stop the loop. Must run inside a `LocalSet`.
    pub fn press(&self, key: &str, scene: &Rc<Scene>, mode: &Rc<Cell<EditorMode>>) {
        self.held.borrow_mut().insert(key.to_string());
        self.update(scene, mode);
    }

    /// Key released. For a rotation key the loop stops and the pre-hold
    /// snapshot is handed back for persistence.
    pub fn release(&self, key: &str) -> Option<Feature> {
        self.held.borrow_mut().remove(key);
        if !is_rotation_key(key) {
            return None;
        }
        self.halt()
    }

    /// Re-evaluate held keys, e.g. after a release while the opposite key is still down
    pub fn resume(&self, scene: &Rc<Scene>, mode: &Rc<Cell<EditorMode>>) {
        self.update(scene, mode);
    }

    /// Stop the loop and take the pre-hold snapshot, if any
    pub fn halt(&self) -> Option<Feature> {
        self.stop();
        self.pending.borrow_mut().take()
    }

    /// Stop the loop, keeping the snapshot
    fn stop(&self) {
        if self.task.borrow_mut().take().is_some() {
            debug!("Rotation stopped after {} ticks total", self.ticks.get());
        }
        self.direction.set(None);
    }

    fn update(&self, scene: &Rc<Scene>, mode: &Rc<Cell<EditorMode>>) {
        let wanted = {
            let held = self.held.borrow();
            let left = held.iter().any(|k| Direction::of_key(k) == Some(Direction::Left));
            let right = held.iter().any(|k| Direction::of_key(k) == Some(Direction::Right));
            match (left, right) {
                (true, false) => Some(Direction::Left),
                (false, true) => Some(Direction::Right),
                // nothing held, or opposing keys cancel out
                _ => None,
            }
        };

        match wanted {
            None => self.stop(),
            Some(direction) if self.direction.get() == Some(direction) && self.is_running() => {}
            Some(direction) => {
                self.stop();
                self.start(direction, scene, mode);
            }
        }
    }

    fn start(&self, direction: Direction, scene: &Rc<Scene>, mode: &Rc<Cell<EditorMode>>) {
        if mode.get() != EditorMode::Edit {
            return;
        }
        let Some(target) = scene.selected() else {
            return;
        };

        {
            let mut pending = self.pending.borrow_mut();
            if pending.is_none() {
                *pending = scene.feature(&target);
            }
        }

        let degrees = direction.sign() * self.step_degrees;
        let handle = tokio::task::spawn_local(rotate_while_held(
            scene.clone(),
            mode.clone(),
            target.clone(),
            degrees,
            self.period,
            self.ticks.clone(),
        ));
        *self.task.borrow_mut() = Some(TickTask(handle));
        self.direction.set(Some(direction));
        info!("Rotating {target} {direction:?}");
    }
}

async fn rotate_while_held(
    scene: Rc<Scene>,
    mode: Rc<Cell<EditorMode>>,
    target: String,
    degrees: f64,
    period: Duration,
    ticks: Rc<Cell<u64>>,
) {
    let mut interval = tokio::time::interval(period);
    // the first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        if mode.get() != EditorMode::Edit || !scene.is_selected(&target) {
            debug!("Rotation of {target} aborted: selection or mode changed");
            break;
        }
        if !rotate_in_place(&scene, &target, degrees) {
            break;
        }
        ticks.set(ticks.get() + 1);
    }
}

/// Rotate a stored feature about its centroid and resync its entity.
/// No remote call.
pub fn rotate_in_place(scene: &Scene, id: &str, degrees: f64) -> bool {
    let Some(mut feature) = scene.feature(id) else {
        return false;
    };
    feature.geometry = rotate_about_centroid(&feature.geometry, degrees);
    scene.upsert(feature);
    true
}
