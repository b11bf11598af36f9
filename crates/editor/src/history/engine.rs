//! Applies commands to the scene and the remote store, and keeps the stacks.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use shared::FeatureId;
use tracing::{debug, info, warn};

use super::command_history::CommandHistory;
use super::commands::{CommandKind, EditCommand};
use crate::api::FeatureApi;
use crate::error::{ApiError, EditorError};
use crate::scene::Scene;

/// What happens to local state when the remote half of a command fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteFailurePolicy {
    /// Restore the pre-command local state. A failed execute records nothing;
    /// a failed undo/redo leaves the command on its original stack.
    #[default]
    RollBack,
    /// Local state stands and undo/redo bookkeeping still moves the command.
    KeepLocal,
}

/// Marks an undo/redo in flight; cleared on drop so a failed or dropped
/// future never wedges the engine.
struct InFlight<'a>(&'a Cell<bool>);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Result<Self, EditorError> {
        if flag.replace(true) {
            return Err(EditorError::StaleUndoRedo);
        }
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct CommandEngine<A> {
    scene: Rc<Scene>,
    api: A,
    history: RefCell<CommandHistory>,
    in_flight: Cell<bool>,
    policy: RemoteFailurePolicy,
}

impl<A: FeatureApi> CommandEngine<A> {
    pub fn new(scene: Rc<Scene>, api: A, policy: RemoteFailurePolicy) -> Self {
        Self {
            scene,
            api,
            history: RefCell::new(CommandHistory::default()),
            in_flight: Cell::new(false),
            policy,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> RemoteFailurePolicy {
        self.policy
    }

    pub fn can_undo(&self) -> bool {
        self.history.borrow().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.borrow().can_redo()
    }

    pub fn undo_count(&self) -> usize {
        self.history.borrow().undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.history.borrow().redo_count()
    }

    /// An undo or redo is awaiting the backend
    pub fn is_busy(&self) -> bool {
        self.in_flight.get()
    }

    /// Apply locally, persist remotely, then record.
    ///
    /// Returns the id of the affected feature after any id swap.
    pub async fn execute_and_record(&self, mut command: EditCommand) -> Result<FeatureId, EditorError> {
        self.apply(&mut command).await?;
        let id = command.feature_id().to_string();
        debug!("Recorded {} of {id}", command.kind());
        self.history.borrow_mut().push(command);
        Ok(id)
    }

    /// Record a command whose effects the caller has already performed
    pub fn record_already_applied(&self, command: EditCommand) {
        debug!("Recorded applied {} of {}", command.kind(), command.feature_id());
        self.history.borrow_mut().push(command);
    }

    /// Send the remote half of a command whose local half is already applied.
    /// Local state is left alone whatever the outcome.
    pub async fn persist(&self, command: &mut EditCommand) -> Result<(), EditorError> {
        let kind = command.kind();
        self.remote(command)
            .await
            .map_err(|e| EditorError::remote(kind, e))
    }

    /// Undo the most recent command. `Ok(None)` when there is nothing to undo.
    pub async fn undo(&self) -> Result<Option<CommandKind>, EditorError> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let popped = self.history.borrow_mut().pop_undo();
        let Some(command) = popped else {
            debug!("Nothing to undo");
            return Ok(None);
        };
        let kind = command.kind();
        let mut step = command.inverse();

        match self.apply(&mut step).await {
            Ok(()) => {
                info!("Undid {kind} of {}", step.feature_id());
                self.history.borrow_mut().push_redo(step.inverse());
                Ok(Some(kind))
            }
            Err(e) => {
                match self.policy {
                    RemoteFailurePolicy::RollBack => self.history.borrow_mut().push_undo(command),
                    RemoteFailurePolicy::KeepLocal => {
                        self.history.borrow_mut().push_redo(step.inverse())
                    }
                }
                Err(e)
            }
        }
    }

    /// Re-apply the most recently undone command
    pub async fn redo(&self) -> Result<Option<CommandKind>, EditorError> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let popped = self.history.borrow_mut().pop_redo();
        let Some(command) = popped else {
            debug!("Nothing to redo");
            return Ok(None);
        };
        let kind = command.kind();
        let mut step = command.clone();

        match self.apply(&mut step).await {
            Ok(()) => {
                info!("Redid {kind} of {}", step.feature_id());
                self.history.borrow_mut().push_undo(step);
                Ok(Some(kind))
            }
            Err(e) => {
                match self.policy {
                    RemoteFailurePolicy::RollBack => self.history.borrow_mut().push_redo(command),
                    RemoteFailurePolicy::KeepLocal => self.history.borrow_mut().push_undo(step),
                }
                Err(e)
            }
        }
    }

    /// Local half first (store, then surface), remote half second
    async fn apply(&self, command: &mut EditCommand) -> Result<(), EditorError> {
        let kind = command.kind();
        self.apply_local(command);

        if let Err(e) = self.remote(command).await {
            warn!("Remote {kind} of {} failed: {e}", command.feature_id());
            if self.policy == RemoteFailurePolicy::RollBack {
                self.apply_local(&command.inverse());
                debug!("Rolled back local {kind} of {}", command.feature_id());
            }
            return Err(EditorError::remote(kind, e));
        }
        Ok(())
    }

    fn apply_local(&self, command: &EditCommand) {
        match command {
            EditCommand::Create { feature } => self.scene.upsert(feature.clone()),
            EditCommand::Update { after, .. } => self.scene.upsert(after.clone()),
            EditCommand::Delete { feature } => {
                self.scene.remove(&feature.id);
            }
        }
    }

    async fn remote(&self, command: &mut EditCommand) -> Result<(), ApiError> {
        match command {
            EditCommand::Create { feature } => {
                let created = self.api.create(feature).await?;
                if !created.id.is_empty() && created.id != feature.id {
                    let old = std::mem::replace(&mut feature.id, created.id.clone());
                    self.swap_id(&old, &created.id);
                }
            }
            EditCommand::Update { id, after, .. } => {
                self.api.update(id.as_str(), after).await?;
            }
            EditCommand::Delete { feature } => {
                self.api.delete(&feature.id, feature.is_polygon()).await?;
            }
        }
        Ok(())
    }

    /// Temporary id to permanent id, everywhere, before anything else runs
    fn swap_id(&self, old: &str, new: &str) {
        self.scene.rekey(old, new);
        self.history.borrow_mut().rekey(old, new);
        info!("Backend assigned {new} to {old}");
    }
}
