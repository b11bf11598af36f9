//! Reversible edit commands.

use std::fmt;

use serde::Serialize;
use shared::{Feature, FeatureId};

/// A reversible mutation. Snapshots are owned deep copies taken when the
/// command is built.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    Create { feature: Feature },
    Update { id: FeatureId, before: Feature, after: Feature },
    Delete { feature: Feature },
}

/// Kind of mutation, for messages and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandKind::Create => "create",
            CommandKind::Update => "update",
            CommandKind::Delete => "delete",
        })
    }
}

impl EditCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            EditCommand::Create { .. } => CommandKind::Create,
            EditCommand::Update { .. } => CommandKind::Update,
            EditCommand::Delete { .. } => CommandKind::Delete,
        }
    }

    pub fn feature_id(&self) -> &str {
        match self {
            EditCommand::Create { feature } | EditCommand::Delete { feature } => &feature.id,
            EditCommand::Update { id, .. } => id,
        }
    }

    /// The command that undoes this one
    pub fn inverse(&self) -> EditCommand {
        match self {
            EditCommand::Create { feature } => EditCommand::Delete {
                feature: feature.clone(),
            },
            EditCommand::Update { id, before, after } => EditCommand::Update {
                id: id.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            EditCommand::Delete { feature } => EditCommand::Create {
                feature: feature.clone(),
            },
        }
    }

    /// Point every reference to `old` at `new`
    pub fn rekey(&mut self, old: &str, new: &str) {
        match self {
            EditCommand::Create { feature } | EditCommand::Delete { feature } => {
                if feature.id == old {
                    feature.id = new.to_string();
                }
            }
            EditCommand::Update { id, before, after } => {
                if id == old {
                    *id = new.to_string();
                    before.id = new.to_string();
                    after.id = new.to_string();
                }
            }
        }
    }
}
