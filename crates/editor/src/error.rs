//! Error taxonomy of the editor and of its remote API.

use shared::FeatureId;
use thiserror::Error;

use crate::history::CommandKind;

/// Failure of a remote persistence call
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response payload: {0}")]
    Decode(String),
    /// Injected or non-HTTP failure (offline store, test doubles)
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum EditorError {
    /// No surface under the pointer. Swallowed by the drawing state machine.
    #[error("no surface under pointer")]
    PickFailure,
    #[error("not enough points: need at least {required}, got {got}")]
    InsufficientPoints { required: usize, got: usize },
    #[error("remote {operation} failed: {source}")]
    RemoteRejected {
        operation: CommandKind,
        #[source]
        source: ApiError,
    },
    #[error("another undo/redo is still in flight")]
    StaleUndoRedo,
    #[error("unknown feature {0}")]
    UnknownFeature(FeatureId),
    #[error("loading from backend failed: {0}")]
    Load(#[source] ApiError),
    #[error("settings: {0}")]
    Settings(String),
}

impl EditorError {
    pub(crate) fn remote(operation: CommandKind, source: ApiError) -> Self {
        EditorError::RemoteRejected { operation, source }
    }
}
