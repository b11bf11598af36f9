//! Undo/redo over create, update and delete.
//!
//! ## Module Structure
//!
//! - [`commands`] - EditCommand enum and its inverse
//! - [`command_history`] - undo and redo stacks
//! - [`engine`] - CommandEngine: local apply, remote persistence, id swaps

mod command_history;
mod commands;
mod engine;

#[cfg(test)]
mod tests;

pub use command_history::CommandHistory;
pub use commands::{CommandKind, EditCommand};
pub use engine::{CommandEngine, RemoteFailurePolicy};
