//! Undo and redo stacks.

use super::commands::EditCommand;

/// Command stacks (most recent last). Unbounded; history lives for one session.
#[derive(Debug, Default)]
pub struct CommandHistory {
    undo_stack: Vec<EditCommand>,
    redo_stack: Vec<EditCommand>,
}

impl CommandHistory {
    /// Record a new command. Invalidates everything that could be redone.
    pub fn push(&mut self, command: EditCommand) {
        self.redo_stack.clear();
        self.undo_stack.push(command);
    }

    pub fn pop_undo(&mut self) -> Option<EditCommand> {
        self.undo_stack.pop()
    }

    pub fn pop_redo(&mut self) -> Option<EditCommand> {
        self.redo_stack.pop()
    }

    /// Push to the redo stack (after an undo)
    pub fn push_redo(&mut self, command: EditCommand) {
        self.redo_stack.push(command);
    }

    /// Push to the undo stack without touching redo (after a redo)
    pub fn push_undo(&mut self, command: EditCommand) {
        self.undo_stack.push(command);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Follow an id swap through both stacks
    pub fn rekey(&mut self, old: &str, new: &str) {
        for command in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            command.rekey(old, new);
        }
    }
}
