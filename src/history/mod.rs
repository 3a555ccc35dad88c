//! Undo/redo history: reversible commands and the bounded stack that
//! replays them.

mod command;
mod stack;

pub use command::{Command, EditContext};
pub use stack::UndoStack;
