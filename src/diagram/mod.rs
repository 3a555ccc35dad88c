//! One open project: the main scene graph, its undo history, canvas
//! settings and function registry, glued together behind gesture-level
//! operations.

mod alignment;
mod edit;

pub use alignment::{AlignmentRule, StackRule};

use crate::canvas::CanvasSettings;
use crate::functions::UserFunctions;
use crate::geometry::Point;
use crate::history::{Command, EditContext, UndoStack};
use crate::object::{IdAllocator, Object, ObjectType};
use crate::scene::{Proxy, Scene, MAIN_SCENE};

#[derive(Debug)]
pub struct Diagram {
    scene: Scene,
    stack: UndoStack,
    settings: CanvasSettings,
    functions: UserFunctions,
    ids: IdAllocator,
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagram {
    /// A fresh Arduino diagram with the two mandatory blocks already on the
    /// canvas. Seeding bypasses the history, so a new diagram starts clean.
    pub fn new() -> Self {
        let settings = CanvasSettings::new();
        let stack = UndoStack::with_limit(settings.redo_undo_stack_size());
        let mut diagram = Self {
            scene: Scene::new(MAIN_SCENE),
            stack,
            settings,
            functions: UserFunctions::new(),
            ids: IdAllocator::new(),
        };
        for (object_type, position) in [
            (ObjectType::Setup, Point::new(10, 10)),
            (ObjectType::Loop, Point::new(10, 140)),
        ] {
            let id = diagram.ids.allocate();
            diagram
                .scene
                .attach(Proxy::new(Object::new(id, object_type, position)));
        }
        diagram
    }

    /// Assembles a diagram read back from a project file. Nothing is seeded;
    /// the file contents are taken as they are.
    pub(crate) fn from_parts(
        scene: Scene,
        settings: CanvasSettings,
        functions: UserFunctions,
        ids: IdAllocator,
    ) -> Self {
        let stack = UndoStack::with_limit(settings.redo_undo_stack_size());
        Self {
            scene,
            stack,
            settings,
            functions,
            ids,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The shell reaches through this for selection, movability flags and
    /// object sizes; undoable edits go through the gesture operations.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn settings(&self) -> &CanvasSettings {
        &self.settings
    }

    pub fn functions(&self) -> &UserFunctions {
        &self.functions
    }

    pub fn undo(&mut self) -> bool {
        let (stack, mut ctx) = self.split();
        stack.undo(&mut ctx)
    }

    pub fn redo(&mut self) -> bool {
        let (stack, mut ctx) = self.split();
        stack.redo(&mut ctx)
    }

    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    pub fn undo_text(&self) -> Option<&str> {
        self.stack.undo_text()
    }

    pub fn redo_text(&self) -> Option<&str> {
        self.stack.redo_text()
    }

    /// True when the diagram has edits the project file does not.
    pub fn has_changes(&self) -> bool {
        !self.stack.is_clean()
    }

    pub(crate) fn mark_saved(&mut self) {
        self.stack.set_clean();
    }

    fn split(&mut self) -> (&mut UndoStack, EditContext<'_>) {
        let Self {
            scene,
            stack,
            settings,
            functions,
            ids: _,
        } = self;
        (
            stack,
            EditContext {
                scene,
                settings,
                functions,
            },
        )
    }

    fn push_command(&mut self, command: Command) {
        let (stack, mut ctx) = self.split();
        stack.push(command, &mut ctx);
    }

    /// Commits commands as one atomic history entry. No commands, no entry.
    fn push_macro(&mut self, label: &str, commands: Vec<Command>) {
        if commands.is_empty() {
            return;
        }
        self.stack.begin_macro(label);
        for command in commands {
            self.push_command(command);
        }
        self.stack.end_macro();
    }
}
