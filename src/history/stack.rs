//! Bounded undo/redo stack.
//!
//! One `Vec` of entries and a single index: entries below the index are
//! applied, entries at or above it are the redo tail. Macros gather several
//! commands into one entry so gestures like "delete everything selected"
//! undo atomically.

use crate::canvas::DEFAULT_REDO_UNDO_STACK_SIZE;

use super::command::{Command, EditContext};

#[derive(Debug)]
struct HistoryEntry {
    label: String,
    commands: Vec<Command>,
}

#[derive(Debug)]
pub struct UndoStack {
    entries: Vec<HistoryEntry>,
    /// Number of applied entries; also the insertion point for the next one.
    index: usize,
    /// Maximum entry count, `0` for unbounded.
    limit: usize,
    /// Index at which the project was last saved, if still reachable.
    clean: Option<usize>,
    open_macro: Option<HistoryEntry>,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_limit(DEFAULT_REDO_UNDO_STACK_SIZE)
    }
}

impl UndoStack {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: 0,
            limit,
            clean: Some(0),
            open_macro: None,
        }
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Applies a new bound immediately, evicting the oldest entries if the
    /// stack already exceeds it.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.enforce_limit();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the command's redo and records it. While a macro is open the
    /// command joins it; otherwise it commits as its own entry.
    pub fn push(&mut self, mut command: Command, ctx: &mut EditContext<'_>) {
        command.redo(ctx);
        match &mut self.open_macro {
            Some(entry) => entry.commands.push(command),
            None => {
                let label = command.description().to_owned();
                self.commit(HistoryEntry {
                    label,
                    commands: vec![command],
                });
            }
        }
    }

    pub fn begin_macro(&mut self, label: impl Into<String>) {
        if self.open_macro.is_some() {
            tracing::warn!("begin_macro while a macro is already open; ignoring");
            return;
        }
        self.open_macro = Some(HistoryEntry {
            label: label.into(),
            commands: Vec::new(),
        });
    }

    /// Commits the open macro. A macro that collected nothing leaves no
    /// entry, which is what lets gestures open macros lazily.
    pub fn end_macro(&mut self) {
        match self.open_macro.take() {
            None => tracing::warn!("end_macro without begin_macro; ignoring"),
            Some(entry) if entry.commands.is_empty() => {}
            Some(entry) => self.commit(entry),
        }
    }

    pub fn undo(&mut self, ctx: &mut EditContext<'_>) -> bool {
        if self.open_macro.is_some() {
            tracing::warn!("undo while a macro is open; ignoring");
            return false;
        }
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        let entry = &mut self.entries[self.index];
        tracing::debug!(label = entry.label.as_str(), "undo");
        for command in entry.commands.iter_mut().rev() {
            command.undo(ctx);
        }
        true
    }

    pub fn redo(&mut self, ctx: &mut EditContext<'_>) -> bool {
        if self.open_macro.is_some() {
            tracing::warn!("redo while a macro is open; ignoring");
            return false;
        }
        let Some(entry) = self.entries.get_mut(self.index) else {
            return false;
        };
        tracing::debug!(label = entry.label.as_str(), "redo");
        for command in entry.commands.iter_mut() {
            command.redo(ctx);
        }
        self.index += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.open_macro.is_none() && self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.open_macro.is_none() && self.index < self.entries.len()
    }

    /// Label of the entry `undo` would revert.
    pub fn undo_text(&self) -> Option<&str> {
        self.index
            .checked_sub(1)
            .and_then(|applied| self.entries.get(applied))
            .map(|entry| entry.label.as_str())
    }

    /// Label of the entry `redo` would reapply.
    pub fn redo_text(&self) -> Option<&str> {
        self.entries.get(self.index).map(|entry| entry.label.as_str())
    }

    /// Marks the current position as the saved state.
    pub fn set_clean(&mut self) {
        self.clean = Some(self.index);
    }

    /// True when the stack sits exactly at the last saved position. Undoing
    /// back to that position makes the stack clean again.
    pub fn is_clean(&self) -> bool {
        self.clean == Some(self.index)
    }

    fn commit(&mut self, entry: HistoryEntry) {
        if self.index < self.entries.len() {
            tracing::debug!(
                discarded = self.entries.len() - self.index,
                "new entry truncates the redo tail"
            );
            self.entries.truncate(self.index);
        }
        if let Some(clean) = self.clean {
            // A saved state that lived in the truncated tail is gone.
            if clean > self.index {
                self.clean = None;
            }
        }
        self.entries.push(entry);
        self.index += 1;
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        if self.limit == 0 {
            return;
        }
        while self.entries.len() > self.limit {
            self.entries.remove(0);
            self.index = self.index.saturating_sub(1);
            self.clean = match self.clean {
                // The saved state fell off the bottom of the history.
                Some(0) | None => None,
                Some(clean) => Some(clean - 1),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasSettings;
    use crate::functions::UserFunctions;
    use crate::geometry::Point;
    use crate::object::{Object, ObjectId, ObjectType};
    use crate::scene::{Proxy, Scene, MAIN_SCENE};

    struct Project {
        scene: Scene,
        settings: CanvasSettings,
        functions: UserFunctions,
    }

    impl Project {
        fn new(ids: &[ObjectId]) -> Self {
            let mut scene = Scene::new(MAIN_SCENE);
            for &id in ids {
                scene.attach(Proxy::new(Object::new(
                    id,
                    ObjectType::AnalogRead,
                    Point::new(0, 0),
                )));
            }
            Self {
                scene,
                settings: CanvasSettings::new(),
                functions: UserFunctions::new(),
            }
        }

        fn context(&mut self) -> EditContext<'_> {
            EditContext {
                scene: &mut self.scene,
                settings: &mut self.settings,
                functions: &mut self.functions,
            }
        }

        fn position(&self, id: ObjectId) -> Point {
            self.scene
                .get(id)
                .map(Proxy::position)
                .expect("object should be attached")
        }

        /// Applies a move the way a gesture would, then returns the command
        /// recording it.
        fn move_object(&mut self, id: ObjectId, to: Point) -> Command {
            let from = self.position(id);
            self.scene.set_position(id, to);
            Command::item_moved(from, &self.scene, id)
        }
    }

    #[test]
    fn undo_and_redo_walk_the_same_entries() {
        let mut project = Project::new(&[1]);
        let mut stack = UndoStack::default();

        for step in 1..=3 {
            let command = project.move_object(1, Point::new(step * 10, 0));
            stack.push(command, &mut project.context());
        }
        assert_eq!(project.position(1), Point::new(30, 0));

        assert!(stack.undo(&mut project.context()));
        assert!(stack.undo(&mut project.context()));
        assert_eq!(project.position(1), Point::new(10, 0));

        assert!(stack.redo(&mut project.context()));
        assert_eq!(project.position(1), Point::new(20, 0));

        assert!(stack.undo(&mut project.context()));
        assert!(stack.undo(&mut project.context()));
        assert!(!stack.undo(&mut project.context()));
        assert_eq!(project.position(1), Point::new(0, 0));
    }

    #[test]
    fn a_new_entry_discards_the_redo_tail() {
        let mut project = Project::new(&[1]);
        let mut stack = UndoStack::default();

        let command = project.move_object(1, Point::new(10, 0));
        stack.push(command, &mut project.context());
        let command = project.move_object(1, Point::new(20, 0));
        stack.push(command, &mut project.context());

        stack.undo(&mut project.context());
        assert!(stack.can_redo());

        let command = project.move_object(1, Point::new(5, 5));
        stack.push(command, &mut project.context());
        assert!(!stack.can_redo());
        assert!(!stack.redo(&mut project.context()));
        assert_eq!(stack.len(), 2);
        assert_eq!(project.position(1), Point::new(5, 5));
    }

    #[test]
    fn macros_undo_and_redo_as_one_entry() {
        let mut project = Project::new(&[1, 2]);
        let mut stack = UndoStack::default();

        stack.begin_macro("items moved");
        let command = project.move_object(1, Point::new(10, 0));
        stack.push(command, &mut project.context());
        let command = project.move_object(2, Point::new(0, 10));
        stack.push(command, &mut project.context());
        stack.end_macro();

        assert_eq!(stack.len(), 1);
        assert_eq!(stack.undo_text(), Some("items moved"));

        assert!(stack.undo(&mut project.context()));
        assert_eq!(project.position(1), Point::new(0, 0));
        assert_eq!(project.position(2), Point::new(0, 0));

        assert!(stack.redo(&mut project.context()));
        assert_eq!(project.position(1), Point::new(10, 0));
        assert_eq!(project.position(2), Point::new(0, 10));
    }

    #[test]
    fn an_empty_macro_leaves_no_entry() {
        let mut stack = UndoStack::default();

        stack.begin_macro("items aligned");
        stack.end_macro();

        assert!(stack.is_empty());
        assert!(stack.is_clean());
        assert_eq!(stack.undo_text(), None);
    }

    #[test]
    fn undo_and_redo_are_refused_while_a_macro_is_open() {
        let mut project = Project::new(&[1]);
        let mut stack = UndoStack::default();

        let command = project.move_object(1, Point::new(10, 0));
        stack.push(command, &mut project.context());

        stack.begin_macro("items deleted");
        assert!(!stack.can_undo());
        assert!(!stack.undo(&mut project.context()));
        assert!(!stack.redo(&mut project.context()));
        assert_eq!(project.position(1), Point::new(10, 0));
        stack.end_macro();

        assert!(stack.can_undo());
    }

    #[test]
    fn a_nested_begin_macro_is_ignored() {
        let mut project = Project::new(&[1]);
        let mut stack = UndoStack::default();

        stack.begin_macro("items moved");
        stack.begin_macro("inner");
        let command = project.move_object(1, Point::new(10, 0));
        stack.push(command, &mut project.context());
        stack.end_macro();

        assert_eq!(stack.len(), 1);
        assert_eq!(stack.undo_text(), Some("items moved"));
    }

    #[test]
    fn the_limit_evicts_the_oldest_entries() {
        let mut project = Project::new(&[1]);
        let mut stack = UndoStack::with_limit(2);

        for step in 1..=4 {
            let command = project.move_object(1, Point::new(step * 10, 0));
            stack.push(command, &mut project.context());
        }
        assert_eq!(stack.len(), 2);

        // Only the retained window can be undone.
        assert!(stack.undo(&mut project.context()));
        assert!(stack.undo(&mut project.context()));
        assert!(!stack.undo(&mut project.context()));
        assert_eq!(project.position(1), Point::new(20, 0));

        assert!(stack.redo(&mut project.context()));
        assert!(stack.redo(&mut project.context()));
        assert_eq!(project.position(1), Point::new(40, 0));
    }

    #[test]
    fn a_zero_limit_means_unbounded() {
        let mut project = Project::new(&[1]);
        let mut stack = UndoStack::with_limit(0);

        for step in 1..=600 {
            let command = project.move_object(1, Point::new(step, 0));
            stack.push(command, &mut project.context());
        }
        assert_eq!(stack.len(), 600);
    }

    #[test]
    fn shrinking_the_limit_evicts_immediately() {
        let mut project = Project::new(&[1]);
        let mut stack = UndoStack::default();

        for step in 1..=5 {
            let command = project.move_object(1, Point::new(step * 10, 0));
            stack.push(command, &mut project.context());
        }

        stack.set_limit(2);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.limit(), 2);
    }

    #[test]
    fn clean_tracking_follows_saves_and_undo() {
        let mut project = Project::new(&[1]);
        let mut stack = UndoStack::default();
        assert!(stack.is_clean());

        let command = project.move_object(1, Point::new(10, 0));
        stack.push(command, &mut project.context());
        assert!(!stack.is_clean());

        stack.set_clean();
        assert!(stack.is_clean());

        let command = project.move_object(1, Point::new(20, 0));
        stack.push(command, &mut project.context());
        assert!(!stack.is_clean());

        stack.undo(&mut project.context());
        assert!(stack.is_clean());

        stack.undo(&mut project.context());
        assert!(!stack.is_clean());
    }

    #[test]
    fn eviction_makes_an_old_clean_state_unreachable() {
        let mut project = Project::new(&[1]);
        let mut stack = UndoStack::with_limit(2);
        // Clean at index 0; two evictions push it off the bottom.
        for step in 1..=3 {
            let command = project.move_object(1, Point::new(step * 10, 0));
            stack.push(command, &mut project.context());
        }

        stack.undo(&mut project.context());
        stack.undo(&mut project.context());
        assert!(!stack.is_clean());
    }

    #[test]
    fn labels_follow_the_cursor() {
        let mut project = Project::new(&[1, 2]);
        let mut stack = UndoStack::default();

        let command = project.move_object(1, Point::new(10, 0));
        stack.push(command, &mut project.context());
        stack.begin_macro("items deleted");
        stack.push(Command::item_deleted(MAIN_SCENE, 2), &mut project.context());
        stack.end_macro();

        assert_eq!(stack.undo_text(), Some("items deleted"));
        assert_eq!(stack.redo_text(), None);

        stack.undo(&mut project.context());
        assert_eq!(stack.undo_text(), Some("item moved"));
        assert_eq!(stack.redo_text(), Some("items deleted"));

        stack.undo(&mut project.context());
        assert_eq!(stack.undo_text(), None);
        assert_eq!(stack.redo_text(), Some("item moved"));
    }
}
