//! Gesture-level edit operations.
//!
//! Each operation applies its effect to the live entities first and then
//! pushes the matching command, so the first stack-driven redo finds the
//! work already done. Deletion is the exception: its command performs the
//! detach on first redo and owns the object while the delete holds.

use crate::canvas::{CanvasSetting, SettingValue, SettingsMap};
use crate::geometry::Point;
use crate::history::Command;
use crate::object::{Object, ObjectId, ObjectProperty, ObjectType, PropertyValue};
use crate::scene::{Proxy, SceneId};

use super::Diagram;

impl Diagram {
    /// Creates an object in the given scene and records the add. Returns the
    /// new id, or `None` when the scene is unreachable.
    pub fn add_object(
        &mut self,
        scene_id: SceneId,
        object_type: ObjectType,
        position: Point,
    ) -> Option<ObjectId> {
        let Some(target) = self.scene.find_scene_mut(scene_id) else {
            tracing::debug!(scene = scene_id, "add_object: scene is gone");
            return None;
        };
        let id = self.ids.allocate();
        let object = Object::new(id, object_type, position);
        if let Some(name) = object.name() {
            self.functions.add_function(name.to_owned());
        }
        target.attach(Proxy::new(object));
        tracing::debug!(scene = scene_id, object = id, kind = object_type.as_tag(), "object added");
        self.push_command(Command::item_added(scene_id, id));
        Some(id)
    }

    /// Deletes every selected, non-mandatory object in the scene as one
    /// history entry. The commands do the detaching.
    pub fn delete_selected(&mut self, scene_id: SceneId) {
        let Some(target) = self.scene.find_scene(scene_id) else {
            tracing::debug!(scene = scene_id, "delete_selected: scene is gone");
            return;
        };
        let doomed: Vec<ObjectId> = target
            .selected_proxies()
            .filter(|proxy| !proxy.object().is_mandatory())
            .map(Proxy::id)
            .collect();
        if doomed.is_empty() {
            return;
        }
        tracing::debug!(scene = scene_id, count = doomed.len(), "deleting selected objects");
        let commands = doomed
            .into_iter()
            .map(|id| Command::item_deleted(scene_id, id))
            .collect();
        self.push_macro("items deleted", commands);
    }

    /// Records a finished drag. `moved` pairs each object with the position
    /// it was picked up from; the scene already holds the drop positions.
    /// Objects that ended up where they started leave no trace.
    pub fn complete_move(&mut self, scene_id: SceneId, moved: &[(ObjectId, Point)]) {
        let Some(target) = self.scene.find_scene(scene_id) else {
            tracing::debug!(scene = scene_id, "complete_move: scene is gone");
            return;
        };
        let mut commands = Vec::new();
        for &(id, previous) in moved {
            match target.get(id) {
                Some(proxy) if proxy.position() != previous => {
                    commands.push(Command::item_moved(previous, target, id));
                }
                _ => {}
            }
        }
        self.push_macro("items moved", commands);
    }

    /// Restyles one object. Setting the text it already has is a no-op.
    pub fn set_style_sheet(&mut self, object_id: ObjectId, style_sheet: impl Into<String>) {
        let style_sheet = style_sheet.into();
        let Some(previous) = self
            .scene
            .find_object(object_id)
            .map(|object| object.style_sheet().to_owned())
        else {
            tracing::debug!(object = object_id, "set_style_sheet: object is gone");
            return;
        };
        if previous == style_sheet {
            return;
        }
        self.with_object_mut(object_id, |object| object.set_style_sheet(style_sheet));
        let Some(object) = self.scene.find_object(object_id) else {
            return;
        };
        let command = Command::style_sheet_changed(previous, object);
        self.push_command(command);
    }

    /// Sets one typed property. Re-setting the current value is a no-op.
    pub fn set_property(
        &mut self,
        object_id: ObjectId,
        property: ObjectProperty,
        value: PropertyValue,
    ) {
        let Some(previous) = self
            .scene
            .find_object(object_id)
            .map(|object| object.property(property).cloned())
        else {
            tracing::debug!(object = object_id, "set_property: object is gone");
            return;
        };
        if previous.as_ref() == Some(&value) {
            return;
        }
        self.with_object_mut(object_id, |object| {
            object.set_property(property, value.clone());
        });
        let command = Command::property_changed(Some(value), previous, property, object_id);
        self.push_command(command);
    }

    /// Renames a function, keeping names unique across the diagram. Returns
    /// false when the target is not a reachable function or the name is
    /// empty, unchanged or already taken.
    pub fn rename_function(&mut self, object_id: ObjectId, name: impl Into<String>) -> bool {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(previous) = self
            .scene
            .find_object(object_id)
            .and_then(|object| object.name().map(str::to_owned))
        else {
            tracing::debug!(object = object_id, "rename_function: no such function");
            return false;
        };
        if previous == name {
            return false;
        }
        if self.functions.contains(name) {
            tracing::debug!(name, "rename_function: name already taken");
            return false;
        }

        let name = name.to_owned();
        self.with_object_mut(object_id, |object| object.set_name(name.clone()));
        self.functions.add_function(name);
        self.functions.delete_function(&previous);
        let Some(object) = self.scene.find_object(object_id) else {
            return false;
        };
        let command = Command::function_renamed(previous, object);
        self.push_command(command);
        true
    }

    /// Changes a function's return type. Non-functions are left alone.
    pub fn set_return_type(&mut self, object_id: ObjectId, return_type: impl Into<String>) {
        let return_type = return_type.into();
        let Some(previous) = self
            .scene
            .find_object(object_id)
            .and_then(|object| object.return_type().map(str::to_owned))
        else {
            tracing::debug!(object = object_id, "set_return_type: no such function");
            return;
        };
        if previous == return_type {
            return;
        }
        self.with_object_mut(object_id, |object| {
            object.set_return_type(return_type.clone());
        });
        let Some(object) = self.scene.find_object(object_id) else {
            return;
        };
        let command = Command::function_return_type_changed(previous, object);
        self.push_command(command);
    }

    /// Applies a settings snapshot from the settings form. A snapshot equal
    /// to the current one leaves no trace. The history bound resizes here,
    /// once, and deliberately stays resized across undo.
    pub fn change_canvas_settings(&mut self, map: SettingsMap) {
        let previous = self.settings.settings();
        if previous == map {
            return;
        }
        self.settings.set_settings(&map);
        if let Some(size) = map
            .get(&CanvasSetting::RedoUndoStackSize)
            .and_then(SettingValue::as_int)
        {
            match usize::try_from(size) {
                Ok(limit) => {
                    self.settings.set_redo_undo_stack_size(limit);
                    self.stack.set_limit(limit);
                }
                Err(_) => tracing::warn!(size, "ignoring negative undo stack size"),
            }
        }
        tracing::debug!(name = self.settings.name(), "canvas settings changed");
        let command = Command::canvas_settings_changed(previous, &self.settings);
        self.push_command(command);
    }

    /// Runs a mutation against an object wherever it lives and bumps the
    /// holding scene's revision. `None` when the object is unreachable.
    fn with_object_mut<R>(
        &mut self,
        id: ObjectId,
        mutate: impl FnOnce(&mut Object) -> R,
    ) -> Option<R> {
        let scene = self.scene.containing_scene_mut(id)?;
        let result = scene.get_mut(id).map(|proxy| mutate(proxy.object_mut()));
        if result.is_some() {
            scene.touch();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::UpdateMode;
    use crate::geometry::Color;
    use crate::scene::MAIN_SCENE;

    #[test]
    fn added_objects_round_trip_through_undo() {
        let mut diagram = Diagram::new();
        let id = diagram
            .add_object(MAIN_SCENE, ObjectType::AnalogRead, Point::new(50, 60))
            .expect("main scene should accept new objects");
        assert_eq!(id, 3);
        assert!(diagram.has_changes());
        assert_eq!(diagram.undo_text(), Some("item added"));

        assert!(diagram.undo());
        assert!(!diagram.scene().contains(id));

        assert!(diagram.redo());
        assert_eq!(
            diagram.scene().find_object(id).map(Object::position),
            Some(Point::new(50, 60))
        );
    }

    #[test]
    fn adding_into_an_unreachable_scene_is_refused() {
        let mut diagram = Diagram::new();
        assert_eq!(
            diagram.add_object(99, ObjectType::AnalogRead, Point::new(0, 0)),
            None
        );
        assert!(!diagram.has_changes());
    }

    #[test]
    fn new_functions_register_their_generated_name() {
        let mut diagram = Diagram::new();
        let id = diagram
            .add_object(MAIN_SCENE, ObjectType::Function, Point::new(0, 0))
            .expect("main scene should accept new objects");

        assert_eq!(
            diagram.scene().find_object(id).and_then(Object::name),
            Some("function_3()")
        );
        assert!(diagram.functions().contains("function_3()"));

        // Un-adding the object does not unregister the name.
        diagram.undo();
        assert!(diagram.functions().contains("function_3()"));
    }

    #[test]
    fn delete_selected_spares_the_mandatory_blocks() {
        let mut diagram = Diagram::new();
        let id = diagram
            .add_object(MAIN_SCENE, ObjectType::Function, Point::new(5, 5))
            .expect("main scene should accept new objects");
        diagram
            .scene_mut()
            .get_mut(id)
            .expect("object should be attached")
            .object_mut()
            .set_editor_open(true);
        diagram.scene_mut().select_all();

        diagram.delete_selected(MAIN_SCENE);
        assert!(!diagram.scene().contains(id));
        assert!(diagram.scene().contains(1));
        assert!(diagram.scene().contains(2));
        assert_eq!(diagram.undo_text(), Some("items deleted"));

        assert!(diagram.undo());
        let restored = diagram
            .scene()
            .find_object(id)
            .expect("undo should restore the object");
        assert!(!restored.is_editor_open());
    }

    #[test]
    fn deleting_an_all_mandatory_selection_leaves_no_entry() {
        let mut diagram = Diagram::new();
        diagram.scene_mut().select_all();

        diagram.delete_selected(MAIN_SCENE);
        assert!(diagram.scene().contains(1));
        assert!(diagram.scene().contains(2));
        assert!(!diagram.can_undo());
    }

    #[test]
    fn one_undo_reverts_a_whole_delete() {
        let mut diagram = Diagram::new();
        let first = diagram
            .add_object(MAIN_SCENE, ObjectType::AnalogRead, Point::new(5, 5))
            .expect("main scene should accept new objects");
        let second = diagram
            .add_object(MAIN_SCENE, ObjectType::AnalogRead, Point::new(9, 9))
            .expect("main scene should accept new objects");
        diagram.scene_mut().set_selected(first, true);
        diagram.scene_mut().set_selected(second, true);

        diagram.delete_selected(MAIN_SCENE);
        assert!(!diagram.scene().contains(first));
        assert!(!diagram.scene().contains(second));

        assert!(diagram.undo());
        assert!(diagram.scene().contains(first));
        assert!(diagram.scene().contains(second));
    }

    #[test]
    fn complete_move_records_only_real_moves() {
        let mut diagram = Diagram::new();
        let id = diagram
            .add_object(MAIN_SCENE, ObjectType::AnalogRead, Point::new(0, 0))
            .expect("main scene should accept new objects");

        // A drag that went nowhere leaves no entry.
        diagram.complete_move(MAIN_SCENE, &[(id, Point::new(0, 0))]);
        assert_eq!(diagram.undo_text(), Some("item added"));

        diagram.scene_mut().set_position(id, Point::new(25, 25));
        diagram.complete_move(MAIN_SCENE, &[(id, Point::new(0, 0))]);
        assert_eq!(diagram.undo_text(), Some("items moved"));

        assert!(diagram.undo());
        assert_eq!(
            diagram.scene().find_object(id).map(Object::position),
            Some(Point::new(0, 0))
        );
    }

    #[test]
    fn style_sheet_changes_round_trip() {
        let mut diagram = Diagram::new();
        let id = diagram
            .add_object(MAIN_SCENE, ObjectType::AnalogRead, Point::new(0, 0))
            .expect("main scene should accept new objects");

        diagram.set_style_sheet(id, "background-color: #112233;");
        assert_eq!(diagram.undo_text(), Some("style sheet changed"));

        // Re-applying the same text is not an edit.
        diagram.set_style_sheet(id, "background-color: #112233;");
        diagram.undo();
        assert_eq!(
            diagram.scene().find_object(id).map(|object| object.style_sheet()),
            Some("")
        );

        diagram.redo();
        assert_eq!(
            diagram.scene().find_object(id).map(|object| object.style_sheet()),
            Some("background-color: #112233;")
        );
    }

    #[test]
    fn a_first_property_value_disappears_on_undo() {
        let mut diagram = Diagram::new();
        let id = diagram
            .add_object(MAIN_SCENE, ObjectType::AnalogRead, Point::new(0, 0))
            .expect("main scene should accept new objects");

        diagram.set_property(
            id,
            ObjectProperty::Comment,
            PropertyValue::Text("pin A0".to_owned()),
        );
        assert_eq!(diagram.undo_text(), Some("property changed"));

        diagram.undo();
        assert_eq!(
            diagram
                .scene()
                .find_object(id)
                .and_then(|object| object.property(ObjectProperty::Comment)),
            None
        );
    }

    #[test]
    fn resetting_the_current_property_value_is_a_no_op() {
        let mut diagram = Diagram::new();
        let id = diagram
            .add_object(MAIN_SCENE, ObjectType::AnalogRead, Point::new(0, 0))
            .expect("main scene should accept new objects");

        diagram.set_property(id, ObjectProperty::Comment, PropertyValue::Bool(true));
        diagram.set_property(id, ObjectProperty::Comment, PropertyValue::Bool(true));
        assert_eq!(diagram.undo_text(), Some("property changed"));

        diagram.undo();
        assert_eq!(diagram.undo_text(), Some("item added"));
    }

    #[test]
    fn rename_enforces_unique_names() {
        let mut diagram = Diagram::new();
        let first = diagram
            .add_object(MAIN_SCENE, ObjectType::Function, Point::new(0, 0))
            .expect("main scene should accept new objects");
        let second = diagram
            .add_object(MAIN_SCENE, ObjectType::Function, Point::new(0, 40))
            .expect("main scene should accept new objects");

        assert!(!diagram.rename_function(second, "function_3()"));
        assert!(!diagram.rename_function(second, "  "));
        assert!(!diagram.rename_function(second, "function_4()"));
        assert!(diagram.rename_function(second, "blink()"));
        assert_eq!(diagram.undo_text(), Some("function renamed"));

        assert!(diagram.undo());
        assert_eq!(
            diagram.scene().find_object(second).and_then(Object::name),
            Some("function_4()")
        );
        assert!(diagram.functions().contains("function_4()"));
        assert!(!diagram.functions().contains("blink()"));

        // The other function was never touched.
        assert_eq!(
            diagram.scene().find_object(first).and_then(Object::name),
            Some("function_3()")
        );
    }

    #[test]
    fn return_types_only_change_on_functions() {
        let mut diagram = Diagram::new();
        let reader = diagram
            .add_object(MAIN_SCENE, ObjectType::AnalogRead, Point::new(0, 0))
            .expect("main scene should accept new objects");
        let function = diagram
            .add_object(MAIN_SCENE, ObjectType::Function, Point::new(0, 40))
            .expect("main scene should accept new objects");

        diagram.set_return_type(reader, "int");
        assert_eq!(diagram.undo_text(), Some("item added"));

        diagram.set_return_type(function, "int");
        assert_eq!(diagram.undo_text(), Some("function return type changed"));

        diagram.undo();
        assert_eq!(
            diagram.scene().find_object(function).and_then(Object::return_type),
            Some("void")
        );
    }

    #[test]
    fn an_unchanged_settings_snapshot_is_a_no_op() {
        let mut diagram = Diagram::new();
        let map = diagram.settings().settings();
        diagram.change_canvas_settings(map);
        assert!(!diagram.has_changes());
    }

    #[test]
    fn settings_changes_apply_and_resize_the_history_once() {
        let mut diagram = Diagram::new();
        let mut map = diagram.settings().settings();
        map.insert(
            CanvasSetting::BackgroundColor,
            SettingValue::Color(Color::new(1, 2, 3)),
        );
        map.insert(CanvasSetting::Name, SettingValue::Text("Bigger".to_owned()));
        map.insert(CanvasSetting::RedoUndoStackSize, SettingValue::Int(50));
        map.insert(
            CanvasSetting::UpdateMode,
            SettingValue::Mode(UpdateMode::Minimal),
        );

        diagram.change_canvas_settings(map);
        assert_eq!(diagram.settings().background_color(), Color::new(1, 2, 3));
        assert_eq!(diagram.settings().name(), "Bigger");
        assert_eq!(diagram.settings().redo_undo_stack_size(), 50);
        assert_eq!(diagram.settings().update_mode(), UpdateMode::Minimal);
        assert_eq!(diagram.stack.limit(), 50);
        assert_eq!(diagram.undo_text(), Some("canvas settings changed"));

        assert!(diagram.undo());
        assert_eq!(
            diagram.settings().background_color(),
            Color::new(211, 211, 211)
        );
        assert_eq!(diagram.settings().name(), "Arduino-Diagram");
        assert_eq!(diagram.settings().update_mode(), UpdateMode::Full);
        // The resized bound survives the undo.
        assert_eq!(diagram.settings().redo_undo_stack_size(), 50);
        assert_eq!(diagram.stack.limit(), 50);
    }

    #[test]
    fn gestures_work_inside_nested_bodies() {
        let mut diagram = Diagram::new();
        // Scene id 2 is the loop block's body.
        let nested = diagram
            .add_object(2, ObjectType::AnalogRead, Point::new(7, 7))
            .expect("loop body should accept new objects");
        assert!(diagram.scene().find_scene(2).is_some_and(|body| body.contains(nested)));
        assert!(!diagram.scene().contains(nested));

        diagram
            .scene_mut()
            .find_scene_mut(2)
            .expect("loop body should resolve")
            .set_selected(nested, true);
        diagram.delete_selected(2);
        assert!(diagram.scene().find_object(nested).is_none());

        assert!(diagram.undo());
        assert_eq!(
            diagram.scene().find_object(nested).map(Object::position),
            Some(Point::new(7, 7))
        );
    }
}
