//! Reversible edit commands.
//!
//! Every undoable edit is one `Command` value: a previous/current pair (or an
//! owned object for add/delete) plus the ids needed to find the target again.
//! Targets are resolved by id each time a command runs, so a command whose
//! object or scene has since disappeared degrades to a no-op instead of
//! touching stale state. Call sites apply the edit first and push the command
//! afterwards; the deletion kind is the one exception, where the first redo
//! performs the detach itself.

use crate::canvas::{CanvasSettings, SettingsMap};
use crate::functions::UserFunctions;
use crate::geometry::Point;
use crate::object::{Object, ObjectId, ObjectProperty, PropertyValue};
use crate::scene::{Proxy, Scene, SceneId};

/// Mutable views over everything commands may touch, split-borrowed from the
/// owning diagram so the undo stack can run alongside them.
#[derive(Debug)]
pub struct EditContext<'a> {
    pub scene: &'a mut Scene,
    pub settings: &'a mut CanvasSettings,
    pub functions: &'a mut UserFunctions,
}

#[derive(Debug)]
pub enum Command {
    ItemAdded {
        scene: SceneId,
        object: ObjectId,
        /// Holds the proxy while the add is undone. Dropping the command in
        /// that state purges the object for good.
        detached: Option<Proxy>,
    },
    ItemDeleted {
        scene: SceneId,
        object: ObjectId,
        /// Holds the proxy while the delete is in effect.
        detached: Option<Proxy>,
    },
    ItemMoved {
        scene: SceneId,
        object: ObjectId,
        previous: Point,
        current: Point,
    },
    PropertyChanged {
        object: ObjectId,
        property: ObjectProperty,
        previous: Option<PropertyValue>,
        current: Option<PropertyValue>,
    },
    StyleSheetChanged {
        object: ObjectId,
        previous: String,
        current: String,
    },
    FunctionRenamed {
        object: ObjectId,
        previous: String,
        current: String,
    },
    FunctionReturnTypeChanged {
        object: ObjectId,
        previous: String,
        current: String,
    },
    CanvasSettingsChanged {
        previous: SettingsMap,
        current: SettingsMap,
    },
}

impl Command {
    pub fn item_added(scene: SceneId, object: ObjectId) -> Self {
        Self::ItemAdded {
            scene,
            object,
            detached: None,
        }
    }

    pub fn item_deleted(scene: SceneId, object: ObjectId) -> Self {
        Self::ItemDeleted {
            scene,
            object,
            detached: None,
        }
    }

    /// The caller supplies where the object came from; where it is now is
    /// read off the scene.
    pub fn item_moved(previous: Point, scene: &Scene, object: ObjectId) -> Self {
        let current = scene.get(object).map_or(previous, Proxy::position);
        Self::ItemMoved {
            scene: scene.id(),
            object,
            previous,
            current,
        }
    }

    pub fn property_changed(
        current: Option<PropertyValue>,
        previous: Option<PropertyValue>,
        property: ObjectProperty,
        object: ObjectId,
    ) -> Self {
        Self::PropertyChanged {
            object,
            property,
            previous,
            current,
        }
    }

    pub fn style_sheet_changed(previous: impl Into<String>, object: &Object) -> Self {
        Self::StyleSheetChanged {
            object: object.id(),
            previous: previous.into(),
            current: object.style_sheet().to_owned(),
        }
    }

    pub fn function_renamed(previous: impl Into<String>, object: &Object) -> Self {
        let previous = previous.into();
        let current = object.name().map_or_else(|| previous.clone(), str::to_owned);
        Self::FunctionRenamed {
            object: object.id(),
            previous,
            current,
        }
    }

    pub fn function_return_type_changed(previous: impl Into<String>, object: &Object) -> Self {
        let previous = previous.into();
        let current = object
            .return_type()
            .map_or_else(|| previous.clone(), str::to_owned);
        Self::FunctionReturnTypeChanged {
            object: object.id(),
            previous,
            current,
        }
    }

    pub fn canvas_settings_changed(previous: SettingsMap, settings: &CanvasSettings) -> Self {
        Self::CanvasSettingsChanged {
            previous,
            current: settings.settings(),
        }
    }

    /// Label shown by undo/redo menus for single-command history entries.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ItemAdded { .. } => "item added",
            Self::ItemDeleted { .. } => "item deleted",
            Self::ItemMoved { .. } => "item moved",
            Self::PropertyChanged { .. } => "property changed",
            Self::StyleSheetChanged { .. } => "style sheet changed",
            Self::FunctionRenamed { .. } => "function renamed",
            Self::FunctionReturnTypeChanged { .. } => "function return type changed",
            Self::CanvasSettingsChanged { .. } => "canvas settings changed",
        }
    }

    pub(crate) fn redo(&mut self, ctx: &mut EditContext<'_>) {
        match self {
            Self::ItemAdded {
                scene,
                object,
                detached,
            } => {
                // First redo after a plain push finds nothing to do: the
                // caller already attached the object.
                if let Some(proxy) = detached.take() {
                    match ctx.scene.find_scene_mut(*scene) {
                        Some(target) => target.attach(proxy),
                        None => {
                            tracing::debug!(scene = *scene, object = *object, "redo add: scene is gone");
                            *detached = Some(proxy);
                        }
                    }
                }
            }
            Self::ItemDeleted {
                scene,
                object,
                detached,
            } => {
                if detached.is_none() {
                    if let Some(target) = ctx.scene.find_scene_mut(*scene) {
                        if let Some(mut proxy) = target.detach(*object) {
                            proxy.object_mut().set_editor_open(false);
                            *detached = Some(proxy);
                        }
                    }
                }
            }
            Self::ItemMoved {
                scene,
                object,
                current,
                ..
            } => {
                if let Some(target) = ctx.scene.find_scene_mut(*scene) {
                    target.set_position(*object, *current);
                }
            }
            Self::PropertyChanged {
                object,
                property,
                current,
                ..
            } => {
                if let Some(target) = touch_object(ctx.scene, *object) {
                    apply_property(target, *property, current);
                }
            }
            Self::StyleSheetChanged {
                object, current, ..
            } => {
                if let Some(target) = touch_object(ctx.scene, *object) {
                    target.set_style_sheet(current.clone());
                }
            }
            Self::FunctionRenamed {
                object,
                previous,
                current,
            } => {
                if let Some(target) = touch_object(ctx.scene, *object) {
                    target.set_name(current.clone());
                    ctx.functions.add_function(current.clone());
                    ctx.functions.delete_function(previous);
                }
            }
            Self::FunctionReturnTypeChanged {
                object, current, ..
            } => {
                if let Some(target) = touch_object(ctx.scene, *object) {
                    target.set_return_type(current.clone());
                }
            }
            Self::CanvasSettingsChanged { current, .. } => {
                ctx.settings.set_settings(current);
                ctx.scene.touch();
            }
        }
    }

    pub(crate) fn undo(&mut self, ctx: &mut EditContext<'_>) {
        match self {
            Self::ItemAdded {
                scene,
                object,
                detached,
            } => {
                if detached.is_none() {
                    if let Some(target) = ctx.scene.find_scene_mut(*scene) {
                        if let Some(proxy) = target.detach(*object) {
                            *detached = Some(proxy);
                        }
                    }
                }
            }
            Self::ItemDeleted {
                scene,
                object,
                detached,
            } => {
                if let Some(proxy) = detached.take() {
                    match ctx.scene.find_scene_mut(*scene) {
                        Some(target) => target.attach(proxy),
                        None => {
                            tracing::debug!(scene = *scene, object = *object, "undo delete: scene is gone");
                            *detached = Some(proxy);
                        }
                    }
                }
            }
            Self::ItemMoved {
                scene,
                object,
                previous,
                ..
            } => {
                if let Some(target) = ctx.scene.find_scene_mut(*scene) {
                    target.set_position(*object, *previous);
                }
            }
            Self::PropertyChanged {
                object,
                property,
                previous,
                ..
            } => {
                if let Some(target) = touch_object(ctx.scene, *object) {
                    apply_property(target, *property, previous);
                }
            }
            Self::StyleSheetChanged {
                object, previous, ..
            } => {
                if let Some(target) = touch_object(ctx.scene, *object) {
                    target.set_style_sheet(previous.clone());
                }
            }
            Self::FunctionRenamed {
                object,
                previous,
                current,
            } => {
                if let Some(target) = touch_object(ctx.scene, *object) {
                    target.set_name(previous.clone());
                    ctx.functions.add_function(previous.clone());
                    ctx.functions.delete_function(current);
                }
            }
            Self::FunctionReturnTypeChanged {
                object, previous, ..
            } => {
                if let Some(target) = touch_object(ctx.scene, *object) {
                    target.set_return_type(previous.clone());
                }
            }
            Self::CanvasSettingsChanged { previous, .. } => {
                ctx.settings.set_settings(previous);
                ctx.scene.touch();
            }
        }
    }
}

/// Finds an object anywhere under `scene` and bumps the revision of the scene
/// holding it, so the shell knows to repaint.
fn touch_object(scene: &mut Scene, id: ObjectId) -> Option<&mut Object> {
    match scene.containing_scene_mut(id) {
        Some(holder) => {
            holder.touch();
            holder.get_mut(id).map(Proxy::object_mut)
        }
        None => {
            tracing::debug!(object = id, "command target is unreachable; ignoring");
            None
        }
    }
}

fn apply_property(object: &mut Object, property: ObjectProperty, value: &Option<PropertyValue>) {
    match value {
        Some(value) => object.set_property(property, value.clone()),
        None => {
            object.remove_property(property);
        }
    }
}
