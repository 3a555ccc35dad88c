/// Diagram objects: the closed set of block kinds an Arduino diagram can
/// contain, their per-kind payloads, and the id allocator that hands out
/// stable identities.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Point, Size};
use crate::scene::Scene;

pub type ObjectId = u64;

/// Discriminant for the closed kind set. Carries no payload; used by the
/// palette, the persistence factory and type-tag serialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Loop,
    Setup,
    Function,
    AnalogRead,
}

impl ObjectType {
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Loop => "arduino-loop",
            Self::Setup => "arduino-setup",
            Self::Function => "arduino-function",
            Self::AnalogRead => "arduino-analogread",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "arduino-loop" => Some(Self::Loop),
            "arduino-setup" => Some(Self::Setup),
            "arduino-function" => Some(Self::Function),
            "arduino-analogread" => Some(Self::AnalogRead),
            _ => None,
        }
    }

    /// Mandatory objects are seeded with every new diagram and can never be
    /// deleted through the editing surface.
    pub const fn is_mandatory(self) -> bool {
        matches!(self, Self::Loop | Self::Setup)
    }

    /// Kinds that open an edit view own a nested scene of their own.
    pub const fn has_edit_view(self) -> bool {
        matches!(self, Self::Loop | Self::Setup | Self::Function)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ObjectProperty {
    BackgroundColor,
    Comment,
}

impl ObjectProperty {
    pub const fn as_key(self) -> &'static str {
        match self {
            Self::BackgroundColor => "background_color",
            Self::Comment => "comment",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "background_color" => Some(Self::BackgroundColor),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Per-kind payload. Kinds with an edit view own the body scene backing it;
/// the body scene's id equals the owning object's id.
#[derive(Debug)]
pub enum ObjectKind {
    Loop { body: Scene },
    Setup { body: Scene },
    Function { name: String, return_type: String, body: Scene },
    AnalogRead,
}

#[derive(Debug)]
pub struct Object {
    id: ObjectId,
    kind: ObjectKind,
    position: Point,
    size: Size,
    style_sheet: String,
    properties: BTreeMap<ObjectProperty, PropertyValue>,
    editor_open: bool,
}

impl Object {
    pub fn new(id: ObjectId, object_type: ObjectType, position: Point) -> Self {
        let kind = match object_type {
            ObjectType::Loop => ObjectKind::Loop {
                body: Scene::new(id),
            },
            ObjectType::Setup => ObjectKind::Setup {
                body: Scene::new(id),
            },
            ObjectType::Function => ObjectKind::Function {
                name: format!("function_{id}()"),
                return_type: String::from("void"),
                body: Scene::new(id),
            },
            ObjectType::AnalogRead => ObjectKind::AnalogRead,
        };

        Self {
            id,
            kind,
            position,
            size: Size::default(),
            style_sheet: String::new(),
            properties: BTreeMap::new(),
            editor_open: false,
        }
    }

    /// Factory for rows read back from a project file. The tag must name a
    /// supported kind; unknown tags are the caller's problem to report.
    pub fn from_saved(tag: &str, id: ObjectId, position: Point) -> Result<Self, ObjectError> {
        if tag.trim().is_empty() {
            return Err(ObjectError::EmptyType);
        }
        let object_type =
            ObjectType::from_tag(tag).ok_or_else(|| ObjectError::UnsupportedType(tag.into()))?;
        Ok(Self::new(id, object_type, position))
    }

    pub const fn id(&self) -> ObjectId {
        self.id
    }

    pub const fn object_type(&self) -> ObjectType {
        match self.kind {
            ObjectKind::Loop { .. } => ObjectType::Loop,
            ObjectKind::Setup { .. } => ObjectType::Setup,
            ObjectKind::Function { .. } => ObjectType::Function,
            ObjectKind::AnalogRead => ObjectType::AnalogRead,
        }
    }

    pub const fn type_tag(&self) -> &'static str {
        self.object_type().as_tag()
    }

    pub const fn is_mandatory(&self) -> bool {
        self.object_type().is_mandatory()
    }

    pub const fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub const fn size(&self) -> Size {
        self.size
    }

    /// The rendered footprint, reported by the widget layer. The editing
    /// core only ever reads it.
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn style_sheet(&self) -> &str {
        &self.style_sheet
    }

    pub fn set_style_sheet(&mut self, style_sheet: impl Into<String>) {
        self.style_sheet = style_sheet.into();
    }

    pub fn property(&self, property: ObjectProperty) -> Option<&PropertyValue> {
        self.properties.get(&property)
    }

    pub fn set_property(&mut self, property: ObjectProperty, value: PropertyValue) {
        self.properties.insert(property, value);
    }

    pub fn remove_property(&mut self, property: ObjectProperty) -> Option<PropertyValue> {
        self.properties.remove(&property)
    }

    pub fn properties(&self) -> impl Iterator<Item = (ObjectProperty, &PropertyValue)> {
        self.properties.iter().map(|(property, value)| (*property, value))
    }

    /// Function name, for function objects only.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ObjectKind::Function { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        if let ObjectKind::Function { name: current, .. } = &mut self.kind {
            *current = name.into();
        }
    }

    pub fn return_type(&self) -> Option<&str> {
        match &self.kind {
            ObjectKind::Function { return_type, .. } => Some(return_type),
            _ => None,
        }
    }

    pub fn set_return_type(&mut self, return_type: impl Into<String>) {
        if let ObjectKind::Function { return_type: current, .. } = &mut self.kind {
            *current = return_type.into();
        }
    }

    /// Nested scene backing this object's edit view, when the kind has one.
    pub fn body(&self) -> Option<&Scene> {
        match &self.kind {
            ObjectKind::Loop { body }
            | ObjectKind::Setup { body }
            | ObjectKind::Function { body, .. } => Some(body),
            ObjectKind::AnalogRead => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut Scene> {
        match &mut self.kind {
            ObjectKind::Loop { body }
            | ObjectKind::Setup { body }
            | ObjectKind::Function { body, .. } => Some(body),
            ObjectKind::AnalogRead => None,
        }
    }

    pub const fn is_editor_open(&self) -> bool {
        self.editor_open
    }

    /// Ignored for kinds without an edit view; they never report open.
    pub fn set_editor_open(&mut self, open: bool) {
        if self.object_type().has_edit_view() {
            self.editor_open = open;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    #[error("empty object type")]
    EmptyType,
    #[error("the type {0} is not supported")]
    UnsupportedType(String),
}

/// Hands out object ids for one diagram. Ids are monotonic and never
/// reused, so undo can re-identify objects across detach and re-attach.
#[derive(Debug, Clone, Copy)]
pub struct IdAllocator {
    next: ObjectId,
}

impl IdAllocator {
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Resumes allocation above the highest id found in a loaded project.
    pub const fn starting_after(highest: ObjectId) -> Self {
        Self {
            next: highest.saturating_add(1),
        }
    }

    pub fn allocate(&mut self) -> ObjectId {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_round_trip() {
        for object_type in [
            ObjectType::Loop,
            ObjectType::Setup,
            ObjectType::Function,
            ObjectType::AnalogRead,
        ] {
            assert_eq!(ObjectType::from_tag(object_type.as_tag()), Some(object_type));
        }
        assert_eq!(ObjectType::from_tag("arduino-diode"), None);
    }

    #[test]
    fn loop_and_setup_are_mandatory() {
        assert!(ObjectType::Loop.is_mandatory());
        assert!(ObjectType::Setup.is_mandatory());
        assert!(!ObjectType::Function.is_mandatory());
        assert!(!ObjectType::AnalogRead.is_mandatory());
    }

    #[test]
    fn edit_view_kinds_carry_a_body_scene() {
        for object_type in [
            ObjectType::Loop,
            ObjectType::Setup,
            ObjectType::Function,
            ObjectType::AnalogRead,
        ] {
            let object = Object::new(7, object_type, Point::new(0, 0));
            assert_eq!(object.body().is_some(), object_type.has_edit_view());
            if let Some(body) = object.body() {
                assert_eq!(body.id(), 7);
            }
        }
    }

    #[test]
    fn the_editor_flag_needs_an_edit_view() {
        let mut function = Object::new(1, ObjectType::Function, Point::new(0, 0));
        function.set_editor_open(true);
        assert!(function.is_editor_open());

        let mut read = Object::new(2, ObjectType::AnalogRead, Point::new(0, 0));
        read.set_editor_open(true);
        assert!(!read.is_editor_open());
    }

    #[test]
    fn functions_start_with_generated_name_and_void_return() {
        let function = Object::new(3, ObjectType::Function, Point::new(10, 20));
        assert_eq!(function.name(), Some("function_3()"));
        assert_eq!(function.return_type(), Some("void"));
    }

    #[test]
    fn set_name_ignores_non_function_objects() {
        let mut read = Object::new(4, ObjectType::AnalogRead, Point::new(0, 0));
        read.set_name("ignored()");
        assert_eq!(read.name(), None);
    }

    #[test]
    fn from_saved_rejects_empty_and_unknown_tags() {
        assert!(matches!(
            Object::from_saved("", 1, Point::new(0, 0)),
            Err(ObjectError::EmptyType)
        ));
        assert!(matches!(
            Object::from_saved("  ", 1, Point::new(0, 0)),
            Err(ObjectError::EmptyType)
        ));
        assert!(matches!(
            Object::from_saved("arduino-servo", 1, Point::new(0, 0)),
            Err(ObjectError::UnsupportedType(tag)) if tag == "arduino-servo"
        ));
    }

    #[test]
    fn properties_are_typed_and_replace_on_set() {
        let mut object = Object::new(5, ObjectType::AnalogRead, Point::new(0, 0));
        assert_eq!(object.property(ObjectProperty::Comment), None);

        object.set_property(ObjectProperty::Comment, PropertyValue::Text("A0".into()));
        object.set_property(ObjectProperty::Comment, PropertyValue::Text("A1".into()));
        assert_eq!(
            object.property(ObjectProperty::Comment),
            Some(&PropertyValue::Text("A1".into()))
        );
    }

    #[test]
    fn id_allocator_never_reuses_ids() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(), 1);
        assert_eq!(ids.allocate(), 2);

        let mut resumed = IdAllocator::starting_after(41);
        assert_eq!(resumed.allocate(), 42);
    }
}
