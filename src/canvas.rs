/// Canvas-wide settings: the per-project configuration persisted alongside
/// the diagram and exchanged with the undo history as snapshot maps.
use std::collections::BTreeMap;

use crate::geometry::Color;

pub const DEFAULT_BACKGROUND_COLOR: Color = Color::new(211, 211, 211);

/// Name given to diagrams whose user-supplied name is effectively empty.
pub const DEFAULT_NAME: &str = "Arduino-Diagram";

/// Default bound on the undo history. `0` means unbounded.
pub const DEFAULT_REDO_UNDO_STACK_SIZE: usize = 500;

/// Closed key set for canvas-settings snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CanvasSetting {
    BackgroundColor,
    Name,
    RedoUndoStackSize,
    UpdateMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Color(Color),
    Int(i64),
    Text(String),
    Mode(UpdateMode),
}

impl SettingValue {
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(color) => Some(*color),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_mode(&self) -> Option<UpdateMode> {
        match self {
            Self::Mode(mode) => Some(*mode),
            _ => None,
        }
    }
}

/// Snapshot of the canvas settings. The undo history stores previous/current
/// pairs of these, and the settings form submits one per apply gesture.
pub type SettingsMap = BTreeMap<CanvasSetting, SettingValue>;

/// Viewport repaint strategy hint consumed by the shell's canvas view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    BoundingRectangle,
    #[default]
    Full,
    Minimal,
    Smart,
}

impl UpdateMode {
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::BoundingRectangle => "bounding_rectangle",
            Self::Full => "full",
            Self::Minimal => "minimal",
            Self::Smart => "smart",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "bounding_rectangle" => Some(Self::BoundingRectangle),
            "full" => Some(Self::Full),
            "minimal" => Some(Self::Minimal),
            "smart" => Some(Self::Smart),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectType {
    #[default]
    Arduino,
}

impl ProjectType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arduino => "Arduino",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "Arduino" => Some(Self::Arduino),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasSettings {
    background_color: Color,
    name: String,
    project_type: ProjectType,
    redo_undo_stack_size: usize,
    update_mode: UpdateMode,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            background_color: DEFAULT_BACKGROUND_COLOR,
            name: DEFAULT_NAME.to_owned(),
            project_type: ProjectType::Arduino,
            redo_undo_stack_size: DEFAULT_REDO_UNDO_STACK_SIZE,
            update_mode: UpdateMode::Full,
        }
    }
}

impl CanvasSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn background_color(&self) -> Color {
        self.background_color
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background_color = color;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = sanitize_name(name);
    }

    pub const fn project_type(&self) -> ProjectType {
        self.project_type
    }

    pub const fn redo_undo_stack_size(&self) -> usize {
        self.redo_undo_stack_size
    }

    pub fn set_redo_undo_stack_size(&mut self, size: usize) {
        self.redo_undo_stack_size = size;
    }

    pub const fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    pub fn set_update_mode(&mut self, mode: UpdateMode) {
        self.update_mode = mode;
    }

    pub fn settings(&self) -> SettingsMap {
        SettingsMap::from([
            (
                CanvasSetting::BackgroundColor,
                SettingValue::Color(self.background_color),
            ),
            (CanvasSetting::Name, SettingValue::Text(self.name.clone())),
            (
                CanvasSetting::RedoUndoStackSize,
                SettingValue::Int(i64::try_from(self.redo_undo_stack_size).unwrap_or(i64::MAX)),
            ),
            (
                CanvasSetting::UpdateMode,
                SettingValue::Mode(self.update_mode),
            ),
        ])
    }

    /// Applies a snapshot. The stack size is carried in snapshots but not
    /// applied here; the owning diagram resizes the history when a settings
    /// gesture commits, never on replay.
    pub fn set_settings(&mut self, map: &SettingsMap) {
        if let Some(color) = map
            .get(&CanvasSetting::BackgroundColor)
            .and_then(SettingValue::as_color)
        {
            self.background_color = color;
        }
        if let Some(name) = map.get(&CanvasSetting::Name).and_then(SettingValue::as_text) {
            self.set_name(name);
        }
        if let Some(mode) = map
            .get(&CanvasSetting::UpdateMode)
            .and_then(SettingValue::as_mode)
        {
            self.update_mode = mode;
        }
    }
}

/// Project names drop the dirty marker and spaces; an effectively empty name
/// falls back to the default.
fn sanitize_name(name: &str) -> String {
    if name.trim().is_empty() {
        return DEFAULT_NAME.to_owned();
    }

    let cleaned = name.replace("(*)", "").replace(' ', "-");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        DEFAULT_NAME.to_owned()
    } else {
        cleaned.to_owned()
    }
}
