//! SQLite project files.
//!
//! A project file carries two tables: `objects`, one row per diagram object
//! with its parent link, and `canvas_settings`, a single row of per-project
//! configuration. Saving replaces the file contents wholesale; loading reads
//! them back tolerantly, degrading bad rows and fields with a warning rather
//! than refusing the whole file.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{params, Connection, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canvas::{CanvasSettings, ProjectType, UpdateMode};
use crate::diagram::Diagram;
use crate::functions::UserFunctions;
use crate::geometry::{Color, Point};
use crate::object::{IdAllocator, Object, ObjectId, ObjectProperty, PropertyValue};
use crate::scene::{Proxy, Scene, SceneId, MAIN_SCENE};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("property encoding error: {0}")]
    Properties(#[from] serde_json::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Root objects carry this parent id; every other row names the object whose
/// body scene holds it.
const NO_PARENT: i64 = -1;

const CREATE_OBJECTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS objects (
    myoid INTEGER NOT NULL UNIQUE,
    parent_oid INTEGER NOT NULL DEFAULT -1,
    position TEXT NOT NULL,
    stylesheet TEXT,
    type TEXT NOT NULL,
    properties TEXT
)";

const CREATE_SETTINGS_TABLE: &str = "CREATE TABLE IF NOT EXISTS canvas_settings (
    background_color TEXT NOT NULL,
    name TEXT NOT NULL PRIMARY KEY,
    project_type TEXT NOT NULL CHECK (project_type IN ('Arduino')),
    redo_undo_stack_size INTEGER NOT NULL DEFAULT 500,
    update_mode TEXT NOT NULL
        CHECK (update_mode IN ('bounding_rectangle', 'full', 'minimal', 'smart'))
)";

const INSERT_OBJECT: &str = "INSERT INTO objects
    (myoid, parent_oid, position, stylesheet, type, properties)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const INSERT_SETTINGS: &str = "INSERT INTO canvas_settings
    (background_color, name, project_type, redo_undo_stack_size, update_mode)
    VALUES (?1, ?2, ?3, ?4, ?5)";

const SELECT_OBJECTS: &str = "SELECT myoid, parent_oid, position, stylesheet, type, properties
    FROM objects ORDER BY myoid";

const SELECT_SETTINGS: &str = "SELECT background_color, name, project_type,
    redo_undo_stack_size, update_mode FROM canvas_settings";

/// The `properties` column, one JSON document per object. Function name and
/// return type live beside the free-form property keys.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PropertiesRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    return_type: Option<String>,
    #[serde(flatten)]
    values: BTreeMap<String, PropertyValue>,
}

struct ObjectRow {
    myoid: i64,
    parent_oid: i64,
    position: String,
    stylesheet: Option<String>,
    kind: String,
    properties: Option<String>,
}

/// An open project database. Both tables are created on open when missing.
pub struct ProjectFile {
    conn: Connection,
}

impl ProjectFile {
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::prepare(Connection::open(path)?)
    }

    pub fn in_memory() -> StorageResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> StorageResult<Self> {
        conn.execute(CREATE_OBJECTS_TABLE, [])?;
        conn.execute(CREATE_SETTINGS_TABLE, [])?;
        Ok(Self { conn })
    }

    /// Replaces the file contents with the diagram and marks it saved. The
    /// whole write is one transaction, so a failed save leaves the previous
    /// contents intact.
    pub fn save(&mut self, diagram: &mut Diagram) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM objects", [])?;
        tx.execute("DELETE FROM canvas_settings", [])?;

        let settings = diagram.settings();
        tx.execute(
            INSERT_SETTINGS,
            params![
                settings.background_color().to_hex(),
                settings.name(),
                settings.project_type().as_str(),
                i64::try_from(settings.redo_undo_stack_size()).unwrap_or(i64::MAX),
                settings.update_mode().as_wire(),
            ],
        )?;

        save_scene(&tx, diagram.scene(), NO_PARENT)?;
        tx.commit()?;

        diagram.mark_saved();
        tracing::debug!(name = diagram.settings().name(), "project saved");
        Ok(())
    }

    /// Reads the whole project back. The returned diagram starts clean, with
    /// an empty history and the id allocator resumed above every id the file
    /// mentions.
    pub fn load(&self) -> StorageResult<Diagram> {
        let settings = self.load_settings()?;
        let mut scene = Scene::new(MAIN_SCENE);
        let mut functions = UserFunctions::new();
        let mut highest: ObjectId = 0;
        let mut restored = 0usize;

        let mut statement = self.conn.prepare(SELECT_OBJECTS)?;
        let rows = statement.query_map([], |row| {
            Ok(ObjectRow {
                myoid: row.get(0)?,
                parent_oid: row.get(1)?,
                position: row.get(2)?,
                stylesheet: row.get(3)?,
                kind: row.get(4)?,
                properties: row.get(5)?,
            })
        })?;

        for row in rows {
            let row = row?;
            if let Ok(id) = ObjectId::try_from(row.myoid) {
                highest = highest.max(id);
            }
            if restore_row(&mut scene, &mut functions, row) {
                restored += 1;
            }
        }

        tracing::debug!(objects = restored, name = settings.name(), "project loaded");
        Ok(Diagram::from_parts(
            scene,
            settings,
            functions,
            IdAllocator::starting_after(highest),
        ))
    }

    fn load_settings(&self) -> StorageResult<CanvasSettings> {
        let row = self.conn.query_row(SELECT_SETTINGS, [], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        });
        let (color, name, project_type, stack_size, update_mode) = match row {
            Ok(columns) => columns,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                tracing::warn!("project file has no canvas settings, using defaults");
                return Ok(CanvasSettings::default());
            }
            Err(err) => return Err(err.into()),
        };

        let mut settings = CanvasSettings::default();
        match Color::parse_hex(&color) {
            Some(color) => settings.set_background_color(color),
            None => {
                tracing::warn!(color = color.as_str(), "unreadable background color, keeping the default");
            }
        }
        settings.set_name(&name);
        if ProjectType::from_name(&project_type).is_none() {
            tracing::warn!(
                project_type = project_type.as_str(),
                "unknown project type, assuming Arduino"
            );
        }
        match usize::try_from(stack_size) {
            Ok(size) => settings.set_redo_undo_stack_size(size),
            Err(_) => {
                tracing::warn!(stack_size, "negative undo stack size, keeping the default");
            }
        }
        match UpdateMode::from_wire(&update_mode) {
            Some(mode) => settings.set_update_mode(mode),
            None => {
                tracing::warn!(
                    update_mode = update_mode.as_str(),
                    "unknown update mode, keeping the default"
                );
            }
        }
        Ok(settings)
    }
}

fn save_scene(tx: &Transaction<'_>, scene: &Scene, parent: i64) -> StorageResult<()> {
    for proxy in scene.proxies() {
        let object = proxy.object();
        tx.execute(
            INSERT_OBJECT,
            params![
                sql_id(object.id()),
                parent,
                encode_position(object.position()),
                object.style_sheet(),
                object.type_tag(),
                encode_properties(object)?,
            ],
        )?;
        if let Some(body) = object.body() {
            save_scene(tx, body, sql_id(object.id()))?;
        }
    }
    Ok(())
}

/// Materialises one row into the scene tree. Returns whether the object was
/// attached; unusable rows are logged and dropped.
fn restore_row(scene: &mut Scene, functions: &mut UserFunctions, row: ObjectRow) -> bool {
    let Ok(id) = ObjectId::try_from(row.myoid) else {
        tracing::warn!(myoid = row.myoid, "skipping object row with a negative id");
        return false;
    };
    let position = decode_position(&row.position).unwrap_or_else(|| {
        tracing::warn!(
            object = id,
            position = row.position.as_str(),
            "unreadable position, placing at the origin"
        );
        Point::new(0, 0)
    });
    let mut object = match Object::from_saved(&row.kind, id, position) {
        Ok(object) => object,
        Err(err) => {
            tracing::warn!(object = id, %err, "skipping object row");
            return false;
        }
    };
    if let Some(stylesheet) = row.stylesheet {
        object.set_style_sheet(stylesheet);
    }
    if let Some(properties) = &row.properties {
        apply_properties(&mut object, properties);
    }
    if let Some(name) = object.name() {
        functions.add_function(name.to_owned());
    }

    let parent: SceneId = match row.parent_oid {
        NO_PARENT => MAIN_SCENE,
        other => match SceneId::try_from(other) {
            Ok(parent) => parent,
            Err(_) => {
                tracing::warn!(object = id, parent = other, "skipping object row with a bad parent");
                return false;
            }
        },
    };
    match scene.find_scene_mut(parent) {
        Some(target) => {
            target.attach(Proxy::new(object));
            true
        }
        None => {
            tracing::warn!(object = id, parent = row.parent_oid, "skipping orphaned object row");
            false
        }
    }
}

fn apply_properties(object: &mut Object, raw: &str) {
    let record: PropertiesRecord = match serde_json::from_str(raw) {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(object = object.id(), %err, "unreadable properties column, ignoring it");
            return;
        }
    };
    if let Some(name) = record.name {
        object.set_name(name);
    }
    if let Some(return_type) = record.return_type {
        object.set_return_type(return_type);
    }
    for (key, value) in record.values {
        match ObjectProperty::from_key(&key) {
            Some(property) => object.set_property(property, value),
            None => {
                tracing::warn!(object = object.id(), key = key.as_str(), "unknown property key, ignoring it");
            }
        }
    }
}

fn encode_properties(object: &Object) -> StorageResult<String> {
    let record = PropertiesRecord {
        name: object.name().map(str::to_owned),
        return_type: object.return_type().map(str::to_owned),
        values: object
            .properties()
            .map(|(property, value)| (property.as_key().to_owned(), value.clone()))
            .collect(),
    };
    Ok(serde_json::to_string(&record)?)
}

fn encode_position(position: Point) -> String {
    format!("({},{})", position.x, position.y)
}

fn decode_position(text: &str) -> Option<Point> {
    let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (x, y) = inner.split_once(',')?;
    Some(Point::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn sql_id(id: ObjectId) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}
