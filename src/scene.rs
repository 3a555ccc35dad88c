/// Scene graph: flat per-scene maps of proxies keyed by object id, nested
/// through container objects' body scenes. Membership changes never destroy
/// the proxy; ownership moves to whoever detached it.
use std::collections::BTreeMap;

use crate::geometry::{Point, Size};
use crate::object::{Object, ObjectId};

pub type SceneId = u64;

/// Id of the top-level sketch scene. Object ids start at 1, so no object
/// scene can collide with it.
pub const MAIN_SCENE: SceneId = 0;

/// Selection and movability wrapper around exactly one object. Selection is
/// written by the interactive layer; the editing core only reads it.
#[derive(Debug)]
pub struct Proxy {
    object: Object,
    selected: bool,
    movable: bool,
}

impl Proxy {
    pub const fn new(object: Object) -> Self {
        Self {
            object,
            selected: false,
            movable: true,
        }
    }

    pub const fn id(&self) -> ObjectId {
        self.object.id()
    }

    pub const fn object(&self) -> &Object {
        &self.object
    }

    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.object
    }

    pub const fn position(&self) -> Point {
        self.object.position()
    }

    pub const fn size(&self) -> Size {
        self.object.size()
    }

    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub const fn is_movable(&self) -> bool {
        self.movable
    }

    pub fn set_movable(&mut self, movable: bool) {
        self.movable = movable;
    }
}

#[derive(Debug)]
pub struct Scene {
    id: SceneId,
    items: BTreeMap<ObjectId, Proxy>,
    revision: u64,
}

impl Scene {
    pub const fn new(id: SceneId) -> Self {
        Self {
            id,
            items: BTreeMap::new(),
            revision: 0,
        }
    }

    pub const fn id(&self) -> SceneId {
        self.id
    }

    /// Monotonic content counter. The shell repaints a scene whenever its
    /// revision moves.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn attach(&mut self, proxy: Proxy) {
        let id = proxy.id();
        if self.items.insert(id, proxy).is_some() {
            tracing::warn!(scene = self.id, object = id, "replaced an already attached object");
        }
        self.touch();
    }

    pub fn detach(&mut self, id: ObjectId) -> Option<Proxy> {
        let detached = self.items.remove(&id);
        if detached.is_some() {
            self.touch();
        }
        detached
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Proxy> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Proxy> {
        self.items.get_mut(&id)
    }

    /// Proxies in ascending id order, the stable order every measurement
    /// pass relies on.
    pub fn proxies(&self) -> impl Iterator<Item = &Proxy> {
        self.items.values()
    }

    pub fn selected_proxies(&self) -> impl Iterator<Item = &Proxy> {
        self.items.values().filter(|proxy| proxy.is_selected())
    }

    pub fn selected_ids(&self) -> Vec<ObjectId> {
        self.items
            .values()
            .filter(|proxy| proxy.is_selected())
            .map(Proxy::id)
            .collect()
    }

    pub fn set_selected(&mut self, id: ObjectId, selected: bool) -> bool {
        match self.items.get_mut(&id) {
            Some(proxy) => {
                proxy.set_selected(selected);
                true
            }
            None => false,
        }
    }

    pub fn select_all(&mut self) {
        for proxy in self.items.values_mut() {
            proxy.set_selected(true);
        }
    }

    pub fn clear_selection(&mut self) {
        for proxy in self.items.values_mut() {
            proxy.set_selected(false);
        }
    }

    /// Moves one object, bumping the revision when it exists.
    pub fn set_position(&mut self, id: ObjectId, position: Point) -> bool {
        match self.items.get_mut(&id) {
            Some(proxy) => {
                proxy.object_mut().set_position(position);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Resolves a scene id against this scene and every body scene nested
    /// under it. A scene detached along with its container is unreachable.
    pub fn find_scene(&self, id: SceneId) -> Option<&Scene> {
        if self.id == id {
            return Some(self);
        }
        for proxy in self.items.values() {
            if let Some(body) = proxy.object().body() {
                if let Some(found) = body.find_scene(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn find_scene_mut(&mut self, id: SceneId) -> Option<&mut Scene> {
        if self.id == id {
            return Some(self);
        }
        for proxy in self.items.values_mut() {
            if let Some(body) = proxy.object_mut().body_mut() {
                if let Some(found) = body.find_scene_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn find_object(&self, id: ObjectId) -> Option<&Object> {
        for proxy in self.items.values() {
            if proxy.id() == id {
                return Some(proxy.object());
            }
            if let Some(body) = proxy.object().body() {
                if let Some(found) = body.find_object(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn find_object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        for proxy in self.items.values_mut() {
            if proxy.id() == id {
                return Some(proxy.object_mut());
            }
            if let Some(body) = proxy.object_mut().body_mut() {
                if let Some(found) = body.find_object_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Resolves the scene that directly holds the object, so callers can
    /// mutate the object and bump that scene's revision in one place.
    pub fn containing_scene_mut(&mut self, id: ObjectId) -> Option<&mut Scene> {
        if self.items.contains_key(&id) {
            return Some(self);
        }
        for proxy in self.items.values_mut() {
            if let Some(body) = proxy.object_mut().body_mut() {
                if let Some(found) = body.containing_scene_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }
}
