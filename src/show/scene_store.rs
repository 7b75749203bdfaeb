use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use common::Scene;
use indexmap::IndexMap;

use super::ControlError;

/// Every loaded scene, keyed by name in insertion order, plus the name of the
/// scene that is currently projected.
///
/// The store is shared between the control surface (the only writer of scene
/// bodies), the playback scheduler (which only moves the current pointer) and
/// the render loop (read only). Scene bodies are handed out as `Arc`s, so a
/// reader keeps whatever version it grabbed even if the scene is edited or
/// removed in the meantime.
#[derive(Debug, Default)]
pub struct SceneStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    scenes: IndexMap<String, Arc<Scene>>,
    current: Option<String>,
    /// Bumped every time the current scene changes identity or its body is
    /// replaced. The render loop reseeds motion state when it sees a new one.
    generation: u64,
}

/// The scene to project, as seen at one instant.
#[derive(Clone, Debug)]
pub struct CurrentScene {
    pub name: String,
    pub generation: u64,
    pub scene: Arc<Scene>,
}

impl StoreInner {
    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn is_current(&self, name: &str) -> bool {
        self.current.as_deref() == Some(name)
    }
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in a whole new collection. A later scene with a name already seen
    /// replaces the earlier body but keeps its position. The first scene
    /// becomes current. Returns the number of distinct scenes.
    pub fn replace_all(&self, scenes: impl IntoIterator<Item = Scene>) -> usize {
        let mut collected: IndexMap<String, Arc<Scene>> = IndexMap::new();
        for scene in scenes {
            collected.insert(scene.name.clone(), Arc::new(scene));
        }

        let mut inner = self.write();
        inner.current = collected.keys().next().cloned();
        inner.scenes = collected;
        inner.touch();

        inner.scenes.len()
    }

    /// Add a scene, or replace the body of the scene with the same name in
    /// place. Returns the previous body, if any.
    pub fn insert(&self, scene: Scene) -> Option<Arc<Scene>> {
        let mut inner = self.write();
        let name = scene.name.clone();
        let previous = inner.scenes.insert(name.clone(), Arc::new(scene));

        if inner.is_current(&name) {
            inner.touch();
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<Scene>> {
        self.read().scenes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().scenes.contains_key(name)
    }

    /// Scene names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.read().scenes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().scenes.is_empty()
    }

    /// Point the current scene at `name`. Selecting the scene that is already
    /// current changes nothing.
    pub fn set_current(&self, name: &str) -> Result<(), ControlError> {
        let mut inner = self.write();
        if !inner.scenes.contains_key(name) {
            return Err(ControlError::UnknownScene(name.to_string()));
        }

        if !inner.is_current(name) {
            inner.current = Some(name.to_string());
            inner.touch();
        }
        Ok(())
    }

    pub fn clear_current(&self) {
        let mut inner = self.write();
        if inner.current.take().is_some() {
            inner.touch();
        }
    }

    pub fn current_name(&self) -> Option<String> {
        self.read().current.clone()
    }

    /// The current scene, if one is selected and still exists.
    pub fn current(&self) -> Option<CurrentScene> {
        let inner = self.read();
        let name = inner.current.as_ref()?;
        let scene = inner.scenes.get(name)?.clone();

        Some(CurrentScene {
            name: name.clone(),
            generation: inner.generation,
            scene,
        })
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Edit a copy of the named scene. The copy replaces the stored body only
    /// when `edit` succeeds; on error the store is left untouched.
    pub fn update<T>(
        &self,
        name: &str,
        edit: impl FnOnce(&mut Scene) -> Result<T, ControlError>,
    ) -> Result<T, ControlError> {
        let mut inner = self.write();
        let slot = inner
            .scenes
            .get_mut(name)
            .ok_or_else(|| ControlError::UnknownScene(name.to_string()))?;

        let mut edited = Scene::clone(slot);
        let output = edit(&mut edited)?;
        // The key is the identity; renames go through `rename`
        edited.name = name.to_string();
        *slot = Arc::new(edited);

        if inner.is_current(name) {
            inner.touch();
        }
        Ok(output)
    }

    /// Re-key a scene. The renamed scene moves to the end of the order, and
    /// the current pointer follows it.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), ControlError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(ControlError::InvalidObject(common::SceneError::EmptyName));
        }
        if old == new {
            return if self.contains(old) {
                Ok(())
            } else {
                Err(ControlError::UnknownScene(old.to_string()))
            };
        }

        let mut inner = self.write();
        if inner.scenes.contains_key(new) {
            return Err(ControlError::NameTaken(new.to_string()));
        }
        let scene = inner
            .scenes
            .shift_remove(old)
            .ok_or_else(|| ControlError::UnknownScene(old.to_string()))?;

        let mut renamed = Scene::clone(&scene);
        renamed.name = new.to_string();
        inner.scenes.insert(new.to_string(), Arc::new(renamed));

        if inner.is_current(old) {
            inner.current = Some(new.to_string());
            inner.touch();
        }
        Ok(())
    }

    /// Drop a scene. Removing the current scene leaves nothing selected.
    pub fn remove(&self, name: &str) -> Option<Arc<Scene>> {
        let mut inner = self.write();
        let removed = inner.scenes.shift_remove(name)?;

        if inner.is_current(name) {
            inner.current = None;
            inner.touch();
        }
        Some(removed)
    }
}
