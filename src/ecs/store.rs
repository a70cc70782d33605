use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::components::{Component, ComponentSet, Fresh, Lifecycle, Name, Position, Sid, TemplateRef};
use super::templates::TemplateCatalog;
use crate::error::GameError;
use crate::protocol::{EntityId, EntitySnapshot};

/// Canonical owner of every entity.
///
/// Components live in a `hecs::World`; the store maps stable, never reused
/// [`EntityId`]s onto hecs handles. Levels only ever hold ids, so there is
/// exactly one copy of each entity.
pub struct EntityStore {
    world: hecs::World,
    index: BTreeMap<EntityId, hecs::Entity>,
    next_id: EntityId,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
            index: BTreeMap::new(),
            next_id: 0,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Allocate a new entity: active, dirty, no components.
    pub fn create_entity(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;

        let handle = self.world.spawn((Lifecycle::default(),));
        self.index.insert(id, handle);
        id
    }

    /// Allocate an entity with an optional archetype reference and an
    /// initial component set. `fresh` entities are picked up by
    /// [`EntityStore::load_new_entities`].
    pub fn create_from(
        &mut self,
        template: Option<TemplateRef>,
        components: ComponentSet,
        fresh: bool,
    ) -> EntityId {
        let id = self.create_entity();
        let handle = self.index[&id];

        for component in components.into_components() {
            // The handle was spawned just above.
            let _ = component.insert_into(&mut self.world, handle);
        }
        if let Some(template) = template {
            let _ = self.world.insert_one(handle, template);
        }
        if fresh {
            let _ = self.world.insert_one(handle, Fresh);
        }
        id
    }

    /// Drop an entity from storage for good. Its id is never handed out
    /// again.
    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.index.remove(&id) {
            Some(handle) => {
                let _ = self.world.despawn(handle);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // ── Components ───────────────────────────────────────────────────

    /// Insert or overwrite a single component. No merging.
    pub fn add_component(&mut self, id: EntityId, component: Component) -> Result<(), GameError> {
        let handle = self.handle(id)?;
        component
            .insert_into(&mut self.world, handle)
            .map_err(|_| GameError::UnknownEntity(id))
    }

    /// Copy of a component, if the entity exists and carries it.
    pub fn component<T: hecs::Component + Clone>(&self, id: EntityId) -> Option<T> {
        let handle = *self.index.get(&id)?;
        self.world.get::<&T>(handle).ok().map(|c| (*c).clone())
    }

    pub fn has<T: hecs::Component>(&self, id: EntityId) -> bool {
        self.index
            .get(&id)
            .and_then(|&h| self.world.entity(h).ok())
            .map_or(false, |e| e.has::<T>())
    }

    /// Mutate a component in place. Returns `None` if the entity or the
    /// component is missing.
    pub fn with_mut<T: hecs::Component, R>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let handle = *self.index.get(&id)?;
        let mut c = self.world.get::<&mut T>(handle).ok()?;
        Some(f(&mut *c))
    }

    /// Full replicated view of an entity.
    pub fn get(&self, id: EntityId) -> Option<EntitySnapshot> {
        let handle = *self.index.get(&id)?;
        let entity = self.world.entity(handle).ok()?;
        let lifecycle = entity.get::<&Lifecycle>().map(|l| *l).unwrap_or_default();
        Some(EntitySnapshot {
            id,
            active: lifecycle.active,
            template: entity.get::<&TemplateRef>().map(|t| t.to_string()),
            components: ComponentSet::capture(entity),
        })
    }

    // ── Flags and capabilities ───────────────────────────────────────

    pub fn is_active(&self, id: EntityId) -> bool {
        self.component::<Lifecycle>(id).map_or(false, |l| l.active)
    }

    pub fn is_updated(&self, id: EntityId) -> bool {
        self.component::<Lifecycle>(id).map_or(false, |l| l.updated)
    }

    pub fn set_active(&mut self, id: EntityId, active: bool) {
        self.with_mut::<Lifecycle, _>(id, |l| l.active = active);
    }

    pub fn mark_updated(&mut self, id: EntityId) {
        self.with_mut::<Lifecycle, _>(id, |l| l.updated = true);
    }

    pub fn clear_updated(&mut self, id: EntityId) {
        self.with_mut::<Lifecycle, _>(id, |l| l.updated = false);
    }

    /// Soft delete: inactive and dirty so the next broadcast pass sees it.
    pub fn deactivate(&mut self, id: EntityId) {
        self.with_mut::<Lifecycle, _>(id, |l| {
            l.active = false;
            l.updated = true;
        });
    }

    pub fn template(&self, id: EntityId) -> Option<TemplateRef> {
        self.component::<TemplateRef>(id)
    }

    pub fn is_monster(&self, id: EntityId) -> bool {
        self.template(id).map_or(false, |t| t.is_monster())
    }

    /// Player-controller capability.
    pub fn is_player(&self, id: EntityId) -> bool {
        self.has::<Sid>(id)
    }

    pub fn position(&self, id: EntityId) -> Option<Position> {
        self.component::<Position>(id)
    }

    pub fn set_position(&mut self, id: EntityId, position: Position) -> Result<(), GameError> {
        self.add_component(id, Component::Position(position))
    }

    /// Display name, falling back to the archetype key.
    pub fn display_name(&self, id: EntityId) -> String {
        if let Some(Name(name)) = self.component::<Name>(id) {
            return name;
        }
        self.template(id)
            .map(|t| t.key)
            .unwrap_or_else(|| "something".to_string())
    }

    // ── Template hydration ───────────────────────────────────────────

    /// Fill the entity's missing components from its archetype. Components
    /// already set on the entity are kept. Returns `true` if a template was
    /// found and applied.
    pub fn hydrate(&mut self, id: EntityId, catalog: &TemplateCatalog) -> bool {
        let Some(handle) = self.index.get(&id).copied() else {
            return false;
        };
        let Some(template) = self.template(id) else {
            return false;
        };
        let Some(defaults) = catalog.get(&template) else {
            warn!("Entity {} references unknown template {}", id, template);
            return false;
        };

        let missing: Vec<Component> = match self.world.entity(handle) {
            Ok(entity) => defaults
                .clone()
                .into_components()
                .into_iter()
                .filter(|c| !c.present_on(entity))
                .collect(),
            Err(_) => return false,
        };

        debug!(
            "Hydrating entity {} from {} [{}]",
            id,
            template,
            missing
                .iter()
                .map(Component::kind)
                .collect::<Vec<_>>()
                .join(", ")
        );
        for component in missing {
            let _ = component.insert_into(&mut self.world, handle);
        }
        true
    }

    /// Hydrate every listed entity.
    pub fn load_level_entities(&mut self, ids: &[EntityId], catalog: &TemplateCatalog) {
        for &id in ids {
            self.hydrate(id, catalog);
            let _ = self.clear_fresh(id);
        }
    }

    /// Hydrate only the listed entities still flagged fresh, clearing the
    /// flag afterwards.
    pub fn load_new_entities(&mut self, ids: &[EntityId], catalog: &TemplateCatalog) {
        for &id in ids {
            if self.has::<Fresh>(id) {
                self.hydrate(id, catalog);
                let _ = self.clear_fresh(id);
            }
        }
    }

    fn clear_fresh(&mut self, id: EntityId) -> Result<(), GameError> {
        let handle = self.handle(id)?;
        let _ = self.world.remove_one::<Fresh>(handle);
        Ok(())
    }

    fn handle(&self, id: EntityId) -> Result<hecs::Entity, GameError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(GameError::UnknownEntity(id))
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
