use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::component::Component;
use super::entity::EntityId;
use super::storage::ComponentStorage;

struct EntityMeta {
    generation: u32,
    alive: bool,
}

/// Type-erased view of a `ComponentStorage<T>`.
trait AnyStorage: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove(&mut self, entity: EntityId);
    fn clear(&mut self);
}

impl<T: Component> AnyStorage for ComponentStorage<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn remove(&mut self, entity: EntityId) {
        ComponentStorage::remove(self, entity);
    }
    fn clear(&mut self) {
        ComponentStorage::clear(self);
    }
}

/// Container for every entity and component of one scene.
pub struct World {
    entities: Vec<EntityMeta>,
    free_list: Vec<u32>,
    storages: HashMap<TypeId, Box<dyn AnyStorage>>,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            free_list: Vec::new(),
            storages: HashMap::new(),
        }
    }

    /// Allocate an entity, reusing a freed slot with a bumped generation.
    pub fn spawn(&mut self) -> EntityId {
        if let Some(index) = self.free_list.pop() {
            let meta = &mut self.entities[index as usize];
            meta.generation += 1;
            meta.alive = true;
            EntityId::new(index, meta.generation)
        } else {
            let index = self.entities.len() as u32;
            self.entities.push(EntityMeta {
                generation: 1,
                alive: true,
            });
            EntityId::new(index, 1)
        }
    }

    /// Destroy an entity and all of its components.
    /// Returns false for stale or unknown handles.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        self.entities[entity.index() as usize].alive = false;
        self.free_list.push(entity.index());
        for storage in self.storages.values_mut() {
            storage.remove(entity);
        }
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities
            .get(entity.index() as usize)
            .is_some_and(|meta| meta.alive && meta.generation == entity.generation())
    }

    /// Attach a component. Ignored for dead entities.
    pub fn insert<T: Component>(&mut self, entity: EntityId, component: T) {
        if !self.is_alive(entity) {
            log::warn!("insert on dead entity {entity} ignored");
            return;
        }
        self.get_or_create_storage::<T>().insert(entity, component);
    }

    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.get_storage::<T>()?.get(entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.get_storage_mut::<T>()?.get_mut(entity)
    }

    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.get_storage_mut::<T>()?.remove(entity)
    }

    pub fn iter_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, meta)| meta.alive)
            .map(|(index, meta)| EntityId::new(index as u32, meta.generation))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.iter().filter(|meta| meta.alive).count()
    }

    /// Entities carrying `T`, in storage order.
    pub fn iter_with<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.get_storage::<T>()
            .into_iter()
            .flat_map(|storage| storage.iter())
    }

    /// Entities carrying both `A` and `B`.
    pub fn iter_with2<A: Component, B: Component>(
        &self,
    ) -> impl Iterator<Item = (EntityId, &A, &B)> {
        self.iter_with::<A>()
            .filter_map(|(entity, a)| self.get::<B>(entity).map(|b| (entity, a, b)))
    }

    /// Despawn everything. Generations keep counting so old handles stay stale.
    pub fn clear(&mut self) {
        for (index, meta) in self.entities.iter_mut().enumerate() {
            if meta.alive {
                meta.alive = false;
                self.free_list.push(index as u32);
            }
        }
        for storage in self.storages.values_mut() {
            storage.clear();
        }
    }

    fn get_or_create_storage<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        self.storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStorage::<T>::new()))
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
            .expect("type mismatch in storage")
    }

    fn get_storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        self.storages
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<ComponentStorage<T>>()
    }

    fn get_storage_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Name, Transform};
    use glam::Vec3;

    #[derive(Debug, PartialEq, Clone)]
    struct Pickable(bool);
    impl Component for Pickable {}

    #[test]
    fn test_despawn_and_reuse() {
        let mut world = World::new();
        let e1 = world.spawn();
        assert!(world.despawn(e1));
        assert!(!world.despawn(e1));

        let e2 = world.spawn();
        assert_eq!(e2.index(), e1.index());
        assert_eq!(e2.generation(), 2);
        assert!(!world.is_alive(e1));
        assert!(world.is_alive(e2));
    }

    #[test]
    fn test_stale_handle_does_not_see_new_components() {
        let mut world = World::new();
        let old = world.spawn();
        world.despawn(old);
        let new = world.spawn();
        world.insert(new, Pickable(true));

        assert_eq!(world.get::<Pickable>(old), None);
        assert_eq!(world.get::<Pickable>(new), Some(&Pickable(true)));
    }

    #[test]
    fn test_dead_entity_operations() {
        let mut world = World::new();
        let entity = world.spawn();
        world.despawn(entity);

        world.insert(entity, Pickable(true));
        assert_eq!(world.get::<Pickable>(entity), None);
        assert_eq!(world.get_mut::<Pickable>(entity), None);
        assert_eq!(world.remove::<Pickable>(entity), None);
    }

    #[test]
    fn test_iter_with2() {
        let mut world = World::new();
        let a = world.spawn();
        world.insert(a, Name::new("a"));
        world.insert(a, Transform::from_position(Vec3::X));

        let b = world.spawn();
        world.insert(b, Name::new("b"));

        let pairs: Vec<_> = world.iter_with2::<Name, Transform>().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, a);
        assert_eq!(pairs[0].2.position, Vec3::X);
    }

    #[test]
    fn test_clear() {
        let mut world = World::new();
        let e = world.spawn();
        world.insert(e, Pickable(false));
        world.clear();

        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.iter_with::<Pickable>().count(), 0);
        let reused = world.spawn();
        assert_eq!(reused.generation(), 2);
    }
}
