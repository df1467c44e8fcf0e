use super::component::Component;
use super::entity::EntityId;

/// Sparse-set component storage.
///
/// `dense` holds the components contiguously, `entities[i]` is the owner of
/// `dense[i]`, and `sparse[entity.index()]` points back into `dense`.
pub struct ComponentStorage<T: Component> {
    dense: Vec<T>,
    entities: Vec<EntityId>,
    sparse: Vec<Option<usize>>,
}

impl<T: Component> ComponentStorage<T> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            entities: Vec::new(),
            sparse: Vec::new(),
        }
    }

    /// Insert a component, replacing any previous one for the same slot.
    pub fn insert(&mut self, entity: EntityId, component: T) {
        let index = entity.index() as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, None);
        }

        match self.sparse[index] {
            Some(dense_index) => {
                self.dense[dense_index] = component;
                self.entities[dense_index] = entity;
            }
            None => {
                self.sparse[index] = Some(self.dense.len());
                self.dense.push(component);
                self.entities.push(entity);
            }
        }
    }

    fn dense_index(&self, entity: EntityId) -> Option<usize> {
        let dense_index = (*self.sparse.get(entity.index() as usize)?)?;
        (self.entities[dense_index] == entity).then_some(dense_index)
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.dense_index(entity).map(|i| &self.dense[i])
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.dense_index(entity).map(|i| &mut self.dense[i])
    }

    /// Remove in O(1) by swapping the last component into the hole.
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let dense_index = self.dense_index(entity)?;
        self.sparse[entity.index() as usize] = None;

        let last_index = self.dense.len() - 1;
        if dense_index != last_index {
            let moved = self.entities[last_index];
            self.sparse[moved.index() as usize] = Some(dense_index);
        }
        self.entities.swap_remove(dense_index);
        Some(self.dense.swap_remove(dense_index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.dense_index(entity).is_some()
    }

    pub fn clear(&mut self) {
        self.dense.clear();
        self.entities.clear();
        self.sparse.clear();
    }
}

impl<T: Component> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone)]
    struct Extent(f32);

    impl Component for Extent {}

    #[test]
    fn test_insert_overwrites() {
        let mut storage = ComponentStorage::new();
        let entity = EntityId::new(0, 1);

        storage.insert(entity, Extent(1.0));
        storage.insert(entity, Extent(3.0));

        assert_eq!(storage.get(entity), Some(&Extent(3.0)));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_remove_middle_keeps_others_addressable() {
        let mut storage = ComponentStorage::new();
        let e1 = EntityId::new(0, 1);
        let e2 = EntityId::new(1, 1);
        let e3 = EntityId::new(2, 1);
        storage.insert(e1, Extent(1.0));
        storage.insert(e2, Extent(2.0));
        storage.insert(e3, Extent(3.0));

        assert_eq!(storage.remove(e2), Some(Extent(2.0)));
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.get(e1), Some(&Extent(1.0)));
        assert_eq!(storage.get(e2), None);
        assert_eq!(storage.get(e3), Some(&Extent(3.0)));
    }

    #[test]
    fn test_stale_generation_is_not_found() {
        let mut storage = ComponentStorage::new();
        storage.insert(EntityId::new(4, 2), Extent(1.0));

        assert!(!storage.contains(EntityId::new(4, 1)));
        assert_eq!(storage.remove(EntityId::new(4, 1)), None);
        assert!(storage.contains(EntityId::new(4, 2)));
    }

    #[test]
    fn test_sparse_index_gap() {
        let mut storage = ComponentStorage::new();
        let entity = EntityId::new(100, 1);
        storage.insert(entity, Extent(1.0));

        assert_eq!(storage.get(entity), Some(&Extent(1.0)));
        assert_eq!(storage.iter().count(), 1);
    }

    #[test]
    fn test_clear() {
        let mut storage = ComponentStorage::new();
        storage.insert(EntityId::new(0, 1), Extent(1.0));
        storage.clear();
        assert!(storage.is_empty());
    }
}
