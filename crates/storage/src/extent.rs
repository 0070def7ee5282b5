//! Extents: the per-kind entity collections
//!
//! An extent is the full in-memory collection of entities of one kind
//! within one application, ordered by key. Scans take the read lock;
//! installs and removals take the write lock. Entities are cloned out so
//! readers never hold the lock across engine logic.

use burrow_core::{Entity, Key};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Ordered in-memory collection of all entities of one kind
#[derive(Debug, Default)]
pub struct Extent {
    entities: RwLock<BTreeMap<Key, Entity>>,
}

impl Extent {
    /// Create an empty extent
    pub fn new() -> Self {
        Extent::default()
    }

    /// Look up one entity by key
    pub fn get(&self, key: &Key) -> Option<Entity> {
        self.entities.read().get(key).cloned()
    }

    /// Install or replace an entity, returning the previous state
    pub fn install(&self, entity: Entity) -> Option<Entity> {
        self.entities.write().insert(entity.key.clone(), entity)
    }

    /// Remove the entity at `key`, returning it if present
    pub fn remove(&self, key: &Key) -> Option<Entity> {
        self.entities.write().remove(key)
    }

    /// True if an entity exists at `key`
    pub fn contains(&self, key: &Key) -> bool {
        self.entities.read().contains_key(key)
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// True if no entities are stored
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Copy of all entities, in key order
    ///
    /// Structural scans (queries, pseudo-kind handlers) work on this
    /// snapshot so they never observe a half-applied job.
    pub fn snapshot(&self) -> Vec<Entity> {
        self.entities.read().values().cloned().collect()
    }

    /// All stored keys, in order
    pub fn keys(&self) -> Vec<Key> {
        self.entities.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(id: i64) -> Key {
        Key::with_id("app", "", "Task", id)
    }

    #[test]
    fn test_install_get_remove() {
        let extent = Extent::new();
        assert!(extent.is_empty());

        let entity = Entity::new(key(1)).with_property("done", false);
        assert!(extent.install(entity.clone()).is_none());
        assert_eq!(extent.get(&key(1)), Some(entity.clone()));
        assert!(extent.contains(&key(1)));
        assert_eq!(extent.len(), 1);

        let replacement = Entity::new(key(1)).with_property("done", true);
        let old = extent.install(replacement.clone());
        assert_eq!(old, Some(entity));
        assert_eq!(extent.get(&key(1)), Some(replacement));

        assert!(extent.remove(&key(1)).is_some());
        assert!(extent.get(&key(1)).is_none());
        assert!(extent.remove(&key(1)).is_none());
    }

    #[test]
    fn test_snapshot_is_key_ordered() {
        let extent = Extent::new();
        for id in [5, 1, 3, 2, 4] {
            extent.install(Entity::new(key(id)));
        }

        let ids: Vec<_> = extent
            .snapshot()
            .iter()
            .map(|e| e.key.leaf().unwrap().id.clone())
            .collect();
        let keys = extent.keys();
        assert_eq!(keys.len(), 5);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_snapshot_detached_from_store() {
        let extent = Extent::new();
        extent.install(Entity::new(key(1)));
        let snap = extent.snapshot();
        extent.install(Entity::new(key(2)));
        assert_eq!(snap.len(), 1);
        assert_eq!(extent.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_keys_ordered_for_any_insertion_order(
            ids in prop::collection::vec(any::<i64>(), 0..32),
        ) {
            let extent = Extent::new();
            for id in &ids {
                extent.install(Entity::new(key(*id)));
            }
            let keys = extent.keys();
            prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));

            let distinct: std::collections::BTreeSet<_> = ids.iter().collect();
            prop_assert_eq!(keys.len(), distinct.len());
        }
    }
}
