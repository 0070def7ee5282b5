//! The `__entity_group__` pseudo-kind
//!
//! Exposes each entity group's version counter as a synthetic entity.
//! The metadata key for group root R is R's child with kind
//! `__entity_group__` and numeric id [`ENTITY_GROUP_ID`](super::ENTITY_GROUP_ID);
//! the entity carries a single `__version__` property equal to the
//! group's internal counter plus a large constant offset derived from
//! engine start time, keeping reported versions monotonic across process
//! restarts without persisting anything.

use super::range::KeyRange;
use super::{ENTITY_GROUP_ID, ENTITY_GROUP_KIND, VERSION_PROPERTY};
use burrow_core::{Entity, Error, Identifier, Key, PropertyValue, Result};
use burrow_storage::GroupTracker;
use std::sync::Arc;

/// Handler computing entity-group metadata from live group state
#[derive(Debug)]
pub struct EntityGroupPseudoKind {
    groups: Arc<GroupTracker>,
    base_version: u64,
}

impl EntityGroupPseudoKind {
    /// Create a handler over the engine's group tracker
    ///
    /// `base_version` is added to every reported version; the facade
    /// derives it from wall-clock time at engine construction.
    pub fn new(groups: Arc<GroupTracker>, base_version: u64) -> Self {
        EntityGroupPseudoKind {
            groups,
            base_version,
        }
    }

    /// Metadata key for one group root
    pub fn key_for(root: &Key) -> Key {
        root.child_id(ENTITY_GROUP_KIND, ENTITY_GROUP_ID)
    }

    /// Group root a well-formed metadata key refers to
    ///
    /// # Errors
    ///
    /// `Error::BadKey` when the key is not a direct child of a group
    /// root or does not carry the canonical numeric id.
    fn root_of(key: &Key) -> Result<Key> {
        if key.path.len() != 2 {
            return Err(Error::BadKey(format!(
                "{} keys are direct children of a group root, got {}",
                ENTITY_GROUP_KIND, key
            )));
        }
        if key.path[1].id != Identifier::Id(ENTITY_GROUP_ID) {
            return Err(Error::BadKey(format!(
                "{} keys carry id {}, got {}",
                ENTITY_GROUP_KIND, ENTITY_GROUP_ID, key.path[1].id
            )));
        }
        Ok(key.root())
    }

    fn metadata_entity(&self, key: Key, version: u64) -> Entity {
        Entity::new(key).with_property(
            VERSION_PROPERTY,
            PropertyValue::I64((self.base_version + version) as i64),
        )
    }

    /// Look up one group's metadata entity by key
    pub fn get(&self, key: &Key) -> Result<Option<Entity>> {
        let root = Self::root_of(key)?;
        Ok(self
            .groups
            .get(&root)
            .map(|group| self.metadata_entity(key.clone(), group.lock().version)))
    }

    /// Metadata entities for every group of (`app`, `namespace`) inside
    /// `range`, in key order
    pub fn scan(&self, app: &str, namespace: &str, range: &KeyRange) -> Vec<Entity> {
        // roots() is already key-ordered and the metadata key is a
        // fixed-suffix child, so the output order is inherited.
        self.groups
            .roots()
            .into_iter()
            .filter(|root| root.app == app && root.namespace == namespace)
            .filter_map(|root| {
                let key = Self::key_for(&root);
                if !range.contains(&key) {
                    return None;
                }
                let version = self.groups.get(&root)?.lock().version;
                Some(self.metadata_entity(key, version))
            })
            .collect()
    }
}
