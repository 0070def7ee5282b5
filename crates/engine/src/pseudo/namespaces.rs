//! The `__namespace__` pseudo-kind
//!
//! Lists every namespace string used anywhere in an application's data as
//! synthetic, property-less entities. A non-empty namespace is keyed by
//! its name; the empty (default) namespace is keyed by the sentinel
//! numeric id [`EMPTY_NAMESPACE_ID`](super::EMPTY_NAMESPACE_ID), since a
//! key cannot carry an empty name. The synthetic keys themselves live in
//! the default namespace.

use super::range::KeyRange;
use super::{EMPTY_NAMESPACE_ID, NAMESPACE_KIND};
use burrow_core::{Entity, Error, Identifier, Key, Result};
use burrow_storage::Profiles;
use std::sync::Arc;

/// Handler computing namespace listings from live extent state
#[derive(Debug)]
pub struct NamespacePseudoKind {
    profiles: Arc<Profiles>,
}

impl NamespacePseudoKind {
    /// Create a handler over the engine's profile set
    pub fn new(profiles: Arc<Profiles>) -> Self {
        NamespacePseudoKind { profiles }
    }

    /// Synthetic key for one namespace string
    pub fn key_for(app: &str, namespace: &str) -> Key {
        if namespace.is_empty() {
            Key::with_id(app, "", NAMESPACE_KIND, EMPTY_NAMESPACE_ID)
        } else {
            Key::with_name(app, "", NAMESPACE_KIND, namespace)
        }
    }

    /// Namespace string a well-formed pseudo-kind key refers to
    ///
    /// # Errors
    ///
    /// `Error::BadKey` for nested paths, numeric ids other than the
    /// empty-namespace sentinel, and empty names.
    fn namespace_of(key: &Key) -> Result<String> {
        if key.path.len() != 1 {
            return Err(Error::BadKey(format!(
                "{} keys have a single path element, got {}",
                NAMESPACE_KIND, key
            )));
        }
        match &key.path[0].id {
            Identifier::Id(id) if *id == EMPTY_NAMESPACE_ID => Ok(String::new()),
            Identifier::Id(id) => Err(Error::BadKey(format!(
                "the empty namespace is keyed by id {}, got id {}",
                EMPTY_NAMESPACE_ID, id
            ))),
            Identifier::Name(name) if !name.is_empty() => Ok(name.clone()),
            Identifier::Name(_) => Err(Error::BadKey(format!(
                "{} names must be non-empty",
                NAMESPACE_KIND
            ))),
        }
    }

    /// Look up one namespace entity by key
    pub fn get(&self, key: &Key) -> Result<Option<Entity>> {
        let namespace = Self::namespace_of(key)?;
        let exists = self
            .profiles
            .get(&key.app)
            .is_some_and(|profile| profile.namespaces().contains(&namespace));
        Ok(exists.then(|| Entity::new(key.clone())))
    }

    /// All namespace entities of `app` inside `range`, in key order
    pub fn scan(&self, app: &str, range: &KeyRange) -> Vec<Entity> {
        let Some(profile) = self.profiles.get(app) else {
            return Vec::new();
        };
        let mut entities: Vec<Entity> = profile
            .namespaces()
            .iter()
            .map(|namespace| Self::key_for(app, namespace))
            .filter(|key| range.contains(key))
            .map(Entity::new)
            .collect();
        entities.sort_by(|a, b| a.key.cmp(&b.key));
        entities
    }
}
