//! Entities, properties, and mutations
//!
//! An entity is a key plus an ordered multiset of named properties. The
//! same name may appear several times (a repeated property); the
//! `multiple` flag records whether repetition is expected for that name.
//!
//! `unique_values` is the normalization used by index accounting: values
//! are deduplicated per (name, value) pair and the `multiple` flag is
//! dropped, so multiplicity alone never makes two entities look different
//! to an index.

use crate::key::Key;
use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One named property of an entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Property value
    pub value: PropertyValue,
    /// Whether repeated values are expected for this name
    pub multiple: bool,
}

impl Property {
    /// Create a single-valued property
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Property {
            name: name.into(),
            value: value.into(),
            multiple: false,
        }
    }

    /// Create a repeated-value property
    pub fn repeated(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Property {
            name: name.into(),
            value: value.into(),
            multiple: true,
        }
    }
}

/// A key plus an ordered multiset of properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Identifying key; also determines the owning entity group
    pub key: Key,
    /// Properties in insertion order; names may repeat
    pub properties: Vec<Property>,
}

impl Entity {
    /// Create an entity with no properties
    pub fn new(key: Key) -> Self {
        Entity {
            key,
            properties: Vec::new(),
        }
    }

    /// Append a property (builder style)
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push(Property::new(name, value));
        self
    }

    /// Append a repeated property (builder style)
    pub fn with_repeated_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.push(Property::repeated(name, value));
        self
    }

    /// First value stored under `name`, if any
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// All values stored under `name`, in insertion order
    pub fn property_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PropertyValue> {
        self.properties
            .iter()
            .filter(move |p| p.name == name)
            .map(|p| &p.value)
    }

    /// Distinct values per property name, multiplicity and `multiple`
    /// flag normalized away
    pub fn unique_values(&self) -> BTreeMap<&str, BTreeSet<&PropertyValue>> {
        let mut map: BTreeMap<&str, BTreeSet<&PropertyValue>> = BTreeMap::new();
        for prop in &self.properties {
            map.entry(prop.name.as_str()).or_default().insert(&prop.value);
        }
        map
    }

    /// Property-for-property equality ignoring ordering
    ///
    /// Compares the two property multisets: the same (name, value,
    /// multiple) triples with the same multiplicities, in any order.
    pub fn same_properties(&self, other: &Entity) -> bool {
        if self.properties.len() != other.properties.len() {
            return false;
        }
        let mut mine: Vec<&Property> = self.properties.iter().collect();
        let mut theirs: Vec<&Property> = other.properties.iter().collect();
        mine.sort();
        theirs.sort();
        mine == theirs
    }
}

/// One put-or-delete unit
///
/// Transaction logs and unapplied jobs are sequences of mutations; a
/// mutation always targets exactly one entity group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Install or replace an entity
    Put(Entity),
    /// Remove the entity at a key
    Delete(Key),
}

impl Mutation {
    /// Key the mutation targets
    pub fn key(&self) -> &Key {
        match self {
            Mutation::Put(entity) => &entity.key,
            Mutation::Delete(key) => key,
        }
    }

    /// Entity group the mutation belongs to
    pub fn group(&self) -> Key {
        self.key().root()
    }
}
