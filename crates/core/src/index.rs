//! Composite index definitions
//!
//! An index definition names a kind, an ordered list of (property,
//! direction) pairs, and whether the index is scoped per ancestor path.
//! Definitions are pure data; the engine assigns ids when an index is
//! created and consults the declared set during write-cost accounting.

use serde::{Deserialize, Serialize};

/// Sort direction of one indexed property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexDirection {
    /// Ascending order
    Ascending,
    /// Descending order
    Descending,
}

/// One (property, direction) pair of an index definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexProperty {
    /// Property name
    pub name: String,
    /// Sort direction
    pub direction: IndexDirection,
}

impl IndexProperty {
    /// Ascending index property
    pub fn ascending(name: impl Into<String>) -> Self {
        IndexProperty {
            name: name.into(),
            direction: IndexDirection::Ascending,
        }
    }

    /// Descending index property
    pub fn descending(name: impl Into<String>) -> Self {
        IndexProperty {
            name: name.into(),
            direction: IndexDirection::Descending,
        }
    }
}

/// A declared composite index over one kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    /// Kind the index covers
    pub kind: String,
    /// Whether the index is scoped per ancestor path
    pub ancestor: bool,
    /// Indexed properties, in index order
    pub properties: Vec<IndexProperty>,
}

impl Index {
    /// Create an index definition
    pub fn new(kind: impl Into<String>, ancestor: bool, properties: Vec<IndexProperty>) -> Self {
        Index {
            kind: kind.into(),
            ancestor,
            properties,
        }
    }

    /// Names of the indexed properties, in index order
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }
}
