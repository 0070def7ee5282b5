//! Per-application profiles
//!
//! A profile holds everything one application owns: one extent per kind,
//! the declared composite indexes (with their assigned ids), and the
//! per-kind id-allocation counters. Profiles and extents are created
//! lazily on the first write for an application and never deleted.

use crate::extent::Extent;
use burrow_core::{Entity, Error, Index, Key, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A declared composite index with its assigned id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIndex {
    /// Engine-assigned index id
    pub id: u64,
    /// The index definition
    pub index: Index,
}

/// Per-application container of extents, indexes, and id counters
#[derive(Debug)]
pub struct Profile {
    app: String,
    extents: DashMap<String, Arc<Extent>>,
    indexes: RwLock<Vec<StoredIndex>>,
    next_index_id: AtomicU64,
    id_counters: DashMap<String, Arc<AtomicI64>>,
}

impl Profile {
    /// Create an empty profile for `app`
    pub fn new(app: impl Into<String>) -> Self {
        Profile {
            app: app.into(),
            extents: DashMap::new(),
            indexes: RwLock::new(Vec::new()),
            next_index_id: AtomicU64::new(1),
            id_counters: DashMap::new(),
        }
    }

    /// Owning application id
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Extent for `kind`, if any entity of that kind was ever written
    pub fn extent(&self, kind: &str) -> Option<Arc<Extent>> {
        self.extents.get(kind).map(|e| Arc::clone(&e))
    }

    /// Extent for `kind`, created lazily on first use
    pub fn extent_or_create(&self, kind: &str) -> Arc<Extent> {
        if let Some(extent) = self.extents.get(kind) {
            return Arc::clone(&extent);
        }
        let created = self
            .extents
            .entry(kind.to_string())
            .or_insert_with(|| {
                debug!(app = %self.app, kind, "creating extent");
                Arc::new(Extent::new())
            });
        Arc::clone(&created)
    }

    /// All kinds with an extent, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.extents.iter().map(|e| e.key().clone()).collect();
        kinds.sort();
        kinds
    }

    /// Every namespace string used anywhere in this application's data
    ///
    /// Computed from live extent state; the empty string is included when
    /// entities exist in the default namespace.
    pub fn namespaces(&self) -> BTreeSet<String> {
        let mut namespaces = BTreeSet::new();
        for extent in self.extents.iter() {
            for key in extent.value().keys() {
                namespaces.insert(key.namespace);
            }
        }
        namespaces
    }

    /// All entities of `kind` whose key has `root` as ancestor
    pub fn entities_in_group(&self, kind: &str, root: &Key) -> Vec<Entity> {
        match self.extent(kind) {
            Some(extent) => extent
                .snapshot()
                .into_iter()
                .filter(|e| e.key.has_ancestor(root))
                .collect(),
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Composite indexes
    // ------------------------------------------------------------------

    /// Declare a composite index, returning its assigned id
    pub fn create_index(&self, index: Index) -> u64 {
        let id = self.next_index_id.fetch_add(1, Ordering::SeqCst);
        self.indexes.write().push(StoredIndex { id, index });
        id
    }

    /// Remove a declared index by id
    pub fn drop_index(&self, id: u64) -> Result<()> {
        let mut indexes = self.indexes.write();
        let before = indexes.len();
        indexes.retain(|stored| stored.id != id);
        if indexes.len() == before {
            return Err(Error::IndexNotFound(id));
        }
        Ok(())
    }

    /// All declared indexes, in creation order
    pub fn indexes(&self) -> Vec<StoredIndex> {
        self.indexes.read().clone()
    }

    /// Declared index definitions covering `kind`
    pub fn indexes_for_kind(&self, kind: &str) -> Vec<Index> {
        self.indexes
            .read()
            .iter()
            .filter(|stored| stored.index.kind == kind)
            .map(|stored| stored.index.clone())
            .collect()
    }

    // ------------------------------------------------------------------
    // Id allocation
    // ------------------------------------------------------------------

    /// Allocate `count` consecutive ids for `kind`, returning the
    /// inclusive (start, end) range
    ///
    /// The same counter feeds both explicit allocation requests and
    /// completion of incomplete keys at put time, so the two can never
    /// collide.
    pub fn allocate_ids(&self, kind: &str, count: u64) -> (i64, i64) {
        let counter = self
            .id_counters
            .entry(kind.to_string())
            .or_insert_with(|| Arc::new(AtomicI64::new(1)));
        let start = counter.fetch_add(count as i64, Ordering::SeqCst);
        (start, start + count as i64 - 1)
    }
}

/// All known application profiles, created lazily on first write
#[derive(Debug, Default)]
pub struct Profiles {
    map: DashMap<String, Arc<Profile>>,
}

impl Profiles {
    /// Create an empty profile set
    pub fn new() -> Self {
        Profiles::default()
    }

    /// Profile for `app`, if the application has ever written data
    pub fn get(&self, app: &str) -> Option<Arc<Profile>> {
        self.map.get(app).map(|p| Arc::clone(&p))
    }

    /// Profile for `app`, created lazily
    pub fn get_or_create(&self, app: &str) -> Arc<Profile> {
        if let Some(profile) = self.map.get(app) {
            return Arc::clone(&profile);
        }
        let created = self
            .map
            .entry(app.to_string())
            .or_insert_with(|| {
                debug!(app, "creating profile");
                Arc::new(Profile::new(app))
            });
        Arc::clone(&created)
    }

    /// All known application ids, sorted
    pub fn apps(&self) -> Vec<String> {
        let mut apps: Vec<String> = self.map.iter().map(|p| p.key().clone()).collect();
        apps.sort();
        apps
    }

    /// Lookup-free iteration support for tests
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if no application has written yet
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
