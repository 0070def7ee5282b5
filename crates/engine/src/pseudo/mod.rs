//! Pseudo-kinds: synthetic, queryable metadata collections
//!
//! A pseudo-kind is a reserved kind name answered from live engine state
//! instead of stored rows. The registry maps kind names to handlers; a
//! kind name registered here can never also exist as a physical extent
//! kind: the facade rejects writes to reserved kinds, and registering
//! the same name twice is a fatal configuration error that panics at
//! startup.
//!
//! Handlers form a closed set, modeled as an enum rather than trait
//! objects; the shared key-range parsing in [`range`] runs before
//! dispatch so concrete handlers only ever see a clean bound pair.

pub mod entity_groups;
pub mod namespaces;
pub mod range;

pub use entity_groups::EntityGroupPseudoKind;
pub use namespaces::NamespacePseudoKind;
pub use range::{parse_key_query, KeyBound, KeyRange};

use crate::query::{self, Query, QueryResult};
use burrow_core::{Entity, Key, Result};
use rustc_hash::FxHashMap;

/// Reserved kind listing the namespaces used by an application
pub const NAMESPACE_KIND: &str = "__namespace__";
/// Reserved kind exposing entity-group versions
pub const ENTITY_GROUP_KIND: &str = "__entity_group__";
/// Reserved property carrying a group's version
pub const VERSION_PROPERTY: &str = "__version__";
/// Sentinel numeric id standing for the empty namespace
pub const EMPTY_NAMESPACE_ID: i64 = 1;
/// Fixed numeric id of every entity-group metadata key
pub const ENTITY_GROUP_ID: i64 = 1;

/// Outcome of a pseudo-kind point lookup
///
/// Distinguishes "this kind is not a pseudo-kind" (the caller falls
/// through to ordinary storage) from "this is a pseudo-kind but nothing
/// exists at this key".
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoGet {
    /// The key's kind is not registered; consult ordinary storage
    NotPseudo,
    /// The synthetic entity at this key
    Found(Entity),
    /// A pseudo-kind, but no entity exists at this key
    Missing,
}

/// One registered pseudo-kind handler
#[derive(Debug)]
pub enum PseudoKind {
    /// Namespace listing
    Namespaces(NamespacePseudoKind),
    /// Entity-group metadata
    EntityGroups(EntityGroupPseudoKind),
}

impl PseudoKind {
    /// Reserved kind name this handler answers for
    pub fn kind_name(&self) -> &'static str {
        match self {
            PseudoKind::Namespaces(_) => NAMESPACE_KIND,
            PseudoKind::EntityGroups(_) => ENTITY_GROUP_KIND,
        }
    }

    fn get(&self, key: &Key) -> Result<Option<Entity>> {
        match self {
            PseudoKind::Namespaces(handler) => handler.get(key),
            PseudoKind::EntityGroups(handler) => handler.get(key),
        }
    }

    fn scan(&self, app: &str, namespace: &str, key_range: &KeyRange) -> Vec<Entity> {
        match self {
            // Namespace listings are application-wide; the synthetic
            // keys live in the default namespace regardless of the
            // querying namespace.
            PseudoKind::Namespaces(handler) => handler.scan(app, key_range),
            PseudoKind::EntityGroups(handler) => handler.scan(app, namespace, key_range),
        }
    }
}

/// Kind-name to handler map consulted before ordinary storage
#[derive(Debug, Default)]
pub struct PseudoKindRegistry {
    handlers: FxHashMap<&'static str, PseudoKind>,
}

impl PseudoKindRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        PseudoKindRegistry::default()
    }

    /// Register a handler under its reserved kind name
    ///
    /// # Panics
    ///
    /// Panics on a duplicate kind name; this is a startup-time
    /// configuration error, not a recoverable condition.
    pub fn register(&mut self, handler: PseudoKind) {
        let kind = handler.kind_name();
        if self.handlers.insert(kind, handler).is_some() {
            panic!("duplicate pseudo-kind registration: {}", kind);
        }
    }

    /// True if `kind` is a reserved pseudo-kind name
    pub fn is_pseudo_kind(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Answer a query if its kind is a pseudo-kind
    ///
    /// Returns `None` when the kind is not registered, letting the
    /// caller fall through to ordinary storage. Otherwise the query's
    /// constraints are folded into a key range (request error on
    /// unsupported filters/orders) and the handler's bounded scan is
    /// paginated like any other result sequence.
    pub fn run_query(&self, query: &Query) -> Option<Result<QueryResult>> {
        let handler = self.handlers.get(query.kind.as_str())?;
        Some(parse_key_query(query).map(|key_range| {
            let entities = handler.scan(&query.app, &query.namespace, &key_range);
            query::paginate(entities, query)
        }))
    }

    /// Answer a point lookup if the key's kind is a pseudo-kind
    pub fn get(&self, key: &Key) -> Result<PseudoGet> {
        let Some(leaf) = key.leaf() else {
            return Ok(PseudoGet::NotPseudo);
        };
        let Some(handler) = self.handlers.get(leaf.kind.as_str()) else {
            return Ok(PseudoGet::NotPseudo);
        };
        Ok(match handler.get(key)? {
            Some(entity) => PseudoGet::Found(entity),
            None => PseudoGet::Missing,
        })
    }
}
