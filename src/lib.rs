//! Burrow - in-process datastore emulator for local development
//!
//! Burrow reproduces the externally observable semantics of an
//! entity-group-partitioned, eventually-consistent datastore entirely
//! in memory: hierarchical keys, per-group transactions, a seeded
//! consistency policy that defers writes the way a replicated backend
//! would, index write-cost accounting, and queryable metadata
//! pseudo-kinds.
//!
//! # Quick Start
//!
//! ```
//! use burrow::{Datastore, DatastoreConfig, Entity, Key};
//!
//! let store = Datastore::new(DatastoreConfig::default())?;
//!
//! let task = Entity::new(Key::with_id("demo", "", "Task", 1))
//!     .with_property("done", false);
//! store.put(task)?;
//!
//! let found = store.get(&Key::with_id("demo", "", "Task", 1))?;
//! assert!(found.is_some());
//! # Ok::<(), burrow::Error>(())
//! ```
//!
//! # Architecture
//!
//! The facade is [`Datastore`]; everything routes through it. The
//! layers underneath mirror the crate workspace: `burrow-core` holds
//! the key/entity/value model, `burrow-storage` the tenant profiles,
//! extents, and entity-group tracking, and `burrow-engine` the
//! consistency policy, cost analyzer, pseudo-kinds, transactions, and
//! query execution.

pub use burrow_core::{
    Entity, Error, Identifier, Index, IndexDirection, IndexProperty, Key, Mutation, PathElement,
    Property, PropertyValue, Result, KEY_PROPERTY,
};
pub use burrow_engine::{
    write_cost, CommitResult, ConsistencyPolicy, Cursor, Datastore, DatastoreConfig, Filter,
    FilterOp, IdRange, Order, PseudoGet, PutResult, Query, QueryResult, Transaction,
    TransactionState, WriteCost, EMPTY_NAMESPACE_ID, ENTITY_GROUP_ID, ENTITY_GROUP_KIND,
    NAMESPACE_KIND, VERSION_PROPERTY,
};
pub use burrow_storage::StoredIndex;
