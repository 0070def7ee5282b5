//! Burrow engine: consistency simulation, cost accounting, pseudo-kinds,
//! transactions, and the service facade
//!
//! The engine reproduces the externally observable semantics of a
//! distributed, entity-group-partitioned, eventually-consistent
//! datastore, entirely in process:
//!
//! - [`ConsistencyPolicy`]: seeded, deterministic apply/defer decisions
//!   simulating the replication window of the real backend.
//! - [`cost`]: pure write-cost accounting over built-in and declared
//!   composite indexes.
//! - [`pseudo`]: synthetic, queryable metadata kinds (`__namespace__`,
//!   `__entity_group__`) computed from live engine state.
//! - [`Transaction`]: single-entity-group mutation logs with an
//!   ACTIVE → COMMITTED | ROLLED_BACK lifecycle.
//! - [`Datastore`]: the facade tying it all together: get/put/delete,
//!   queries, transactions, index DDL, and id allocation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod consistency;
pub mod cost;
pub mod datastore;
pub mod pseudo;
pub mod query;
pub mod transaction;

pub use config::DatastoreConfig;
pub use consistency::ConsistencyPolicy;
pub use cost::{write_cost, WriteCost};
pub use datastore::{CommitResult, Datastore, IdRange, PutResult};
pub use pseudo::{
    PseudoGet, PseudoKindRegistry, EMPTY_NAMESPACE_ID, ENTITY_GROUP_ID, ENTITY_GROUP_KIND,
    NAMESPACE_KIND, VERSION_PROPERTY,
};
pub use query::{Cursor, Filter, FilterOp, Order, Query, QueryResult};
pub use transaction::{Transaction, TransactionState};
