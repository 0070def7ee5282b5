//! In-memory state for Burrow
//!
//! This crate holds the mutable state the engine operates on, with the
//! locking discipline the emulator relies on:
//!
//! - [`Extent`]: all entities of one kind in one application, ordered by
//!   key, behind a `parking_lot::RwLock` (shared scans, exclusive
//!   installs).
//! - [`Profile`]: per-application container of extents, declared
//!   composite indexes, and id-allocation counters; applications and
//!   extents are created lazily on first write.
//! - [`GroupState`]/[`GroupTracker`]: per-entity-group version counter,
//!   unapplied-job queue, and active-transaction slot, each group behind
//!   its own `parking_lot::Mutex`.
//!
//! Nothing here touches disk; the emulator is explicitly non-durable.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod extent;
pub mod group;
pub mod profile;

pub use extent::Extent;
pub use group::{GroupState, GroupTracker, UnappliedJob};
pub use profile::{Profile, Profiles, StoredIndex};
