//! Core types for Burrow
//!
//! This crate defines the foundational types used throughout the emulator:
//! - Key: application/namespace-scoped entity path with a total order
//! - Identifier/PathElement: the (kind, id-or-name) building blocks of paths
//! - Entity/Property: an entity is a key plus an ordered multiset of properties
//! - PropertyValue: closed value enum with a deterministic cross-variant order
//! - Index: composite index definitions (property list + direction + ancestor flag)
//! - Mutation: a put-or-delete unit carried by transaction logs and unapplied jobs
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod error;
pub mod index;
pub mod key;
pub mod value;

pub use entity::{Entity, Mutation, Property};
pub use error::{Error, Result};
pub use index::{Index, IndexDirection, IndexProperty};
pub use key::{Identifier, Key, PathElement, KEY_PROPERTY};
pub use value::PropertyValue;
