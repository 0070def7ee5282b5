//! Property value types
//!
//! This module defines `PropertyValue`, the closed enum of values a
//! property can hold. Unlike a generic JSON value, property values need
//! a deterministic **total order** and hashability: the cost analyzer
//! dedupes properties by (name, value), and the query engine sorts and
//! range-compares values. Floats therefore use IEEE-754 total ordering
//! (`f64::total_cmp`) and hash by bit pattern, which makes `NaN == NaN`
//! here, departing from IEEE equality so values can live in sets and
//! maps.
//!
//! Values of different variants never compare equal; cross-variant
//! ordering follows a fixed variant rank (Null < I64 < F64 < Bool <
//! String < Blob < Timestamp < Key).

use crate::key::Key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Value held by one entity property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Explicit null
    Null,
    /// 64-bit signed integer
    I64(i64),
    /// 64-bit float, totally ordered via `total_cmp`
    F64(f64),
    /// Boolean
    Bool(bool),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Blob(Vec<u8>),
    /// Point in time (UTC)
    Timestamp(DateTime<Utc>),
    /// Reference to another entity
    Key(Key),
}

impl PropertyValue {
    /// Variant name, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "Null",
            PropertyValue::I64(_) => "I64",
            PropertyValue::F64(_) => "F64",
            PropertyValue::Bool(_) => "Bool",
            PropertyValue::String(_) => "String",
            PropertyValue::Blob(_) => "Blob",
            PropertyValue::Timestamp(_) => "Timestamp",
            PropertyValue::Key(_) => "Key",
        }
    }

    /// Rank used for cross-variant ordering
    fn rank(&self) -> u8 {
        match self {
            PropertyValue::Null => 0,
            PropertyValue::I64(_) => 1,
            PropertyValue::F64(_) => 2,
            PropertyValue::Bool(_) => 3,
            PropertyValue::String(_) => 4,
            PropertyValue::Blob(_) => 5,
            PropertyValue::Timestamp(_) => 6,
            PropertyValue::Key(_) => 7,
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropertyValue {}

impl Ord for PropertyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use PropertyValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (I64(a), I64(b)) => a.cmp(b),
            (F64(a), F64(b)) => a.total_cmp(b),
            (Bool(a), Bool(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Blob(a), Blob(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (Key(a), Key(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for PropertyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            PropertyValue::Null => {}
            PropertyValue::I64(v) => v.hash(state),
            // Bit pattern, consistent with total_cmp equality
            PropertyValue::F64(v) => v.to_bits().hash(state),
            PropertyValue::Bool(v) => v.hash(state),
            PropertyValue::String(v) => v.hash(state),
            PropertyValue::Blob(v) => v.hash(state),
            PropertyValue::Timestamp(v) => v.hash(state),
            PropertyValue::Key(v) => v.hash(state),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::I64(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::F64(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<Key> for PropertyValue {
    fn from(v: Key) -> Self {
        PropertyValue::Key(v)
    }
}
