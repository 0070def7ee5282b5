//! Index write-cost accounting
//!
//! Computes how many index rows a write touches: the two built-in
//! single-property indexes (ascending and descending) implied for every
//! property name, plus every declared composite index covering the kind,
//! plus the one-off "all entities of kind" row on an entity's first
//! write.
//!
//! Everything here is a pure function of (old entity or absent, new
//! entity, declared index set), with no hidden state, which keeps the
//! formulas directly property-testable.

use burrow_core::{Entity, Index, PropertyValue};
use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, BTreeSet};

/// Billing-simulation figure for one write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCost {
    /// Entity rows written (0 for a no-op, otherwise 1)
    pub entity_writes: u64,
    /// Index rows added or removed
    pub index_writes: u64,
}

impl std::ops::Add for WriteCost {
    type Output = WriteCost;

    fn add(self, rhs: WriteCost) -> WriteCost {
        WriteCost {
            entity_writes: self.entity_writes + rhs.entity_writes,
            index_writes: self.index_writes + rhs.index_writes,
        }
    }
}

impl std::ops::AddAssign for WriteCost {
    fn add_assign(&mut self, rhs: WriteCost) {
        *self = *self + rhs;
    }
}

type UniqueValues<'a> = BTreeMap<&'a str, BTreeSet<&'a PropertyValue>>;

/// Distinct values recorded under `name`
fn count(values: &UniqueValues<'_>, name: &str) -> u64 {
    values.get(name).map_or(0, |set| set.len() as u64)
}

/// Distinct values recorded under `name` in both sets
fn common_count(old: &UniqueValues<'_>, new: &UniqueValues<'_>, name: &str) -> u64 {
    match (old.get(name), new.get(name)) {
        (Some(a), Some(b)) => a.intersection(b).count() as u64,
        _ => 0,
    }
}

/// Compute the write cost of replacing `old` (or nothing) with `new`
///
/// `indexes` is the set of declared composite indexes covering the
/// entity's kind; the built-in single-property indexes are implied and
/// need not be declared.
pub fn write_cost(old: Option<&Entity>, new: &Entity, indexes: &[Index]) -> WriteCost {
    // Property-for-property equal entities are a no-op.
    if let Some(old) = old {
        if old.same_properties(new) {
            return WriteCost::default();
        }
    }

    let old_values = old.map(Entity::unique_values).unwrap_or_default();
    let new_values = new.unique_values();

    let mut index_writes = 0u64;

    // Built-in indexes: every property name appearing on either entity
    // implies one ascending and one descending single-property index.
    let names: FxHashSet<&str> = old_values.keys().chain(new_values.keys()).copied().collect();
    for name in names {
        let old_n = count(&old_values, name);
        let new_n = count(&new_values, name);
        let common = common_count(&old_values, &new_values, name);
        index_writes += 2 * ((old_n - common) + (new_n - common));
    }

    // Declared composite indexes: counts are products across the index's
    // property list of the distinct values in each respective set.
    for index in indexes {
        let mut old_rows = 1u64;
        let mut new_rows = 1u64;
        let mut common_rows = 1u64;
        for name in index.property_names() {
            old_rows *= count(&old_values, name);
            new_rows *= count(&new_values, name);
            common_rows *= common_count(&old_values, &new_values, name);
        }
        let mut writes = (old_rows - common_rows) + (new_rows - common_rows);
        // Ancestor scoping multiplies rows by the ancestor path length;
        // irrelevant for single-property indexes.
        if index.ancestor && index.properties.len() > 1 {
            writes *= new.key.path.len() as u64;
        }
        index_writes += writes;
    }

    // First write pays for the implicit "all entities of kind" row.
    if old.is_none() {
        index_writes += 1;
    }

    WriteCost {
        entity_writes: 1,
        index_writes,
    }
}
