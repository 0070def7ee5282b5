//! Entity group state
//!
//! Each entity group owns a monotonically increasing version counter, a
//! FIFO queue of unapplied jobs, and an at-most-one active-transaction
//! slot. All three live behind one mutex per group: writes to a group
//! serialize on that mutex while reads of unrelated groups proceed
//! unblocked.
//!
//! Groups are created on first use under a given root and never deleted;
//! an emptied group persists, version counter intact.

use burrow_core::{Error, Key, Mutation, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// A committed mutation log whose application was deferred
///
/// Simulates the replication delay of the emulated backend: the job is
/// durable from the caller's point of view but not yet visible, until a
/// later read rolls it forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnappliedJob {
    /// Mutations, in commit order
    pub mutations: Vec<Mutation>,
}

/// Mutable state of one entity group
#[derive(Debug, Default)]
pub struct GroupState {
    /// Applied-mutation version counter; strictly increases on every
    /// applied job and is untouched by deferred or rolled-back work
    pub version: u64,
    /// Deferred jobs, oldest first
    pub unapplied: VecDeque<UnappliedJob>,
    /// Handle of the transaction currently holding this group, if any
    pub active_txn: Option<u64>,
}

impl GroupState {
    /// Claim the group for transaction `txn_id`
    ///
    /// Idempotent for the holder; any other holder produces a
    /// `TransactionConflict` carrying the group root.
    pub fn claim(&mut self, txn_id: u64, root: &Key) -> Result<()> {
        match self.active_txn {
            None => {
                self.active_txn = Some(txn_id);
                Ok(())
            }
            Some(holder) if holder == txn_id => Ok(()),
            Some(holder) => {
                debug!(%root, holder, contender = txn_id, "entity group contention");
                Err(Error::TransactionConflict { root: root.clone() })
            }
        }
    }

    /// Release the group if `txn_id` holds it
    pub fn release(&mut self, txn_id: u64) {
        if self.active_txn == Some(txn_id) {
            self.active_txn = None;
        }
    }

    /// True if at least one deferred job is queued
    pub fn has_unapplied(&self) -> bool {
        !self.unapplied.is_empty()
    }
}

/// All known entity groups, keyed by root
#[derive(Debug, Default)]
pub struct GroupTracker {
    groups: DashMap<Key, Arc<Mutex<GroupState>>>,
}

impl GroupTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        GroupTracker::default()
    }

    /// Group state for `root`, created on first use
    pub fn group(&self, root: &Key) -> Arc<Mutex<GroupState>> {
        if let Some(group) = self.groups.get(root) {
            return Arc::clone(&group);
        }
        let created = self
            .groups
            .entry(root.clone())
            .or_insert_with(|| Arc::new(Mutex::new(GroupState::default())));
        Arc::clone(&created)
    }

    /// Group state for `root`, if the group was ever written
    pub fn get(&self, root: &Key) -> Option<Arc<Mutex<GroupState>>> {
        self.groups.get(root).map(|g| Arc::clone(&g))
    }

    /// All known group roots, in key order
    pub fn roots(&self) -> Vec<Key> {
        let mut roots: Vec<Key> = self.groups.iter().map(|g| g.key().clone()).collect();
        roots.sort();
        roots
    }

    /// Number of known groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True if no group has been created yet
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
