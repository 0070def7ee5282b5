//! Transactions: single-entity-group mutation logs
//!
//! A transaction buffers mutations against exactly one entity group and
//! applies them atomically at commit. The lifecycle is a one-way state
//! machine: ACTIVE → COMMITTED or ACTIVE → ROLLED_BACK, both terminal;
//! handles are single-use.
//!
//! Group binding happens on the first operation that names a key: the
//! transaction claims the group's active slot then, and any later
//! operation targeting a different group is a `CrossGroupTransaction`
//! request error. The commit protocol itself (policy decision, cost
//! accounting, version bump) lives in the facade, which owns the
//! storage and policy handles.

use burrow_core::{Entity, Error, Key, Mutation, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting operations
    Active,
    /// Mutation log handed off for application (terminal)
    Committed,
    /// Mutation log discarded (terminal)
    RolledBack,
}

/// One transaction: a mutation log bound to at most one entity group
#[derive(Debug)]
pub struct Transaction {
    id: u64,
    app: String,
    state: TransactionState,
    group: Option<Key>,
    mutations: Vec<Mutation>,
}

impl Transaction {
    /// Create an active, unbound transaction
    pub fn new(id: u64, app: impl Into<String>) -> Self {
        Transaction {
            id,
            app: app.into(),
            state: TransactionState::Active,
            group: None,
            mutations: Vec::new(),
        }
    }

    /// Transaction handle
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Owning application
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Current lifecycle state
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Entity group the transaction is bound to, once any operation has
    /// named a key
    pub fn group(&self) -> Option<&Key> {
        self.group.as_ref()
    }

    /// Buffered mutations, in operation order
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Error unless the transaction is still active
    pub fn ensure_active(&self) -> Result<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            _ => Err(Error::TransactionNotActive(self.id)),
        }
    }

    /// Bind the transaction to `root`, or verify the existing binding
    ///
    /// # Errors
    ///
    /// `Error::CrossGroupTransaction` when already bound to a different
    /// group.
    pub fn bind_group(&mut self, root: &Key) -> Result<()> {
        match &self.group {
            None => {
                self.group = Some(root.clone());
                Ok(())
            }
            Some(bound) if bound == root => Ok(()),
            Some(bound) => Err(Error::CrossGroupTransaction {
                bound: bound.clone(),
                attempted: root.clone(),
            }),
        }
    }

    /// Buffer one mutation
    pub fn record(&mut self, mutation: Mutation) -> Result<()> {
        self.ensure_active()?;
        self.bind_group(&mutation.group())?;
        self.mutations.push(mutation);
        Ok(())
    }

    /// Read-your-writes lookup into the buffered log
    ///
    /// `Some(Some(entity))` if the log puts an entity at `key`,
    /// `Some(None)` if the log deletes it, `None` if the log does not
    /// touch the key (read from storage instead). The latest mutation
    /// for the key wins.
    pub fn pending_change(&self, key: &Key) -> Option<Option<Entity>> {
        self.mutations
            .iter()
            .rev()
            .find(|m| m.key() == key)
            .map(|m| match m {
                Mutation::Put(entity) => Some(entity.clone()),
                Mutation::Delete(_) => None,
            })
    }

    /// Transition to COMMITTED, handing the mutation log to the caller
    pub fn mark_committed(&mut self) -> Result<Vec<Mutation>> {
        self.ensure_active()?;
        self.state = TransactionState::Committed;
        Ok(std::mem::take(&mut self.mutations))
    }

    /// Transition to ROLLED_BACK, discarding the mutation log
    pub fn mark_rolled_back(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.state = TransactionState::RolledBack;
        self.mutations.clear();
        Ok(())
    }
}

/// Live transactions by handle
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    txns: DashMap<u64, Arc<Mutex<Transaction>>>,
    next_id: AtomicU64,
}

impl TransactionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        TransactionRegistry {
            txns: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start a transaction for `app`, returning its handle
    pub fn begin(&self, app: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.txns
            .insert(id, Arc::new(Mutex::new(Transaction::new(id, app))));
        id
    }

    /// Look up a transaction by handle
    pub fn get(&self, id: u64) -> Result<Arc<Mutex<Transaction>>> {
        self.txns
            .get(&id)
            .map(|t| Arc::clone(&t))
            .ok_or(Error::TransactionNotFound(id))
    }

    /// Drop a terminal transaction's bookkeeping
    pub fn remove(&self, id: u64) {
        self.txns.remove(&id);
    }
}
