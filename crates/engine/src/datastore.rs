//! The datastore facade
//!
//! `Datastore` orchestrates every operation: point lookups and queries
//! consult the pseudo-kind registry first and fall through to ordinary
//! extent scans; writes run as jobs through the consistency policy, the
//! cost analyzer, and the owning entity group's version counter.
//!
//! ## Job model
//!
//! A commit (or a non-transactional write, which is a single-mutation
//! implicit job) is decided by the policy as a unit: the whole mutation
//! log either applies now (cost-accounted per entity, installed, group
//! version +1) or is buffered as one unapplied job with storage and
//! version untouched. A job that applies first rolls forward everything
//! queued ahead of it, so jobs always land in commit order. Strong
//! reads catch a group up by applying every pending job;
//! eventually-consistent reads ask the policy per pending job, oldest
//! first, and stop at the first refusal.
//!
//! ## Locking
//!
//! Lock order is transaction → group → extent/policy; policy decisions
//! for a job happen under the group lock, so the generator's draw order
//! is serialized per committing job even under concurrent callers.

use crate::config::DatastoreConfig;
use crate::consistency::ConsistencyPolicy;
use crate::cost::{write_cost, WriteCost};
use crate::pseudo::{
    EntityGroupPseudoKind, NamespacePseudoKind, PseudoGet, PseudoKind, PseudoKindRegistry,
};
use crate::query::{self, Query, QueryResult};
use crate::transaction::{Transaction, TransactionRegistry};
use burrow_core::{Entity, Error, Index, Key, Mutation, Result};
use burrow_storage::{GroupState, GroupTracker, Profile, Profiles, StoredIndex, UnappliedJob};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a non-transactional write
#[derive(Debug, Clone, PartialEq)]
pub struct PutResult {
    /// Stored key, with any allocated id filled in
    pub key: Key,
    /// Whether the job applied immediately or was deferred
    pub applied: bool,
    /// Group version after the operation (unchanged when deferred)
    pub version: u64,
    /// Write cost, zero until a deferred job applies
    pub cost: WriteCost,
}

/// Outcome of a commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitResult {
    /// Whether the mutation log applied immediately or was deferred
    pub applied: bool,
    /// Group version after the commit (unchanged when deferred; 0 for a
    /// transaction that never touched a group)
    pub version: u64,
    /// Accumulated write cost of the applied log
    pub cost: WriteCost,
}

/// Inclusive block of allocated numeric ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    /// First allocated id
    pub start: i64,
    /// Last allocated id
    pub end: i64,
}

/// In-process, multi-tenant datastore emulator
pub struct Datastore {
    profiles: Arc<Profiles>,
    groups: Arc<GroupTracker>,
    policy: ConsistencyPolicy,
    pseudo: PseudoKindRegistry,
    txns: TransactionRegistry,
    base_version: u64,
}

impl Datastore {
    /// Create an engine from explicit configuration
    ///
    /// # Errors
    ///
    /// `Error::InvalidConfiguration` for an out-of-range unapplied-job
    /// percentage.
    pub fn new(config: DatastoreConfig) -> Result<Self> {
        let policy = ConsistencyPolicy::new(config.unapplied_job_pct, config.consistency_seed)?;
        let profiles = Arc::new(Profiles::new());
        let groups = Arc::new(GroupTracker::new());
        // Offsetting reported versions by start time keeps them monotonic
        // across restarts without persisting anything.
        let base_version = Utc::now().timestamp_micros().max(0) as u64;

        let mut pseudo = PseudoKindRegistry::new();
        pseudo.register(PseudoKind::Namespaces(NamespacePseudoKind::new(
            Arc::clone(&profiles),
        )));
        pseudo.register(PseudoKind::EntityGroups(EntityGroupPseudoKind::new(
            Arc::clone(&groups),
            base_version,
        )));

        info!(
            unapplied_pct = policy.unapplied_pct(),
            base_version, "datastore engine ready"
        );
        Ok(Datastore {
            profiles,
            groups,
            policy,
            pseudo,
            txns: TransactionRegistry::new(),
            base_version,
        })
    }

    /// Create an engine configured from the environment
    pub fn from_env() -> Result<Self> {
        Self::new(DatastoreConfig::from_env()?)
    }

    /// Constant added to every reported entity-group version
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Internal (un-offset) version of one entity group
    pub fn group_version(&self, root: &Key) -> u64 {
        self.groups.get(root).map_or(0, |group| group.lock().version)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Strongly consistent point lookup
    pub fn get(&self, key: &Key) -> Result<Option<Entity>> {
        self.get_with_consistency(key, false)
    }

    /// Point lookup with an explicit consistency choice
    ///
    /// A strong read (`eventual = false`) first applies every pending
    /// job of the key's entity group; an eventual read lets the policy
    /// decide, job by job, whether to roll forward.
    pub fn get_with_consistency(&self, key: &Key, eventual: bool) -> Result<Option<Entity>> {
        key.validate()?;
        self.roll_forward(&key.root(), eventual);
        match self.pseudo.get(key)? {
            PseudoGet::Found(entity) => return Ok(Some(entity)),
            PseudoGet::Missing => return Ok(None),
            PseudoGet::NotPseudo => {}
        }
        self.stored(key)
    }

    /// Point lookup inside a transaction
    ///
    /// Binds the transaction to the key's entity group (claiming the
    /// group's active slot) and reads the transaction's own buffered
    /// writes before storage. Transactional reads are strongly
    /// consistent: the group is caught up when first claimed.
    pub fn transactional_get(&self, txn_id: u64, key: &Key) -> Result<Option<Entity>> {
        key.validate()?;
        let txn = self.txns.get(txn_id)?;
        let mut txn = txn.lock();
        txn.ensure_active()?;
        self.claim_group(&mut txn, &key.root())?;

        if let Some(change) = txn.pending_change(key) {
            return Ok(change);
        }
        match self.pseudo.get(key)? {
            PseudoGet::Found(entity) => return Ok(Some(entity)),
            PseudoGet::Missing => return Ok(None),
            PseudoGet::NotPseudo => {}
        }
        self.stored(key)
    }

    /// Run a query: pseudo-kind registry first, ordinary storage second
    ///
    /// Ancestor queries are strongly consistent and catch their group up
    /// before scanning; kind-only queries scan applied state as-is.
    pub fn run_query(&self, query: &Query) -> Result<QueryResult> {
        if let Some(result) = self.pseudo.run_query(query) {
            return result;
        }
        if let Some(ancestor) = &query.ancestor {
            self.roll_forward(&ancestor.root(), false);
        }
        let candidates = self
            .profiles
            .get(&query.app)
            .and_then(|profile| profile.extent(&query.kind))
            .map(|extent| extent.snapshot())
            .unwrap_or_default();
        Ok(query::execute(candidates, query))
    }

    // ------------------------------------------------------------------
    // Non-transactional writes (single-mutation implicit jobs)
    // ------------------------------------------------------------------

    /// Install or replace an entity
    ///
    /// An incomplete key (leaf id 0) is completed from the id allocator
    /// first. The write runs as a single-mutation job through the
    /// consistency policy.
    pub fn put(&self, entity: Entity) -> Result<PutResult> {
        entity.key.validate()?;
        self.reject_reserved_kind(&entity.key)?;
        let entity = self.complete_key(entity)?;
        let root = entity.key.root();
        let key = entity.key.clone();
        let (applied, version, cost) = self.run_job(&root, vec![Mutation::Put(entity)]);
        Ok(PutResult {
            key,
            applied,
            version,
            cost,
        })
    }

    /// Delete the entity at `key`
    ///
    /// Runs as a single-mutation job; deleting an absent entity is a
    /// valid job and still advances the group when applied.
    pub fn delete(&self, key: &Key) -> Result<PutResult> {
        key.validate()?;
        self.reject_reserved_kind(key)?;
        let root = key.root();
        let (applied, version, cost) = self.run_job(&root, vec![Mutation::Delete(key.clone())]);
        Ok(PutResult {
            key: key.clone(),
            applied,
            version,
            cost,
        })
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Start a transaction for `app`, returning its handle
    pub fn begin_transaction(&self, app: &str) -> u64 {
        self.txns.begin(app)
    }

    /// Buffer a put in a transaction
    ///
    /// Returns the (possibly newly completed) key. Nothing becomes
    /// visible until commit.
    pub fn transactional_put(&self, txn_id: u64, entity: Entity) -> Result<Key> {
        entity.key.validate()?;
        self.reject_reserved_kind(&entity.key)?;
        let entity = self.complete_key(entity)?;
        let txn = self.txns.get(txn_id)?;
        let mut txn = txn.lock();
        txn.ensure_active()?;
        self.claim_group(&mut txn, &entity.key.root())?;
        let key = entity.key.clone();
        txn.record(Mutation::Put(entity))?;
        Ok(key)
    }

    /// Buffer a delete in a transaction
    pub fn transactional_delete(&self, txn_id: u64, key: &Key) -> Result<()> {
        key.validate()?;
        self.reject_reserved_kind(key)?;
        let txn = self.txns.get(txn_id)?;
        let mut txn = txn.lock();
        txn.ensure_active()?;
        self.claim_group(&mut txn, &key.root())?;
        txn.record(Mutation::Delete(key.clone()))
    }

    /// Commit a transaction, applying or deferring its log as one job
    pub fn commit(&self, txn_id: u64) -> Result<CommitResult> {
        let txn = self.txns.get(txn_id)?;
        let mut txn = txn.lock();
        let root = txn.group().cloned();
        let mutations = txn.mark_committed()?;
        drop(txn);
        self.txns.remove(txn_id);

        let Some(root) = root else {
            // Never touched a group: nothing to decide or apply.
            return Ok(CommitResult {
                applied: true,
                version: 0,
                cost: WriteCost::default(),
            });
        };

        let group = self.groups.group(&root);
        let mut state = group.lock();
        let result = if mutations.is_empty() {
            // Claimed the group but wrote nothing: no job, no draw.
            CommitResult {
                applied: true,
                version: state.version,
                cost: WriteCost::default(),
            }
        } else if self.policy.should_apply_new_job(&root) {
            // Deferred jobs committed before this transaction land first.
            self.drain_pending(&root, &mut state);
            let profile = self.profiles.get_or_create(&root.app);
            let cost = self.apply_mutations(&profile, &mutations);
            state.version += 1;
            debug!(%root, version = state.version, "commit applied");
            CommitResult {
                applied: true,
                version: state.version,
                cost,
            }
        } else {
            state.unapplied.push_back(UnappliedJob { mutations });
            debug!(%root, pending = state.unapplied.len(), "commit deferred");
            CommitResult {
                applied: false,
                version: state.version,
                cost: WriteCost::default(),
            }
        };
        state.release(txn_id);
        Ok(result)
    }

    /// Roll back a transaction, discarding its log
    pub fn rollback(&self, txn_id: u64) -> Result<()> {
        let txn = self.txns.get(txn_id)?;
        let mut txn = txn.lock();
        let root = txn.group().cloned();
        txn.mark_rolled_back()?;
        drop(txn);
        if let Some(root) = root {
            self.groups.group(&root).lock().release(txn_id);
        }
        self.txns.remove(txn_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Index DDL and id allocation
    // ------------------------------------------------------------------

    /// Declare a composite index, returning its assigned id
    pub fn create_index(&self, app: &str, index: Index) -> Result<u64> {
        if self.pseudo.is_pseudo_kind(&index.kind) {
            return Err(Error::InvalidConfiguration(format!(
                "cannot declare an index on reserved kind {:?}",
                index.kind
            )));
        }
        let id = self.profiles.get_or_create(app).create_index(index);
        info!(app, id, "composite index created");
        Ok(id)
    }

    /// Remove a declared composite index by id
    pub fn delete_index(&self, app: &str, id: u64) -> Result<()> {
        let profile = self.profiles.get(app).ok_or(Error::IndexNotFound(id))?;
        profile.drop_index(id)?;
        info!(app, id, "composite index deleted");
        Ok(())
    }

    /// All declared indexes of `app`, in creation order
    pub fn get_indices(&self, app: &str) -> Vec<StoredIndex> {
        self.profiles
            .get(app)
            .map(|profile| profile.indexes())
            .unwrap_or_default()
    }

    /// Reserve `count` consecutive numeric ids for `kind`
    ///
    /// Draws from the same counter that completes incomplete keys at put
    /// time, so allocated and auto-assigned ids never collide.
    pub fn allocate_ids(&self, app: &str, kind: &str, count: u64) -> Result<IdRange> {
        if count == 0 {
            return Err(Error::BadKey(
                "id allocation count must be positive".to_string(),
            ));
        }
        let (start, end) = self.profiles.get_or_create(app).allocate_ids(kind, count);
        Ok(IdRange { start, end })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn stored(&self, key: &Key) -> Result<Option<Entity>> {
        Ok(self
            .profiles
            .get(&key.app)
            .and_then(|profile| profile.extent(key.kind()))
            .and_then(|extent| extent.get(key)))
    }

    fn reject_reserved_kind(&self, key: &Key) -> Result<()> {
        for elem in &key.path {
            if self.pseudo.is_pseudo_kind(&elem.kind) {
                return Err(Error::BadKey(format!(
                    "kind {:?} is reserved for a pseudo-kind",
                    elem.kind
                )));
            }
        }
        Ok(())
    }

    /// Complete an incomplete key from the id allocator
    ///
    /// Only the leaf element may be incomplete; an unassigned id in the
    /// middle of a path is a request error.
    fn complete_key(&self, mut entity: Entity) -> Result<Entity> {
        if entity.key.is_complete() {
            return Ok(entity);
        }
        let leaf = entity.key.path.len() - 1;
        if entity.key.path[..leaf]
            .iter()
            .any(|elem| matches!(elem.id, burrow_core::Identifier::Id(0)))
        {
            return Err(Error::BadKey(
                "only the leaf path element may have an unassigned id".to_string(),
            ));
        }
        let profile = self.profiles.get_or_create(&entity.key.app);
        let (id, _) = profile.allocate_ids(entity.key.kind(), 1);
        entity.key = entity.key.with_assigned_id(id);
        Ok(entity)
    }

    /// Run one job: a single policy decision for the whole mutation log
    fn run_job(&self, root: &Key, mutations: Vec<Mutation>) -> (bool, u64, WriteCost) {
        let group = self.groups.group(root);
        let mut state = group.lock();
        if self.policy.should_apply_new_job(root) {
            // Anything committed earlier lands first.
            self.drain_pending(root, &mut state);
            let profile = self.profiles.get_or_create(&root.app);
            let cost = self.apply_mutations(&profile, &mutations);
            state.version += 1;
            (true, state.version, cost)
        } else {
            state.unapplied.push_back(UnappliedJob { mutations });
            debug!(%root, pending = state.unapplied.len(), "job deferred");
            (false, state.version, WriteCost::default())
        }
    }

    /// Install a mutation log into extents, accounting cost per entity
    ///
    /// Caller holds the group lock and bumps the version once per job.
    fn apply_mutations(&self, profile: &Profile, mutations: &[Mutation]) -> WriteCost {
        let mut total = WriteCost::default();
        for mutation in mutations {
            match mutation {
                Mutation::Put(entity) => {
                    let kind = entity.key.kind();
                    let extent = profile.extent_or_create(kind);
                    let old = extent.get(&entity.key);
                    let cost = write_cost(old.as_ref(), entity, &profile.indexes_for_kind(kind));
                    debug!(
                        key = %entity.key,
                        entity_writes = cost.entity_writes,
                        index_writes = cost.index_writes,
                        "put applied"
                    );
                    extent.install(entity.clone());
                    total += cost;
                }
                Mutation::Delete(key) => {
                    let removed = profile
                        .extent(key.kind())
                        .and_then(|extent| extent.remove(key));
                    if let Some(old) = removed {
                        // Removal cost: the entity row plus every index
                        // row the old state occupied.
                        let cost = write_cost(
                            Some(&old),
                            &Entity::new(key.clone()),
                            &profile.indexes_for_kind(key.kind()),
                        );
                        debug!(key = %key, index_writes = cost.index_writes, "delete applied");
                        total += cost;
                    }
                }
            }
        }
        total
    }

    /// Apply pending jobs for one group before a read
    fn roll_forward(&self, root: &Key, eventual: bool) {
        let Some(group) = self.groups.get(root) else {
            return;
        };
        let mut state = group.lock();
        while state.has_unapplied() {
            if eventual && !self.policy.should_roll_forward_existing_job(root) {
                break;
            }
            let Some(job) = state.unapplied.pop_front() else {
                break;
            };
            let profile = self.profiles.get_or_create(&root.app);
            let cost = self.apply_mutations(&profile, &job.mutations);
            state.version += 1;
            debug!(
                %root,
                version = state.version,
                index_writes = cost.index_writes,
                "pending job rolled forward"
            );
        }
    }

    /// Bind a transaction to a group, claim its active slot, and catch
    /// the group up for strong transactional reads
    fn claim_group(&self, txn: &mut Transaction, root: &Key) -> Result<()> {
        txn.bind_group(root)?;
        let group = self.groups.group(root);
        let mut state = group.lock();
        state.claim(txn.id(), root)?;
        self.drain_pending(root, &mut state);
        Ok(())
    }

    /// Apply every queued job of one group, oldest first
    ///
    /// Caller holds the group lock. Runs ahead of any job applying now,
    /// so jobs never apply out of commit order.
    fn drain_pending(&self, root: &Key, state: &mut GroupState) {
        while let Some(job) = state.unapplied.pop_front() {
            let profile = self.profiles.get_or_create(&root.app);
            self.apply_mutations(&profile, &job.mutations);
            state.version += 1;
            debug!(%root, version = state.version, "pending job applied ahead of newer work");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pseudo::{ENTITY_GROUP_KIND, NAMESPACE_KIND, VERSION_PROPERTY};
    use crate::query::FilterOp;
    use burrow_core::{IndexProperty, PropertyValue};

    fn strong() -> Datastore {
        Datastore::new(DatastoreConfig::default()).unwrap()
    }

    fn always_lagging() -> Datastore {
        Datastore::new(
            DatastoreConfig::default()
                .with_unapplied_job_pct(100.0)
                .with_consistency_seed(1),
        )
        .unwrap()
    }

    fn task(id: i64) -> Entity {
        Entity::new(Key::with_id("app", "", "Task", id)).with_property("done", false)
    }

    #[test]
    fn test_put_get_roundtrip() {
        let store = strong();
        let entity = task(1);
        let result = store.put(entity.clone()).unwrap();
        assert!(result.applied);
        assert_eq!(result.version, 1);
        assert_eq!(result.cost.entity_writes, 1);

        assert_eq!(store.get(&entity.key).unwrap(), Some(entity));
        assert_eq!(store.get(&task(2).key).unwrap(), None);
    }

    #[test]
    fn test_put_rejects_reserved_kinds() {
        let store = strong();
        let entity = Entity::new(Key::with_name("app", "", NAMESPACE_KIND, "ns"));
        assert!(matches!(store.put(entity), Err(Error::BadKey(_))));

        let nested = Entity::new(
            Key::with_id("app", "", "Author", 1).child_id(ENTITY_GROUP_KIND, 1),
        );
        assert!(matches!(store.put(nested), Err(Error::BadKey(_))));
    }

    #[test]
    fn test_incomplete_key_completed_on_put() {
        let store = strong();
        let result = store
            .put(Entity::new(Key::with_id("app", "", "Task", 0)))
            .unwrap();
        assert!(result.key.is_complete());

        // Allocation never reuses an auto-assigned id
        let range = store.allocate_ids("app", "Task", 10).unwrap();
        assert!(range.start > leaf_id(&result.key));
        assert_eq!(range.end - range.start + 1, 10);
    }

    fn leaf_id(key: &Key) -> i64 {
        match key.leaf().unwrap().id {
            burrow_core::Identifier::Id(id) => id,
            _ => panic!("expected numeric id"),
        }
    }

    #[test]
    fn test_incomplete_interior_element_rejected() {
        let store = strong();
        let key = Key::with_id("app", "", "Author", 0).child_id("Book", 1);
        assert!(matches!(
            store.put(Entity::new(key)),
            Err(Error::BadKey(_))
        ));
    }

    #[test]
    fn test_delete_applied() {
        let store = strong();
        let entity = task(1);
        store.put(entity.clone()).unwrap();

        let result = store.delete(&entity.key).unwrap();
        assert!(result.applied);
        assert_eq!(result.version, 2);
        assert_eq!(store.get(&entity.key).unwrap(), None);
    }

    #[test]
    fn test_version_advances_per_applied_job() {
        let store = strong();
        let root = Key::with_id("app", "", "Author", 1);
        assert_eq!(store.group_version(&root), 0);

        store.put(Entity::new(root.child_id("Book", 1))).unwrap();
        assert_eq!(store.group_version(&root), 1);
        store.put(Entity::new(root.child_id("Book", 2))).unwrap();
        assert_eq!(store.group_version(&root), 2);

        // Writes to another group leave this one alone
        store
            .put(Entity::new(Key::with_id("app", "", "Author", 2)))
            .unwrap();
        assert_eq!(store.group_version(&root), 2);
    }

    #[test]
    fn test_deferred_write_invisible_until_strong_read() {
        let store = always_lagging();
        let entity = task(1);
        let result = store.put(entity.clone()).unwrap();
        assert!(!result.applied);
        assert_eq!(result.version, 0);

        // Eventual read: policy refuses (100% lag), so nothing visible
        assert_eq!(
            store.get_with_consistency(&entity.key, true).unwrap(),
            None
        );
        assert_eq!(store.group_version(&entity.key.root()), 0);

        // Strong read catches the group up unconditionally
        assert_eq!(store.get(&entity.key).unwrap(), Some(entity.clone()));
        assert_eq!(store.group_version(&entity.key.root()), 1);
    }

    #[test]
    fn test_transaction_commit_applies_log_atomically() {
        let store = strong();
        let root = Key::with_id("app", "", "Author", 1);
        let txn = store.begin_transaction("app");

        let first = Entity::new(root.child_id("Book", 1)).with_property("title", "a");
        let second = Entity::new(root.child_id("Book", 2)).with_property("title", "b");
        store.transactional_put(txn, first.clone()).unwrap();
        store.transactional_put(txn, second.clone()).unwrap();

        // Invisible before commit
        assert_eq!(store.get(&first.key).unwrap(), None);

        let result = store.commit(txn).unwrap();
        assert!(result.applied);
        assert_eq!(result.version, 1);
        assert_eq!(result.cost.entity_writes, 2);

        assert_eq!(store.get(&first.key).unwrap(), Some(first));
        assert_eq!(store.get(&second.key).unwrap(), Some(second));
        // One job, one version bump
        assert_eq!(store.group_version(&root), 1);

        // Handle is single-use
        assert!(matches!(
            store.commit(txn),
            Err(Error::TransactionNotFound(_))
        ));
    }

    #[test]
    fn test_transaction_read_your_writes() {
        let store = strong();
        let key = Key::with_id("app", "", "Task", 1);
        store
            .put(Entity::new(key.clone()).with_property("v", 1i64))
            .unwrap();

        let txn = store.begin_transaction("app");
        let draft = Entity::new(key.clone()).with_property("v", 2i64);
        store.transactional_put(txn, draft.clone()).unwrap();

        assert_eq!(store.transactional_get(txn, &key).unwrap(), Some(draft));
        store.transactional_delete(txn, &key).unwrap();
        assert_eq!(store.transactional_get(txn, &key).unwrap(), None);

        store.rollback(txn).unwrap();
        // Rollback leaves stored state and version untouched
        assert_eq!(
            store.get(&key).unwrap(),
            Some(Entity::new(key.clone()).with_property("v", 1i64))
        );
        assert_eq!(store.group_version(&key.root()), 1);
    }

    #[test]
    fn test_concurrent_transactions_on_one_group_conflict() {
        let store = strong();
        let root = Key::with_id("app", "", "Author", 1);

        let first = store.begin_transaction("app");
        let second = store.begin_transaction("app");
        store
            .transactional_put(first, Entity::new(root.child_id("Book", 1)))
            .unwrap();

        let err = store
            .transactional_put(second, Entity::new(root.child_id("Book", 2)))
            .unwrap_err();
        assert_eq!(err, Error::TransactionConflict { root: root.clone() });
        assert!(err.is_retryable());

        // Releasing the group frees it for the second transaction
        store.commit(first).unwrap();
        store
            .transactional_put(second, Entity::new(root.child_id("Book", 2)))
            .unwrap();
        store.commit(second).unwrap();
        assert_eq!(store.group_version(&root), 2);
    }

    #[test]
    fn test_cross_group_transaction_rejected() {
        let store = strong();
        let txn = store.begin_transaction("app");
        store
            .transactional_put(txn, Entity::new(Key::with_id("app", "", "Author", 1)))
            .unwrap();

        let err = store
            .transactional_put(txn, Entity::new(Key::with_id("app", "", "Author", 2)))
            .unwrap_err();
        assert!(matches!(err, Error::CrossGroupTransaction { .. }));
    }

    #[test]
    fn test_empty_transaction_commit() {
        let store = always_lagging();
        let txn = store.begin_transaction("app");
        let result = store.commit(txn).unwrap();
        // No job, no policy draw, nothing deferred
        assert!(result.applied);
        assert_eq!(result.version, 0);
        assert_eq!(result.cost, WriteCost::default());
    }

    #[test]
    fn test_query_over_storage() {
        let store = strong();
        for (id, priority) in [(1, 2i64), (2, 1), (3, 3)] {
            store
                .put(task(id).with_property("priority", priority))
                .unwrap();
        }

        let query = Query::new("app", "Task")
            .with_filter("priority", FilterOp::GreaterThanOrEqual, 2i64);
        let result = store.run_query(&query).unwrap();
        assert_eq!(result.entities.len(), 2);
    }

    #[test]
    fn test_ancestor_query_is_strongly_consistent() {
        let store = always_lagging();
        let root = Key::with_id("app", "", "Author", 1);
        store
            .put(Entity::new(root.child_id("Book", 1)))
            .unwrap();

        // Kind-only query sees applied state only
        let lazy = store.run_query(&Query::new("app", "Book")).unwrap();
        assert!(lazy.entities.is_empty());

        // Ancestor query forces the group to catch up
        let strong = store
            .run_query(&Query::new("app", "Book").with_ancestor(root.clone()))
            .unwrap();
        assert_eq!(strong.entities.len(), 1);
        assert_eq!(store.group_version(&root), 1);
    }

    #[test]
    fn test_namespace_pseudo_kind_query() {
        let store = strong();
        store.put(task(1)).unwrap();
        store
            .put(Entity::new(Key::with_id("app", "ns1", "Task", 2)))
            .unwrap();
        store
            .put(Entity::new(Key::with_id("app", "ns1", "Task", 3)))
            .unwrap();

        let result = store.run_query(&Query::new("app", NAMESPACE_KIND)).unwrap();
        assert_eq!(result.entities.len(), 2);
        assert_eq!(
            result.entities[0].key,
            Key::with_id("app", "", NAMESPACE_KIND, crate::pseudo::EMPTY_NAMESPACE_ID)
        );
        assert_eq!(
            result.entities[1].key,
            Key::with_name("app", "", NAMESPACE_KIND, "ns1")
        );
    }

    #[test]
    fn test_entity_group_pseudo_kind_get() {
        let store = strong();
        let root = Key::with_id("app", "", "Author", 1);
        store.put(Entity::new(root.child_id("Book", 1))).unwrap();

        let meta_key = root.child_id(ENTITY_GROUP_KIND, 1);
        let entity = store.get(&meta_key).unwrap().expect("group exists");
        assert_eq!(
            entity.property(VERSION_PROPERTY),
            Some(&PropertyValue::I64((store.base_version() + 1) as i64))
        );

        // Pseudo-kind but no such group: absent, not an error
        let ghost = Key::with_id("app", "", "Author", 9).child_id(ENTITY_GROUP_KIND, 1);
        assert_eq!(store.get(&ghost).unwrap(), None);
    }

    #[test]
    fn test_index_ddl_and_cost_integration() {
        let store = strong();
        let index = Index::new(
            "Task",
            false,
            vec![
                IndexProperty::ascending("done"),
                IndexProperty::ascending("priority"),
            ],
        );
        let id = store.create_index("app", index.clone()).unwrap();
        assert_eq!(store.get_indices("app").len(), 1);
        assert_eq!(store.get_indices("app")[0].index, index);

        // Composite index participates in write cost
        let result = store
            .put(task(1).with_property("priority", 2i64))
            .unwrap();
        // Built-ins: 2 props * 2 = 4; composite: 1; first write: 1
        assert_eq!(result.cost.index_writes, 6);

        store.delete_index("app", id).unwrap();
        assert!(store.get_indices("app").is_empty());
        assert_eq!(
            store.delete_index("app", id),
            Err(Error::IndexNotFound(id))
        );
    }

    #[test]
    fn test_index_on_reserved_kind_rejected() {
        let store = strong();
        let index = Index::new(NAMESPACE_KIND, false, vec![IndexProperty::ascending("x")]);
        assert!(matches!(
            store.create_index("app", index),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_allocate_ids_validates_count() {
        let store = strong();
        assert!(matches!(
            store.allocate_ids("app", "Task", 0),
            Err(Error::BadKey(_))
        ));
    }

    #[test]
    fn test_bad_config_rejected_at_construction() {
        let config = DatastoreConfig::default().with_unapplied_job_pct(101.0);
        assert!(matches!(
            Datastore::new(config),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
