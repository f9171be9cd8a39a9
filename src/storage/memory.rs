use super::{
    AggregateCounter, CounterTable, LikeStore, LikeTransaction, MembershipRecord, MembershipStore,
    MembershipTable,
};
use crate::core::{
    CounterDelta, CounterSnapshot, MembershipKey, ResourceId, Result, StoreError,
};
use crate::transaction::{Change, Transaction, TransactionId};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Settings for the in-memory backing store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// Simulated round-trip latency per store operation, in milliseconds.
    pub op_latency_ms: u64,
}

impl MemoryStoreConfig {
    pub fn op_latency(mut self, latency: Duration) -> Self {
        self.op_latency_ms = latency.as_millis() as u64;
        self
    }
}

#[derive(Debug, Default)]
struct Tables {
    counters: CounterTable,
    memberships: MembershipTable,
}

impl Tables {
    /// Every staged change must still hold its claim before anything is applied.
    fn check_commit(&self, txn: TransactionId, staged: &[Change]) -> Result<()> {
        for change in staged {
            let resource = change.resource();
            if !self.counters.contains(resource) {
                return Err(StoreError::ResourceNotFound(resource));
            }
            let held = match change {
                // Repeated writes to one key share a single claim.
                Change::InsertMembership { key, .. } | Change::DeleteMembership { key } => {
                    self.memberships.owns_claim(key, txn)
                }
                Change::WriteCounter { .. } => self.counters.owns_claim(resource, txn),
            };
            if !held {
                return Err(StoreError::ExecutionError(format!(
                    "{} lost its claim on {} for {}",
                    txn,
                    change.kind(),
                    resource
                )));
            }
        }
        Ok(())
    }

    fn apply(&mut self, txn: TransactionId, changes: &[Change]) {
        for change in changes {
            match change {
                Change::InsertMembership { key, liked_at } => {
                    self.memberships.commit_insert(key, txn, *liked_at)
                }
                Change::DeleteMembership { key } => self.memberships.commit_delete(key, txn),
                Change::WriteCounter { resource, .. } => {
                    self.counters.commit_write(*resource, txn)
                }
            }
        }
    }

    fn release(&mut self, txn: TransactionId, changes: &[Change]) {
        for change in changes {
            match change {
                Change::InsertMembership { key, .. } | Change::DeleteMembership { key } => {
                    self.memberships.release(key, txn)
                }
                Change::WriteCounter { resource, .. } => self.counters.release(*resource, txn),
            }
        }
    }
}

/// Reference backing store: a versioned counter table and a membership table
/// with a unique `(resource, actor)` key, shared by every clone.
///
/// Its only synchronization is a short critical section per operation, standing
/// in for the row-level atomicity a database gives a single statement.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLikeStore {
    tables: Arc<Mutex<Tables>>,
    config: MemoryStoreConfig,
}

impl InMemoryLikeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            tables: Arc::default(),
            config,
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Registers a likeable resource with `likeCount = 0, version = 0`.
    pub fn create_resource(&self, resource: ResourceId) -> Result<()> {
        self.tables.lock()?.counters.create(resource)
    }

    /// Removes the resource and cascades to its committed memberships.
    ///
    /// Transactions still holding claims on it fail at commit.
    pub fn remove_resource(&self, resource: ResourceId) -> Result<bool> {
        let mut tables = self.tables.lock()?;
        if !tables.counters.remove(resource) {
            return Ok(false);
        }
        let removed = tables.memberships.remove_resource(resource);
        debug!("Removed resource {} and {} memberships", resource, removed);
        Ok(true)
    }

    pub fn resources(&self) -> Result<Vec<ResourceId>> {
        Ok(self.tables.lock()?.counters.resources())
    }

    pub fn committed_counter(&self, resource: ResourceId) -> Result<CounterSnapshot> {
        self.tables.lock()?.counters.committed(resource)
    }

    pub fn membership_count(&self, resource: ResourceId) -> Result<usize> {
        Ok(self.tables.lock()?.memberships.count_for(resource))
    }

    pub fn memberships(&self, resource: ResourceId) -> Result<Vec<MembershipRecord>> {
        Ok(self.tables.lock()?.memberships.records_for(resource))
    }

    /// Rows currently claimed by uncommitted transactions. Zero once quiescent.
    pub fn pending_claims(&self) -> Result<usize> {
        let tables = self.tables.lock()?;
        Ok(tables.counters.claim_count() + tables.memberships.claim_count())
    }
}

#[async_trait]
impl LikeStore for InMemoryLikeStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        Ok(InMemoryTransaction {
            txn: Transaction::new(TransactionId::new()),
            tables: Arc::clone(&self.tables),
            latency: Duration::from_millis(self.config.op_latency_ms),
        })
    }
}

/// Transaction handle on an [`InMemoryLikeStore`].
///
/// Dropping it while still active rolls it back.
#[derive(Debug)]
pub struct InMemoryTransaction {
    txn: Transaction,
    tables: Arc<Mutex<Tables>>,
    latency: Duration,
}

impl InMemoryTransaction {
    /// Suspension point standing in for the database round trip.
    async fn round_trip(&self) {
        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn with_tables<T>(
        &mut self,
        op: impl FnOnce(&mut Tables, &mut Transaction) -> Result<T>,
    ) -> Result<T> {
        self.txn.ensure_active()?;
        let mut tables = self.tables.lock()?;
        op(&mut tables, &mut self.txn)
    }
}

#[async_trait]
impl MembershipStore for InMemoryTransaction {
    async fn exists(&mut self, key: &MembershipKey) -> Result<bool> {
        self.round_trip().await;
        self.with_tables(|tables, txn| Ok(tables.memberships.contains(key, txn.id())))
    }

    async fn insert(&mut self, key: &MembershipKey) -> Result<()> {
        self.round_trip().await;
        self.with_tables(|tables, txn| {
            if !key.actor.is_well_formed() {
                return Err(StoreError::InvalidActor(key.actor.to_string()));
            }
            if !tables.counters.contains(key.resource) {
                return Err(StoreError::ResourceNotFound(key.resource));
            }
            let liked_at = Utc::now();
            tables.memberships.claim_insert(key, txn.id(), liked_at)?;
            txn.stage(Change::InsertMembership {
                key: key.clone(),
                liked_at,
            })
        })
    }

    async fn delete(&mut self, key: &MembershipKey) -> Result<()> {
        self.round_trip().await;
        self.with_tables(|tables, txn| {
            tables.memberships.claim_delete(key, txn.id())?;
            txn.stage(Change::DeleteMembership { key: key.clone() })
        })
    }
}

#[async_trait]
impl AggregateCounter for InMemoryTransaction {
    async fn read_with_version(&mut self, resource: ResourceId) -> Result<CounterSnapshot> {
        self.round_trip().await;
        self.with_tables(|tables, txn| tables.counters.read(resource, txn.id()))
    }

    async fn conditional_write(
        &mut self,
        resource: ResourceId,
        expected_version: u64,
        delta: CounterDelta,
    ) -> Result<CounterSnapshot> {
        self.round_trip().await;
        self.with_tables(|tables, txn| {
            let staged = tables
                .counters
                .claim_write(resource, txn.id(), expected_version, delta)?;
            txn.stage(Change::WriteCounter {
                resource,
                expected_version,
                count: staged.count,
            })?;
            Ok(staged)
        })
    }
}

#[async_trait]
impl LikeTransaction for InMemoryTransaction {
    fn id(&self) -> TransactionId {
        self.txn.id()
    }

    async fn commit(&mut self) -> Result<()> {
        self.round_trip().await;
        self.with_tables(|tables, txn| {
            let id = txn.id();
            if let Err(err) = tables.check_commit(id, txn.staged()) {
                warn!("{} failed commit check, rolling back: {}", id, err);
                let released = txn.rollback()?;
                tables.release(id, &released);
                return Err(err);
            }
            let changes = txn.commit()?;
            tables.apply(id, &changes);
            Ok(())
        })
    }

    async fn rollback(&mut self) -> Result<()> {
        self.with_tables(|tables, txn| {
            let id = txn.id();
            let released = txn.rollback()?;
            tables.release(id, &released);
            Ok(())
        })
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.txn.state().is_active() {
            return;
        }
        let id = self.txn.id();
        let Ok(released) = self.txn.rollback() else {
            return;
        };
        match self.tables.lock() {
            Ok(mut tables) => {
                warn!(
                    "{} dropped while active, released {} staged changes",
                    id,
                    released.len()
                );
                tables.release(id, &released);
            }
            Err(err) => warn!("{} dropped while active, store lock poisoned: {}", id, err),
        }
    }
}
