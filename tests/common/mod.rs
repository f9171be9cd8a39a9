#![allow(dead_code)]

use async_trait::async_trait;
use liketoggle::core::Result;
use liketoggle::transaction::TransactionId;
use liketoggle::{
    AggregateCounter, CounterDelta, CounterSnapshot, InMemoryLikeStore, LikeStore,
    LikeTransaction, MembershipKey, MembershipStore, ResourceId, RetryPolicy, StoreError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

pub const POST: ResourceId = ResourceId(1);

/// Store with resources `1..=count` already created.
pub fn seeded_store(count: u64) -> InMemoryLikeStore {
    let store = InMemoryLikeStore::new();
    for id in 1..=count {
        store.create_resource(ResourceId(id)).unwrap();
    }
    store
}

/// Many attempts with millisecond backoff, for contention tests.
pub fn contention_policy() -> RetryPolicy {
    RetryPolicy::new()
        .max_attempts(200)
        .initial_interval(Duration::from_millis(1))
        .multiplier(1.0)
        .max_interval(Duration::from_millis(1))
        .jitter(0.0)
}

/// Wraps a transaction and fails every counter write with a version conflict.
pub struct ConflictingTransaction {
    inner: <InMemoryLikeStore as LikeStore>::Tx,
}

#[async_trait]
impl MembershipStore for ConflictingTransaction {
    async fn exists(&mut self, key: &MembershipKey) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn insert(&mut self, key: &MembershipKey) -> Result<()> {
        self.inner.insert(key).await
    }

    async fn delete(&mut self, key: &MembershipKey) -> Result<()> {
        self.inner.delete(key).await
    }
}

#[async_trait]
impl AggregateCounter for ConflictingTransaction {
    async fn read_with_version(&mut self, resource: ResourceId) -> Result<CounterSnapshot> {
        self.inner.read_with_version(resource).await
    }

    async fn conditional_write(
        &mut self,
        resource: ResourceId,
        expected_version: u64,
        _delta: CounterDelta,
    ) -> Result<CounterSnapshot> {
        Err(StoreError::VersionConflict {
            resource,
            expected: expected_version,
        })
    }
}

#[async_trait]
impl LikeTransaction for ConflictingTransaction {
    fn id(&self) -> TransactionId {
        self.inner.id()
    }

    async fn commit(&mut self) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.inner.rollback().await
    }
}

/// Store whose counter writes always lose the race. Counts transactions begun.
#[derive(Clone)]
pub struct AlwaysConflictStore {
    pub inner: InMemoryLikeStore,
    pub begun: Arc<AtomicU32>,
}

impl AlwaysConflictStore {
    pub fn new(inner: InMemoryLikeStore) -> Self {
        Self {
            inner,
            begun: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn begun(&self) -> u32 {
        self.begun.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LikeStore for AlwaysConflictStore {
    type Tx = ConflictingTransaction;

    async fn begin(&self) -> Result<ConflictingTransaction> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(ConflictingTransaction {
            inner: self.inner.begin().await?,
        })
    }
}

/// Store whose first `failures` transactions cannot be opened.
#[derive(Clone)]
pub struct FlakyStore {
    pub inner: InMemoryLikeStore,
    failures: u32,
    pub begun: Arc<AtomicU32>,
}

impl FlakyStore {
    pub fn new(inner: InMemoryLikeStore, failures: u32) -> Self {
        Self {
            inner,
            failures,
            begun: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn begun(&self) -> u32 {
        self.begun.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LikeStore for FlakyStore {
    type Tx = <InMemoryLikeStore as LikeStore>::Tx;

    async fn begin(&self) -> Result<Self::Tx> {
        let call = self.begun.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(StoreError::IoError(format!("connection reset (call {})", call + 1)));
        }
        self.inner.begin().await
    }
}
