// ============================================================================
// Storage Contracts
// ============================================================================
//
// The toggle engine talks to its backing store only through these traits.
// Every operation may suspend (network / database round trip) and reports
// races as `StoreError` values instead of panicking or blocking.
//
// ============================================================================

pub mod counter;
pub mod membership;
pub mod memory;

pub use counter::CounterTable;
pub use membership::{MembershipRecord, MembershipTable};
pub use memory::{InMemoryLikeStore, InMemoryTransaction, MemoryStoreConfig};

use crate::core::{CounterDelta, CounterSnapshot, MembershipKey, ResourceId, Result};
use crate::transaction::TransactionId;
use async_trait::async_trait;

/// Durable set of `(resource, actor)` pairs with a uniqueness constraint.
#[async_trait]
pub trait MembershipStore: Send {
    /// Side-effect free membership check.
    async fn exists(&mut self, key: &MembershipKey) -> Result<bool>;

    /// Fails with `StoreError::AlreadyExists` when the pair is already present
    /// or a concurrent insert holds it.
    async fn insert(&mut self, key: &MembershipKey) -> Result<()>;

    /// Fails with `StoreError::MembershipNotFound` when the pair is absent or
    /// a concurrent delete holds it.
    async fn delete(&mut self, key: &MembershipKey) -> Result<()>;
}

/// Versioned counter attached to a resource.
#[async_trait]
pub trait AggregateCounter: Send {
    /// Fails with `StoreError::ResourceNotFound` when the resource does not exist.
    async fn read_with_version(&mut self, resource: ResourceId) -> Result<CounterSnapshot>;

    /// Compare-and-swap on the version column: succeeds only when the stored
    /// version still equals `expected_version`, otherwise
    /// `StoreError::VersionConflict`. Returns the value the row will hold
    /// after commit.
    async fn conditional_write(
        &mut self,
        resource: ResourceId,
        expected_version: u64,
        delta: CounterDelta,
    ) -> Result<CounterSnapshot>;
}

/// One transactional unit of work over both tables.
#[async_trait]
pub trait LikeTransaction: MembershipStore + AggregateCounter {
    fn id(&self) -> TransactionId;

    /// Applies every staged write at once.
    async fn commit(&mut self) -> Result<()>;

    /// Discards every staged write.
    async fn rollback(&mut self) -> Result<()>;
}

/// Backing store shared by all concurrent togglers.
#[async_trait]
pub trait LikeStore: Send + Sync + 'static {
    type Tx: LikeTransaction + 'static;

    async fn begin(&self) -> Result<Self::Tx>;
}
