// ============================================================================
// liketoggle Library
// ============================================================================
//
// Idempotent like/unlike toggling on shared resources. A versioned counter and
// a uniqueness-constrained membership table are kept in step by optimistic
// concurrency control plus bounded, jittered retries.
//
// ============================================================================

pub mod config;
pub mod core;
pub mod facade;
pub mod retry;
pub mod storage;
pub mod toggle;
pub mod transaction;

pub use config::EngineConfig;
pub use core::{
    ActorId, ConfigError, CounterDelta, CounterSnapshot, LikeResponse, MembershipKey, ResourceId,
    StoreError, ToggleError,
};
pub use facade::PostLikeService;
pub use retry::{
    ConflictClass, ConflictClassifier, RetryOrchestrator, RetryPolicy, RetryState,
    RetryStatsSnapshot,
};
pub use storage::{
    AggregateCounter, InMemoryLikeStore, LikeStore, LikeTransaction, MembershipStore,
    MemoryStoreConfig,
};
pub use toggle::{ToggleAction, ToggleEngine, ToggleOutcome};
