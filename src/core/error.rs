use super::types::{MembershipKey, ResourceId};
use crate::transaction::TransactionId;
use thiserror::Error;

/// Outcome of a single backing-store operation that did not go through.
///
/// Conflicts are ordinary values here; `retry::ConflictClassifier` decides
/// which of them are worth another attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Version conflict on resource {resource}: expected version {expected}")]
    VersionConflict { resource: ResourceId, expected: u64 },

    #[error("Membership {0} already exists")]
    AlreadyExists(MembershipKey),

    #[error("Membership {0} not found")]
    MembershipNotFound(MembershipKey),

    #[error("Resource {0} not found")]
    ResourceNotFound(ResourceId),

    #[error("Invalid actor: {0}")]
    InvalidActor(String),

    #[error("Counter on resource {0} cannot go below zero")]
    CounterUnderflow(ResourceId),

    #[error("Transaction {0} is not active")]
    TransactionClosed(TransactionId),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

/// Errors that cross the toggle engine boundary.
///
/// Transient conflicts never show up here; they are absorbed by the retry
/// loop or folded into [`ToggleError::Exhausted`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToggleError {
    #[error("Resource {0} not found")]
    ResourceNotFound(ResourceId),

    #[error("No authenticated actor")]
    ActorUnresolved,

    #[error("Invalid actor: {0}")]
    InvalidActor(String),

    #[error("Gave up after {attempts} attempts, please retry: {last_error}")]
    Exhausted { attempts: u32, last_error: StoreError },
}

impl ToggleError {
    /// `true` when the request itself is invalid and resubmitting cannot help.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Exhausted { .. })
    }

    /// `true` when the client may resubmit the same request later.
    pub fn should_resubmit(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}
