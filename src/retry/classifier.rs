use crate::core::{ResourceId, StoreError, ToggleError};
use std::fmt;

/// Why a failed attempt is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// Another writer bumped the counter version first.
    VersionConflict,
    /// A concurrent insert of the same membership won.
    DuplicateMembership,
    /// The membership was removed by a concurrent delete.
    MissingMembership,
    /// Infrastructure failure (I/O, timeout, lock, commit bookkeeping).
    Transient,
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::VersionConflict => "version_conflict",
            Self::DuplicateMembership => "duplicate_membership",
            Self::MissingMembership => "missing_membership",
            Self::Transient => "transient",
        };
        write!(f, "{label}")
    }
}

/// Why a failed attempt must not be repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalReason {
    ResourceNotFound(ResourceId),
    InvalidActor(String),
}

impl From<FatalReason> for ToggleError {
    fn from(reason: FatalReason) -> Self {
        match reason {
            FatalReason::ResourceNotFound(resource) => ToggleError::ResourceNotFound(resource),
            FatalReason::InvalidActor(actor) => ToggleError::InvalidActor(actor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictClass {
    Retryable(RetryReason),
    Fatal(FatalReason),
}

impl ConflictClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Labels the outcome of a failed store operation.
///
/// Only a missing resource and a malformed actor are fatal. Everything else,
/// including infrastructure faults, is retried under the same bounded policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictClassifier;

impl ConflictClassifier {
    pub fn classify(err: &StoreError) -> ConflictClass {
        match err {
            StoreError::ResourceNotFound(resource) => {
                ConflictClass::Fatal(FatalReason::ResourceNotFound(*resource))
            }
            StoreError::InvalidActor(actor) => {
                ConflictClass::Fatal(FatalReason::InvalidActor(actor.clone()))
            }
            StoreError::VersionConflict { .. } => {
                ConflictClass::Retryable(RetryReason::VersionConflict)
            }
            StoreError::AlreadyExists(_) => {
                ConflictClass::Retryable(RetryReason::DuplicateMembership)
            }
            StoreError::MembershipNotFound(_) => {
                ConflictClass::Retryable(RetryReason::MissingMembership)
            }
            StoreError::CounterUnderflow(_)
            | StoreError::TransactionClosed(_)
            | StoreError::ExecutionError(_)
            | StoreError::LockError(_)
            | StoreError::IoError(_)
            | StoreError::Timeout(_) => ConflictClass::Retryable(RetryReason::Transient),
        }
    }
}
