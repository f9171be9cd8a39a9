// ============================================================================
// Transaction State Management
// ============================================================================
//
// One like transaction covers exactly one toggle attempt:
// Active -> Committed when both the membership and the counter change land,
// Active -> Aborted when either of them lost a race.
//
// ============================================================================

use super::Change;
use crate::core::{Result, StoreError};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// Transaction lifecycle
///
/// ```text
/// Active ──commit──> Committed
///   │
///   └──rollback──> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

impl TransactionState {
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::Aborted
        )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Active => write!(f, "ACTIVE"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Bookkeeping for one transaction: its state and the writes staged so far.
///
/// The backing store owns the actual rows; this only tracks what has to be
/// applied on commit or released on rollback.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
    staged: Vec<Change>,
    start_time: std::time::Instant,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            staged: Vec::new(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn staged(&self) -> &[Change] {
        &self.staged
    }

    pub fn duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Fails with `TransactionClosed` once the transaction reached a terminal state.
    pub fn ensure_active(&self) -> Result<()> {
        if self.state.is_active() {
            Ok(())
        } else {
            Err(StoreError::TransactionClosed(self.id))
        }
    }

    pub fn stage(&mut self, change: Change) -> Result<()> {
        self.ensure_active()?;
        self.staged.push(change);
        Ok(())
    }

    /// Marks the transaction committed and hands back the changes to apply.
    pub fn commit(&mut self) -> Result<Vec<Change>> {
        self.ensure_active()?;
        self.state = TransactionState::Committed;
        Ok(std::mem::take(&mut self.staged))
    }

    /// Marks the transaction aborted and hands back the changes whose claims
    /// must be released.
    pub fn rollback(&mut self) -> Result<Vec<Change>> {
        self.ensure_active()?;
        self.state = TransactionState::Aborted;
        Ok(std::mem::take(&mut self.staged))
    }
}
