use crate::core::{MembershipKey, ResourceId, Result, StoreError};
use crate::transaction::TransactionId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Committed "actor likes resource" row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipRecord {
    pub key: MembershipKey,
    pub liked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    Insert(DateTime<Utc>),
    Delete,
}

#[derive(Debug, Clone, Copy)]
struct Claim {
    owner: TransactionId,
    op: PendingOp,
}

/// Membership rows keyed by `(resource, actor)`; the map key is the unique index.
///
/// A staged insert or delete claims its key until the owning transaction
/// commits or rolls back. Other transactions touching a claimed key fail
/// immediately instead of waiting.
#[derive(Debug, Default)]
pub struct MembershipTable {
    committed: HashMap<MembershipKey, DateTime<Utc>>,
    claims: HashMap<MembershipKey, Claim>,
}

impl MembershipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed state overlaid with the caller's own staged writes.
    pub fn contains(&self, key: &MembershipKey, txn: TransactionId) -> bool {
        match self.claims.get(key) {
            Some(claim) if claim.owner == txn => matches!(claim.op, PendingOp::Insert(_)),
            _ => self.committed.contains_key(key),
        }
    }

    pub fn claim_insert(
        &mut self,
        key: &MembershipKey,
        txn: TransactionId,
        liked_at: DateTime<Utc>,
    ) -> Result<()> {
        if self.claimed_by_other(key, txn) || self.contains(key, txn) {
            return Err(StoreError::AlreadyExists(key.clone()));
        }
        self.claims.insert(
            key.clone(),
            Claim {
                owner: txn,
                op: PendingOp::Insert(liked_at),
            },
        );
        Ok(())
    }

    pub fn claim_delete(&mut self, key: &MembershipKey, txn: TransactionId) -> Result<()> {
        if self.claimed_by_other(key, txn) || !self.contains(key, txn) {
            return Err(StoreError::MembershipNotFound(key.clone()));
        }
        self.claims.insert(
            key.clone(),
            Claim {
                owner: txn,
                op: PendingOp::Delete,
            },
        );
        Ok(())
    }

    pub(crate) fn owns_claim(&self, key: &MembershipKey, txn: TransactionId) -> bool {
        self.claims.get(key).is_some_and(|claim| claim.owner == txn)
    }

    pub(crate) fn commit_insert(
        &mut self,
        key: &MembershipKey,
        txn: TransactionId,
        liked_at: DateTime<Utc>,
    ) {
        self.release(key, txn);
        self.committed.insert(key.clone(), liked_at);
    }

    pub(crate) fn commit_delete(&mut self, key: &MembershipKey, txn: TransactionId) {
        self.release(key, txn);
        self.committed.remove(key);
    }

    pub(crate) fn release(&mut self, key: &MembershipKey, txn: TransactionId) {
        if self.owns_claim(key, txn) {
            self.claims.remove(key);
        }
    }

    /// Drops every committed row of a removed resource.
    pub(crate) fn remove_resource(&mut self, resource: ResourceId) -> usize {
        let before = self.committed.len();
        self.committed.retain(|key, _| key.resource != resource);
        before - self.committed.len()
    }

    pub fn count_for(&self, resource: ResourceId) -> usize {
        self.committed
            .keys()
            .filter(|key| key.resource == resource)
            .count()
    }

    pub fn records_for(&self, resource: ResourceId) -> Vec<MembershipRecord> {
        let mut records: Vec<MembershipRecord> = self
            .committed
            .iter()
            .filter(|(key, _)| key.resource == resource)
            .map(|(key, liked_at)| MembershipRecord {
                key: key.clone(),
                liked_at: *liked_at,
            })
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    fn claimed_by_other(&self, key: &MembershipKey, txn: TransactionId) -> bool {
        self.claims.get(key).is_some_and(|claim| claim.owner != txn)
    }
}
