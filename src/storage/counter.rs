use crate::core::{CounterDelta, CounterSnapshot, ResourceId, Result, StoreError};
use crate::transaction::TransactionId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct CounterClaim {
    owner: TransactionId,
    staged: CounterSnapshot,
}

#[derive(Debug, Clone, Copy)]
struct CounterRow {
    committed: CounterSnapshot,
    claim: Option<CounterClaim>,
}

/// Resource rows: like count plus the optimistic-lock version column.
#[derive(Debug, Default)]
pub struct CounterTable {
    rows: HashMap<ResourceId, CounterRow>,
}

impl CounterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, resource: ResourceId) -> Result<()> {
        if self.rows.contains_key(&resource) {
            return Err(StoreError::ExecutionError(format!(
                "Resource {} already exists",
                resource
            )));
        }
        self.rows.insert(
            resource,
            CounterRow {
                committed: CounterSnapshot {
                    count: 0,
                    version: 0,
                },
                claim: None,
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, resource: ResourceId) -> bool {
        self.rows.remove(&resource).is_some()
    }

    pub fn contains(&self, resource: ResourceId) -> bool {
        self.rows.contains_key(&resource)
    }

    /// Committed value, or the caller's own staged value if it already wrote.
    pub fn read(&self, resource: ResourceId, txn: TransactionId) -> Result<CounterSnapshot> {
        let row = self
            .rows
            .get(&resource)
            .ok_or(StoreError::ResourceNotFound(resource))?;
        Ok(match row.claim {
            Some(claim) if claim.owner == txn => claim.staged,
            _ => row.committed,
        })
    }

    pub fn committed(&self, resource: ResourceId) -> Result<CounterSnapshot> {
        self.rows
            .get(&resource)
            .map(|row| row.committed)
            .ok_or(StoreError::ResourceNotFound(resource))
    }

    /// `UPDATE .. SET count = count + delta, version = version + 1
    ///  WHERE id = resource AND version = expected_version`, staged until commit.
    pub fn claim_write(
        &mut self,
        resource: ResourceId,
        txn: TransactionId,
        expected_version: u64,
        delta: CounterDelta,
    ) -> Result<CounterSnapshot> {
        let row = self
            .rows
            .get_mut(&resource)
            .ok_or(StoreError::ResourceNotFound(resource))?;

        let current = match row.claim {
            Some(claim) if claim.owner == txn => claim.staged,
            Some(_) => {
                return Err(StoreError::VersionConflict {
                    resource,
                    expected: expected_version,
                });
            }
            None => row.committed,
        };

        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                resource,
                expected: expected_version,
            });
        }

        let count = delta
            .apply(current.count)
            .ok_or(StoreError::CounterUnderflow(resource))?;
        let staged = CounterSnapshot {
            count,
            version: expected_version + 1,
        };
        row.claim = Some(CounterClaim { owner: txn, staged });
        Ok(staged)
    }

    pub(crate) fn owns_claim(&self, resource: ResourceId, txn: TransactionId) -> bool {
        self.rows
            .get(&resource)
            .and_then(|row| row.claim)
            .is_some_and(|claim| claim.owner == txn)
    }

    pub(crate) fn commit_write(&mut self, resource: ResourceId, txn: TransactionId) {
        if let Some(row) = self.rows.get_mut(&resource) {
            if let Some(claim) = row.claim.filter(|claim| claim.owner == txn) {
                row.committed = claim.staged;
                row.claim = None;
            }
        }
    }

    pub(crate) fn release(&mut self, resource: ResourceId, txn: TransactionId) {
        if let Some(row) = self.rows.get_mut(&resource) {
            if row.claim.is_some_and(|claim| claim.owner == txn) {
                row.claim = None;
            }
        }
    }

    pub fn resources(&self) -> Vec<ResourceId> {
        let mut ids: Vec<ResourceId> = self.rows.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn claim_count(&self) -> usize {
        self.rows.values().filter(|row| row.claim.is_some()).count()
    }
}
