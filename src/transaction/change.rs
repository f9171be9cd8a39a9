// ============================================================================
// Staged Changes
// ============================================================================
//
// Every write a like transaction makes is staged as a Change. Nothing is
// visible to other transactions until COMMIT applies the whole list; ROLLBACK
// releases the claimed rows and drops the list.
//
// ============================================================================

use crate::core::{MembershipKey, ResourceId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Create a membership record
    InsertMembership {
        key: MembershipKey,
        liked_at: DateTime<Utc>,
    },

    /// Remove a membership record
    DeleteMembership { key: MembershipKey },

    /// Version-checked counter write; commits as `version = expected_version + 1`
    WriteCounter {
        resource: ResourceId,
        expected_version: u64,
        count: u64,
    },
}

impl Change {
    /// Get the resource affected by this change
    pub fn resource(&self) -> ResourceId {
        match self {
            Change::InsertMembership { key, .. } => key.resource,
            Change::DeleteMembership { key } => key.resource,
            Change::WriteCounter { resource, .. } => *resource,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Change::InsertMembership { .. } => "insert_membership",
            Change::DeleteMembership { .. } => "delete_membership",
            Change::WriteCounter { .. } => "write_counter",
        }
    }
}
