use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a likeable resource (a post).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl ResourceId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque actor token supplied by the authentication layer.
///
/// The engine only compares actors for equality. The one check it makes is
/// [`ActorId::is_well_formed`], which rejects blank or control-character ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        !self.0.trim().is_empty() && !self.0.chars().any(char::is_control)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Uuid> for ActorId {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite natural key of a membership record: "actor likes resource".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MembershipKey {
    pub resource: ResourceId,
    pub actor: ActorId,
}

impl MembershipKey {
    pub fn new(resource: ResourceId, actor: ActorId) -> Self {
        Self { resource, actor }
    }
}

impl fmt::Display for MembershipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource, self.actor)
    }
}

/// Counter value together with the version it was read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub count: u64,
    pub version: u64,
}

/// Direction of a counter adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterDelta {
    Increment,
    Decrement,
}

impl CounterDelta {
    /// Applies the delta, refusing to go below zero.
    pub fn apply(self, count: u64) -> Option<u64> {
        match self {
            Self::Increment => count.checked_add(1),
            Self::Decrement => count.checked_sub(1),
        }
    }
}

impl fmt::Display for CounterDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increment => write!(f, "+1"),
            Self::Decrement => write!(f, "-1"),
        }
    }
}

/// What the request layer renders after a toggle or a like-info lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub like_count: u64,
    pub liked_by_current_actor: bool,
}

impl LikeResponse {
    pub fn new(like_count: u64, liked_by_current_actor: bool) -> Self {
        Self {
            like_count,
            liked_by_current_actor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_well_formed() {
        assert!(ActorId::from("member-42").is_well_formed());
        assert!(!ActorId::from("").is_well_formed());
        assert!(!ActorId::from("   ").is_well_formed());
        assert!(!ActorId::from("bad\nid").is_well_formed());
    }

    #[test]
    fn test_counter_delta_never_underflows() {
        assert_eq!(CounterDelta::Increment.apply(0), Some(1));
        assert_eq!(CounterDelta::Decrement.apply(1), Some(0));
        assert_eq!(CounterDelta::Decrement.apply(0), None);
    }

    #[test]
    fn test_like_response_wire_names() {
        let json = serde_json::to_value(LikeResponse::new(3, true)).unwrap();
        assert_eq!(json["likeCount"], 3);
        assert_eq!(json["likedByCurrentActor"], true);
    }
}
