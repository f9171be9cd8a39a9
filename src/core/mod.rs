pub mod error;
pub mod types;

pub use error::{ConfigError, Result, StoreError, ToggleError};
pub use types::{ActorId, CounterDelta, CounterSnapshot, LikeResponse, MembershipKey, ResourceId};
