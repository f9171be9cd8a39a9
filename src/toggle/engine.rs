use crate::core::{
    ActorId, CounterDelta, LikeResponse, MembershipKey, ResourceId, StoreError, ToggleError,
};
use crate::retry::{RetryOrchestrator, RetryPolicy, RetryStatsSnapshot};
use crate::storage::{AggregateCounter, LikeStore, LikeTransaction, MembershipStore};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{Instrument, Level, event, info_span};

/// Which way a toggle flipped the membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    Liked,
    Unliked,
}

/// Committed result of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub action: ToggleAction,
    pub like_count: u64,
    /// Counter version written by the committing attempt.
    pub version: u64,
}

impl ToggleOutcome {
    pub fn liked(&self) -> bool {
        self.action == ToggleAction::Liked
    }
}

impl From<ToggleOutcome> for LikeResponse {
    fn from(outcome: ToggleOutcome) -> Self {
        LikeResponse::new(outcome.like_count, outcome.liked())
    }
}

/// Flips an actor's like on a resource, keeping the counter equal to the
/// number of membership records.
///
/// Each attempt runs in its own store transaction; conflicts with concurrent
/// togglers roll the attempt back and hand it to the [`RetryOrchestrator`].
/// The engine itself takes no locks.
pub struct ToggleEngine<S: LikeStore> {
    store: Arc<S>,
    retry: RetryOrchestrator,
}

impl<S: LikeStore> Clone for ToggleEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            retry: self.retry.clone(),
        }
    }
}

impl<S: LikeStore> ToggleEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    pub fn with_policy(store: S, policy: RetryPolicy) -> Self {
        Self::from_shared(Arc::new(store), policy)
    }

    pub fn from_shared(store: Arc<S>, policy: RetryPolicy) -> Self {
        Self {
            store,
            retry: RetryOrchestrator::new(policy),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    pub fn stats(&self) -> RetryStatsSnapshot {
        self.retry.stats().snapshot()
    }

    /// Likes the resource if the actor has not liked it yet, unlikes it otherwise.
    pub async fn toggle(
        &self,
        resource: ResourceId,
        actor: &ActorId,
    ) -> Result<ToggleOutcome, ToggleError> {
        self.toggle_until(resource, actor, None).await
    }

    /// [`toggle`](Self::toggle) that stops retrying once `deadline` would be
    /// overrun and reports [`ToggleError::Exhausted`].
    pub async fn toggle_until(
        &self,
        resource: ResourceId,
        actor: &ActorId,
        deadline: Option<Instant>,
    ) -> Result<ToggleOutcome, ToggleError> {
        if !actor.is_well_formed() {
            return Err(ToggleError::InvalidActor(actor.to_string()));
        }

        let key = MembershipKey::new(resource, actor.clone());
        let key = &key;
        let span = info_span!("toggle", resource = %resource, actor = %actor);
        self.retry
            .run_until(deadline, move |attempt| self.attempt_keyed(key, attempt))
            .instrument(span)
            .await
    }

    /// One transactional attempt, without retries.
    pub async fn attempt(
        &self,
        resource: ResourceId,
        actor: &ActorId,
    ) -> Result<ToggleOutcome, StoreError> {
        self.attempt_keyed(&MembershipKey::new(resource, actor.clone()), 1)
            .await
    }

    async fn attempt_keyed(
        &self,
        key: &MembershipKey,
        attempt: u32,
    ) -> Result<ToggleOutcome, StoreError> {
        let mut tx = self.store.begin().await?;

        match Self::apply_toggle(&mut tx, key).await {
            Ok(outcome) => {
                tx.commit().await?;
                event!(
                    Level::DEBUG,
                    txn = %tx.id(),
                    attempt,
                    action = ?outcome.action,
                    like_count = outcome.like_count,
                    "toggle committed"
                );
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    event!(
                        Level::WARN,
                        txn = %tx.id(),
                        error = %rollback_err,
                        "rollback after failed attempt did not complete"
                    );
                }
                event!(
                    Level::DEBUG,
                    txn = %tx.id(),
                    attempt,
                    error = %err,
                    "toggle attempt rolled back"
                );
                Err(err)
            }
        }
    }

    async fn apply_toggle(
        tx: &mut S::Tx,
        key: &MembershipKey,
    ) -> Result<ToggleOutcome, StoreError> {
        let liked = tx.exists(key).await?;
        let current = tx.read_with_version(key.resource).await?;

        let (action, delta) = if liked {
            tx.delete(key).await?;
            (ToggleAction::Unliked, CounterDelta::Decrement)
        } else {
            tx.insert(key).await?;
            (ToggleAction::Liked, CounterDelta::Increment)
        };

        let written = tx
            .conditional_write(key.resource, current.version, delta)
            .await?;

        Ok(ToggleOutcome {
            action,
            like_count: written.count,
            version: written.version,
        })
    }

    /// Current like count and whether `actor` (if any) has liked the resource.
    pub async fn like_info(
        &self,
        resource: ResourceId,
        actor: Option<&ActorId>,
    ) -> Result<LikeResponse, ToggleError> {
        if let Some(actor) = actor.filter(|actor| !actor.is_well_formed()) {
            return Err(ToggleError::InvalidActor(actor.to_string()));
        }

        self.retry
            .run(move |_| self.read_like_info(resource, actor))
            .await
    }

    async fn read_like_info(
        &self,
        resource: ResourceId,
        actor: Option<&ActorId>,
    ) -> Result<LikeResponse, StoreError> {
        let mut tx = self.store.begin().await?;
        let result = Self::read_in(&mut tx, resource, actor).await;
        if let Err(err) = tx.rollback().await {
            event!(Level::WARN, txn = %tx.id(), error = %err, "read-only rollback failed");
        }
        result
    }

    async fn read_in(
        tx: &mut S::Tx,
        resource: ResourceId,
        actor: Option<&ActorId>,
    ) -> Result<LikeResponse, StoreError> {
        let snapshot = tx.read_with_version(resource).await?;
        let liked = match actor {
            Some(actor) => {
                tx.exists(&MembershipKey::new(resource, actor.clone()))
                    .await?
            }
            None => false,
        };
        Ok(LikeResponse::new(snapshot.count, liked))
    }
}
