use crate::config::EngineConfig;
use crate::core::{ActorId, LikeResponse, ResourceId, ToggleError};
use crate::storage::{InMemoryLikeStore, LikeStore};
use crate::toggle::ToggleEngine;
use futures::future::try_join_all;
use tracing::{Level, event};

/// Entry point for the request layer.
///
/// Callers hand over the actor their authentication layer resolved, or `None`
/// for an anonymous request. Toggling requires an actor; reading like info
/// does not.
pub struct PostLikeService<S: LikeStore> {
    engine: ToggleEngine<S>,
}

impl<S: LikeStore> Clone for PostLikeService<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl PostLikeService<InMemoryLikeStore> {
    /// Service over a fresh in-memory store configured from `config`.
    pub fn in_memory(config: &EngineConfig) -> Self {
        let store = InMemoryLikeStore::with_config(config.store.clone());
        Self::new(ToggleEngine::with_policy(store, config.retry.clone()))
    }
}

impl<S: LikeStore> PostLikeService<S> {
    pub fn new(engine: ToggleEngine<S>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ToggleEngine<S> {
        &self.engine
    }

    pub async fn toggle_like(
        &self,
        post_id: ResourceId,
        actor: Option<&ActorId>,
    ) -> Result<LikeResponse, ToggleError> {
        let actor = actor.ok_or(ToggleError::ActorUnresolved)?;
        event!(Level::DEBUG, post_id = %post_id, actor = %actor, "toggle like requested");

        let outcome = self.engine.toggle(post_id, actor).await?;
        Ok(outcome.into())
    }

    pub async fn like_info(
        &self,
        post_id: ResourceId,
        actor: Option<&ActorId>,
    ) -> Result<LikeResponse, ToggleError> {
        self.engine.like_info(post_id, actor).await
    }

    /// Like info for a listing page, in the order of `post_ids`.
    pub async fn like_infos(
        &self,
        post_ids: &[ResourceId],
        actor: Option<&ActorId>,
    ) -> Result<Vec<(ResourceId, LikeResponse)>, ToggleError> {
        try_join_all(post_ids.iter().map(|&post_id| async move {
            let info = self.engine.like_info(post_id, actor).await?;
            Ok::<_, ToggleError>((post_id, info))
        }))
        .await
    }
}
