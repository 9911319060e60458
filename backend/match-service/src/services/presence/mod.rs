//! Online status
//!
//! Ranking never talks to a transport directly. It asks a [`PresenceReader`]
//! which of the fetched candidates are online right now and overlays the
//! answer on the stored flag.

use crate::error::Result;
use crate::models::Candidate;
use async_trait::async_trait;
use dashmap::DashSet;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceReader: Send + Sync {
    /// Subset of `user_ids` currently online
    async fn online_among(&self, user_ids: &[Uuid]) -> Result<HashSet<Uuid>>;

    async fn is_online(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.online_among(&[user_id]).await?.contains(&user_id))
    }
}

/// Online users are members of one Redis set maintained by the realtime gateway
#[derive(Clone)]
pub struct RedisPresence {
    redis: ConnectionManager,
    online_set_key: String,
}

impl RedisPresence {
    pub fn new(redis: ConnectionManager, online_set_key: impl Into<String>) -> Self {
        Self {
            redis,
            online_set_key: online_set_key.into(),
        }
    }
}

#[async_trait]
impl PresenceReader for RedisPresence {
    async fn online_among(&self, user_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        if user_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut pipe = redis::pipe();
        for id in user_ids {
            pipe.sismember(&self.online_set_key, id.to_string());
        }

        let flags: Vec<bool> = pipe.query_async(&mut self.redis.clone()).await?;

        Ok(user_ids
            .iter()
            .zip(flags)
            .filter_map(|(id, online)| online.then_some(*id))
            .collect())
    }

    async fn is_online(&self, user_id: Uuid) -> Result<bool> {
        let mut conn = self.redis.clone();
        let online: bool = conn
            .sismember(&self.online_set_key, user_id.to_string())
            .await?;
        Ok(online)
    }
}

/// In-process registry for single-node and test setups
#[derive(Debug, Default)]
pub struct LocalPresence {
    online: DashSet<Uuid>,
}

impl LocalPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_online(&self, user_id: Uuid) {
        self.online.insert(user_id);
    }

    pub fn mark_offline(&self, user_id: Uuid) {
        self.online.remove(&user_id);
    }
}

#[async_trait]
impl PresenceReader for LocalPresence {
    async fn online_among(&self, user_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        Ok(user_ids
            .iter()
            .filter(|id| self.online.contains(*id))
            .copied()
            .collect())
    }
}

/// Replace stored flags with live status. A failing reader leaves the stored
/// flags in place.
pub async fn overlay_online_status(reader: &dyn PresenceReader, candidates: &mut [Candidate]) {
    let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();

    match reader.online_among(&ids).await {
        Ok(online) => {
            for candidate in candidates.iter_mut() {
                candidate.is_online = online.contains(&candidate.id);
            }
        }
        Err(e) => {
            warn!(error = %e, candidates = ids.len(), "Presence lookup failed, using stored online flags");
        }
    }
}
