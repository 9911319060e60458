use super::{BlockStore, CandidateQuery, ProfileStore, TagStore};
use crate::error::Result;
use crate::models::{CandidateRow, RequesterProfile};
use crate::services::compatibility::admits_all;
use crate::services::reputation::{InteractionCounts, ReputationStore};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Process-local directory used by tests and local runs without Postgres.
/// Every user row doubles as that user's own profile.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: DashMap<Uuid, CandidateRow>,
    tags: DashMap<Uuid, HashSet<String>>,
    /// (blocker, blocked)
    blocks: DashSet<(Uuid, Uuid)>,
    interactions: DashMap<Uuid, InteractionCounts>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, row: CandidateRow) {
        self.users.insert(row.id, row);
    }

    pub fn set_tags(&self, user_id: Uuid, tags: &[&str]) {
        self.tags
            .insert(user_id, tags.iter().map(|tag| tag.to_string()).collect());
    }

    pub fn block(&self, blocker: Uuid, blocked: Uuid) {
        self.blocks.insert((blocker, blocked));
    }

    pub fn unblock(&self, blocker: Uuid, blocked: Uuid) {
        self.blocks.remove(&(blocker, blocked));
    }

    pub fn set_interactions(&self, user_id: Uuid, counts: InteractionCounts) {
        self.interactions.insert(user_id, counts);
    }

    pub fn fame_rating(&self, user_id: Uuid) -> Option<i32> {
        self.users.get(&user_id).and_then(|row| row.fame_rating)
    }

    fn tags_vec(&self, user_id: Uuid) -> Vec<String> {
        self.tags
            .get(&user_id)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryDirectory {
    async fn requester_profile(&self, user_id: Uuid) -> Result<Option<RequesterProfile>> {
        Ok(self.users.get(&user_id).map(|row| RequesterProfile {
            gender: row.gender.clone(),
            sexual_preference: row.sexual_preference.clone(),
            latitude: row.latitude,
            longitude: row.longitude,
        }))
    }

    async fn eligible_candidates(&self, query: &CandidateQuery) -> Result<Vec<CandidateRow>> {
        let rows: Vec<CandidateRow> = self.users.iter().map(|entry| entry.value().clone()).collect();

        let mut eligible: Vec<CandidateRow> = rows
            .into_iter()
            .filter(|row| {
                let tags = self.tags_vec(row.id);
                admits_all(&query.predicates, row, &tags, query.today)
            })
            .collect();
        eligible.sort_by_key(|row| row.id);

        Ok(eligible)
    }
}

#[async_trait]
impl TagStore for InMemoryDirectory {
    async fn tags_of(&self, user_id: Uuid) -> Result<HashSet<String>> {
        Ok(self
            .tags
            .get(&user_id)
            .map(|tags| tags.clone())
            .unwrap_or_default())
    }

    async fn tags_of_many(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<String>>> {
        Ok(user_ids
            .iter()
            .map(|id| (*id, self.tags_vec(*id)))
            .filter(|(_, tags)| !tags.is_empty())
            .collect())
    }
}

#[async_trait]
impl BlockStore for InMemoryDirectory {
    async fn is_blocked_either_direction(&self, user_id: Uuid, other_id: Uuid) -> Result<bool> {
        Ok(self.blocks.contains(&(user_id, other_id)) || self.blocks.contains(&(other_id, user_id)))
    }

    async fn blocked_either_direction(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        Ok(self
            .blocks
            .iter()
            .filter_map(|pair| {
                let (blocker, blocked) = *pair;
                if blocker == user_id {
                    Some(blocked)
                } else if blocked == user_id {
                    Some(blocker)
                } else {
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl ReputationStore for InMemoryDirectory {
    async fn interaction_counts(&self, user_id: Uuid) -> Result<InteractionCounts> {
        Ok(self
            .interactions
            .get(&user_id)
            .map(|counts| *counts)
            .unwrap_or_default())
    }

    async fn store_fame_rating(&self, user_id: Uuid, rating: i32) -> Result<()> {
        if let Some(mut row) = self.users.get_mut(&user_id) {
            row.fame_rating = Some(rating);
        }
        Ok(())
    }
}
