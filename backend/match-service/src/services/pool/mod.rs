mod memory;
mod postgres;

use crate::error::Result;
use crate::models::{
    Candidate, CandidateRow, Filters, Gender, RequesterContext, RequesterProfile, SexualPreference,
};
use crate::services::compatibility::{
    admits_all, candidate_age, effective_fame, eligibility_predicates, Predicate,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub use memory::InMemoryDirectory;
pub use postgres::PgDirectory;

/// What a profile store is asked for. Stores push down the predicates they
/// can express and may return extra rows; they must never drop an eligible one.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub predicates: Vec<Predicate>,
    pub today: NaiveDate,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `None` when the user has no profile row yet
    async fn requester_profile(&self, user_id: Uuid) -> Result<Option<RequesterProfile>>;

    async fn eligible_candidates(&self, query: &CandidateQuery) -> Result<Vec<CandidateRow>>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn tags_of(&self, user_id: Uuid) -> Result<HashSet<String>>;

    /// Tags for a batch of users; users without tags may be absent from the map
    async fn tags_of_many(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<String>>>;

    async fn common_tag_count(&self, user_id: Uuid, other_id: Uuid) -> Result<usize> {
        let mine = self.tags_of(user_id).await?;
        let theirs = self.tags_of(other_id).await?;
        Ok(mine.intersection(&theirs).count())
    }
}

#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn is_blocked_either_direction(&self, user_id: Uuid, other_id: Uuid) -> Result<bool>;

    /// Everyone `user_id` blocked plus everyone who blocked `user_id`
    async fn blocked_either_direction(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;
}

/// Eligible candidate set for one requester, unordered and unpaginated
#[derive(Clone)]
pub struct CandidatePool {
    profiles: Arc<dyn ProfileStore>,
    tags: Arc<dyn TagStore>,
    blocks: Arc<dyn BlockStore>,
}

impl CandidatePool {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        tags: Arc<dyn TagStore>,
        blocks: Arc<dyn BlockStore>,
    ) -> Self {
        Self {
            profiles,
            tags,
            blocks,
        }
    }

    /// Same backend for all three contracts
    pub fn from_directory<D>(directory: Arc<D>) -> Self
    where
        D: ProfileStore + TagStore + BlockStore + 'static,
    {
        Self::new(directory.clone(), directory.clone(), directory)
    }

    pub async fn requester_context(&self, user_id: Uuid) -> Result<Option<RequesterContext>> {
        let (profile, tags) = futures::try_join!(
            self.profiles.requester_profile(user_id),
            self.tags.tags_of(user_id)
        )?;
        let Some(profile) = profile else {
            return Ok(None);
        };

        Ok(Some(RequesterContext {
            gender: profile.gender.as_deref().and_then(Gender::parse),
            sexual_preference: profile
                .sexual_preference
                .as_deref()
                .and_then(SexualPreference::parse),
            latitude: profile.latitude,
            longitude: profile.longitude,
            tags,
        }))
    }

    pub async fn fetch_candidates(
        &self,
        requester_id: Uuid,
        context: &RequesterContext,
        filters: &Filters,
        today: NaiveDate,
    ) -> Result<Vec<Candidate>> {
        let excluded = self.blocks.blocked_either_direction(requester_id).await?;
        let query = CandidateQuery {
            predicates: eligibility_predicates(requester_id, context, filters, &excluded),
            today,
        };

        let rows = self.profiles.eligible_candidates(&query).await?;
        let fetched = rows.len();

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut tags_by_user = if ids.is_empty() {
            HashMap::new()
        } else {
            self.tags.tags_of_many(&ids).await?
        };

        let candidates: Vec<Candidate> = rows
            .into_iter()
            .filter_map(|row| {
                let mut tags = tags_by_user.remove(&row.id).unwrap_or_default();
                tags.sort();
                tags.dedup();

                admits_all(&query.predicates, &row, &tags, today)
                    .then(|| into_candidate(row, tags, &context.tags, today))
            })
            .collect();

        debug!(
            requester_id = %requester_id,
            fetched = fetched,
            eligible = candidates.len(),
            excluded = excluded.len(),
            "Candidate pool built"
        );

        Ok(candidates)
    }
}

fn into_candidate(
    row: CandidateRow,
    tags: Vec<String>,
    requester_tags: &HashSet<String>,
    today: NaiveDate,
) -> Candidate {
    let common_tag_count = tags.iter().filter(|tag| requester_tags.contains(*tag)).count();

    Candidate {
        age: candidate_age(&row, today),
        gender: row.gender(),
        fame_rating: effective_fame(&row),
        id: row.id,
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        birth_date: row.birth_date,
        city: row.city,
        country: row.country,
        latitude: row.latitude,
        longitude: row.longitude,
        profile_photo: row.profile_photo,
        distance_km: None,
        common_tag_count,
        tags,
        is_online: row.is_online,
        last_login_at: row.last_login,
    }
}
