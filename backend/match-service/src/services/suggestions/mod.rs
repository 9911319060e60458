use crate::error::{MatchError, Result};
use crate::metrics;
use crate::models::{Filters, Page, SortSpec, SuggestionPage};
use crate::services::pool::CandidatePool;
use crate::services::presence::{overlay_online_status, PresenceReader};
use crate::services::ranking::RankingEngine;
use crate::utils::with_deadline;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One validated browse request
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub requester_id: Uuid,
    pub filters: Filters,
    pub sort: SortSpec,
    pub page: Page,
}

/// Requester context -> eligible pool -> live presence -> ranked page
pub struct SuggestionService {
    pool: CandidatePool,
    engine: RankingEngine,
    presence: Option<Arc<dyn PresenceReader>>,
    store_timeout: Duration,
}

impl SuggestionService {
    pub fn new(pool: CandidatePool, store_timeout: Duration) -> Self {
        Self {
            pool,
            engine: RankingEngine::new(),
            presence: None,
            store_timeout,
        }
    }

    pub fn with_presence(mut self, presence: Arc<dyn PresenceReader>) -> Self {
        self.presence = Some(presence);
        self
    }

    pub async fn suggest(&self, request: SuggestionRequest) -> Result<SuggestionPage> {
        self.suggest_on(request, Utc::now().date_naive()).await
    }

    /// Ages are computed as of `today`
    pub async fn suggest_on(
        &self,
        request: SuggestionRequest,
        today: NaiveDate,
    ) -> Result<SuggestionPage> {
        let started = Instant::now();
        let result = self.build_page(&request, today).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(MatchError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        metrics::record_suggestion(outcome, request.sort.key.as_str(), started.elapsed());

        result
    }

    async fn build_page(&self, request: &SuggestionRequest, today: NaiveDate) -> Result<SuggestionPage> {
        let requester_id = request.requester_id;

        let context =
            with_deadline(self.store_timeout, self.pool.requester_context(requester_id)).await?;
        let Some(context) = context else {
            debug!(requester_id = %requester_id, "Requester has no profile, no suggestions");
            return Ok(empty_page(request.page));
        };

        let mut candidates = with_deadline(
            self.store_timeout,
            self.pool
                .fetch_candidates(requester_id, &context, &request.filters, today),
        )
        .await?;

        if let Some(presence) = &self.presence {
            let overlay = overlay_online_status(presence.as_ref(), &mut candidates);
            if timeout(self.store_timeout, overlay).await.is_err() {
                warn!(
                    requester_id = %requester_id,
                    timeout = ?self.store_timeout,
                    "Presence lookup timed out, using stored online flags"
                );
            }
        }

        let ranked = self.engine.rank(
            candidates,
            &context,
            request.sort,
            request.filters.max_distance_km,
            request.page,
        );
        metrics::record_eligible_candidates(ranked.total);

        info!(
            requester_id = %requester_id,
            sort_by = request.sort.key.as_str(),
            total = ranked.total,
            returned = ranked.page.len(),
            offset = request.page.offset,
            "Suggestions ranked"
        );

        Ok(SuggestionPage {
            profiles: ranked.page,
            total: ranked.total,
            limit: request.page.limit,
            offset: request.page.offset,
        })
    }
}

fn empty_page(page: Page) -> SuggestionPage {
    SuggestionPage {
        profiles: Vec::new(),
        total: 0,
        limit: page.limit,
        offset: page.offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateRow, RequesterProfile};
    use crate::services::compatibility::tests::row;
    use crate::services::pool::{
        BlockStore, CandidateQuery, InMemoryDirectory, ProfileStore, TagStore,
    };
    use crate::services::presence::LocalPresence;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
    }

    fn request(requester: u128) -> SuggestionRequest {
        SuggestionRequest {
            requester_id: Uuid::from_u128(requester),
            filters: Filters::default(),
            sort: SortSpec::default(),
            page: Page { limit: 20, offset: 0 },
        }
    }

    fn directory() -> Arc<InMemoryDirectory> {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut requester = row(1);
        requester.gender = Some("male".to_string());
        directory.insert(requester);
        for id in 2..=4 {
            directory.insert(row(id));
        }
        directory
    }

    #[tokio::test]
    async fn test_missing_profile_returns_empty_page() {
        let service = SuggestionService::new(
            CandidatePool::from_directory(directory()),
            Duration::from_secs(1),
        );

        let page = service.suggest_on(request(42), today()).await.unwrap();
        assert!(page.profiles.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.limit, 20);
    }

    #[tokio::test]
    async fn test_page_echoes_paging_and_total() {
        let service = SuggestionService::new(
            CandidatePool::from_directory(directory()),
            Duration::from_secs(1),
        );
        let mut req = request(1);
        req.page = Page { limit: 2, offset: 1 };

        let page = service.suggest_on(req, today()).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.profiles.len(), 2);
        assert_eq!((page.limit, page.offset), (2, 1));
    }

    #[tokio::test]
    async fn test_presence_overrides_stored_flag() {
        let presence = Arc::new(LocalPresence::new());
        presence.mark_online(Uuid::from_u128(3));
        let service = SuggestionService::new(
            CandidatePool::from_directory(directory()),
            Duration::from_secs(1),
        )
        .with_presence(presence);

        let page = service.suggest_on(request(1), today()).await.unwrap();
        let online: Vec<Uuid> = page
            .profiles
            .iter()
            .filter(|c| c.is_online)
            .map(|c| c.id)
            .collect();
        assert_eq!(online, vec![Uuid::from_u128(3)]);
    }

    struct SlowProfiles;

    #[async_trait]
    impl ProfileStore for SlowProfiles {
        async fn requester_profile(&self, _user_id: Uuid) -> Result<Option<RequesterProfile>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(RequesterProfile::default()))
        }

        async fn eligible_candidates(&self, _query: &CandidateQuery) -> Result<Vec<CandidateRow>> {
            Ok(Vec::new())
        }
    }

    struct NoTagsNoBlocks;

    #[async_trait]
    impl TagStore for NoTagsNoBlocks {
        async fn tags_of(&self, _user_id: Uuid) -> Result<HashSet<String>> {
            Ok(HashSet::new())
        }

        async fn tags_of_many(&self, _user_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<String>>> {
            Ok(HashMap::new())
        }
    }

    #[async_trait]
    impl BlockStore for NoTagsNoBlocks {
        async fn is_blocked_either_direction(&self, _user_id: Uuid, _other_id: Uuid) -> Result<bool> {
            Ok(false)
        }

        async fn blocked_either_direction(&self, _user_id: Uuid) -> Result<HashSet<Uuid>> {
            Ok(HashSet::new())
        }
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let pool = CandidatePool::new(
            Arc::new(SlowProfiles),
            Arc::new(NoTagsNoBlocks),
            Arc::new(NoTagsNoBlocks),
        );
        let service = SuggestionService::new(pool, Duration::from_millis(20));

        let err = service.suggest_on(request(1), today()).await.unwrap_err();
        assert!(matches!(err, MatchError::Timeout(_)));
        assert_eq!(err.code(), "TIMEOUT");
    }
}
