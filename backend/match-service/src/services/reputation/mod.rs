/// Fame rating
///
/// A [0, 100] reputation score aggregated from weighted interaction counts.
/// The event bookkeeping lives elsewhere; this module owns the formula and the
/// rule for who needs rescoring after an event.
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const BASE_RATING: f64 = 50.0;
pub const POINTS_PER_LIKE: f64 = 2.0;
pub const POINTS_PER_MATCH: f64 = 3.0;
pub const POINTS_PER_VISIT: f64 = 0.5;
pub const POINTS_PER_REPORT: f64 = -10.0;
pub const POINTS_PER_BLOCK: f64 = -5.0;

pub const MIN_RATING: i32 = 0;
pub const MAX_RATING: i32 = 100;

/// Interactions received by one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InteractionCounts {
    pub likes_received: i64,
    pub matches: i64,
    pub visits_received: i64,
    pub reports_received: i64,
    pub blocks_received: i64,
}

impl InteractionCounts {
    pub fn fame_score(&self) -> i32 {
        score(
            self.likes_received,
            self.matches,
            self.visits_received,
            self.reports_received,
            self.blocks_received,
        )
    }
}

/// Raw total may go negative or past 100; only the rounded result is clamped.
pub fn score(likes: i64, matches: i64, visits: i64, reports: i64, blocks: i64) -> i32 {
    let raw = BASE_RATING
        + likes as f64 * POINTS_PER_LIKE
        + matches as f64 * POINTS_PER_MATCH
        + visits as f64 * POINTS_PER_VISIT
        + reports as f64 * POINTS_PER_REPORT
        + blocks as f64 * POINTS_PER_BLOCK;

    raw.round()
        .clamp(MIN_RATING as f64, MAX_RATING as f64) as i32
}

/// Rating of a profile nobody has scored yet
pub fn unscored_rating() -> i32 {
    InteractionCounts::default().fame_score()
}

/// Interaction that changes somebody's fame rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionEvent {
    Like { from: Uuid, to: Uuid },
    Unlike { from: Uuid, to: Uuid },
    Match { a: Uuid, b: Uuid },
    Unmatch { a: Uuid, b: Uuid },
    Visit { visitor: Uuid, visited: Uuid },
    Block { blocker: Uuid, blocked: Uuid },
    Unblock { blocker: Uuid, blocked: Uuid },
    Report { reporter: Uuid, reported: Uuid },
}

impl InteractionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InteractionEvent::Like { .. } => "like",
            InteractionEvent::Unlike { .. } => "unlike",
            InteractionEvent::Match { .. } => "match",
            InteractionEvent::Unmatch { .. } => "unmatch",
            InteractionEvent::Visit { .. } => "visit",
            InteractionEvent::Block { .. } => "block",
            InteractionEvent::Unblock { .. } => "unblock",
            InteractionEvent::Report { .. } => "report",
        }
    }

    /// Users whose rating must be recomputed; matches are symmetric
    pub fn rescore_targets(&self) -> Vec<Uuid> {
        match *self {
            InteractionEvent::Like { to, .. } | InteractionEvent::Unlike { to, .. } => vec![to],
            InteractionEvent::Match { a, b } | InteractionEvent::Unmatch { a, b } => {
                if a == b {
                    vec![a]
                } else {
                    vec![a, b]
                }
            }
            InteractionEvent::Visit { visited, .. } => vec![visited],
            InteractionEvent::Block { blocked, .. } | InteractionEvent::Unblock { blocked, .. } => {
                vec![blocked]
            }
            InteractionEvent::Report { reported, .. } => vec![reported],
        }
    }
}

/// Storage the recalculation reads counts from and writes ratings to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReputationStore: Send + Sync {
    async fn interaction_counts(&self, user_id: Uuid) -> Result<InteractionCounts>;
    async fn store_fame_rating(&self, user_id: Uuid, rating: i32) -> Result<()>;
}

pub struct FameRecalculator {
    store: Arc<dyn ReputationStore>,
}

impl FameRecalculator {
    pub fn new(store: Arc<dyn ReputationStore>) -> Self {
        Self { store }
    }

    pub async fn recalculate(&self, user_id: Uuid) -> Result<i32> {
        let counts = self.store.interaction_counts(user_id).await?;
        let rating = counts.fame_score();
        self.store.store_fame_rating(user_id, rating).await?;

        info!(
            user_id = %user_id,
            likes = counts.likes_received,
            matches = counts.matches,
            visits = counts.visits_received,
            reports = counts.reports_received,
            blocks = counts.blocks_received,
            rating = rating,
            "Fame rating recalculated"
        );

        Ok(rating)
    }

    /// Rescore everyone the event touches, in `rescore_targets` order
    pub async fn apply(&self, event: &InteractionEvent) -> Result<Vec<(Uuid, i32)>> {
        let mut ratings = Vec::new();
        for user_id in event.rescore_targets() {
            ratings.push((user_id, self.recalculate(user_id).await?));
        }
        Ok(ratings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;

    #[test]
    fn test_base_score() {
        assert_eq!(score(0, 0, 0, 0, 0), 50);
        assert_eq!(unscored_rating(), 50);
    }

    #[test]
    fn test_weighted_sum() {
        // 50 + 5*2 + 2*3 + 4*0.5 - 1*10 - 1*5 = 53
        assert_eq!(score(5, 2, 4, 1, 1), 53);
        // 50 + 0.5 rounds up
        assert_eq!(score(0, 0, 1, 0, 0), 51);
    }

    #[test]
    fn test_clamped_to_range() {
        assert_eq!(score(1000, 0, 0, 0, 0), 100);
        assert_eq!(score(0, 0, 0, 10, 0), 0);
        // negative intermediate total, only the result is clamped
        assert_eq!(score(0, 0, 1, 5, 5), 0);

        for likes in [0, 3, 40] {
            for reports in [0, 2, 9] {
                for blocks in [0, 4, 20] {
                    let s = score(likes, likes / 2, likes * 3, reports, blocks);
                    assert!((0..=100).contains(&s));
                }
            }
        }
    }

    #[test]
    fn test_monotonic_in_likes_and_reports() {
        for base in [(0, 0, 0, 0, 0), (3, 1, 7, 2, 1), (30, 10, 0, 0, 0)] {
            let (l, m, v, r, b) = base;
            let mut previous = score(l, m, v, r, b);
            for extra in 1..40 {
                let next = score(l + extra, m, v, r, b);
                assert!(next >= previous);
                previous = next;
            }

            let mut previous = score(l, m, v, r, b);
            for extra in 1..15 {
                let next = score(l, m, v, r + extra, b);
                assert!(next <= previous);
                previous = next;
            }
        }
    }

    #[test]
    fn test_rescore_targets() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);

        assert_eq!(InteractionEvent::Like { from: a, to: b }.rescore_targets(), vec![b]);
        assert_eq!(InteractionEvent::Match { a, b }.rescore_targets(), vec![a, b]);
        assert_eq!(InteractionEvent::Unmatch { a, b }.rescore_targets(), vec![a, b]);
        assert_eq!(
            InteractionEvent::Block { blocker: a, blocked: b }.rescore_targets(),
            vec![b]
        );
        assert_eq!(
            InteractionEvent::Report { reporter: a, reported: b }.rescore_targets(),
            vec![b]
        );
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::json!({
            "type": "visit",
            "visitor": Uuid::from_u128(1),
            "visited": Uuid::from_u128(2),
        });
        let event: InteractionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.kind(), "visit");
        assert_eq!(event.rescore_targets(), vec![Uuid::from_u128(2)]);
    }

    #[tokio::test]
    async fn test_recalculate_writes_back_score() {
        let user = Uuid::from_u128(7);
        let mut store = MockReputationStore::new();
        store.expect_interaction_counts().returning(|_| {
            Ok(InteractionCounts {
                likes_received: 10,
                matches: 2,
                ..Default::default()
            })
        });
        store
            .expect_store_fame_rating()
            .withf(move |id, rating| *id == user && *rating == 76)
            .times(1)
            .returning(|_, _| Ok(()));

        let recalculator = FameRecalculator::new(Arc::new(store));
        assert_eq!(recalculator.recalculate(user).await.unwrap(), 76);
    }

    #[tokio::test]
    async fn test_match_rescoring_touches_both_parties() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let mut store = MockReputationStore::new();
        store
            .expect_interaction_counts()
            .times(2)
            .returning(|_| Ok(InteractionCounts::default()));
        store
            .expect_store_fame_rating()
            .times(2)
            .returning(|_, _| Ok(()));

        let recalculator = FameRecalculator::new(Arc::new(store));
        let ratings = recalculator.apply(&InteractionEvent::Match { a, b }).await.unwrap();
        assert_eq!(ratings, vec![(a, 50), (b, 50)]);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockReputationStore::new();
        store
            .expect_interaction_counts()
            .returning(|_| Err(MatchError::Internal("counts unavailable".to_string())));

        let recalculator = FameRecalculator::new(Arc::new(store));
        assert!(recalculator.recalculate(Uuid::from_u128(3)).await.is_err());
    }
}
