use super::{BlockStore, CandidateQuery, ProfileStore, TagStore};
use crate::error::Result;
use crate::models::{CandidateRow, RequesterProfile, SexualPreference};
use crate::services::compatibility::Predicate;
use crate::services::reputation::{self, InteractionCounts, ReputationStore};
use crate::utils::years_before;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const CANDIDATE_COLUMNS: &str = r#"
    SELECT
        u.id,
        u.username,
        u.first_name,
        u.last_name,
        u.is_verified,
        u.has_completed_onboarding,
        u.is_online,
        u.last_login,
        p.gender,
        p.sexual_preference,
        p.birth_date,
        p.city,
        p.country,
        p.latitude,
        p.longitude,
        p.fame_rating,
        (SELECT ph.filename FROM photos ph
         WHERE ph.user_id = u.id AND ph.is_profile_picture = TRUE
         LIMIT 1) AS profile_photo
    FROM users u
    JOIN profiles p ON p.user_id = u.id
    WHERE TRUE"#;

/// Age bounds past this span are left to the in-memory re-check; the
/// birth dates they imply fall outside the Postgres `date` range.
const PUSHDOWN_AGE_LIMIT: u32 = 200;

const COMMON_TAG_COUNT_SQL: &str = r#"
    SELECT COUNT(DISTINCT a.tag_id)
    FROM user_tags a
    JOIN user_tags b ON a.tag_id = b.tag_id
    WHERE a.user_id = $1 AND b.user_id = $2"#;

const PAIR_BLOCKED_SQL: &str = r#"
    SELECT EXISTS(
        SELECT 1 FROM blocks
        WHERE (blocker_id = $1 AND blocked_user_id = $2)
           OR (blocker_id = $2 AND blocked_user_id = $1)
    )"#;

/// Postgres-backed profile, tag, block and reputation store
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Candidate SELECT with every predicate pushed down as a bound condition.
/// Age bounds become a birth-date range one day wider than exact.
pub(crate) fn candidate_query(query: &CandidateQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(CANDIDATE_COLUMNS);

    for predicate in &query.predicates {
        push_predicate(&mut builder, predicate, query.today);
    }

    builder.push(" ORDER BY u.id");
    builder
}

fn push_predicate(builder: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate, today: NaiveDate) {
    match predicate {
        Predicate::NotUser(id) => {
            builder.push(" AND u.id <> ").push_bind(*id);
        }
        Predicate::VerifiedAndOnboarded => {
            builder.push(" AND u.is_verified = TRUE AND u.has_completed_onboarding = TRUE");
        }
        Predicate::NotIn(ids) => {
            builder.push(" AND u.id <> ALL(").push_bind(ids.clone()).push(")");
        }
        Predicate::GenderIs(gender) => {
            builder.push(" AND p.gender = ").push_bind(gender.as_str());
        }
        Predicate::AcceptsGender(gender) => {
            builder
                .push(" AND COALESCE(p.sexual_preference, ")
                .push_bind(SexualPreference::Both.as_str())
                .push(") IN (")
                .push_bind(SexualPreference::Both.as_str())
                .push(", ")
                .push_bind(gender.as_str())
                .push(")");
        }
        Predicate::MinAge(min) | Predicate::MaxAge(min) if *min > PUSHDOWN_AGE_LIMIT => {}
        Predicate::MinAge(min) => {
            let latest_birth = years_before(today, *min).succ_opt().unwrap_or(NaiveDate::MAX);
            builder.push(" AND p.birth_date <= ").push_bind(latest_birth);
        }
        Predicate::MaxAge(max) => {
            let earliest_birth = years_before(today, max.saturating_add(1));
            builder.push(" AND p.birth_date >= ").push_bind(earliest_birth);
        }
        Predicate::MinFame(min) => {
            builder
                .push(" AND COALESCE(p.fame_rating, ")
                .push_bind(reputation::unscored_rating())
                .push(") >= ")
                .push_bind(*min);
        }
        Predicate::MaxFame(max) => {
            builder
                .push(" AND COALESCE(p.fame_rating, ")
                .push_bind(reputation::unscored_rating())
                .push(") <= ")
                .push_bind(*max);
        }
        Predicate::HasAnyTag(tags) => {
            builder
                .push(
                    " AND EXISTS (SELECT 1 FROM user_tags ut JOIN tags t ON t.id = ut.tag_id \
                     WHERE ut.user_id = u.id AND t.name = ANY(",
                )
                .push_bind(tags.clone())
                .push("))");
        }
        Predicate::LocationContains(needle) => {
            let pattern = format!("%{}%", escape_like(needle));
            builder
                .push(" AND (p.city ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR p.country ILIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }
}

/// Escape LIKE metacharacters so user text matches literally
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl ProfileStore for PgDirectory {
    async fn requester_profile(&self, user_id: Uuid) -> Result<Option<RequesterProfile>> {
        let profile = sqlx::query_as::<_, RequesterProfile>(
            r#"
            SELECT p.gender, p.sexual_preference, p.latitude, p.longitude
            FROM profiles p
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn eligible_candidates(&self, query: &CandidateQuery) -> Result<Vec<CandidateRow>> {
        let rows = candidate_query(query)
            .build_query_as::<CandidateRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

#[async_trait]
impl TagStore for PgDirectory {
    async fn tags_of(&self, user_id: Uuid) -> Result<HashSet<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT t.name
            FROM user_tags ut
            JOIN tags t ON t.id = ut.tag_id
            WHERE ut.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names.into_iter().collect())
    }

    async fn tags_of_many(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<String>>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT ut.user_id, t.name
            FROM user_tags ut
            JOIN tags t ON t.id = ut.tag_id
            WHERE ut.user_id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tags: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (user_id, name) in rows {
            tags.entry(user_id).or_default().push(name);
        }
        Ok(tags)
    }

    async fn common_tag_count(&self, user_id: Uuid, other_id: Uuid) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(COMMON_TAG_COUNT_SQL)
        .bind(user_id)
        .bind(other_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as usize)
    }
}

#[async_trait]
impl BlockStore for PgDirectory {
    async fn is_blocked_either_direction(&self, user_id: Uuid, other_id: Uuid) -> Result<bool> {
        let blocked: bool = sqlx::query_scalar(PAIR_BLOCKED_SQL)
        .bind(user_id)
        .bind(other_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(blocked)
    }

    async fn blocked_either_direction(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT blocked_user_id FROM blocks WHERE blocker_id = $1
            UNION
            SELECT blocker_id FROM blocks WHERE blocked_user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl ReputationStore for PgDirectory {
    async fn interaction_counts(&self, user_id: Uuid) -> Result<InteractionCounts> {
        let counts = sqlx::query_as::<_, InteractionCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM likes WHERE to_user_id = $1) AS likes_received,
                (SELECT COUNT(*)
                 FROM likes l1
                 JOIN likes l2
                   ON l1.from_user_id = l2.to_user_id AND l1.to_user_id = l2.from_user_id
                 WHERE l1.to_user_id = $1) AS matches,
                (SELECT COUNT(*) FROM visits WHERE visited_user_id = $1) AS visits_received,
                (SELECT COUNT(*) FROM reports WHERE reported_user_id = $1) AS reports_received,
                (SELECT COUNT(*) FROM blocks WHERE blocked_user_id = $1) AS blocks_received
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn store_fame_rating(&self, user_id: Uuid, rating: i32) -> Result<()> {
        sqlx::query("UPDATE profiles SET fame_rating = $1 WHERE user_id = $2")
            .bind(rating)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
