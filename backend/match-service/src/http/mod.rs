//! HTTP surface of match-service
//!
//! Validation happens here, once, before anything reaches the core.

use crate::config::BrowseConfig;
use crate::error::{MatchError, Result};
use crate::metrics;
use crate::models::{Filters, Page, SortDirection, SortKey, SortSpec};
use crate::services::reputation::{FameRecalculator, InteractionEvent};
use crate::services::suggestions::{SuggestionRequest, SuggestionService};
use actix_web::{dev::Payload, get, post, web, FromRequest, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

/// Header the auth gateway sets after validating the session
pub const USER_ID_HEADER: &str = "x-user-id";

pub struct AppState {
    pub suggestions: SuggestionService,
    pub fame: FameRecalculator,
    pub browse: BrowseConfig,
}

/// Authenticated requester
#[derive(Debug, Clone, Copy)]
pub struct RequesterId(pub Uuid);

impl FromRequest for RequesterId {
    type Error = MatchError;
    type Future = Ready<Result<Self>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(RequesterId)
            .ok_or(MatchError::Unauthorized);

        ready(id)
    }
}

/// Raw query string; everything is text so bad values map to our own codes
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub min_age: Option<String>,
    pub max_age: Option<String>,
    pub max_distance: Option<String>,
    pub min_fame: Option<String>,
    pub max_fame: Option<String>,
    pub tags: Option<String>,
    pub location: Option<String>,
    pub view: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSuggestionsQuery {
    pub filters: Filters,
    pub sort: SortSpec,
    pub page: Page,
}

/// Empty parameters count as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn bounded(value: &Option<String>, min: i64, max: i64, code: &'static str) -> Result<Option<i64>> {
    let Some(raw) = present(value) else {
        return Ok(None);
    };

    match raw.parse::<i64>() {
        Ok(n) if (min..=max).contains(&n) => Ok(Some(n)),
        _ => Err(MatchError::invalid(code, format!("out of range or not an integer: {}", raw))),
    }
}

pub fn parse_suggestions_query(
    query: &SuggestionsQuery,
    config: &BrowseConfig,
) -> Result<ParsedSuggestionsQuery> {
    let ceiling = match present(&query.view) {
        Some("map") => config.max_map_limit,
        _ => config.max_page_limit,
    };
    let limit = present(&query.limit)
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(config.default_limit)
        .min(ceiling);

    let offset = match present(&query.offset).map(str::parse::<i64>) {
        None | Some(Err(_)) => 0,
        Some(Ok(n)) if n < 0 => {
            return Err(MatchError::invalid("INVALID_OFFSET", "offset must be >= 0"));
        }
        Some(Ok(n)) => n as usize,
    };

    let key = match present(&query.sort_by) {
        None => SortKey::Distance,
        Some(raw) => SortKey::parse(raw)
            .ok_or_else(|| MatchError::invalid("INVALID_SORT_BY", format!("unknown sort key: {}", raw)))?,
    };
    let direction = match present(&query.order) {
        None => SortDirection::Asc,
        Some(raw) => SortDirection::parse(raw)
            .ok_or_else(|| MatchError::invalid("INVALID_ORDER", format!("unknown order: {}", raw)))?,
    };

    let filters = Filters {
        min_age: bounded(&query.min_age, 18, u32::MAX.into(), "INVALID_MIN_AGE")?.map(|n| n as u32),
        max_age: bounded(&query.max_age, 18, u32::MAX.into(), "INVALID_MAX_AGE")?.map(|n| n as u32),
        max_distance_km: bounded(&query.max_distance, 0, u32::MAX.into(), "INVALID_MAX_DISTANCE")?
            .map(|n| n as u32),
        min_fame: bounded(&query.min_fame, 0, 100, "INVALID_MIN_FAME")?.map(|n| n as i32),
        max_fame: bounded(&query.max_fame, 0, 100, "INVALID_MAX_FAME")?.map(|n| n as i32),
        tags: present(&query.tags)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        location: present(&query.location).map(str::to_string),
    };

    Ok(ParsedSuggestionsQuery {
        filters,
        sort: SortSpec::new(key, direction),
        page: Page { limit, offset },
    })
}

/// GET /api/v1/browse/suggestions
#[get("/api/v1/browse/suggestions")]
pub async fn get_suggestions(
    state: web::Data<AppState>,
    requester: RequesterId,
    query: web::Query<SuggestionsQuery>,
) -> Result<HttpResponse> {
    let parsed = parse_suggestions_query(&query, &state.browse)?;

    let page = state
        .suggestions
        .suggest(SuggestionRequest {
            requester_id: requester.0,
            filters: parsed.filters,
            sort: parsed.sort,
            page: parsed.page,
        })
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FameRatingResponse {
    pub user_id: Uuid,
    pub fame_rating: i32,
}

/// POST /api/v1/internal/fame-events
#[post("/api/v1/internal/fame-events")]
pub async fn post_fame_event(
    state: web::Data<AppState>,
    event: web::Json<InteractionEvent>,
) -> Result<HttpResponse> {
    let event = event.into_inner();

    let ratings = match state.fame.apply(&event).await {
        Ok(ratings) => {
            metrics::record_fame_recalculation(event.kind(), "ok");
            ratings
        }
        Err(e) => {
            metrics::record_fame_recalculation(event.kind(), "error");
            warn!(event = event.kind(), error = %e, "Fame recalculation failed");
            return Err(e);
        }
    };

    let body: Vec<FameRatingResponse> = ratings
        .into_iter()
        .map(|(user_id, fame_rating)| FameRatingResponse {
            user_id,
            fame_rating,
        })
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_suggestions)
        .service(post_fame_event)
        .service(health)
        .route("/metrics", web::get().to(metrics::metrics_handler));
}
