/// Ranking Module
///
/// Orders an already-fetched candidate set and cuts one page out of it.
///
/// # Workflow
/// 1. Compute each candidate's distance from the requester
/// 2. Drop candidates beyond the distance ceiling (unknown distance is kept)
/// 3. Count what remains (`total`)
/// 4. Sort with [`compare_candidates`]
/// 5. Slice `[offset, offset + limit)`
///
/// Everything here is synchronous and performs no I/O.
pub mod comparator;

pub use comparator::{compare_candidates, secondary_direction, CASCADE};

use crate::models::{Candidate, Page, RankingResult, RequesterContext, SortSpec};
use crate::services::geo;

#[derive(Debug, Clone, Copy, Default)]
pub struct RankingEngine;

impl RankingEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn rank(
        &self,
        candidates: Vec<Candidate>,
        context: &RequesterContext,
        sort: SortSpec,
        max_distance_km: Option<u32>,
        page: Page,
    ) -> RankingResult {
        let mut ranked: Vec<Candidate> = candidates
            .into_iter()
            .map(|mut candidate| {
                candidate.distance_km = geo::distance_between(
                    (context.latitude, context.longitude),
                    (candidate.latitude, candidate.longitude),
                );
                candidate
            })
            .filter(|candidate| within_distance(candidate, max_distance_km))
            .collect();

        let total = ranked.len();

        ranked.sort_by(|a, b| compare_candidates(a, b, sort));

        let page = ranked
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();

        RankingResult { page, total }
    }
}

/// Only a known distance can exceed the ceiling
fn within_distance(candidate: &Candidate, max_distance_km: Option<u32>) -> bool {
    match (candidate.distance_km, max_distance_km) {
        (Some(distance), Some(max)) => distance <= f64::from(max),
        _ => true,
    }
}
