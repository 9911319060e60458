// ============================================
// Compatibility Filter
// ============================================
//
// Eligibility is a flat list of predicates. Stores push down what they can
// index; the candidate pool re-checks every predicate in memory, so a store
// may return a superset but never drop an eligible row.

use crate::models::{CandidateRow, Filters, Gender, RequesterContext, SexualPreference};
use crate::services::reputation;
use crate::utils::age_on;
use chrono::NaiveDate;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Never suggest the requester to themselves
    NotUser(Uuid),
    VerifiedAndOnboarded,
    /// Block relationships in either direction (sorted ids)
    NotIn(Vec<Uuid>),
    GenderIs(Gender),
    /// Candidate's own preference (unset = both) must accept this gender
    AcceptsGender(Gender),
    MinAge(u32),
    MaxAge(u32),
    MinFame(i32),
    MaxFame(i32),
    HasAnyTag(Vec<String>),
    /// Case-insensitive substring of city or country
    LocationContains(String),
}

impl Predicate {
    pub fn admits(&self, row: &CandidateRow, tags: &[String], today: NaiveDate) -> bool {
        match self {
            Predicate::NotUser(id) => row.id != *id,
            Predicate::VerifiedAndOnboarded => row.is_verified && row.has_completed_onboarding,
            Predicate::NotIn(ids) => ids.binary_search(&row.id).is_err(),
            Predicate::GenderIs(gender) => row.gender() == Some(*gender),
            Predicate::AcceptsGender(gender) => row
                .sexual_preference()
                .unwrap_or(SexualPreference::Both)
                .accepts(*gender),
            Predicate::MinAge(min) => candidate_age(row, today).is_some_and(|age| age >= *min),
            Predicate::MaxAge(max) => candidate_age(row, today).is_some_and(|age| age <= *max),
            Predicate::MinFame(min) => effective_fame(row) >= *min,
            Predicate::MaxFame(max) => effective_fame(row) <= *max,
            Predicate::HasAnyTag(wanted) => tags.iter().any(|tag| wanted.contains(tag)),
            Predicate::LocationContains(needle) => {
                let needle = needle.to_lowercase();
                [row.city.as_deref(), row.country.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

pub fn candidate_age(row: &CandidateRow, today: NaiveDate) -> Option<u32> {
    row.birth_date.and_then(|birth| age_on(birth, today))
}

/// Stored rating, or the zero-event score when the profile was never rated
pub fn effective_fame(row: &CandidateRow) -> i32 {
    row.fame_rating.unwrap_or_else(reputation::unscored_rating)
}

/// Both sides must accept each other's gender. Unset requester preference is
/// `both`; unset requester gender puts no constraint on the candidate.
pub fn is_orientation_compatible(
    requester_gender: Option<Gender>,
    requester_preference: Option<SexualPreference>,
    candidate_gender: Option<Gender>,
    candidate_preference: Option<SexualPreference>,
) -> bool {
    let wanted_by_requester = match requester_preference.unwrap_or(SexualPreference::Both) {
        SexualPreference::Both => true,
        preference => candidate_gender.is_some_and(|gender| preference.accepts(gender)),
    };

    let requester_wanted = match requester_gender {
        Some(gender) => candidate_preference
            .unwrap_or(SexualPreference::Both)
            .accepts(gender),
        None => true,
    };

    wanted_by_requester && requester_wanted
}

pub fn orientation_predicates(context: &RequesterContext) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    match context.effective_preference() {
        SexualPreference::Male => predicates.push(Predicate::GenderIs(Gender::Male)),
        SexualPreference::Female => predicates.push(Predicate::GenderIs(Gender::Female)),
        SexualPreference::Both => {}
    }

    if let Some(gender) = context.gender {
        predicates.push(Predicate::AcceptsGender(gender));
    }

    predicates
}

/// Predicates for the optional user filters. `max_distance_km` is not here:
/// distance is only known after ranking computes it.
pub fn filter_predicates(filters: &Filters) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    if let Some(min) = filters.min_age {
        predicates.push(Predicate::MinAge(min));
    }
    if let Some(max) = filters.max_age {
        predicates.push(Predicate::MaxAge(max));
    }
    if let Some(min) = filters.min_fame {
        predicates.push(Predicate::MinFame(min));
    }
    if let Some(max) = filters.max_fame {
        predicates.push(Predicate::MaxFame(max));
    }
    if !filters.tags.is_empty() {
        let mut tags = filters.tags.clone();
        tags.sort();
        tags.dedup();
        predicates.push(Predicate::HasAnyTag(tags));
    }
    if let Some(location) = filters.location.as_deref().map(str::trim) {
        if !location.is_empty() {
            predicates.push(Predicate::LocationContains(location.to_string()));
        }
    }

    predicates
}

/// Full eligibility list for one request
pub fn eligibility_predicates(
    requester_id: Uuid,
    context: &RequesterContext,
    filters: &Filters,
    excluded: &HashSet<Uuid>,
) -> Vec<Predicate> {
    let mut predicates = vec![Predicate::NotUser(requester_id), Predicate::VerifiedAndOnboarded];

    if !excluded.is_empty() {
        let mut ids: Vec<Uuid> = excluded.iter().copied().collect();
        ids.sort();
        predicates.push(Predicate::NotIn(ids));
    }

    predicates.extend(orientation_predicates(context));
    predicates.extend(filter_predicates(filters));
    predicates
}

pub fn admits_all(
    predicates: &[Predicate],
    row: &CandidateRow,
    tags: &[String],
    today: NaiveDate,
) -> bool {
    predicates
        .iter()
        .all(|predicate| predicate.admits(row, tags, today))
}
