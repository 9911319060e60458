use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SexualPreference {
    Male,
    Female,
    Both,
}

impl SexualPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            SexualPreference::Male => "male",
            SexualPreference::Female => "female",
            SexualPreference::Both => "both",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(SexualPreference::Male),
            "female" => Some(SexualPreference::Female),
            "both" => Some(SexualPreference::Both),
            _ => None,
        }
    }

    pub fn accepts(&self, gender: Gender) -> bool {
        match self {
            SexualPreference::Both => true,
            SexualPreference::Male => gender == Gender::Male,
            SexualPreference::Female => gender == Gender::Female,
        }
    }
}

/// Per-request view of the user asking for suggestions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequesterContext {
    pub gender: Option<Gender>,
    pub sexual_preference: Option<SexualPreference>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tags: HashSet<String>,
}

impl RequesterContext {
    /// Unset preference means open to everyone
    pub fn effective_preference(&self) -> SexualPreference {
        self.sexual_preference.unwrap_or(SexualPreference::Both)
    }
}

/// Profile columns the requester context is built from
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct RequesterProfile {
    pub gender: Option<String>,
    pub sexual_preference: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Raw candidate row as returned by the profile store
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub has_completed_onboarding: bool,
    pub is_online: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub gender: Option<String>,
    pub sexual_preference: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fame_rating: Option<i32>,
    pub profile_photo: Option<String>,
}

impl CandidateRow {
    pub fn gender(&self) -> Option<Gender> {
        self.gender.as_deref().and_then(Gender::parse)
    }

    pub fn sexual_preference(&self) -> Option<SexualPreference> {
        self.sexual_preference
            .as_deref()
            .and_then(SexualPreference::parse)
    }
}

/// A profile shown to the requester, built fresh for every request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<u32>,
    #[serde(skip)]
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fame_rating: i32,
    pub profile_photo: Option<String>,
    #[serde(rename = "distance")]
    pub distance_km: Option<f64>,
    #[serde(rename = "commonTagsCount")]
    pub common_tag_count: usize,
    pub tags: Vec<String>,
    pub is_online: bool,
    #[serde(rename = "lastLogin")]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Optional request filters; `None` / empty means "not filtered"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub max_distance_km: Option<u32>,
    pub min_fame: Option<i32>,
    pub max_fame: Option<i32>,
    pub tags: Vec<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Distance,
    Age,
    Fame,
    Tags,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "distance" => Some(SortKey::Distance),
            "age" => Some(SortKey::Age),
            "fame" => Some(SortKey::Fame),
            "tags" => Some(SortKey::Tags),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Distance => "distance",
            SortKey::Age => "age",
            SortKey::Fame => "fame",
            SortKey::Tags => "tags",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new(SortKey::Distance, SortDirection::Asc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingResult {
    pub page: Vec<Candidate>,
    /// Eligible candidates before pagination
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionPage {
    pub profiles: Vec<Candidate>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_accepts() {
        assert!(SexualPreference::Both.accepts(Gender::Male));
        assert!(SexualPreference::Both.accepts(Gender::Female));
        assert!(SexualPreference::Male.accepts(Gender::Male));
        assert!(!SexualPreference::Male.accepts(Gender::Female));
        assert!(!SexualPreference::Female.accepts(Gender::Male));
    }

    #[test]
    fn test_unset_preference_defaults_to_both() {
        let ctx = RequesterContext::default();
        assert_eq!(ctx.effective_preference(), SexualPreference::Both);
    }

    #[test]
    fn test_candidate_wire_names() {
        let candidate = Candidate {
            id: Uuid::nil(),
            username: "alice".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Martin".to_string(),
            age: Some(27),
            birth_date: NaiveDate::from_ymd_opt(1998, 3, 1),
            gender: Some(Gender::Female),
            city: Some("Lausanne".to_string()),
            country: Some("Switzerland".to_string()),
            latitude: Some(46.52),
            longitude: Some(6.63),
            fame_rating: 62,
            profile_photo: None,
            distance_km: Some(3.0),
            common_tag_count: 2,
            tags: vec!["hiking".to_string()],
            is_online: true,
            last_login_at: None,
        };

        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["distance"], 3.0);
        assert_eq!(json["commonTagsCount"], 2);
        assert_eq!(json["fameRating"], 62);
        assert_eq!(json["gender"], "female");
        assert!(json.get("birthDate").is_none());
    }
}
