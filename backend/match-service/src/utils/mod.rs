// Date and deadline helpers for match-service
use crate::error::{MatchError, Result};
use chrono::{Datelike, NaiveDate};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Whole years lived on `today`. A birthday counts on its calendar day;
/// 29 February birthdays count from 1 March in non-leap years.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth_date > today {
        return None;
    }

    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }

    u32::try_from(years).ok()
}

/// Same calendar day `years` earlier, 29 February landing on 28 February.
/// Saturates at `NaiveDate::MIN` when the result is out of range.
pub fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    let Some(year) = i32::try_from(years)
        .ok()
        .and_then(|years| date.year().checked_sub(years))
    else {
        return NaiveDate::MIN;
    };

    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(NaiveDate::MIN)
}

/// Run a collaborator call under a deadline
pub async fn with_deadline<F, T>(duration: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    timeout(duration, future)
        .await
        .map_err(|_| MatchError::Timeout(duration))?
}
