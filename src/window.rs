//! The date range events are trimmed to.

use crate::ics::date::{DISPLAY_FORMAT, EventTime, end_of_day, start_of_day};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::fmt;

/// Closed interval `[start, end]` of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Which side of the window a user-supplied bound sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

impl TrimWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(anyhow!(
                "Window start {} is after window end {}",
                start.format(DISPLAY_FORMAT),
                end.format(DISPLAY_FORMAT)
            ));
        }
        Ok(Self { start, end })
    }

    /// From the first instant of `start` through the last instant of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        Self::new(start_of_day(start), end_of_day(end))
    }

    /// Monday of the previous ISO week through Sunday of the week containing
    /// `today`.
    pub fn default_for(today: NaiveDate) -> Self {
        let this_monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let previous_monday = this_monday - Duration::weeks(1);
        let this_sunday = this_monday + Duration::days(6);
        Self {
            start: start_of_day(previous_monday),
            end: end_of_day(this_sunday),
        }
    }

    /// True when the event lies fully inside the window, bounds included.
    pub fn contains(&self, start: &EventTime, end: &EventTime) -> bool {
        start.as_utc() >= self.start && end.as_utc() <= self.end
    }
}

impl fmt::Display for TrimWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.format(DISPLAY_FORMAT), self.end.format(DISPLAY_FORMAT))
    }
}

/// Parse a window bound given as `YYYY-MM-DD` or RFC 3339.
///
/// Plain dates expand to the start or end of that day depending on `bound`.
pub fn parse_bound(value: &str, bound: Bound) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| {
            format!(
                "Invalid window bound '{}', expected YYYY-MM-DD or RFC 3339",
                value
            )
        })?;
    Ok(match bound {
        Bound::Start => start_of_day(date),
        Bound::End => end_of_day(date),
    })
}
