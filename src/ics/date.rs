//! Timestamp decoding for DTSTART/DTEND payloads.
//
// Two encodings are handled: the simple `FIELD:<timestamp>` form and the
// parameterized `FIELD;TZID=<zone>:<timestamp>` / `FIELD;VALUE=DATE:<date>`
// forms. Anything else carrying a parameter is rejected.

use crate::error::TrimError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Display format used in Keep/Remove log lines.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

const BASIC_DATE: &str = "%Y%m%d";
const EXTENDED_DATE: &str = "%Y-%m-%d";
const FLOATING_FORMATS: [&str; 2] = ["%Y%m%dT%H%M%S", "%Y-%m-%dT%H:%M:%S"];

// `;KEY=value:payload`, where value may be a quoted string.
static COMPLEX_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^;([A-Za-z0-9-]+)=("[^"]*"|[^:;"]*):(.*)$"#).unwrap());

/// A decoded event timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTime {
    /// A calendar date with no time of day.
    AllDay(NaiveDate),
    /// A point in time, normalised to UTC.
    Instant(DateTime<Utc>),
}

impl EventTime {
    /// The instant used for window comparisons. All-day dates compare as
    /// midnight UTC.
    pub fn as_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::AllDay(date) => start_of_day(*date),
            EventTime::Instant(instant) => *instant,
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_utc().format(DISPLAY_FORMAT))
    }
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last representable instant of `date` in UTC.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::nanoseconds(1)
}

/// Decode everything after the field name: either `:<timestamp>` or
/// `;PARAM=value:<payload>`.
pub fn parse_field_value(
    rest: &str,
    ignore_invalid_time_zones: bool,
) -> Result<EventTime, TrimError> {
    if let Some(value) = rest.strip_prefix(':') {
        return parse_timestamp(value);
    }

    let caps = COMPLEX_FIELD
        .captures(rest)
        .ok_or_else(|| TrimError::UnsupportedDateEncoding(rest.to_string()))?;
    let key = caps[1].to_ascii_uppercase();
    let param = caps[2].trim_matches('"');
    let payload = &caps[3];

    match key.as_str() {
        "TZID" => {
            let (zone, payload) = split_unquoted_zone(&caps, param, payload);
            parse_in_zone(zone, payload, ignore_invalid_time_zones)
        }
        "VALUE" if param.eq_ignore_ascii_case("DATE") => parse_date(payload),
        "VALUE" => Err(TrimError::UnsupportedDateEncoding(format!(
            "VALUE={}",
            param
        ))),
        _ => Err(TrimError::UnsupportedDateEncoding(format!(
            "{}={}",
            key, param
        ))),
    }
}

// Unquoted zone names such as `(UTC+01:00) Amsterdam` contain colons. When the
// text after the first colon is not a timestamp, split at the last one instead.
fn split_unquoted_zone<'t>(
    caps: &regex::Captures<'t>,
    param: &'t str,
    payload: &'t str,
) -> (&'t str, &'t str) {
    let Some(value) = caps.get(2) else {
        return (param, payload);
    };
    if value.as_str().starts_with('"') || parse_timestamp(payload).is_ok() {
        return (param, payload);
    }

    let full = &caps.get(0).map_or("", |m| m.as_str())[value.start()..];
    full.rsplit_once(':').unwrap_or((param, payload))
}

/// Parse a bare ISO 8601-like timestamp.
///
/// Accepts `yyyymmddTHHMMSSZ`, floating `yyyymmddTHHMMSS` (taken as UTC),
/// `yyyymmdd` all-day dates, RFC 3339 and their extended variants.
pub fn parse_timestamp(value: &str) -> Result<EventTime, TrimError> {
    let value = value.trim();

    if let Some(naive) = value.strip_suffix('Z').and_then(parse_floating) {
        return Ok(EventTime::Instant(naive.and_utc()));
    }
    if let Some(naive) = parse_floating(value) {
        return Ok(EventTime::Instant(naive.and_utc()));
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(EventTime::Instant(instant.with_timezone(&Utc)));
    }
    if let Some(date) = parse_naive_date(value) {
        return Ok(EventTime::AllDay(date));
    }

    Err(TrimError::malformed(value, "expected an ISO 8601 timestamp"))
}

/// Parse an all-day `VALUE=DATE` payload.
pub fn parse_date(value: &str) -> Result<EventTime, TrimError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, BASIC_DATE)
        .map(EventTime::AllDay)
        .map_err(|e| TrimError::malformed(value, e))
}

/// Interpret `value` as wall-clock time in `zone`.
///
/// An unknown zone, or a local time the zone skips over, falls back to a
/// zone-less parse when `ignore_invalid_time_zones` is set.
pub fn parse_in_zone(
    zone: &str,
    value: &str,
    ignore_invalid_time_zones: bool,
) -> Result<EventTime, TrimError> {
    let value = value.trim();
    let Ok(tz) = zone.parse::<Tz>() else {
        return fallback(zone, value, ignore_invalid_time_zones);
    };

    // A payload that is not wall-clock time is malformed regardless of zone.
    let Some(naive) = parse_floating(value) else {
        return parse_timestamp(value);
    };

    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => Ok(EventTime::Instant(local.with_timezone(&Utc))),
        None => fallback(zone, value, ignore_invalid_time_zones),
    }
}

fn fallback(
    zone: &str,
    value: &str,
    ignore_invalid_time_zones: bool,
) -> Result<EventTime, TrimError> {
    if !ignore_invalid_time_zones {
        return Err(TrimError::UnrecognizedTimeZone(zone.to_string()));
    }
    warn!(
        "Invalid time zone '{}', parsing '{}' without zone information",
        zone, value
    );
    parse_timestamp(value)
}

fn parse_floating(value: &str) -> Option<NaiveDateTime> {
    FLOATING_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, BASIC_DATE)
        .or_else(|_| NaiveDate::parse_from_str(value, EXTENDED_DATE))
        .ok()
}
