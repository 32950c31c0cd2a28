//! Line classifier for iCalendar content.

use super::date::{EventTime, parse_field_value};
use crate::error::TrimError;

pub const EVENT_BEGIN: &str = "BEGIN:VEVENT";
pub const EVENT_END: &str = "END:VEVENT";

const START_FIELD: &str = "DTSTART";
const END_FIELD: &str = "DTEND";
const RECURRENCE_FIELD: &str = "RRULE";

/// Semantic tag for one raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedLine {
    EventStart,
    EventEnd,
    StartDate(EventTime),
    EndDate(EventTime),
    Recurring,
    Other,
}

/// Classify a single line.
///
/// Lines that name DTSTART or DTEND but carry an unparseable payload are an
/// error; anything unrecognised is `Other` and passes through untouched.
pub fn classify_line(
    line: &str,
    ignore_invalid_time_zones: bool,
) -> Result<ClassifiedLine, TrimError> {
    let line = line.trim_end();

    if line == EVENT_BEGIN {
        return Ok(ClassifiedLine::EventStart);
    }
    if line == EVENT_END {
        return Ok(ClassifiedLine::EventEnd);
    }
    if let Some(rest) = field_rest(line, START_FIELD) {
        return parse_field_value(rest, ignore_invalid_time_zones).map(ClassifiedLine::StartDate);
    }
    if let Some(rest) = field_rest(line, END_FIELD) {
        return parse_field_value(rest, ignore_invalid_time_zones).map(ClassifiedLine::EndDate);
    }
    if field_rest(line, RECURRENCE_FIELD).is_some() {
        return Ok(ClassifiedLine::Recurring);
    }

    Ok(ClassifiedLine::Other)
}

// The part after `name`, provided the name is followed by a value or a
// parameter separator. Keeps `DTSTARTX:` and friends out.
fn field_rest<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    line.strip_prefix(name).filter(|rest| rest.starts_with(':') || rest.starts_with(';'))
}
