//! Streaming iCalendar trimmer.
//
// The classifier in `line` tags each raw line, `date` decodes the timestamp
// payloads, and `filter` runs the per-event state machine over the tagged
// stream.

pub mod date;
pub mod filter;
pub mod line;

use serde::{Deserialize, Serialize};

pub use date::EventTime;
pub use filter::{Retention, TrimStats, Trimmed, trim, trim_calendars, trim_with_stats};
pub use line::{ClassifiedLine, classify_line};

/// Line terminator used when reassembling the trimmed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Crlf,
    Lf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Crlf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}

impl std::str::FromStr for LineEnding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crlf" => Ok(LineEnding::Crlf),
            "lf" => Ok(LineEnding::Lf),
            other => Err(format!("Unknown line ending '{}', expected crlf or lf", other)),
        }
    }
}

/// Knobs for a single trim run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimOptions {
    /// Keep events carrying an RRULE even when they fall outside the window.
    pub keep_recurring_events: bool,
    /// Parse a timestamp without its zone when the TZID cannot be resolved.
    pub ignore_invalid_time_zones: bool,
    /// Log a Keep/Remove line for every event.
    pub verbose_logs: bool,
    /// Append an event that never reaches END:VEVENT instead of failing.
    pub flush_unterminated_events: bool,
    pub line_ending: LineEnding,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self {
            keep_recurring_events: true,
            ignore_invalid_time_zones: true,
            verbose_logs: false,
            flush_unterminated_events: false,
            line_ending: LineEnding::Crlf,
        }
    }
}
