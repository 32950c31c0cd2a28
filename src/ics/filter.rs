//! Event filter engine.
//!
//! Folds the classified line stream of one file through a two-state machine.
//! Lines outside events go straight to the output. Lines inside an event are
//! buffered in an `EventAccumulator` until `END:VEVENT`, where the
//! retention decision either commits the whole block or drops it.

use super::TrimOptions;
use super::date::EventTime;
use super::line::{ClassifiedLine, classify_line};
use crate::error::TrimError;
use crate::window::TrimWindow;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of the retention rules for one completed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Start or end is missing, so relevance cannot be judged.
    KeepIncomplete,
    /// Fully inside the window.
    Keep,
    /// Outside the window but recurring, and recurring events are kept.
    KeepRecurring,
    Remove,
}

impl Retention {
    /// Apply the retention rules in precedence order.
    pub fn evaluate(
        start: Option<&EventTime>,
        end: Option<&EventTime>,
        recurring: bool,
        window: &TrimWindow,
        keep_recurring_events: bool,
    ) -> Self {
        match (start, end) {
            (Some(start), Some(end)) if window.contains(start, end) => Retention::Keep,
            (Some(_), Some(_)) if recurring && keep_recurring_events => Retention::KeepRecurring,
            (Some(_), Some(_)) => Retention::Remove,
            _ => Retention::KeepIncomplete,
        }
    }

    pub fn is_kept(&self) -> bool {
        !matches!(self, Retention::Remove)
    }
}

/// Per-file event counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimStats {
    pub kept: usize,
    pub removed: usize,
    /// Kept only because they recur.
    pub recurring_kept: usize,
}

impl TrimStats {
    fn record(&mut self, retention: Retention) {
        match retention {
            Retention::Remove => self.removed += 1,
            Retention::KeepRecurring => {
                self.kept += 1;
                self.recurring_kept += 1;
            }
            Retention::Keep | Retention::KeepIncomplete => self.kept += 1,
        }
    }

    pub fn merge(&mut self, other: &TrimStats) {
        self.kept += other.kept;
        self.removed += other.removed;
        self.recurring_kept += other.recurring_kept;
    }
}

/// Trimmed content of one file together with its counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trimmed {
    pub content: String,
    pub stats: TrimStats,
}

/// Lines and fields gathered for the event currently open.
#[derive(Debug)]
struct EventAccumulator<'a> {
    lines: Vec<&'a str>,
    opened_at: usize,
    start: Option<EventTime>,
    end: Option<EventTime>,
    recurring: bool,
}

impl<'a> EventAccumulator<'a> {
    fn open(line: &'a str, line_no: usize) -> Self {
        Self {
            lines: vec![line],
            opened_at: line_no,
            start: None,
            end: None,
            recurring: false,
        }
    }

    fn retention(&self, window: &TrimWindow, options: &TrimOptions) -> Retention {
        Retention::evaluate(
            self.start.as_ref(),
            self.end.as_ref(),
            self.recurring,
            window,
            options.keep_recurring_events,
        )
    }
}

struct OptionalTime<'t>(Option<&'t EventTime>);

impl fmt::Display for OptionalTime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(time) => write!(f, "{}", time),
            None => f.write_str("<null>"),
        }
    }
}

fn decision_message(event: &EventAccumulator<'_>, retention: Retention) -> String {
    let start = OptionalTime(event.start.as_ref());
    let end = OptionalTime(event.end.as_ref());
    if retention.is_kept() {
        let suffix = if event.recurring { " (recurring)" } else { "" };
        format!("Keep: {} - {}{}", start, end, suffix)
    } else {
        format!("Remove: {} - {}", start, end)
    }
}

fn log_decision(event: &EventAccumulator<'_>, retention: Retention, verbose: bool) {
    let message = decision_message(event, retention);
    if verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}

#[derive(Debug, Default)]
struct Output<'a> {
    lines: Vec<&'a str>,
    stats: TrimStats,
}

/// Filter state. The open event travels by value between transitions.
#[derive(Debug)]
enum FilterState<'a> {
    Idle,
    InEvent(EventAccumulator<'a>),
}

impl<'a> FilterState<'a> {
    fn advance(
        self,
        mut output: Output<'a>,
        line_no: usize,
        raw: &'a str,
        classified: ClassifiedLine,
        window: &TrimWindow,
        options: &TrimOptions,
    ) -> (Self, Output<'a>) {
        match (self, classified) {
            (FilterState::Idle, ClassifiedLine::EventStart) => {
                (FilterState::InEvent(EventAccumulator::open(raw, line_no)), output)
            }
            (FilterState::Idle, _) => {
                output.lines.push(raw);
                (FilterState::Idle, output)
            }
            (FilterState::InEvent(mut event), ClassifiedLine::EventEnd) => {
                event.lines.push(raw);
                let retention = event.retention(window, options);
                log_decision(&event, retention, options.verbose_logs);
                output.stats.record(retention);
                if retention.is_kept() {
                    output.lines.extend(event.lines);
                }
                (FilterState::Idle, output)
            }
            (FilterState::InEvent(mut event), classified) => {
                event.lines.push(raw);
                match classified {
                    ClassifiedLine::StartDate(time) => event.start = Some(time),
                    ClassifiedLine::EndDate(time) => event.end = Some(time),
                    ClassifiedLine::Recurring => event.recurring = true,
                    _ => {}
                }
                (FilterState::InEvent(event), output)
            }
        }
    }
}

// Split on LF, dropping one CR per line so CRLF and LF input both work.
fn split_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Trim `content` to the events inside `window`, returning per-event counts.
pub fn trim_with_stats(
    content: &str,
    window: &TrimWindow,
    options: &TrimOptions,
) -> Result<Trimmed, TrimError> {
    let (state, mut output) = split_lines(content).enumerate().try_fold(
        (FilterState::Idle, Output::default()),
        |(state, output), (index, raw)| {
            let line_no = index + 1;
            let classified = classify_line(raw, options.ignore_invalid_time_zones)
                .map_err(|e| e.at_line(line_no))?;
            Ok::<_, TrimError>(state.advance(output, line_no, raw, classified, window, options))
        },
    )?;

    if let FilterState::InEvent(event) = state {
        if !options.flush_unterminated_events {
            return Err(TrimError::UnterminatedEvent {
                line: event.opened_at,
            });
        }
        warn!(
            "Event starting at line {} has no END:VEVENT, keeping it unfiltered",
            event.opened_at
        );
        output.lines.extend(event.lines);
    }

    Ok(Trimmed {
        content: output.lines.join(options.line_ending.as_str()),
        stats: output.stats,
    })
}

/// Trim `content` to the events inside `window`.
pub fn trim(
    content: &str,
    window: &TrimWindow,
    options: &TrimOptions,
) -> Result<String, TrimError> {
    trim_with_stats(content, window, options).map(|trimmed| trimmed.content)
}

/// Trim every file in a name-to-content mapping. Each file succeeds or fails
/// on its own.
pub fn trim_calendars<I>(
    files: I,
    window: &TrimWindow,
    options: &TrimOptions,
) -> BTreeMap<String, Result<String, TrimError>>
where
    I: IntoIterator<Item = (String, String)>,
{
    files
        .into_iter()
        .map(|(name, content)| {
            let trimmed = trim(&content, window, options);
            (name, trimmed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::LineEnding;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn january() -> TrimWindow {
        TrimWindow::from_dates(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    fn lf() -> TrimOptions {
        TrimOptions {
            line_ending: LineEnding::Lf,
            ..TrimOptions::default()
        }
    }

    fn event(start: &str, end: &str, extra: &str) -> String {
        format!(
            "BEGIN:VEVENT\nDTSTART:{}\nDTEND:{}\n{}END:VEVENT\n",
            start, end, extra
        )
    }

    #[test]
    fn test_keeps_event_inside_window() {
        let input = format!(
            "BEGIN:VCALENDAR\n{}END:VCALENDAR\n",
            event("20240105T100000Z", "20240105T110000Z", "")
        );
        assert_eq!(trim(&input, &january(), &lf()).unwrap(), input);
    }

    #[test]
    fn test_drops_event_outside_window() {
        let input = format!(
            "BEGIN:VCALENDAR\n{}{}END:VCALENDAR\n",
            event("20240105T100000Z", "20240105T110000Z", "SUMMARY:in\n"),
            event("20240305T100000Z", "20240305T110000Z", "SUMMARY:out\n"),
        );
        let expected = format!(
            "BEGIN:VCALENDAR\n{}END:VCALENDAR\n",
            event("20240105T100000Z", "20240105T110000Z", "SUMMARY:in\n")
        );
        let trimmed = trim_with_stats(&input, &january(), &lf()).unwrap();
        assert_eq!(trimmed.content, expected);
        assert_eq!(
            trimmed.stats,
            TrimStats {
                kept: 1,
                removed: 1,
                recurring_kept: 0
            }
        );
    }

    #[test]
    fn test_straddling_event_is_removed() {
        let input = event("20231231T230000Z", "20240101T010000Z", "");
        assert_eq!(trim(&input, &january(), &lf()).unwrap(), "");
    }

    #[test]
    fn test_missing_end_is_kept() {
        let input = "BEGIN:VEVENT\nDTSTART:20200101T000000Z\nEND:VEVENT";
        assert_eq!(trim(input, &january(), &lf()).unwrap(), input);
    }

    #[test]
    fn test_recurring_event_policy() {
        let input = event("20200106T090000Z", "20200106T093000Z", "RRULE:FREQ=WEEKLY\n");
        let trimmed = trim_with_stats(&input, &january(), &lf()).unwrap();
        assert_eq!(trimmed.content, input);
        assert_eq!(trimmed.stats.recurring_kept, 1);

        let strict = TrimOptions {
            keep_recurring_events: false,
            ..lf()
        };
        assert_eq!(trim(&input, &january(), &strict).unwrap(), "");
    }

    #[test]
    fn test_last_dtstart_wins() {
        let input = concat!(
            "BEGIN:VEVENT\n",
            "DTSTART:20200101T000000Z\n",
            "DTSTART:20240110T000000Z\n",
            "DTEND:20240110T010000Z\n",
            "END:VEVENT"
        );
        assert_eq!(trim(input, &january(), &lf()).unwrap(), input);
    }

    #[test]
    fn test_crlf_round_trip() {
        let input = concat!(
            "BEGIN:VCALENDAR\r\n",
            "BEGIN:VEVENT\r\n",
            "DTSTART:20240105T100000Z\r\n",
            "DTEND:20240105T110000Z\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n"
        );
        assert_eq!(trim(input, &january(), &TrimOptions::default()).unwrap(), input);
    }

    #[test]
    fn test_line_ending_is_normalised() {
        let input = "BEGIN:VCALENDAR\nEND:VCALENDAR\n";
        assert_eq!(
            trim(input, &january(), &TrimOptions::default()).unwrap(),
            "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n"
        );
    }

    #[test]
    fn test_unterminated_event_errors() {
        let input = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nDTSTART:20200101T000000Z\n";
        let err = trim(input, &january(), &lf()).unwrap_err();
        assert!(matches!(err, TrimError::UnterminatedEvent { line: 2 }));
    }

    #[test]
    fn test_unterminated_event_flushed() {
        let input = concat!(
            "BEGIN:VCALENDAR\n",
            "BEGIN:VEVENT\n",
            "DTSTART:20200101T000000Z\n",
            "DTEND:20200101T010000Z\n"
        );
        let options = TrimOptions {
            flush_unterminated_events: true,
            ..lf()
        };
        assert_eq!(trim(input, &january(), &options).unwrap(), input);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let input = "BEGIN:VEVENT\nSUMMARY:x\nDTSTART:not-a-date\nEND:VEVENT";
        let err = trim(input, &january(), &lf()).unwrap_err();
        assert!(matches!(err, TrimError::AtLine { line: 3, .. }));
        assert!(matches!(err.kind(), TrimError::MalformedTimestamp { .. }));
    }

    #[test]
    fn test_retention_precedence() {
        let window = january();
        let inside = EventTime::Instant(window.start);
        let outside = EventTime::Instant(window.end + chrono::Duration::days(1));

        let evaluate = |start, end, recurring, keep_recurring| {
            Retention::evaluate(start, end, recurring, &window, keep_recurring)
        };

        assert_eq!(
            evaluate(None, Some(&outside), false, false),
            Retention::KeepIncomplete
        );
        assert_eq!(
            evaluate(Some(&inside), Some(&inside), true, true),
            Retention::Keep
        );
        assert_eq!(
            evaluate(Some(&inside), Some(&outside), true, true),
            Retention::KeepRecurring
        );
        assert_eq!(
            evaluate(Some(&inside), Some(&outside), true, false),
            Retention::Remove
        );
        assert_eq!(
            evaluate(Some(&inside), Some(&outside), false, true),
            Retention::Remove
        );
    }

    #[test]
    fn test_optional_time_display() {
        assert_eq!(OptionalTime(None).to_string(), "<null>");
        let t = EventTime::AllDay(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(OptionalTime(Some(&t)).to_string(), "2024-01-02 00:00");
    }

    fn accumulated(start: Option<EventTime>, recurring: bool) -> EventAccumulator<'static> {
        let end = Utc.with_ymd_and_hms(2024, 1, 5, 11, 0, 0).unwrap();
        EventAccumulator {
            lines: Vec::new(),
            opened_at: 1,
            start,
            end: Some(EventTime::Instant(end)),
            recurring,
        }
    }

    fn jan_5_ten() -> Option<EventTime> {
        Some(EventTime::Instant(
            Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_decision_message_missing_start() {
        let event = accumulated(None, false);
        assert_eq!(
            decision_message(&event, Retention::KeepIncomplete),
            "Keep: <null> - 2024-01-05 11:00"
        );
    }

    #[test]
    fn test_decision_message_recurring_suffix() {
        let event = accumulated(jan_5_ten(), true);
        assert_eq!(
            decision_message(&event, Retention::KeepRecurring),
            "Keep: 2024-01-05 10:00 - 2024-01-05 11:00 (recurring)"
        );
    }

    #[test]
    fn test_decision_message_inside_window() {
        let event = accumulated(jan_5_ten(), false);
        assert_eq!(
            decision_message(&event, Retention::Keep),
            "Keep: 2024-01-05 10:00 - 2024-01-05 11:00"
        );
    }

    #[test]
    fn test_decision_message_remove() {
        let event = accumulated(jan_5_ten(), true);
        assert_eq!(
            decision_message(&event, Retention::Remove),
            "Remove: 2024-01-05 10:00 - 2024-01-05 11:00"
        );
    }

    #[test]
    fn test_trim_calendars_isolates_failures() {
        let files = vec![
            (
                "good.ics".to_string(),
                event("20240105T100000Z", "20240105T110000Z", ""),
            ),
            (
                "bad.ics".to_string(),
                "BEGIN:VEVENT\nDTEND:later\nEND:VEVENT".to_string(),
            ),
        ];
        let results = trim_calendars(files, &january(), &lf());
        assert_eq!(results.len(), 2);
        assert!(results["good.ics"].is_ok());
        assert!(results["bad.ics"].is_err());
    }
}
