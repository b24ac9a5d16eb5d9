//! Calendar week resolution.
//!
//! Tasks are grouped by the Monday that starts their week. Everything here
//! works on calendar dates (`NaiveDate`); instants are reduced to their local
//! date before any week arithmetic so DST changes cannot shift a bucket.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, TimeZone};

use crate::fields::Day;

/// The Monday at or before `date`.
///
/// Dates in the partial first week of the calendar clamp to `NaiveDate::MIN`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let weekday = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(weekday)).unwrap_or(NaiveDate::MIN)
}

/// The Sunday closing the week that contains `date`, clamped to `NaiveDate::MAX`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    offset_days(week_start(date), 6)
}

fn offset_days(start: NaiveDate, days: u64) -> NaiveDate {
    start.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

/// `date` moved by `weeks` (negative goes back), or `None` past the calendar range.
pub fn shift_weeks(date: NaiveDate, weeks: i64) -> Option<NaiveDate> {
    Duration::try_weeks(weeks).and_then(|d| date.checked_add_signed(d))
}

/// Canonical `YYYY-MM-DD` week bucket key for `date`.
pub fn week_key(date: NaiveDate) -> String {
    week_start(date).format("%Y-%m-%d").to_string()
}

/// Week bucket key for an instant, taken in the instant's own offset.
pub fn week_key_at<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    week_key(instant.date_naive())
}

/// The seven calendar dates of the week containing `date`, Monday first.
pub fn week_days(date: NaiveDate) -> [(Day, NaiveDate); 7] {
    let start = week_start(date);
    Day::ALL.map(|d| (d, offset_days(start, d.index() as u64)))
}

/// Parse a human-readable reference date for the active week.
///
/// Supports:
/// - "today", "yesterday", "tomorrow"
/// - "this week", "last week", "next week"
/// - "2w ago", "in 3w"
/// - "monday" / "mon" (that day of the current week)
/// - "YYYY-MM-DD"
///
/// Offsets that leave the representable calendar yield `None`.
pub fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" | "this week" | "now" => return Some(today),
        "yesterday" => return today.pred_opt(),
        "tomorrow" => return today.succ_opt(),
        "last week" | "previous week" => return shift_weeks(today, -1),
        "next week" => return shift_weeks(today, 1),
        _ => {}
    }

    if let Some(n) = s.strip_suffix("w ago") {
        if let Ok(weeks) = n.trim().parse::<i64>() {
            return weeks.checked_neg().and_then(|w| shift_weeks(today, w));
        }
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(n) = rest.strip_suffix('w') {
            if let Ok(weeks) = n.trim().parse::<i64>() {
                return shift_weeks(today, weeks);
            }
        }
    }

    if let Ok(day) = s.parse::<Day>() {
        return week_start(today).checked_add_days(Days::new(day.index() as u64));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}
