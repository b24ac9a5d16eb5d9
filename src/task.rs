//! Task data structure and the daily status model.
//!
//! A `Task` is one unit of planned site work for one week. Its `DailyStatus`
//! is a fixed seven-slot track (Monday first) and every completion question
//! is answered from that track, never from a stored flag.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{PlanError, Result};
use crate::fields::*;
use crate::week::week_start;

/// One slot of the weekly track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub day: Day,
    pub status: DayStatus,
}

/// Exactly seven entries, one per weekday, Monday first.
///
/// Deserialization rejects tracks with a missing, repeated or unknown day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DayEntry>", into = "Vec<DayEntry>")]
pub struct DailyStatus([DayEntry; 7]);

impl DailyStatus {
    /// Seed a track: planned days start `planned`, the rest `not_planned`.
    pub fn from_planned(planned: &[Day]) -> Self {
        DailyStatus(Day::ALL.map(|day| DayEntry {
            day,
            status: if planned.contains(&day) {
                DayStatus::Planned
            } else {
                DayStatus::NotPlanned
            },
        }))
    }

    pub fn get(&self, day: Day) -> DayStatus {
        self.0[day.index()].status
    }

    fn set(&mut self, day: Day, status: DayStatus) {
        self.0[day.index()].status = status;
    }

    pub fn entries(&self) -> &[DayEntry; 7] {
        &self.0
    }

    pub fn has_not_done(&self) -> bool {
        self.0.iter().any(|e| e.status == DayStatus::NotDone)
    }

    /// At least one day is part of the plan (in any state but `not_planned`).
    pub fn has_planned_days(&self) -> bool {
        self.0.iter().any(|e| e.status != DayStatus::NotPlanned)
    }

    /// True iff nothing is `not_done` and at least one day was planned.
    pub fn is_fully_completed(&self) -> bool {
        self.has_planned_days() && !self.has_not_done()
    }

}

impl TryFrom<Vec<DayEntry>> for DailyStatus {
    type Error = PlanError;

    fn try_from(entries: Vec<DayEntry>) -> Result<Self> {
        if entries.len() != 7 {
            return Err(PlanError::InvalidDailyStatus(format!(
                "expected 7 entries, found {}",
                entries.len()
            )));
        }
        let mut slots: [Option<DayStatus>; 7] = [None; 7];
        for e in entries {
            let slot = &mut slots[e.day.index()];
            if slot.is_some() {
                return Err(PlanError::InvalidDailyStatus(format!(
                    "{} appears more than once",
                    e.day
                )));
            }
            *slot = Some(e.status);
        }
        // Seven entries with no repeat means every day is present.
        Ok(DailyStatus(Day::ALL.map(|day| DayEntry {
            day,
            status: slots[day.index()].unwrap_or(DayStatus::NotPlanned),
        })))
    }
}

impl From<DailyStatus> for Vec<DayEntry> {
    fn from(track: DailyStatus) -> Self {
        track.0.to_vec()
    }
}

/// A week-scoped unit of planned work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub description: String,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub discipline: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub planned_days: Vec<Day>,
    pub daily_status: DailyStatus,
    #[serde(default)]
    pub completion_status: CompletionStatus,
    /// Monday of the task's week, stamped at creation.
    #[serde(default, deserialize_with = "lenient_week_date")]
    pub week_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub cause: Option<String>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    /// Create a task for the week containing `reference`.
    pub fn new(
        id: u64,
        description: impl Into<String>,
        planned_days: &[Day],
        reference: NaiveDate,
        now_utc: i64,
    ) -> Self {
        let mut days = planned_days.to_vec();
        days.sort();
        days.dedup();
        Self {
            id,
            description: description.into(),
            item: None,
            discipline: None,
            location: None,
            sector: None,
            responsible: None,
            daily_status: DailyStatus::from_planned(&days),
            planned_days: days,
            completion_status: CompletionStatus::NotCompleted,
            week_start_date: Some(week_start(reference)),
            cause: None,
            created_at_utc: now_utc,
            updated_at_utc: now_utc,
        }
    }

    pub fn with_discipline(mut self, discipline: impl Into<String>) -> Self {
        self.discipline = Some(discipline.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_responsible(mut self, responsible: impl Into<String>) -> Self {
        self.responsible = Some(responsible.into());
        self
    }

    pub fn status_of(&self, day: Day) -> DayStatus {
        self.daily_status.get(day)
    }

    /// Derived from the daily track on every call.
    pub fn is_fully_completed(&self) -> bool {
        self.daily_status.is_fully_completed()
    }

    pub fn has_not_done(&self) -> bool {
        self.daily_status.has_not_done()
    }

    /// A task with no planned day has nothing to complete.
    pub fn is_applicable(&self) -> bool {
        self.daily_status.has_planned_days()
    }

    /// Date used to place the task in the week index: the stamped week start,
    /// or the creation date when the stamp is missing.
    pub fn bucket_date(&self) -> Option<NaiveDate> {
        self.week_start_date.or_else(|| {
            DateTime::from_timestamp(self.created_at_utc, 0).map(|dt| dt.date_naive())
        })
    }

    /// Apply a caller-requested transition to one day.
    pub fn mark(&mut self, day: Day, to: MarkAs, cause: Option<String>) -> Result<()> {
        match to {
            MarkAs::Done => self.mark_done(day),
            MarkAs::NotDone => self.mark_not_done(day, cause),
            MarkAs::Planned => self.reset_day(day),
        }
    }

    pub fn mark_done(&mut self, day: Day) -> Result<()> {
        self.transition(day, DayStatus::Done)
    }

    /// Mark a day as not done, optionally recording why.
    pub fn mark_not_done(&mut self, day: Day, cause: Option<String>) -> Result<()> {
        self.transition(day, DayStatus::NotDone)?;
        if let Some(c) = normalise_text(cause) {
            self.cause = Some(c);
        }
        Ok(())
    }

    /// Undo a done/not-done mark, returning the day to `planned`.
    pub fn reset_day(&mut self, day: Day) -> Result<()> {
        self.transition(day, DayStatus::Planned)
    }

    /// Flip a marked day between done and not done.
    pub fn toggle_day(&mut self, day: Day) -> Result<()> {
        let to = match self.status_of(day) {
            DayStatus::Done => DayStatus::NotDone,
            DayStatus::NotDone => DayStatus::Done,
            DayStatus::NotPlanned => return Err(PlanError::DayNotPlanned(day)),
            from @ DayStatus::Planned => {
                return Err(PlanError::InvalidTransition {
                    day,
                    from,
                    to: DayStatus::Done,
                })
            }
        };
        self.transition(day, to)
    }

    /// Set or clear the non-completion cause.
    pub fn set_cause(&mut self, cause: Option<String>) -> Result<()> {
        match normalise_text(cause) {
            Some(c) => {
                if !self.has_not_done() {
                    return Err(PlanError::NoNotDoneDay);
                }
                self.cause = Some(c);
            }
            None => self.cause = None,
        }
        Ok(())
    }

    /// Add a day to the plan. Only `not_planned` days change.
    pub fn plan_day(&mut self, day: Day) -> Result<()> {
        match self.status_of(day) {
            DayStatus::NotPlanned => {
                self.daily_status.set(day, DayStatus::Planned);
                self.planned_days.push(day);
                self.planned_days.sort();
                self.planned_days.dedup();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Remove a day from the plan. Marked days must be reset first.
    pub fn unplan_day(&mut self, day: Day) -> Result<()> {
        match self.status_of(day) {
            DayStatus::Planned => {
                self.daily_status.set(day, DayStatus::NotPlanned);
                self.planned_days.retain(|d| *d != day);
                Ok(())
            }
            DayStatus::NotPlanned => Ok(()),
            from => Err(PlanError::InvalidTransition {
                day,
                from,
                to: DayStatus::NotPlanned,
            }),
        }
    }

    /// Bring the persisted label in line with the derived completion.
    pub fn refresh_completion_label(&mut self) {
        self.completion_status = if self.is_fully_completed() {
            CompletionStatus::Completed
        } else {
            CompletionStatus::NotCompleted
        };
    }

    fn transition(&mut self, day: Day, to: DayStatus) -> Result<()> {
        let from = self.status_of(day);
        if from == to {
            return Ok(());
        }
        match (from, to) {
            (DayStatus::NotPlanned, _) => return Err(PlanError::DayNotPlanned(day)),
            (_, DayStatus::NotPlanned) => {
                return Err(PlanError::InvalidTransition { day, from, to })
            }
            _ => {}
        }
        self.daily_status.set(day, to);
        // The cause only describes an outstanding not-done day.
        if !self.has_not_done() {
            self.cause = None;
        }
        Ok(())
    }
}

fn normalise_text(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (time of day dropped).
/// Anything else loads as `None` so the task simply falls out of week views.
fn lenient_week_date<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<NaiveDate>, D::Error> {
    let parsed = match Value::deserialize(d)? {
        Value::Null => return Ok(None),
        Value::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        }
        _ => None,
    };
    if parsed.is_none() {
        warn!("ignoring malformed week_start_date");
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn task(days: &[Day]) -> Task {
        Task::new(1, "Concretagem laje", days, monday(), 0)
    }

    #[test]
    fn test_new_seeds_track_from_planned_days() {
        let t = task(&[Day::Wed, Day::Mon, Day::Wed]);
        assert_eq!(t.planned_days, vec![Day::Mon, Day::Wed]);
        for e in t.daily_status.entries() {
            let expected = if matches!(e.day, Day::Mon | Day::Wed) {
                DayStatus::Planned
            } else {
                DayStatus::NotPlanned
            };
            assert_eq!(e.status, expected, "{}", e.day);
        }
        assert_eq!(t.week_start_date, Some(monday()));
        assert_eq!(t.completion_status, CompletionStatus::NotCompleted);
    }

    #[test]
    fn test_week_start_is_stamped_to_monday() {
        let thursday = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let t = Task::new(1, "x", &[Day::Fri], thursday, 0);
        assert_eq!(t.week_start_date, Some(monday()));
    }

    #[test]
    fn test_mon_done_wed_not_done_is_not_complete() {
        let mut t = task(&[Day::Mon, Day::Wed]);
        t.mark_done(Day::Mon).unwrap();
        t.mark_not_done(Day::Wed, Some("Chuva".into())).unwrap();
        assert!(!t.is_fully_completed());
        assert_eq!(t.cause.as_deref(), Some("Chuva"));
    }

    #[test]
    fn test_completion_definition() {
        let mut t = task(&[Day::Mon, Day::Tue]);
        // Nothing not_done and something planned.
        assert!(t.is_fully_completed());
        t.mark_not_done(Day::Tue, None).unwrap();
        assert!(!t.is_fully_completed());
        t.toggle_day(Day::Tue).unwrap();
        assert_eq!(t.status_of(Day::Tue), DayStatus::Done);
        assert!(t.is_fully_completed());
    }

    #[test]
    fn test_zero_planned_days_is_not_complete() {
        let t = task(&[]);
        assert!(!t.is_fully_completed());
        assert!(!t.is_applicable());
    }

    #[test]
    fn test_not_planned_day_cannot_be_marked() {
        let mut t = task(&[Day::Mon]);
        assert!(matches!(t.mark_done(Day::Tue), Err(PlanError::DayNotPlanned(Day::Tue))));
        assert!(matches!(
            t.mark_not_done(Day::Sun, Some("x".into())),
            Err(PlanError::DayNotPlanned(Day::Sun))
        ));
        assert!(matches!(t.toggle_day(Day::Sat), Err(PlanError::DayNotPlanned(Day::Sat))));
        assert_eq!(t.status_of(Day::Tue), DayStatus::NotPlanned);
    }

    #[test]
    fn test_toggle_requires_marked_day() {
        let mut t = task(&[Day::Mon]);
        assert!(matches!(t.toggle_day(Day::Mon), Err(PlanError::InvalidTransition { .. })));
    }

    #[test]
    fn test_round_trip_leaves_no_residue() {
        let mut t = task(&[Day::Mon, Day::Wed]);
        t.mark_done(Day::Mon).unwrap();
        let before = t.clone();
        t.mark_not_done(Day::Wed, Some("Falta de material".into())).unwrap();
        assert!(t.cause.is_some());
        t.reset_day(Day::Wed).unwrap();
        assert_eq!(t, before);
        assert_eq!(t.cause, None);
        assert_eq!(t.is_fully_completed(), before.is_fully_completed());
    }

    #[test]
    fn test_cause_kept_while_another_day_is_not_done() {
        let mut t = task(&[Day::Mon, Day::Tue]);
        t.mark_not_done(Day::Mon, Some("Chuva".into())).unwrap();
        t.mark_not_done(Day::Tue, None).unwrap();
        t.mark_done(Day::Mon).unwrap();
        assert_eq!(t.cause.as_deref(), Some("Chuva"));
        t.mark_done(Day::Tue).unwrap();
        assert_eq!(t.cause, None);
    }

    #[test]
    fn test_set_cause_requires_not_done_day() {
        let mut t = task(&[Day::Mon]);
        assert!(matches!(t.set_cause(Some("Chuva".into())), Err(PlanError::NoNotDoneDay)));
        t.mark_not_done(Day::Mon, None).unwrap();
        t.set_cause(Some("  Chuva ".into())).unwrap();
        assert_eq!(t.cause.as_deref(), Some("Chuva"));
        t.set_cause(None).unwrap();
        assert_eq!(t.cause, None);
    }

    #[test]
    fn test_plan_and_unplan() {
        let mut t = task(&[Day::Mon]);
        t.plan_day(Day::Fri).unwrap();
        assert_eq!(t.planned_days, vec![Day::Mon, Day::Fri]);
        assert_eq!(t.status_of(Day::Fri), DayStatus::Planned);
        t.mark_done(Day::Fri).unwrap();
        assert!(matches!(t.unplan_day(Day::Fri), Err(PlanError::InvalidTransition { .. })));
        t.reset_day(Day::Fri).unwrap();
        t.unplan_day(Day::Fri).unwrap();
        assert_eq!(t.planned_days, vec![Day::Mon]);
        assert_eq!(t.status_of(Day::Fri), DayStatus::NotPlanned);
    }

    #[test]
    fn test_refresh_completion_label() {
        let mut t = task(&[Day::Mon]);
        t.mark_done(Day::Mon).unwrap();
        t.refresh_completion_label();
        assert_eq!(t.completion_status, CompletionStatus::Completed);
        t.mark_not_done(Day::Mon, None).unwrap();
        t.refresh_completion_label();
        assert_eq!(t.completion_status, CompletionStatus::NotCompleted);
    }

    #[test]
    fn test_daily_status_rejects_bad_tracks() {
        let short = r#"[{"day":"mon","status":"planned"}]"#;
        assert!(serde_json::from_str::<DailyStatus>(short).is_err());

        let mut entries: Vec<DayEntry> = DailyStatus::from_planned(&[]).entries().to_vec();
        entries[6].day = Day::Mon;
        let dup = serde_json::to_string(&entries).unwrap();
        let err = serde_json::from_str::<DailyStatus>(&dup).unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let unknown = r#"[{"day":"xyz","status":"planned"}]"#;
        assert!(serde_json::from_str::<DailyStatus>(unknown).is_err());
    }

    #[test]
    fn test_daily_status_is_reordered_monday_first() {
        let mut entries: Vec<DayEntry> = DailyStatus::from_planned(&[Day::Sun]).entries().to_vec();
        entries.reverse();
        let json = serde_json::to_string(&entries).unwrap();
        let track: DailyStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(track.entries()[0].day, Day::Mon);
        assert_eq!(track.get(Day::Sun), DayStatus::Planned);
    }

    #[test]
    fn test_malformed_week_start_loads_as_none() {
        let mut t = task(&[Day::Mon]);
        let mut v = serde_json::to_value(&t).unwrap();
        v["week_start_date"] = serde_json::json!("not a date");
        let back: Task = serde_json::from_value(v.clone()).unwrap();
        assert_eq!(back.week_start_date, None);

        v["week_start_date"] = serde_json::json!("2024-03-06T15:00:00-03:00");
        let back: Task = serde_json::from_value(v).unwrap();
        t.week_start_date = NaiveDate::from_ymd_opt(2024, 3, 6);
        assert_eq!(back.week_start_date, t.week_start_date);
    }

    #[test]
    fn test_non_string_week_start_loads_as_none() {
        let t = task(&[Day::Mon]);
        let bad_values = [
            serde_json::json!(20240304),
            serde_json::json!({}),
            serde_json::json!([2024, 3, 4]),
            serde_json::json!(true),
        ];
        for bad in bad_values {
            let mut v = serde_json::to_value(&t).unwrap();
            v["week_start_date"] = bad.clone();
            let back: Task = serde_json::from_value(v).unwrap();
            assert_eq!(back.week_start_date, None, "{bad}");
            assert_eq!(back.daily_status, t.daily_status);
        }
    }

    #[test]
    fn test_store_with_numeric_week_start_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obra_tasks.json");
        let mut v = serde_json::to_value(crate::db::Database { tasks: vec![task(&[Day::Mon])] }).unwrap();
        v["tasks"][0]["week_start_date"] = serde_json::json!(20240304);
        std::fs::write(&path, v.to_string()).unwrap();

        let db = crate::db::Database::load(&path).unwrap();
        assert_eq!(db.tasks.len(), 1);
        assert_eq!(db.tasks[0].week_start_date, None);
        assert!(crate::filter::filter_by_week(&db.tasks, monday()).is_empty());
    }

    #[test]
    fn test_bucket_date_falls_back_to_creation() {
        let mut t = task(&[Day::Mon]);
        t.week_start_date = None;
        t.created_at_utc = 1_709_683_200; // 2024-03-06T00:00:00Z
        assert_eq!(t.bucket_date(), NaiveDate::from_ymd_opt(2024, 3, 6));
    }
}
