//! Task filter pipeline.
//!
//! Each filter takes borrowed tasks and returns a new `Vec<&Task>`, so a
//! pipeline never mutates the collection it reads. Filters are independent
//! predicates and compose by conjunction.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::fields::StatusChip;
use crate::task::Task;
use crate::week::{week_key, week_start};

/// Keep tasks stamped with the same week as `week`. Unstamped tasks are dropped.
pub fn filter_by_week<'a>(tasks: impl IntoIterator<Item = &'a Task>, week: NaiveDate) -> Vec<&'a Task> {
    let key = week_key(week);
    tasks
        .into_iter()
        .filter(|t| t.week_start_date.is_some_and(|d| week_key(d) == key))
        .collect()
}

pub fn filter_by_status_chip<'a>(tasks: impl IntoIterator<Item = &'a Task>, chip: StatusChip) -> Vec<&'a Task> {
    tasks
        .into_iter()
        .filter(|t| match chip {
            StatusChip::All => true,
            StatusChip::Completed => t.is_fully_completed(),
            StatusChip::Pending => !t.is_fully_completed(),
        })
        .collect()
}

/// Case-insensitive substring search over description, location, sector and
/// responsible. A blank query keeps everything.
pub fn filter_by_search<'a>(tasks: impl IntoIterator<Item = &'a Task>, query: &str) -> Vec<&'a Task> {
    let needle = query.trim().to_lowercase();
    tasks
        .into_iter()
        .filter(|t| needle.is_empty() || matches_text(t, &needle))
        .collect()
}

fn matches_text(t: &Task, needle: &str) -> bool {
    std::iter::once(Some(t.description.as_str()))
        .chain([
            t.location.as_deref(),
            t.sector.as_deref(),
            t.responsible.as_deref(),
        ])
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Everything a task view filters on, passed explicitly per call.
#[derive(Debug, Clone)]
pub struct TaskQuery {
    pub week: NaiveDate,
    pub chip: StatusChip,
    pub search: Option<String>,
}

impl TaskQuery {
    pub fn for_week(week: NaiveDate) -> Self {
        TaskQuery {
            week,
            chip: StatusChip::All,
            search: None,
        }
    }

    pub fn with_chip(mut self, chip: StatusChip) -> Self {
        self.chip = chip;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Week, then chip, then search.
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let by_week = filter_by_week(tasks, self.week);
        let by_chip = filter_by_status_chip(by_week.iter().copied(), self.chip);
        let out = match self.search.as_deref() {
            Some(q) => filter_by_search(by_chip, q),
            None => by_chip,
        };
        debug!(
            total = tasks.len(),
            matched = out.len(),
            week = %week_key(self.week),
            "filtered tasks"
        );
        out
    }
}

/// A week bucket with the number of tasks placed in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekBucket {
    pub week_start: NaiveDate,
    pub tasks: usize,
    /// Tasks placed only through their creation date.
    pub unstamped: usize,
}

/// All week buckets present in `tasks`, oldest first.
pub fn week_index<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<WeekBucket> {
    let mut buckets: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for t in tasks {
        let Some(d) = t.bucket_date() else { continue };
        let entry = buckets.entry(week_start(d)).or_default();
        entry.0 += 1;
        if t.week_start_date.is_none() {
            entry.1 += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(week_start, (tasks, unstamped))| WeekBucket {
            week_start,
            tasks,
            unstamped,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Day;
    use chrono::Duration;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn sample() -> Vec<Task> {
        let mut done = Task::new(1, "Forma pilares bloco A", &[Day::Mon], monday(), 0)
            .with_location("Torre 1")
            .with_responsible("João");
        done.mark_done(Day::Mon).unwrap();

        let mut pending = Task::new(2, "Armação vigas", &[Day::Tue], monday(), 0)
            .with_sector("Estrutura");
        pending.mark_not_done(Day::Tue, Some("Chuva".into())).unwrap();

        let next_week = Task::new(3, "Forma pilares bloco B", &[Day::Mon], monday() + Duration::days(7), 0);

        let mut unstamped = Task::new(4, "Forma escada", &[Day::Mon], monday(), 0);
        unstamped.week_start_date = None;

        vec![done, pending, next_week, unstamped]
    }

    fn ids(tasks: &[&Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_filter_by_week_any_day_of_week() {
        let tasks = sample();
        let sunday = monday() + Duration::days(6);
        assert_eq!(ids(&filter_by_week(&tasks, sunday)), vec![1, 2]);
        assert_eq!(ids(&filter_by_week(&tasks, monday() + Duration::days(8))), vec![3]);
    }

    #[test]
    fn test_filter_by_week_is_subset_with_matching_key() {
        let tasks = sample();
        let out = filter_by_week(&tasks, monday());
        for t in &out {
            assert!(tasks.iter().any(|x| x.id == t.id));
            assert_eq!(week_key(t.week_start_date.unwrap()), week_key(monday()));
        }
    }

    #[test]
    fn test_status_chips() {
        let tasks = sample();
        let week = filter_by_week(&tasks, monday());
        assert_eq!(ids(&filter_by_status_chip(week.iter().copied(), StatusChip::All)), vec![1, 2]);
        assert_eq!(ids(&filter_by_status_chip(week.iter().copied(), StatusChip::Completed)), vec![1]);
        assert_eq!(ids(&filter_by_status_chip(week.iter().copied(), StatusChip::Pending)), vec![2]);
    }

    #[test]
    fn test_search_fields_case_insensitive() {
        let tasks = sample();
        assert_eq!(ids(&filter_by_search(&tasks, "FORMA")), vec![1, 3, 4]);
        assert_eq!(ids(&filter_by_search(&tasks, "torre")), vec![1]);
        assert_eq!(ids(&filter_by_search(&tasks, "estrutura")), vec![2]);
        assert_eq!(ids(&filter_by_search(&tasks, "joão")), vec![1]);
        // Cause is not a searchable field.
        assert!(filter_by_search(&tasks, "chuva").is_empty());
    }

    #[test]
    fn test_blank_search_is_identity() {
        let tasks = sample();
        assert_eq!(filter_by_search(&tasks, "").len(), tasks.len());
        assert_eq!(filter_by_search(&tasks, "   ").len(), tasks.len());
    }

    #[test]
    fn test_search_is_idempotent() {
        let tasks = sample();
        for q in ["forma", "ARM", " torre ", "", "zzz"] {
            let once = filter_by_search(&tasks, q);
            let twice = filter_by_search(once.iter().copied(), q);
            assert_eq!(ids(&once), ids(&twice), "query {q:?}");
        }
    }

    #[test]
    fn test_query_excludes_other_week_regardless_of_later_filters() {
        let tasks = sample();
        for chip in [StatusChip::All, StatusChip::Completed, StatusChip::Pending] {
            let out = TaskQuery::for_week(monday())
                .with_chip(chip)
                .with_search("bloco B")
                .apply(&tasks);
            assert!(out.is_empty(), "{chip:?}");
        }
    }

    #[test]
    fn test_query_order_does_not_change_result() {
        let tasks = sample();
        let piped = TaskQuery::for_week(monday())
            .with_chip(StatusChip::Completed)
            .with_search("forma")
            .apply(&tasks);
        let reversed = filter_by_week(
            filter_by_status_chip(filter_by_search(&tasks, "forma"), StatusChip::Completed),
            monday(),
        );
        assert_eq!(ids(&piped), ids(&reversed));
        assert_eq!(ids(&piped), vec![1]);
    }

    #[test]
    fn test_week_index_counts_unstamped_by_creation_date() {
        let mut tasks = sample();
        tasks[3].created_at_utc = 1_709_683_200; // Wednesday 2024-03-06
        let index = week_index(&tasks);
        assert_eq!(
            index,
            vec![
                WeekBucket { week_start: monday(), tasks: 3, unstamped: 1 },
                WeekBucket { week_start: monday() + Duration::days(7), tasks: 1, unstamped: 0 },
            ]
        );
    }
}
