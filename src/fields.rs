//! Enumerations and field types for weekly task planning.
//!
//! This module defines the weekday tokens, the per-day status values, the
//! coarse completion label and the list/filter options used by the CLI.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// A weekday slot in a task's weekly track. Monday first.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    /// All seven days in track order.
    pub const ALL: [Day; 7] = [
        Day::Mon,
        Day::Tue,
        Day::Wed,
        Day::Thu,
        Day::Fri,
        Day::Sat,
        Day::Sun,
    ];

    /// Position of the day in the weekly track (Monday = 0).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn token(self) -> &'static str {
        match self {
            Day::Mon => "mon",
            Day::Tue => "tue",
            Day::Wed => "wed",
            Day::Thu => "thu",
            Day::Fri => "fri",
            Day::Sat => "sat",
            Day::Sun => "sun",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Day {
    type Err = PlanError;

    /// Accepts the three-letter token or the full English name, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mon" | "monday" => Ok(Day::Mon),
            "tue" | "tuesday" => Ok(Day::Tue),
            "wed" | "wednesday" => Ok(Day::Wed),
            "thu" | "thursday" => Ok(Day::Thu),
            "fri" | "friday" => Ok(Day::Fri),
            "sat" | "saturday" => Ok(Day::Sat),
            "sun" | "sunday" => Ok(Day::Sun),
            _ => Err(PlanError::UnknownDay(s.to_string())),
        }
    }
}

/// Status of one weekday slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Planned,
    NotPlanned,
    Done,
    NotDone,
}

impl DayStatus {
    /// Single-character glyph used in task tables.
    pub fn glyph(self) -> char {
        match self {
            DayStatus::Planned => '○',
            DayStatus::NotPlanned => '·',
            DayStatus::Done => '✔',
            DayStatus::NotDone => '✘',
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DayStatus::Planned => "planned",
            DayStatus::NotPlanned => "not_planned",
            DayStatus::Done => "done",
            DayStatus::NotDone => "not_done",
        })
    }
}

/// Target state for an explicit day transition requested from the CLI.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum MarkAs {
    Done,
    NotDone,
    /// Undo a previous mark.
    Planned,
}

/// Coarse, caller-facing completion label persisted with each task.
///
/// This is a display label only. Completion used for metrics is always
/// derived from the daily track via `Task::is_fully_completed`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    #[default]
    NotCompleted,
    Completed,
}

/// Completion chip used to narrow task lists.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusChip {
    #[default]
    All,
    Completed,
    Pending,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Id,
    Discipline,
    Week,
}
