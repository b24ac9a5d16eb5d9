//! Error types for the planning core and the task store.

use thiserror::Error;

use crate::fields::{Day, DayStatus};

/// Errors raised by task mutation, validation and storage.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("unknown day token '{0}' (expected mon, tue, wed, thu, fri, sat or sun)")]
    UnknownDay(String),

    #[error("invalid daily status: {0}")]
    InvalidDailyStatus(String),

    #[error("{0} is not a planned day for this task")]
    DayNotPlanned(Day),

    #[error("cannot move {day} from {from} to {to}")]
    InvalidTransition {
        day: Day,
        from: DayStatus,
        to: DayStatus,
    },

    #[error("a cause can only be set while at least one day is not done")]
    NoNotDoneDay,

    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("site name '{0}' has no letters or digits")]
    InvalidSiteName(String),

    #[error("site '{0}' already exists")]
    SiteExists(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("task store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = PlanError> = std::result::Result<T, E>;
