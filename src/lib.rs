//! # weekly_pcp
//!
//! Weekly task bucketing and PCP (Percentage of Plan Completed) aggregation
//! for construction-site planning.
//!
//! - [`week`] resolves any date to its Monday-start week bucket.
//! - [`filter`] narrows a task list by week, completion chip and text search.
//! - [`task`] holds the seven-slot daily status track and its transitions.
//! - [`pcp`] rolls a filtered task list up into overall, per-discipline and
//!   per-cause figures.
//! - [`db`] and [`site`] persist tasks as one JSON file per construction site.
//!
//! ```
//! use chrono::NaiveDate;
//! use weekly_pcp::fields::Day;
//! use weekly_pcp::filter::TaskQuery;
//! use weekly_pcp::pcp::aggregate;
//! use weekly_pcp::task::Task;
//!
//! let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
//! let mut t = Task::new(1, "Alvenaria bloco B", &[Day::Mon, Day::Wed], monday, 0);
//! t.mark_done(Day::Mon).unwrap();
//! t.mark_not_done(Day::Wed, Some("Chuva".into())).unwrap();
//!
//! let tasks = vec![t];
//! let week = TaskQuery::for_week(monday).apply(&tasks);
//! let pcp = aggregate(week);
//! assert_eq!(pcp.overall.percentage, 0);
//! assert_eq!(pcp.cause_count("Chuva"), 1);
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod filter;
pub mod pcp;
pub mod site;
pub mod task;
pub mod week;

pub use error::PlanError;
pub use fields::{CompletionStatus, Day, DayStatus, MarkAs, StatusChip};
pub use filter::{filter_by_search, filter_by_status_chip, filter_by_week, TaskQuery};
pub use pcp::{aggregate, aggregate_with, PcpBreakdown};
pub use task::{DailyStatus, Task};
pub use week::{week_key, week_start};
