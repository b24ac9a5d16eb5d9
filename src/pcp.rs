//! Percentage of Plan Completed (PCP) aggregation.
//!
//! The aggregator reduces an already filtered set of tasks to the overall
//! PCP, one row per discipline and a table of non-completion causes. Output
//! field names are part of the JSON contract consumed by chart renderers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::filter::filter_by_week;
use crate::task::Task;
use crate::week::{week_end, week_start};

/// Sentinel bucket names for tasks without a discipline or a cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub no_discipline: String,
    pub no_cause: String,
}

impl Default for Labels {
    fn default() -> Self {
        Labels {
            no_discipline: "No discipline".to_string(),
            no_cause: "No cause".to_string(),
        }
    }
}

/// Completed vs. total with the rounded percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub percentage: u32,
    pub completed_tasks: usize,
    pub total_tasks: usize,
}

impl Completion {
    pub fn new(completed_tasks: usize, total_tasks: usize) -> Self {
        Completion {
            percentage: percentage(completed_tasks, total_tasks),
            completed_tasks,
            total_tasks,
        }
    }

    fn add(&mut self, completed: bool) {
        self.total_tasks += 1;
        if completed {
            self.completed_tasks += 1;
        }
        self.percentage = percentage(self.completed_tasks, self.total_tasks);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineCompletion {
    pub name: String,
    pub percentage: u32,
    pub completed_tasks: usize,
    pub total_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseCount {
    pub cause: String,
    pub count: usize,
}

/// Aggregated PCP for one set of tasks. Recomputed on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcpBreakdown {
    pub overall: Completion,
    /// In order of first appearance.
    pub disciplines: Vec<DisciplineCompletion>,
    /// Most frequent first; ties keep first appearance.
    pub causes: Vec<CauseCount>,
    /// Tasks with no planned day, left out of every total.
    pub not_applicable: usize,
}

impl PcpBreakdown {
    pub fn discipline(&self, name: &str) -> Option<&DisciplineCompletion> {
        self.disciplines.iter().find(|d| d.name == name)
    }

    pub fn cause_count(&self, cause: &str) -> usize {
        self.causes
            .iter()
            .find(|c| c.cause == cause)
            .map_or(0, |c| c.count)
    }
}

/// `round(completed / total * 100)` with halves rounded up; 0 for an empty set.
pub fn percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed * 200 + total) / (total * 2)) as u32
}

pub fn aggregate<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> PcpBreakdown {
    aggregate_with(tasks, &Labels::default())
}

pub fn aggregate_with<'a>(tasks: impl IntoIterator<Item = &'a Task>, labels: &Labels) -> PcpBreakdown {
    let mut overall = Completion::default();
    let mut disciplines: Vec<(String, Completion)> = Vec::new();
    let mut causes: Vec<CauseCount> = Vec::new();
    let mut not_applicable = 0;

    for t in tasks {
        if !t.is_applicable() {
            not_applicable += 1;
            continue;
        }
        let completed = t.is_fully_completed();
        overall.add(completed);

        let name = label_or(t.discipline.as_deref(), &labels.no_discipline);
        match disciplines.iter_mut().find(|(n, _)| *n == name) {
            Some((_, c)) => c.add(completed),
            None => {
                let mut c = Completion::default();
                c.add(completed);
                disciplines.push((name, c));
            }
        }

        // A cause left on a task with no not-done day is stale.
        if t.has_not_done() {
            let cause = label_or(t.cause.as_deref(), &labels.no_cause);
            match causes.iter_mut().find(|c| c.cause == cause) {
                Some(c) => c.count += 1,
                None => causes.push(CauseCount { cause, count: 1 }),
            }
        }
    }

    causes.sort_by(|a, b| b.count.cmp(&a.count));

    debug!(
        total = overall.total_tasks,
        completed = overall.completed_tasks,
        disciplines = disciplines.len(),
        causes = causes.len(),
        not_applicable,
        "aggregated pcp"
    );

    PcpBreakdown {
        overall,
        disciplines: disciplines
            .into_iter()
            .map(|(name, c)| DisciplineCompletion {
                name,
                percentage: c.percentage,
                completed_tasks: c.completed_tasks,
                total_tasks: c.total_tasks,
            })
            .collect(),
        causes,
        not_applicable,
    }
}

fn label_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Overall PCP of one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekPcp {
    pub week_start: NaiveDate,
    pub overall: Completion,
}

/// Overall PCP for each of `weeks`, each week filtered on its own.
pub fn pcp_trend(tasks: &[Task], weeks: &[NaiveDate]) -> Vec<WeekPcp> {
    weeks
        .iter()
        .map(|&w| WeekPcp {
            week_start: week_start(w),
            overall: aggregate(filter_by_week(tasks, w)).overall,
        })
        .collect()
}

/// Render a breakdown as a plain-text report.
pub fn print_breakdown(b: &PcpBreakdown, week: NaiveDate) {
    println!("PCP for week of {} to {}", week_start(week), week_end(week));
    println!(
        "Overall:      {:>3}%  {}  ({}/{})",
        b.overall.percentage,
        bar(b.overall.percentage),
        b.overall.completed_tasks,
        b.overall.total_tasks
    );
    if b.not_applicable > 0 {
        println!("Not applicable (no planned days): {}", b.not_applicable);
    }

    println!();
    println!("{:<20} {:>4}  {:<20} {}", "Discipline", "PCP", "", "Done/Total");
    if b.disciplines.is_empty() {
        println!("  -");
    }
    for d in &b.disciplines {
        println!(
            "{:<20} {:>3}%  {}  {}/{}",
            crate::db::truncate(&d.name, 20),
            d.percentage,
            bar(d.percentage),
            d.completed_tasks,
            d.total_tasks
        );
    }

    println!();
    println!("{:<32} {}", "Cause", "Tasks");
    if b.causes.is_empty() {
        println!("  -");
    }
    for c in &b.causes {
        println!("{:<32} {}", crate::db::truncate(&c.cause, 32), c.count);
    }
}

fn bar(pct: u32) -> String {
    let filled = (pct as usize).min(100) / 5;
    format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled))
}
