//! Task store and table formatting helpers.
//!
//! This module provides the `Database` struct, a JSON-file backed task list
//! that serves the fetch/update/delete contract for the planning core, plus
//! helpers for printing task tables and exporting CSV.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PlanError, Result};
use crate::fields::*;
use crate::task::Task;
use crate::week::week_key;

/// In-memory task list for one construction site.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<Task>,
}

impl Database {
    /// Load from a JSON file. A missing file is an empty store; an unreadable
    /// or invalid file is an error so it is never silently overwritten.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no task store yet, starting empty");
            return Ok(Database::default());
        }
        let buf = fs::read_to_string(path)?;
        let db: Database = serde_json::from_str(&buf)?;
        debug!(path = %path.display(), tasks = db.tasks.len(), "loaded task store");
        Ok(db)
    }

    /// Save using an atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        info!(path = %path.display(), tasks = self.tasks.len(), "saved task store");
        Ok(())
    }

    /// Apply `change` to a staged copy, save it, and only then adopt it.
    ///
    /// A failed save leaves `self` exactly as it was.
    pub fn commit<R>(&mut self, path: &Path, change: impl FnOnce(&mut Database) -> R) -> Result<R> {
        let mut staged = Database {
            tasks: self.tasks.clone(),
        };
        let out = change(&mut staged);
        staged.save(path)?;
        *self = staged;
        Ok(out)
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Like `get_mut`, but a missing task is an error.
    pub fn require_mut(&mut self, id: u64) -> Result<&mut Task> {
        self.get_mut(id).ok_or(PlanError::TaskNotFound(id))
    }

    /// Remove tasks by IDs, returning how many were removed.
    pub fn remove_ids(&mut self, ids: &HashSet<u64>) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !ids.contains(&t.id));
        before - self.tasks.len()
    }
}

/// Split comma-separated day tokens, keeping Monday-first order without repeats.
pub fn split_days(inputs: &[String]) -> Result<Vec<Day>> {
    let mut days = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            if part.trim().is_empty() {
                continue;
            }
            days.push(part.parse::<Day>()?);
        }
    }
    days.sort();
    days.dedup();
    Ok(days)
}

/// Render the seven day slots as glyphs, Monday first.
pub fn format_track(t: &Task) -> String {
    t.daily_status.entries().iter().map(|e| e.status.glyph()).collect()
}

pub fn format_completion(t: &Task) -> &'static str {
    if !t.is_applicable() {
        "n/a"
    } else if t.is_fully_completed() {
        "Done"
    } else {
        "Pending"
    }
}

pub fn format_label(s: CompletionStatus) -> &'static str {
    match s {
        CompletionStatus::NotCompleted => "not completed",
        CompletionStatus::Completed => "completed",
    }
}

pub fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task]) {
    println!(
        "{:<5} {:<10} {:<14} {:<7} {:<8} {:<16} {}",
        "ID", "Week", "Discipline", "MTWTFSS", "Status", "Cause", "Description"
    );
    for t in tasks {
        let week = t
            .week_start_date
            .map(week_key)
            .unwrap_or_else(|| "-".into());
        let discipline = t.discipline.clone().unwrap_or_else(|| "-".into());
        let cause = t.cause.clone().unwrap_or_else(|| "-".into());
        println!(
            "{:<5} {:<10} {:<14} {:<7} {:<8} {:<16} {}",
            t.id,
            week,
            truncate(&discipline, 14),
            format_track(t),
            format_completion(t),
            truncate(&cause, 16),
            t.description
        );
    }
    println!("Legend: ○ planned  ✔ done  ✘ not done  · not planned");
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Quote a CSV field when it contains a separator, quote or newline.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Build CSV for tasks, one column per weekday.
pub fn tasks_to_csv(tasks: &[&Task]) -> String {
    let mut out = String::from(
        "ID,Week,Description,Item,Discipline,Location,Sector,Responsible,Mon,Tue,Wed,Thu,Fri,Sat,Sun,FullyCompleted,Cause\n",
    );
    for t in tasks {
        let opt = |v: &Option<String>| escape_csv(v.as_deref().unwrap_or(""));
        let days: Vec<String> = t
            .daily_status
            .entries()
            .iter()
            .map(|e| e.status.to_string())
            .collect();
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{}\n",
            t.id,
            t.week_start_date.map(week_key).unwrap_or_default(),
            escape_csv(&t.description),
            opt(&t.item),
            opt(&t.discipline),
            opt(&t.location),
            opt(&t.sector),
            opt(&t.responsible),
            days.join(","),
            t.is_fully_completed(),
            opt(&t.cause),
        ));
    }
    out
}
