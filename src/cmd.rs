//! Command implementations for the CLI interface.
//!
//! Store-bound handlers receive the loaded `Database` from `main`. Every
//! mutation is applied to a copy of the task first and only committed and
//! saved when it succeeds.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use tracing::info;

use weekly_pcp::config::{self, Config};
use weekly_pcp::db::*;
use weekly_pcp::error::PlanError;
use weekly_pcp::fields::*;
use weekly_pcp::filter::{week_index, TaskQuery};
use weekly_pcp::pcp::{aggregate_with, pcp_trend, print_breakdown, Labels};
use weekly_pcp::site::{create_site, discover_sites};
use weekly_pcp::task::Task;
use weekly_pcp::week::{parse_date_input, shift_weeks, week_days, week_key, week_start};

#[derive(Subcommand)]
pub enum Commands {
    /// Register a task for a week.
    Add {
        /// What is to be done.
        description: String,
        /// Planned days (mon..sun). May be repeated and comma-separated.
        #[arg(long = "day", short = 'd')]
        days: Vec<String>,
        /// Reference date for the task's week: YYYY-MM-DD, "next week", "in 2w".
        #[arg(long)]
        week: Option<String>,
        /// Work item or package.
        #[arg(long)]
        item: Option<String>,
        /// Discipline (e.g. Civil, Elétrica).
        #[arg(long)]
        discipline: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        sector: Option<String>,
        /// Responsible party.
        #[arg(long)]
        responsible: Option<String>,
    },

    /// List the tasks of a week.
    List {
        /// Any date inside the week to show (default: today).
        #[arg(long)]
        week: Option<String>,
        /// Completion chip.
        #[arg(long, value_enum, default_value_t = StatusChip::All)]
        chip: StatusChip,
        /// Text search over description, location, sector and responsible.
        #[arg(long, short = 'q')]
        search: Option<String>,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Id)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show a single task.
    View {
        id: u64,
        #[arg(long)]
        json: bool,
    },

    /// Mark a planned day done, not done, or back to planned.
    Mark {
        id: u64,
        #[arg(value_enum)]
        day: Day,
        #[arg(value_enum)]
        status: MarkAs,
        /// Cause of non-completion (with not-done).
        #[arg(long)]
        cause: Option<String>,
    },

    /// Flip a marked day between done and not done.
    Toggle {
        id: u64,
        #[arg(value_enum)]
        day: Day,
    },

    /// Set or clear the cause of non-completion.
    Cause {
        id: u64,
        /// Cause text. Omit together with --clear to remove it.
        cause: Option<String>,
        #[arg(long)]
        clear: bool,
    },

    /// Add days to a task's plan.
    Plan {
        id: u64,
        /// Days to add (mon..sun), comma-separated or repeated.
        #[arg(required = true)]
        days: Vec<String>,
    },

    /// Remove unmarked days from a task's plan.
    Unplan {
        id: u64,
        #[arg(required = true)]
        days: Vec<String>,
    },

    /// Update text fields on a task. An empty value clears an optional field.
    Update {
        id: u64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        item: Option<String>,
        #[arg(long)]
        discipline: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        responsible: Option<String>,
    },

    /// Delete tasks by ID.
    Delete {
        #[arg(required = true)]
        ids: Vec<u64>,
    },

    /// Percentage of Plan Completed for a week.
    Pcp {
        #[arg(long)]
        week: Option<String>,
        #[arg(long, value_enum, default_value_t = StatusChip::All)]
        chip: StatusChip,
        #[arg(long, short = 'q')]
        search: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Overall PCP for several consecutive weeks ending at --week.
    Trend {
        #[arg(long)]
        week: Option<String>,
        /// Number of weeks to show.
        #[arg(long, default_value_t = 4)]
        weeks: usize,
        #[arg(long)]
        json: bool,
    },

    /// List week buckets that have tasks.
    Weeks,

    /// List construction sites in the data directory.
    Sites,

    /// Manage construction sites.
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },

    /// Export a week's tasks to CSV.
    Export {
        /// Output file path (default: tasks_<week>.csv)
        #[arg(long, short)]
        output: Option<String>,
        #[arg(long)]
        week: Option<String>,
        #[arg(long, value_enum, default_value_t = StatusChip::All)]
        chip: StatusChip,
        #[arg(long, short = 'q')]
        search: Option<String>,
    },

    /// Create a timestamped backup of the current task store.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Manage config.toml.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum SiteAction {
    /// Create an empty task store for a new site.
    New { name: String },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a default config.toml if none exists.
    Init,
    /// Print the effective configuration.
    Show,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Resolve a `--week` argument, defaulting to today.
pub fn resolve_week(arg: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match arg {
        None => Ok(today),
        Some(s) => parse_date_input(s, today).with_context(|| {
            format!("Unrecognised week '{s}'. Use YYYY-MM-DD, 'today', 'last week', 'next week', 'in 2w' or '3w ago'.")
        }),
    }
}

fn build_query(week: Option<&str>, chip: StatusChip, search: Option<String>) -> Result<TaskQuery> {
    let mut q = TaskQuery::for_week(resolve_week(week, today())?).with_chip(chip);
    if let Some(s) = search {
        q = q.with_search(s);
    }
    Ok(q)
}

fn clean(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Apply `f` to a copy of task `id`; commit and save only on success.
fn mutate_task(
    db: &mut Database,
    db_path: &Path,
    id: u64,
    f: impl FnOnce(&mut Task) -> Result<(), PlanError>,
) -> Result<Task> {
    let mut draft = db.get(id).cloned().ok_or(PlanError::TaskNotFound(id))?;
    f(&mut draft)?;
    draft.refresh_completion_label();
    draft.updated_at_utc = Utc::now().timestamp();
    db.commit(db_path, |staged| {
        if let Some(slot) = staged.get_mut(id) {
            *slot = draft.clone();
        }
    })
    .context("Failed to save task store")?;
    Ok(draft)
}

fn print_track_line(t: &Task) {
    println!(
        "Task {}: {}  {}{}",
        t.id,
        format_track(t),
        format_completion(t),
        t.cause.as_deref().map(|c| format!("  (cause: {c})")).unwrap_or_default()
    );
}

/// Add a new task to the store.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    description: String,
    days: Vec<String>,
    week: Option<String>,
    item: Option<String>,
    discipline: Option<String>,
    location: Option<String>,
    sector: Option<String>,
    responsible: Option<String>,
) -> Result<()> {
    let description = description.trim().to_string();
    if description.is_empty() {
        bail!("Description cannot be empty.");
    }
    let days = split_days(&days)?;
    if days.is_empty() {
        eprintln!("Warning: no planned days; this task will not count towards PCP.");
    }
    let reference = resolve_week(week.as_deref(), today())?;

    let id = db.next_id();
    let mut task = Task::new(id, description, &days, reference, Utc::now().timestamp());
    task.item = clean(item);
    task.discipline = clean(discipline);
    task.location = clean(location);
    task.sector = clean(sector);
    task.responsible = clean(responsible);
    db.commit(db_path, |staged| staged.tasks.push(task))
        .context("Failed to save task store")?;
    info!(id, week = %week_key(reference), "task added");
    println!("Added task {} for week of {}", id, week_start(reference));
    Ok(())
}

/// List a week's tasks with optional chip/search filters.
pub fn cmd_list(
    db: &Database,
    week: Option<String>,
    chip: StatusChip,
    search: Option<String>,
    sort: SortKey,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let query = build_query(week.as_deref(), chip, search)?;
    let mut filtered = query.apply(&db.tasks);

    match sort {
        SortKey::Id => filtered.sort_by_key(|t| t.id),
        SortKey::Discipline => filtered.sort_by(|a, b| {
            a.discipline
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .cmp(&b.discipline.as_deref().unwrap_or("").to_lowercase())
                .then(a.id.cmp(&b.id))
        }),
        SortKey::Week => filtered.sort_by_key(|t| (t.week_start_date, t.id)),
    }
    if let Some(n) = limit {
        filtered.truncate(n);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&filtered)?);
        return Ok(());
    }
    println!("Week of {}", week_start(query.week));
    if filtered.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    print_table(&filtered);
    Ok(())
}

/// View detailed information about a task.
pub fn cmd_view(db: &Database, id: u64, json: bool) -> Result<()> {
    let t = db.get(id).ok_or(PlanError::TaskNotFound(id))?;
    if json {
        let mut v = serde_json::to_value(t)?;
        v["is_fully_completed"] = serde_json::Value::Bool(t.is_fully_completed());
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }
    let dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    println!("ID:           {}", t.id);
    println!("Description:  {}", t.description);
    println!("Item:         {}", dash(&t.item));
    println!("Discipline:   {}", dash(&t.discipline));
    println!("Location:     {}", dash(&t.location));
    println!("Sector:       {}", dash(&t.sector));
    println!("Responsible:  {}", dash(&t.responsible));
    println!(
        "Week:         {}",
        t.week_start_date.map(week_key).unwrap_or_else(|| "- (unassigned)".into())
    );
    println!("Completion:   {}", format_completion(t));
    println!("Label:        {}", format_label(t.completion_status));
    println!("Cause:        {}", dash(&t.cause));
    println!("Created:      {}", format_timestamp(t.created_at_utc));
    println!("Updated:      {}", format_timestamp(t.updated_at_utc));
    println!("Days:");
    match t.week_start_date {
        Some(ws) => {
            for (day, date) in week_days(ws) {
                println!("  {} {}  {}", day, date.format("%d/%m"), t.status_of(day));
            }
        }
        None => {
            for e in t.daily_status.entries() {
                println!("  {}        {}", e.day, e.status);
            }
        }
    }
    Ok(())
}

pub fn cmd_mark(
    db: &mut Database,
    db_path: &Path,
    id: u64,
    day: Day,
    status: MarkAs,
    cause: Option<String>,
) -> Result<()> {
    if cause.is_some() && status != MarkAs::NotDone {
        bail!("--cause only applies when marking a day not-done.");
    }
    let t = mutate_task(db, db_path, id, |t| t.mark(day, status, cause))?;
    print_track_line(&t);
    Ok(())
}

pub fn cmd_toggle(db: &mut Database, db_path: &Path, id: u64, day: Day) -> Result<()> {
    let t = mutate_task(db, db_path, id, |t| t.toggle_day(day))?;
    print_track_line(&t);
    Ok(())
}

pub fn cmd_cause(
    db: &mut Database,
    db_path: &Path,
    id: u64,
    cause: Option<String>,
    clear: bool,
) -> Result<()> {
    match (cause, clear) {
        (Some(_), true) => bail!("Pass either a cause or --clear, not both."),
        (None, false) => bail!("Pass a cause, or --clear to remove it."),
        (cause, _) => {
            let t = mutate_task(db, db_path, id, |t| t.set_cause(cause))?;
            print_track_line(&t);
        }
    }
    Ok(())
}

pub fn cmd_plan(db: &mut Database, db_path: &Path, id: u64, days: Vec<String>, plan: bool) -> Result<()> {
    let days = split_days(&days)?;
    let t = mutate_task(db, db_path, id, |t| {
        for d in days {
            if plan {
                t.plan_day(d)?;
            } else {
                t.unplan_day(d)?;
            }
        }
        Ok(())
    })?;
    print_track_line(&t);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    id: u64,
    description: Option<String>,
    item: Option<String>,
    discipline: Option<String>,
    location: Option<String>,
    sector: Option<String>,
    responsible: Option<String>,
) -> Result<()> {
    if let Some(d) = &description {
        if d.trim().is_empty() {
            bail!("Description cannot be empty.");
        }
    }
    mutate_task(db, db_path, id, |t| {
        if let Some(d) = description { t.description = d.trim().to_string(); }
        if item.is_some() { t.item = clean(item); }
        if discipline.is_some() { t.discipline = clean(discipline); }
        if location.is_some() { t.location = clean(location); }
        if sector.is_some() { t.sector = clean(sector); }
        if responsible.is_some() { t.responsible = clean(responsible); }
        Ok(())
    })?;
    println!("Updated task {}", id);
    Ok(())
}

pub fn cmd_delete(db: &mut Database, db_path: &Path, ids: Vec<u64>) -> Result<()> {
    if let Some(missing) = ids.iter().find(|id| db.get(**id).is_none()) {
        bail!(PlanError::TaskNotFound(*missing));
    }
    let ids: HashSet<u64> = ids.into_iter().collect();
    let removed = db
        .commit(db_path, |staged| staged.remove_ids(&ids))
        .context("Failed to save task store")?;
    println!("Deleted {} task(s).", removed);
    Ok(())
}

pub fn cmd_pcp(
    db: &Database,
    labels: &Labels,
    week: Option<String>,
    chip: StatusChip,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let query = build_query(week.as_deref(), chip, search)?;
    let breakdown = aggregate_with(query.apply(&db.tasks), labels);
    if json {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
    } else {
        print_breakdown(&breakdown, query.week);
    }
    Ok(())
}

pub fn cmd_trend(db: &Database, week: Option<String>, weeks: usize, json: bool) -> Result<()> {
    if weeks == 0 {
        bail!("--weeks must be at least 1.");
    }
    let last = resolve_week(week.as_deref(), today())?;
    let span = i64::try_from(weeks - 1).ok();
    if span.and_then(|n| shift_weeks(last, -n)).is_none() {
        bail!("--weeks {weeks} reaches past the earliest supported date.");
    }
    let range: Vec<NaiveDate> = (0..weeks)
        .rev()
        .filter_map(|i| shift_weeks(last, -(i as i64)))
        .collect();
    let trend = pcp_trend(&db.tasks, &range);
    if json {
        println!("{}", serde_json::to_string_pretty(&trend)?);
        return Ok(());
    }
    println!("{:<12} {:>4}  {}", "Week", "PCP", "Done/Total");
    for w in trend {
        println!(
            "{:<12} {:>3}%  {}/{}",
            w.week_start, w.overall.percentage, w.overall.completed_tasks, w.overall.total_tasks
        );
    }
    Ok(())
}

pub fn cmd_weeks(db: &Database) {
    let index = week_index(&db.tasks);
    if index.is_empty() {
        println!("No tasks.");
        return;
    }
    println!("{:<12} {}", "Week", "Tasks");
    for b in index {
        if b.unstamped > 0 {
            println!("{:<12} {} ({} without week, placed by creation date)", b.week_start, b.tasks, b.unstamped);
        } else {
            println!("{:<12} {}", b.week_start, b.tasks);
        }
    }
}

pub fn cmd_sites(data_dir: &Path) -> Result<()> {
    let sites = discover_sites(data_dir)?;
    if sites.is_empty() {
        println!("No sites in {}", data_dir.display());
        return Ok(());
    }
    println!("{:<24} {:<8} {}", "Site", "Tasks", "File");
    for s in sites {
        let count = match Database::load(&s.file_path) {
            Ok(db) => db.tasks.len().to_string(),
            Err(_) => "error".into(),
        };
        println!("{:<24} {:<8} {}", truncate(&s.display_name, 24), count, s.file_path.display());
    }
    Ok(())
}

pub fn cmd_site(data_dir: &Path, action: SiteAction) -> Result<()> {
    match action {
        SiteAction::New { name } => {
            let site = create_site(&name, data_dir)?;
            println!("Created site '{}' at {}", site.display_name, site.file_path.display());
        }
    }
    Ok(())
}

pub fn cmd_export(
    db: &Database,
    output: Option<String>,
    week: Option<String>,
    chip: StatusChip,
    search: Option<String>,
) -> Result<()> {
    let query = build_query(week.as_deref(), chip, search)?;
    let tasks = query.apply(&db.tasks);
    let output_path = output.unwrap_or_else(|| format!("tasks_{}.csv", week_key(query.week)));
    fs::write(&output_path, tasks_to_csv(&tasks))
        .with_context(|| format!("Failed to write CSV file {output_path}"))?;
    println!("Exported {} task(s) to {}", tasks.len(), output_path);
    Ok(())
}

/// Create a timestamped backup of the store file in a `backup/` sibling directory.
pub fn create_backup(db_path: &Path) -> Result<String> {
    if !db_path.exists() {
        bail!("Task store {} does not exist", db_path.display());
    }
    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let db_filename = db_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("tasks.json");
    let backup_path = backup_dir.join(format!("{}_{}", timestamp, db_filename));
    fs::copy(db_path, &backup_path)?;
    Ok(backup_path.to_string_lossy().to_string())
}

pub fn cmd_backup(db_path: &Path) -> Result<()> {
    let path = create_backup(db_path)?;
    println!("Backup created: {}", path);
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

pub fn cmd_config(data_dir: &Path, cfg: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            fs::create_dir_all(data_dir)
                .with_context(|| format!("Failed to create {}", data_dir.display()))?;
            let path = config::config_path(data_dir);
            if config::init_config(data_dir)? {
                println!("Wrote {}", path.display());
            } else {
                println!("Config already exists: {}", path.display());
            }
        }
        ConfigAction::Show => {
            println!("# data dir: {}", data_dir.display());
            print!("{}", toml::to_string_pretty(cfg).context("serialize config")?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn thursday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    fn store_with_task() -> (tempfile::TempDir, std::path::PathBuf, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obra_tasks.json");
        let mut db = Database::default();
        db.tasks.push(Task::new(1, "Alvenaria", &[Day::Mon, Day::Wed], thursday(), 0));
        db.save(&path).unwrap();
        (dir, path, db)
    }

    #[test]
    fn test_resolve_week() {
        assert_eq!(resolve_week(None, thursday()).unwrap(), thursday());
        assert_eq!(
            resolve_week(Some("last week"), thursday()).unwrap(),
            thursday() - Duration::weeks(1)
        );
        assert!(resolve_week(Some("whenever"), thursday()).is_err());
    }

    #[test]
    fn test_mutation_commits_and_refreshes_label() {
        let (_dir, path, mut db) = store_with_task();
        cmd_mark(&mut db, &path, 1, Day::Mon, MarkAs::Done, None).unwrap();
        let saved = Database::load(&path).unwrap();
        assert_eq!(saved.tasks[0].status_of(Day::Mon), DayStatus::Done);
        assert_eq!(saved.tasks[0].completion_status, CompletionStatus::Completed);
    }

    #[test]
    fn test_failed_mutation_leaves_store_untouched() {
        let (_dir, path, mut db) = store_with_task();
        cmd_mark(&mut db, &path, 1, Day::Wed, MarkAs::Done, None).unwrap();
        let before = db.tasks[0].clone();
        assert!(cmd_plan(&mut db, &path, 1, vec!["fri,xyz".into()], true).is_err());
        assert!(cmd_mark(&mut db, &path, 1, Day::Tue, MarkAs::Done, None).is_err());
        // Monday unplans fine but Wednesday is marked, so the batch rolls back.
        assert!(cmd_plan(&mut db, &path, 1, vec!["mon,wed".into()], false).is_err());
        assert_eq!(db.tasks[0], before);
        assert_eq!(Database::load(&path).unwrap().tasks[0], before);
    }

    #[test]
    fn test_cause_requires_not_done() {
        let (_dir, path, mut db) = store_with_task();
        assert!(cmd_cause(&mut db, &path, 1, Some("Chuva".into()), false).is_err());
        cmd_mark(&mut db, &path, 1, Day::Wed, MarkAs::NotDone, Some("Chuva".into())).unwrap();
        assert_eq!(db.tasks[0].cause.as_deref(), Some("Chuva"));
        cmd_cause(&mut db, &path, 1, None, true).unwrap();
        assert_eq!(db.tasks[0].cause, None);
    }

    #[test]
    fn test_delete_unknown_id_is_error() {
        let (_dir, path, mut db) = store_with_task();
        assert!(cmd_delete(&mut db, &path, vec![1, 99]).is_err());
        assert_eq!(db.tasks.len(), 1);
        cmd_delete(&mut db, &path, vec![1]).unwrap();
        assert!(Database::load(&path).unwrap().tasks.is_empty());
    }

    #[test]
    fn test_failed_save_keeps_memory_in_sync_with_disk() {
        let (dir, _path, mut db) = store_with_task();
        let unwritable = dir.path().join("missing").join("obra_tasks.json");
        let before = db.tasks.clone();

        assert!(cmd_mark(&mut db, &unwritable, 1, Day::Mon, MarkAs::Done, None).is_err());
        assert!(cmd_delete(&mut db, &unwritable, vec![1]).is_err());
        let added = cmd_add(
            &mut db,
            &unwritable,
            "Reboco".into(),
            vec!["tue".into()],
            None,
            None,
            None,
            None,
            None,
            None,
        );
        assert!(added.is_err());
        assert_eq!(db.tasks, before);
    }

    #[test]
    fn test_trend_rejects_span_past_calendar_start() {
        let db = Database::default();
        assert!(cmd_trend(&db, Some("2024-03-07".into()), 100_000_000, true).is_err());
        assert!(cmd_trend(&db, Some("2024-03-07".into()), usize::MAX, true).is_err());
        assert!(cmd_trend(&db, Some("100000000w ago".into()), 1, true).is_err());
    }

    #[test]
    fn test_backup_copies_store() {
        let (dir, path, _db) = store_with_task();
        let backup = create_backup(&path).unwrap();
        assert!(Path::new(&backup).starts_with(dir.path().join("backup")));
        assert_eq!(fs::read_to_string(&backup).unwrap(), fs::read_to_string(&path).unwrap());
    }
}
