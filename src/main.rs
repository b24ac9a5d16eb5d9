//! # pcp - weekly site planning CLI
//!
//! Register the week's tasks per construction site, mark each planned day as
//! done or not done, and report the Percentage of Plan Completed (PCP) with
//! discipline and cause breakdowns.
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a site and plan a task for Monday and Wednesday
//! pcp site new "Torre Sul"
//! pcp -s torre_sul add "Alvenaria 3º pavimento" -d mon,wed --discipline Civil
//!
//! # Daily check-in
//! pcp -s torre_sul mark 1 mon done
//! pcp -s torre_sul mark 1 wed not-done --cause "Chuva"
//!
//! # Weekly report
//! pcp -s torre_sul pcp
//! pcp -s torre_sul pcp --week "last week" --json
//! ```
//!
//! Data is stored in `~/.pcp/` (or `$PCP_HOME`) with each site as a separate
//! `<site>_tasks.json` file. An optional `config.toml` there sets the default
//! site, log level and the sentinel labels used in reports.

use std::path::Path;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod cmd;

use cli::Cli;
use cmd::*;
use weekly_pcp::config::{load_config, resolve_data_dir, Config};
use weekly_pcp::db::Database;
use weekly_pcp::site::Site;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir.as_deref());

    let cfg = match load_config(&data_dir) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    init_tracing(cli.log_level.as_deref().unwrap_or(&cfg.log_level));

    if let Err(e) = run(cli, &data_dir, &cfg) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, data_dir: &Path, cfg: &Config) -> anyhow::Result<()> {
    // Commands that don't need a task store.
    match cli.command {
        Commands::Completions { shell } => {
            cmd_completions(shell);
            return Ok(());
        }
        Commands::Config { action } => return cmd_config(data_dir, cfg, action),
        Commands::Sites => return cmd_sites(data_dir),
        Commands::Site { action } => {
            std::fs::create_dir_all(data_dir)?;
            return cmd_site(data_dir, action);
        }
        _ => {}
    }

    let db_path = match cli.db {
        Some(p) => p,
        None => {
            std::fs::create_dir_all(data_dir)?;
            let name = cli.site.as_deref().unwrap_or(&cfg.default_site);
            Site::new(name, data_dir).file_path
        }
    };

    if let Commands::Backup = cli.command {
        return cmd_backup(&db_path);
    }

    let mut db = Database::load(&db_path)?;

    match cli.command {
        Commands::Add { description, days, week, item, discipline, location, sector, responsible } =>
            cmd_add(&mut db, &db_path, description, days, week, item, discipline, location, sector, responsible),

        Commands::List { week, chip, search, sort, limit, json } =>
            cmd_list(&db, week, chip, search, sort, limit, json),

        Commands::View { id, json } => cmd_view(&db, id, json),

        Commands::Mark { id, day, status, cause } => cmd_mark(&mut db, &db_path, id, day, status, cause),

        Commands::Toggle { id, day } => cmd_toggle(&mut db, &db_path, id, day),

        Commands::Cause { id, cause, clear } => cmd_cause(&mut db, &db_path, id, cause, clear),

        Commands::Plan { id, days } => cmd_plan(&mut db, &db_path, id, days, true),

        Commands::Unplan { id, days } => cmd_plan(&mut db, &db_path, id, days, false),

        Commands::Update { id, description, item, discipline, location, sector, responsible } =>
            cmd_update(&mut db, &db_path, id, description, item, discipline, location, sector, responsible),

        Commands::Delete { ids } => cmd_delete(&mut db, &db_path, ids),

        Commands::Pcp { week, chip, search, json } => cmd_pcp(&db, &cfg.labels, week, chip, search, json),

        Commands::Trend { week, weeks, json } => cmd_trend(&db, week, weeks, json),

        Commands::Weeks => {
            cmd_weeks(&db);
            Ok(())
        }

        Commands::Export { output, week, chip, search } => cmd_export(&db, output, week, chip, search),

        Commands::Completions { .. }
        | Commands::Config { .. }
        | Commands::Sites
        | Commands::Site { .. }
        | Commands::Backup => unreachable!("handled above"),
    }
}
