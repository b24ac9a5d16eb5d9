use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Weekly site task planner with PCP reporting.
/// Storage defaults to ~/.pcp/<site>_tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "pcp", version, about = "Weekly task planning and PCP reports for construction sites")]
pub struct Cli {
    /// Path to a task store file. Overrides --site.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Data directory holding site stores and config.toml.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Construction site to work on (defaults to `default_site` from config).
    #[arg(long, short, global = true)]
    pub site: Option<String>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
