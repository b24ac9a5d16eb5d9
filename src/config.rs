//! Optional `config.toml` in the data directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pcp::Labels;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Used when neither `RUST_LOG` nor `--log-level` is given.
    pub log_level: String,
    /// Site opened when `--site` is not passed.
    pub default_site: String,
    pub labels: Labels,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            default_site: "default".to_string(),
            labels: Labels::default(),
        }
    }
}

/// Resolve the data directory: explicit override, then `$PCP_HOME`, then `~/.pcp`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Ok(p) = std::env::var("PCP_HOME") {
        if !p.trim().is_empty() {
            return PathBuf::from(p);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".pcp")
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

pub fn load_config(data_dir: &Path) -> Result<Config> {
    let p = config_path(data_dir);
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(data_dir: &Path, cfg: &Config) -> Result<()> {
    let p = config_path(data_dir);
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Write the default config unless one exists. Returns whether a file was written.
pub fn init_config(data_dir: &Path) -> Result<bool> {
    if config_path(data_dir).exists() {
        return Ok(false);
    }
    save_config(data_dir, &Config::default())?;
    Ok(true)
}
