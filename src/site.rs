//! Construction site discovery and per-site task store files.
//!
//! Each site keeps its tasks in its own JSON file inside the data directory,
//! named `<site_name>_tasks.json`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::error::{PlanError, Result};

/// A construction site and the path of its task store.
#[derive(Debug, Clone)]
pub struct Site {
    pub name: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

impl Site {
    pub fn new(display_name: &str, data_dir: &Path) -> Self {
        let name = sanitize_site_name(display_name);
        let file_path = data_dir.join(format!("{}_tasks.json", name));
        Site {
            name,
            display_name: display_name.to_string(),
            file_path,
        }
    }

    /// Recognise a site from its store file name.
    pub fn from_file(file_path: PathBuf) -> Option<Self> {
        let file_name = file_path.file_stem()?.to_str()?;
        let name = file_name.strip_suffix("_tasks")?;
        if name.is_empty() {
            return None;
        }
        Some(Site {
            name: name.to_string(),
            display_name: name.replace('_', " "),
            file_path,
        })
    }

    pub fn create_if_not_exists(&self) -> Result<()> {
        if !self.file_path.exists() {
            Database::default().save(&self.file_path)?;
        }
        Ok(())
    }
}

/// Lowercase, with runs of non-alphanumerics collapsed to one underscore.
pub fn sanitize_site_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// All sites in the data directory, sorted by display name.
pub fn discover_sites(data_dir: &Path) -> Result<Vec<Site>> {
    let mut sites = Vec::new();
    if !data_dir.exists() {
        return Ok(sites);
    }
    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            if let Some(site) = Site::from_file(path) {
                sites.push(site);
            }
        }
    }
    sites.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(sites)
}

pub fn create_site(display_name: &str, data_dir: &Path) -> Result<Site> {
    if sanitize_site_name(display_name).is_empty() {
        return Err(PlanError::InvalidSiteName(display_name.to_string()));
    }
    let site = Site::new(display_name, data_dir);
    if site.file_path.exists() {
        return Err(PlanError::SiteExists(display_name.to_string()));
    }
    site.create_if_not_exists()?;
    Ok(site)
}
