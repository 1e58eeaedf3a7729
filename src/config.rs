use std::env;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::positions::{parse_sort_spec, PositionColumn};
use crate::sort_filter::{SortOrder, SyncOptions};
use crate::time::ZonedFormatter;

fn get_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn get_env_bool(key: &str, default: bool) -> bool {
    match get_env(key) {
        None => default,
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"),
    }
}

fn get_env_usize(key: &str, default: usize) -> Result<usize> {
    match get_env(key) {
        None => Ok(default),
        Some(v) => Ok(v
            .parse::<usize>()
            .map_err(|e| anyhow!("{key} invalid int: {e}"))?),
    }
}

fn get_env_string(key: &str, default: &str) -> String {
    get_env(key).unwrap_or_else(|| default.to_string())
}

/// `GRID_DEFAULT_SORT` is read raw so that an explicitly empty value disables
/// the default instead of falling back to it.
fn get_env_raw(key: &str) -> Option<String> {
    env::var(key).ok().map(|s| s.trim().to_string())
}

pub const COOKIE_DISABLED: &str = "off";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Inputs / storage
    pub positions_path: String,
    pub cookie_jar_path: String,

    // Persistence
    pub cookie_name: Option<String>, // None when GRID_COOKIE_NAME=off
    pub sync_search_params: bool,

    // Presentation
    pub timezone: String,
    pub default_sort: Option<String>, // key:asc|desc
    pub latest_only: bool,
    pub row_limit: usize, // 0 = unlimited
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            positions_path: "./data/positions.json".to_string(),
            cookie_jar_path: "./data/cookies.json".to_string(),
            cookie_name: Some("positions_grid".to_string()),
            sync_search_params: true,
            timezone: "UTC".to_string(),
            default_sort: Some("updated:desc".to_string()),
            latest_only: true,
            row_limit: 50,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let cookie_name = get_env_string("GRID_COOKIE_NAME", "positions_grid");
        let cookie_name = if cookie_name.eq_ignore_ascii_case(COOKIE_DISABLED) {
            None
        } else {
            Some(cookie_name)
        };

        let default_sort = match get_env_raw("GRID_DEFAULT_SORT") {
            None => defaults.default_sort.clone(),
            Some(v) if v.is_empty() => None,
            Some(v) => Some(v),
        };

        let s = Self {
            positions_path: get_env_string("GRID_POSITIONS_PATH", &defaults.positions_path),
            cookie_jar_path: get_env_string("GRID_COOKIE_JAR_PATH", &defaults.cookie_jar_path),
            cookie_name,
            sync_search_params: get_env_bool("GRID_SYNC_SEARCH_PARAMS", defaults.sync_search_params),
            timezone: get_env_string("GRID_TIMEZONE", &defaults.timezone),
            default_sort,
            latest_only: get_env_bool("GRID_LATEST_ONLY", defaults.latest_only),
            row_limit: get_env_usize("GRID_ROW_LIMIT", defaults.row_limit)?,
        };

        s.validate()?;
        Ok(s)
    }

    pub fn validate(&self) -> Result<()> {
        if self.positions_path.trim().is_empty() {
            return Err(anyhow!("GRID_POSITIONS_PATH must not be empty"));
        }
        if self.cookie_name.is_some() && self.cookie_jar_path.trim().is_empty() {
            return Err(anyhow!(
                "GRID_COOKIE_JAR_PATH must be set while cookie sync is enabled"
            ));
        }
        if let Some(name) = &self.cookie_name {
            if name.chars().any(|c| c.is_whitespace() || matches!(c, ';' | ',' | '=')) {
                return Err(anyhow!("GRID_COOKIE_NAME is not a valid cookie name (got {name:?})"));
            }
        }
        self.formatter()?;
        self.default_sort()?;
        Ok(())
    }

    pub fn formatter(&self) -> Result<ZonedFormatter> {
        ZonedFormatter::new(&self.timezone).map_err(|e| anyhow!("GRID_TIMEZONE invalid: {e}"))
    }

    pub fn default_sort(&self) -> Result<Option<(PositionColumn, SortOrder)>> {
        self.default_sort
            .as_deref()
            .map(|spec| parse_sort_spec(spec).map_err(|e| anyhow!("GRID_DEFAULT_SORT invalid: {e}")))
            .transpose()
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            cookie_key: self.cookie_name.clone(),
            search_params: self.sync_search_params,
        }
    }
}
