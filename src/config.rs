use crate::ics::{LineEnding, TrimOptions};
use crate::window::{Bound, TrimWindow, parse_bound};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub trim: TrimConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

/// Window bounds as `YYYY-MM-DD` or RFC 3339. Unset bounds fall back to the
/// previous week through the end of the current week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    pub keep_recurring_events: bool,
    pub ignore_invalid_time_zones: bool,
    pub flush_unterminated_events: bool,
    pub verbose_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extension: String,
    pub line_ending: LineEnding,
}

impl Default for TrimConfig {
    fn default() -> Self {
        let options = TrimOptions::default();
        Self {
            keep_recurring_events: options.keep_recurring_events,
            ignore_invalid_time_zones: options.ignore_invalid_time_zones,
            flush_unterminated_events: options.flush_unterminated_events,
            verbose_logs: options.verbose_logs,
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            extension: "ics".to_string(),
            line_ending: LineEnding::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        // If config doesn't exist, create default
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    /// Read an explicit config file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn trim_options(&self) -> TrimOptions {
        TrimOptions {
            keep_recurring_events: self.trim.keep_recurring_events,
            ignore_invalid_time_zones: self.trim.ignore_invalid_time_zones,
            verbose_logs: self.trim.verbose_logs,
            flush_unterminated_events: self.trim.flush_unterminated_events,
            line_ending: self.files.line_ending,
        }
    }

    /// Resolve the configured window, filling unset bounds from the default
    /// window around `today`.
    pub fn window(&self, today: NaiveDate) -> Result<TrimWindow> {
        let fallback = TrimWindow::default_for(today);
        let start = match &self.window.start {
            Some(value) => parse_bound(value, Bound::Start)?,
            None => fallback.start,
        };
        let end = match &self.window.end {
            Some(value) => parse_bound(value, Bound::End)?,
            None => fallback.end,
        };
        TrimWindow::new(start, end)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "icstrim", "icstrim")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}
