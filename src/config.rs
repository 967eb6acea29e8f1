/*
 * luet-pm - Terminal front-end for the luet package manager.
 * Copyright (C) 2025  luet-pm contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Configuration management with validation and defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{LuetError, LuetResult};

/// Main configuration structure for luet-pm
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name or path of the luet binary
    pub luet_bin: String,

    /// Elevation helper: auto, pkexec, sudo or none
    pub elevation: String,

    /// Run kbuildsycoca6 after packages change
    pub refresh_desktop_cache: bool,

    /// Filesystem locations used by luet
    pub paths: PathsConfig,

    /// Delays between system check steps
    pub pacing: PacingConfig,

    /// Terminal UI configuration
    pub ui: UiConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            luet_bin: "luet".to_string(),
            elevation: "auto".to_string(),
            refresh_desktop_cache: true,
            paths: PathsConfig::default(),
            pacing: PacingConfig::default(),
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Locations of luet's on-disk state
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Package cache measured by `du` and emptied by `luet cleanup`
    pub cache_dir: PathBuf,

    /// Timestamp written by `luet repo update`
    pub sync_file: PathBuf,

    /// Root of the synced repository trees
    pub repos_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("/var/luet/db/packages/"),
            sync_file: PathBuf::from("/var/luet/db/repos/luet/SYNCTIME"),
            repos_dir: PathBuf::from("/var/luet/db/repos"),
        }
    }
}

/// Pauses inserted by the system check so the log stays readable
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// After every logged command result
    pub log_ms: u64,
    /// Before the repair sequence starts
    pub repair_start_ms: u64,
    /// Before each reinstall
    pub before_reinstall_ms: u64,
    /// After each reinstall
    pub after_reinstall_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            log_ms: 50,
            repair_start_ms: 2000,
            before_reinstall_ms: 2000,
            after_reinstall_ms: 1000,
        }
    }
}

impl PacingConfig {
    /// No pauses at all
    pub fn none() -> Self {
        Self {
            log_ms: 0,
            repair_start_ms: 0,
            before_reinstall_ms: 0,
            after_reinstall_ms: 0,
        }
    }

    pub fn log(&self) -> Duration {
        Duration::from_millis(self.log_ms)
    }

    pub fn repair_start(&self) -> Duration {
        Duration::from_millis(self.repair_start_ms)
    }

    pub fn before_reinstall(&self) -> Duration {
        Duration::from_millis(self.before_reinstall_ms)
    }

    pub fn after_reinstall(&self) -> Duration {
        Duration::from_millis(self.after_reinstall_ms)
    }
}

/// Terminal UI configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Output log lines kept in memory
    pub log_lines: usize,

    /// Redraw / spinner interval
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            log_lines: 2000,
            tick_rate_ms: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file used while the TUI owns the terminal
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

const ELEVATION_CHOICES: &[&str] = &["auto", "pkexec", "sudo", "none"];

impl Config {
    /// Load configuration from multiple sources with precedence:
    /// 1. /etc/luet-pm/config.toml (system-wide)
    /// 2. ~/.config/luet-pm/config.toml (user)
    /// 3. an explicit `--config` file
    /// 4. Environment variables (LUET_PM_*)
    pub fn load(explicit: Option<&Path>) -> LuetResult<Self> {
        let mut config = Config::default();

        config = config.merge_file(Path::new("/etc/luet-pm/config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            config = config.merge_file(&config_dir.join("luet-pm").join("config.toml"));
        }

        if let Some(path) = explicit {
            let content = fs::read_to_string(path).map_err(|e| {
                LuetError::filesystem(path.display().to_string(), "cannot read config", e)
            })?;
            let parsed = toml::from_str::<Config>(&content).map_err(|e| LuetError::Config {
                message: format!("{}: {}", path.display(), e),
            })?;
            config = config.merge(parsed);
        }

        config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn merge_file(self, path: &Path) -> Self {
        if !path.exists() {
            return self;
        }
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(parsed) => {
                    debug!(path = %path.display(), "loaded config");
                    self.merge(parsed)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unparsable config");
                    self
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                self
            }
        }
    }

    /// Merge another config into this one (other takes precedence for non-default values)
    fn merge(mut self, other: Config) -> Self {
        let default = Config::default();

        if other.luet_bin != default.luet_bin {
            self.luet_bin = other.luet_bin;
        }
        if other.elevation != default.elevation {
            self.elevation = other.elevation;
        }
        if other.refresh_desktop_cache != default.refresh_desktop_cache {
            self.refresh_desktop_cache = other.refresh_desktop_cache;
        }
        if other.pacing != default.pacing {
            self.pacing = other.pacing;
        }
        if other.logging.level != default.logging.level {
            self.logging.level = other.logging.level;
        }
        if other.logging.file.is_some() {
            self.logging.file = other.logging.file;
        }

        self.paths = self.paths.merge(other.paths);
        self.ui = self.ui.merge(other.ui);

        self
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("LUET_PM_LUET_BIN") {
            self.luet_bin = val;
        }

        if let Ok(val) = std::env::var("LUET_PM_ELEVATION") {
            self.elevation = val.to_lowercase();
        }

        if let Ok(val) = std::env::var("LUET_PM_REFRESH_DESKTOP_CACHE") {
            self.refresh_desktop_cache = val == "1" || val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("LUET_PM_LOG_LEVEL") {
            self.logging.level = val;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> LuetResult<()> {
        if self.luet_bin.trim().is_empty() {
            return Err(LuetError::Config {
                message: "luet_bin must not be empty".to_string(),
            });
        }
        if !ELEVATION_CHOICES.contains(&self.elevation.as_str()) {
            return Err(LuetError::Config {
                message: format!(
                    "elevation must be one of {}, got '{}'",
                    ELEVATION_CHOICES.join(", "),
                    self.elevation
                ),
            });
        }
        if self.ui.log_lines == 0 {
            return Err(LuetError::Config {
                message: "ui.log_lines must be at least 1".to_string(),
            });
        }
        if self.ui.tick_rate_ms == 0 {
            return Err(LuetError::Config {
                message: "ui.tick_rate_ms must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Log file for the TUI, defaulting to the user cache directory
    pub fn tui_log_file(&self) -> Option<PathBuf> {
        self.logging
            .file
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("luet-pm").join("luet-pm.log")))
    }
}

impl PathsConfig {
    fn merge(mut self, other: PathsConfig) -> Self {
        let default = PathsConfig::default();

        if other.cache_dir != default.cache_dir {
            self.cache_dir = other.cache_dir;
        }
        if other.sync_file != default.sync_file {
            self.sync_file = other.sync_file;
        }
        if other.repos_dir != default.repos_dir {
            self.repos_dir = other.repos_dir;
        }

        self
    }
}

impl UiConfig {
    fn merge(mut self, other: UiConfig) -> Self {
        let default = UiConfig::default();

        if other.log_lines != default.log_lines {
            self.log_lines = other.log_lines;
        }
        if other.tick_rate_ms != default.tick_rate_ms {
            self.tick_rate_ms = other.tick_rate_ms;
        }

        self
    }
}
