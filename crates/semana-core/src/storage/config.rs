//! TOML-based application configuration.
//!
//! Stores the user's planning preferences:
//! - Work days and the daily work-hour window
//! - Daily task goal
//! - Energy-hours schedule (which hours suit high/medium/low energy work)
//! - Server settings for the functions service
//!
//! Configuration is stored at `~/.config/semana/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::task::EnergyLevel;

/// Hours of the day suited to each energy level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnergyHours {
    #[serde(default = "default_high_hours")]
    pub high: Vec<u8>,
    #[serde(default = "default_medium_hours")]
    pub medium: Vec<u8>,
    #[serde(default = "default_low_hours")]
    pub low: Vec<u8>,
}

impl EnergyHours {
    /// Candidate hours for an energy level.
    pub fn for_level(&self, level: EnergyLevel) -> &[u8] {
        match level {
            EnergyLevel::High => &self.high,
            EnergyLevel::Medium => &self.medium,
            EnergyLevel::Low => &self.low,
        }
    }
}

impl Default for EnergyHours {
    fn default() -> Self {
        Self {
            high: default_high_hours(),
            medium: default_medium_hours(),
            low: default_low_hours(),
        }
    }
}

/// Weekly planning preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannerPreferences {
    /// Work days as ISO weekday numbers (1 = Monday .. 7 = Sunday)
    #[serde(default = "default_work_days")]
    pub work_days: Vec<u8>,
    #[serde(default = "default_work_start")]
    pub work_start_hour: u8,
    #[serde(default = "default_work_end")]
    pub work_end_hour: u8,
    /// Target number of tasks per work day
    #[serde(default = "default_daily_goal")]
    pub daily_task_goal: u32,
    #[serde(default)]
    pub energy_hours: EnergyHours,
}

impl PlannerPreferences {
    /// Width of the configured work window in hours.
    pub fn daily_window_hours(&self) -> f64 {
        self.work_end_hour.saturating_sub(self.work_start_hour) as f64
    }

    /// Whether the user changed anything from the defaults.
    pub fn is_customized(&self) -> bool {
        *self != Self::default()
    }
}

impl Default for PlannerPreferences {
    fn default() -> Self {
        Self {
            work_days: default_work_days(),
            work_start_hour: default_work_start(),
            work_end_hour: default_work_end(),
            daily_task_goal: default_daily_goal(),
            energy_hours: EnergyHours::default(),
        }
    }
}

/// Functions-service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "127.0.0.1:8787"
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Bearer token required by the function routes; unset disables the service
    #[serde(default)]
    pub api_token: Option<String>,
    /// User the service operates on behalf of
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api_token: None,
            user_id: default_user_id(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/semana/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub planner: PlannerPreferences,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Path of the configuration file.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be determined.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/semana"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, or defaults when the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    /// Load from an explicit path (used by tests).
    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Save the configuration.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        self.save_to(&path)
    }

    /// Save to an explicit path (used by tests).
    pub fn save_to(&self, path: &PathBuf) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })
    }
}

// Default functions
fn default_work_days() -> Vec<u8> {
    vec![1, 2, 3, 4, 5]
}
fn default_work_start() -> u8 {
    9
}
fn default_work_end() -> u8 {
    17
}
fn default_daily_goal() -> u32 {
    3
}
fn default_high_hours() -> Vec<u8> {
    vec![9, 10, 11]
}
fn default_medium_hours() -> Vec<u8> {
    vec![12, 13, 15, 16]
}
fn default_low_hours() -> Vec<u8> {
    vec![17, 18, 19]
}
fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}
fn default_user_id() -> String {
    "local".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = PlannerPreferences::default();
        assert_eq!(prefs.work_days, vec![1, 2, 3, 4, 5]);
        assert_eq!(prefs.daily_window_hours(), 8.0);
        assert!(!prefs.is_customized());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.planner.daily_task_goal = 5;
        config.planner.work_days = vec![1, 3, 5];
        config.server.api_token = Some("secreto".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.planner.daily_task_goal, 5);
        assert_eq!(loaded.planner.work_days, vec![1, 3, 5]);
        assert_eq!(loaded.server.api_token.as_deref(), Some("secreto"));
        assert!(loaded.planner.is_customized());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(!config.planner.is_customized());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[planner]\ndaily_task_goal = 4\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.planner.daily_task_goal, 4);
        assert_eq!(config.planner.work_start_hour, 9);
    }

    #[test]
    fn test_energy_hours_lookup() {
        let hours = EnergyHours::default();
        assert_eq!(hours.for_level(crate::task::EnergyLevel::High), &[9, 10, 11]);
    }
}
