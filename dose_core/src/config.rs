//! Configuration file support for doselog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/doselog/config.toml`.
//! These are the user's settings: medication defaults, reminder preferences
//! and display units. None of them change how adherence is computed.

use crate::{Error, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub medication: MedicationConfig,

    #[serde(default)]
    pub reminders: ReminderConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Defaults applied to newly logged injections
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MedicationConfig {
    #[serde(default = "default_medication_name")]
    pub name: String,

    #[serde(default = "default_dose_mg")]
    pub default_dose_mg: f64,

    #[serde(default = "default_site")]
    pub default_site: Option<String>,
}

impl Default for MedicationConfig {
    fn default() -> Self {
        Self {
            name: default_medication_name(),
            default_dose_mg: default_dose_mg(),
            default_site: default_site(),
        }
    }
}

/// Reminder preferences
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Local time of day, `HH:MM`
    #[serde(default = "default_reminder_time")]
    pub time: String,

    /// How many days before the projected shot the reminder fires
    #[serde(default = "default_lead_days")]
    pub lead_days: u32,

    #[serde(default = "default_reminder_message")]
    pub message: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time: default_reminder_time(),
            lead_days: default_lead_days(),
            message: default_reminder_message(),
        }
    }
}

impl ReminderConfig {
    /// Parse the configured time of day
    pub fn time_of_day(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.time.trim(), "%H:%M").map_err(|e| {
            Error::Config(format!("Invalid reminder time '{}': {}", self.time, e))
        })
    }
}

/// Display preferences
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    #[serde(default)]
    pub use_metric_system: bool,

    /// Names of user-defined wellness metrics offered when logging
    #[serde(default)]
    pub custom_metrics: Vec<String>,
}

impl DisplayConfig {
    pub fn weight_unit(&self) -> &'static str {
        if self.use_metric_system {
            "kg"
        } else {
            "lbs"
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("doselog")
}

fn default_medication_name() -> String {
    "Ozempic".into()
}

fn default_dose_mg() -> f64 {
    1.0
}

fn default_site() -> Option<String> {
    Some("Stomach".into())
}

fn default_true() -> bool {
    true
}

fn default_reminder_time() -> String {
    "09:00".into()
}

fn default_lead_days() -> u32 {
    1
}

fn default_reminder_message() -> String {
    "Time to prepare for your GLP-1 shot tomorrow".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("doselog").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check settings for values that would break logging or reminders
    ///
    /// Returns a list of human-readable problems; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.medication.name.trim().is_empty() {
            errors.push("Medication name is empty".to_string());
        }
        if !self.medication.default_dose_mg.is_finite() || self.medication.default_dose_mg <= 0.0
        {
            errors.push(format!(
                "Default dose must be positive, got {}",
                self.medication.default_dose_mg
            ));
        }
        if let Err(e) = self.reminders.time_of_day() {
            errors.push(e.to_string());
        }
        for name in &self.display.custom_metrics {
            if name.trim().is_empty() {
                errors.push("Custom metric has empty name".to_string());
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.medication.name, "Ozempic");
        assert_eq!(config.medication.default_dose_mg, 1.0);
        assert_eq!(config.medication.default_site.as_deref(), Some("Stomach"));
        assert!(config.reminders.enabled);
        assert_eq!(config.reminders.lead_days, 1);
        assert!(!config.display.use_metric_system);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.medication.name, parsed.medication.name);
        assert_eq!(config.reminders.time, parsed.reminders.time);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[medication]
name = "Mounjaro"

[display]
use_metric_system = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.medication.name, "Mounjaro");
        assert_eq!(config.medication.default_dose_mg, 1.0); // default
        assert_eq!(config.display.weight_unit(), "kg");
        assert_eq!(config.reminders.time, "09:00"); // default
    }

    #[test]
    fn test_validate_reports_bad_values() {
        let mut config = Config::default();
        config.medication.default_dose_mg = 0.0;
        config.reminders.time = "9am".into();

        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("Default dose")));
        assert!(errors.iter().any(|e| e.contains("reminder time")));
    }

    #[test]
    fn test_save_and_load_from_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.reminders.lead_days = 2;
        config.display.custom_metrics = vec!["steps".into()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.reminders.lead_days, 2);
        assert_eq!(loaded.display.custom_metrics, vec!["steps".to_string()]);
    }
}
