//! Engine configuration

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tabsense_focus::{Enforcer, DEFAULT_BLOCK_PAGE, DEFAULT_INTERNAL_SCHEMES};
use tabsense_tabs::{ClassifierConfig, DEFAULT_HEAVY_SITES};

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Path to the settings database
    pub database_path: PathBuf,
    /// Idle time before a tab shows up as inactive on the dashboard
    #[serde(with = "minutes")]
    pub ui_inactive_threshold: Duration,
    /// Idle time before auto-clean discards a tab
    #[serde(with = "minutes")]
    pub sweep_inactive_threshold: Duration,
    /// Period of the auto-clean alarm
    #[serde(with = "minutes")]
    pub sweep_interval: Duration,
    /// URL fragments marking a tab as heavy
    pub heavy_sites: Vec<String>,
    /// Page blocked tabs are redirected to
    pub block_page_url: String,
    /// Scheme prefixes focus sessions never block
    pub internal_schemes: Vec<String>,
    /// Capacity of the engine's command queue
    pub command_buffer: usize,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("tabsense.db"),
            ui_inactive_threshold: Duration::minutes(30),
            sweep_inactive_threshold: Duration::minutes(20),
            sweep_interval: Duration::minutes(5),
            heavy_sites: DEFAULT_HEAVY_SITES.iter().map(|s| s.to_string()).collect(),
            block_page_url: DEFAULT_BLOCK_PAGE.to_string(),
            internal_schemes: DEFAULT_INTERNAL_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            command_buffer: 64,
        }
    }

    /// Read a JSON config file. A missing file yields the defaults, and
    /// fields absent from the file keep their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;

        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("uiInactiveThreshold", self.ui_inactive_threshold),
            ("sweepInactiveThreshold", self.sweep_inactive_threshold),
            ("sweepInterval", self.sweep_interval),
        ];
        for (name, value) in positive {
            if value <= Duration::zero() {
                return Err(CoreError::Config(format!("{} must be positive", name)));
            }
        }

        if self.block_page_url.trim().is_empty() {
            return Err(CoreError::Config("blockPageUrl cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Classifier settings for the dashboard view
    pub fn ui_classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            inactive_threshold: self.ui_inactive_threshold,
            heavy_sites: self.heavy_sites.clone(),
        }
    }

    pub fn enforcer(&self) -> Enforcer {
        Enforcer::new(self.block_page_url.clone(), self.internal_schemes.clone())
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("TabSense"))
            .unwrap_or_else(|| PathBuf::from(".tabsense"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

/// Durations stored as whole minutes
mod minutes {
    use chrono::Duration;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_minutes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let minutes = i64::deserialize(deserializer)?;
        Duration::try_minutes(minutes)
            .ok_or_else(|| D::Error::custom(format!("{} minutes is out of range", minutes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(PathBuf::from("/data"));
        assert_eq!(config.database_path, PathBuf::from("/data/tabsense.db"));
        assert_eq!(config.ui_inactive_threshold, Duration::minutes(30));
        assert_eq!(config.sweep_inactive_threshold, Duration::minutes(20));
        assert_eq!(config.sweep_interval, Duration::minutes(5));
        assert!(config.heavy_sites.iter().any(|s| s == "zoom.us"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"sweepInactiveThreshold": 45, "heavySites": ["example.org"]}"#,
        )
        .unwrap();

        assert_eq!(config.sweep_inactive_threshold, Duration::minutes(45));
        assert_eq!(config.ui_inactive_threshold, Duration::minutes(30));
        assert_eq!(config.heavy_sites, vec!["example.org"]);
        assert_eq!(config.ui_classifier().heavy_sites, vec!["example.org"]);
    }

    #[test]
    fn test_durations_serialize_as_minutes() {
        let json = serde_json::to_value(Config::new(PathBuf::from("/data"))).unwrap();
        assert_eq!(json["sweepInterval"], 5);
        assert_eq!(json["uiInactiveThreshold"], 30);
    }

    #[test]
    fn test_validate_rejects_non_positive_durations() {
        let mut config = Config::new(PathBuf::from("/data"));
        config.sweep_interval = Duration::zero();
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_out_of_range_minutes_are_an_error() {
        let result = serde_json::from_str::<Config>(r#"{"sweepInterval": 9223372036854775807}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_out_of_range_minutes() {
        let path = std::env::temp_dir().join(format!("tabsense-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"uiInactiveThreshold": -9223372036854775808}"#).unwrap();

        let result = Config::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(CoreError::Serialization(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load("/definitely/not/here/tabsense.json").unwrap();
        assert_eq!(config.sweep_interval, Duration::minutes(5));
    }
}
