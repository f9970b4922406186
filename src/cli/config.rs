//! Tool settings for mbrl-jobs
//!
//! TOML-based settings with defaults and validation.
//! Location: ~/.mbrl-jobs/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{ConfigError, Result};
use crate::job::{DefaultSettings, StartState, ValidationSettings};
use crate::workspace::ExportSettings;

/// Complete tool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub defaults: DefaultSettings,
    pub validation: ValidationSettings,
    pub export: ExportSettings,
    pub output: OutputSettings,
}

/// Terminal output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub color: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Settings {
    /// Load settings from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(settings_path) = path {
            Self::load_from_file(&settings_path)
        } else {
            Self::load_default()
        }
    }

    /// Load settings from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Settings(format!("Failed to read settings: {}", e)))?;

        let settings: Settings = toml::from_str(&contents)
            .map_err(|e| ConfigError::Settings(format!("Failed to parse settings: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Settings::default())
    }

    /// Standard settings location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".mbrl-jobs").join("config.toml"))
    }

    /// Validate settings values
    pub fn validate(&self) -> Result<()> {
        let d = &self.defaults;
        if d.save_freq == 0 {
            return Err(ConfigError::Settings(
                "defaults.save_freq must be greater than 0".to_string(),
            ));
        }

        if !(d.hvp_frac > 0.0 && d.hvp_frac <= 1.0) {
            return Err(ConfigError::Settings(format!(
                "defaults.hvp_frac must be in (0, 1], got {}",
                d.hvp_frac
            )));
        }

        d.start_state
            .parse::<StartState>()
            .map_err(|e| ConfigError::Settings(format!("defaults.start_state: {}", e)))?;

        if let Some(total) = self.validation.expected_filter_total {
            if !total.is_finite() {
                return Err(ConfigError::Settings(
                    "validation.expected_filter_total must be finite".to_string(),
                ));
            }
        }

        if self.export.job_data_file.trim().is_empty() {
            return Err(ConfigError::Settings(
                "export.job_data_file must not be empty".to_string(),
            ));
        }

        if self.export.json_indent > 16 {
            return Err(ConfigError::Settings(format!(
                "export.json_indent must be at most 16, got {}",
                self.export.json_indent
            )));
        }

        Ok(())
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Settings(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Settings(format!("Failed to create settings dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Settings(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.defaults.save_freq, 10);
        assert_eq!(settings.defaults.device, "cpu");
        assert_eq!(settings.export.job_data_file, "job_data.json");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let settings: Settings = toml::from_str(
            "[validation]\nexpected_filter_total = 1.5\n\n[defaults]\nsave_freq = 5\n",
        )
        .unwrap();
        assert_eq!(settings.validation.expected_filter_total, Some(1.5));
        assert_eq!(settings.defaults.save_freq, 5);
        assert_eq!(settings.defaults.replay_buffer_size, 1_000_000);
        assert!(settings.output.color);
    }

    #[test]
    fn test_validation_zero_save_freq() {
        let mut settings = Settings::default();
        settings.defaults.save_freq = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_start_state() {
        let mut settings = Settings::default();
        settings.defaults.start_state = "anywhere".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_indent() {
        let mut settings = Settings::default();
        settings.export.json_indent = 64;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut settings = Settings::default();
        settings.validation.strict_keys = true;
        settings.save(&path).unwrap();

        let loaded = Settings::load(Some(path)).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(Settings::load(Some(PathBuf::from("/definitely/not/here.toml"))).is_err());
    }
}
