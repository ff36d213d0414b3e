//! Application configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::Filter;

/// Failure while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// App configuration, loadable from a YAML file.
///
/// Every field has a default, so a config file only needs the keys it wants
/// to override. CLI flags override file values in turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Camera device index
    pub camera_index: u32,
    /// Capture width hint
    pub capture_width: u32,
    /// Capture height hint
    pub capture_height: u32,
    /// Directory where saved photos land
    pub save_dir: PathBuf,
    /// Filter selected at startup. Unknown identifiers fall back to none.
    pub default_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            capture_width: 1280,
            capture_height: 720,
            save_dir: PathBuf::from("."),
            default_filter: "none".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// The startup filter this configuration selects.
    pub fn startup_filter(&self) -> Filter {
        Filter::parse(&self.default_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.camera_index, 0);
        assert_eq!(config.capture_width, 1280);
        assert_eq!(config.capture_height, 720);
        assert_eq!(config.startup_filter(), Filter::None);
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_filter: sepia").unwrap();
        writeln!(file, "camera_index: 2").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.camera_index, 2);
        assert_eq!(config.capture_width, 1280);
        assert_eq!(config.startup_filter(), Filter::Sepia);
    }

    #[test]
    fn test_unknown_filter_id_resolves_to_none() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_filter: glitter").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.startup_filter(), Filter::None);
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "camera_index: [not a number").unwrap();

        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
