//! Observer Settings
//!
//! JSON settings file for a service config type. A missing file is created
//! with the type's defaults; missing keys in an existing file fall back to
//! defaults through `#[serde(default)]` on the config type.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use observer_keystore::default_config_dir_for;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// A config value together with the file it was loaded from.
#[derive(Debug)]
pub struct Settings<T> {
    pub config: T,
    path: PathBuf,
}

impl<T: Serialize + DeserializeOwned + Default> Settings<T> {
    /// Load from `custom_path` or the service's default location, writing
    /// defaults first if nothing is there yet.
    pub fn load_or_default(service: &str, custom_path: Option<&Path>) -> Result<Self> {
        let path = custom_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_settings_path(service));

        if !path.exists() {
            debug!("Writing default settings to {}", path.display());
            let settings = Self {
                config: T::default(),
                path,
            };
            settings.save()?;
            return Ok(settings);
        }

        debug!("Loading settings from {}", path.display());
        let content = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Self { config, path })
    }

    pub fn save(&self) -> Result<()> {
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.path, content).map_err(write_err)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Default settings file for a service.
pub fn default_settings_path(service: &str) -> PathBuf {
    default_config_dir_for(service).join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct TestConfig {
        name: String,
        value: u32,
    }

    impl Default for TestConfig {
        fn default() -> Self {
            Self {
                name: "observer".into(),
                value: 7,
            }
        }
    }

    #[test]
    fn test_settings_created_with_defaults() {
        let dir = std::env::temp_dir().join("observer-settings-test");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("settings.json");

        let settings: Settings<TestConfig> =
            Settings::load_or_default("test", Some(&path)).unwrap();
        assert_eq!(settings.config, TestConfig::default());
        assert!(path.exists());
        assert_eq!(settings.path(), path.as_path());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_settings_save_and_reload() {
        let dir = std::env::temp_dir().join("observer-settings-test-save");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("settings.json");

        let mut settings: Settings<TestConfig> =
            Settings::load_or_default("test", Some(&path)).unwrap();
        settings.config.value = 42;
        settings.save().unwrap();

        let loaded: Settings<TestConfig> =
            Settings::load_or_default("test", Some(&path)).unwrap();
        assert_eq!(loaded.config.value, 42);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = std::env::temp_dir().join("observer-settings-test-partial");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(&path, r#"{"value": 3}"#).unwrap();

        let loaded: Settings<TestConfig> =
            Settings::load_or_default("test", Some(&path)).unwrap();
        assert_eq!(loaded.config.name, "observer");
        assert_eq!(loaded.config.value, 3);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = std::env::temp_dir().join("observer-settings-test-bad");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(&path, "not json").unwrap();

        let result: Result<Settings<TestConfig>> = Settings::load_or_default("test", Some(&path));
        assert!(matches!(result, Err(SettingsError::Parse { .. })));

        let _ = fs::remove_dir_all(&dir);
    }
}
