//! Session configuration.
//!
//! Loaded from `config.toml` in the platform config directory. Every
//! section is `#[serde(default)]`, so a partial file only overrides the
//! keys it names.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tab and quota settings
    pub session: SessionConfig,

    /// Where session state is persisted
    pub storage: StorageConfig,

    /// Editing surface settings
    pub surface: SurfaceConfig,
}

impl Config {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from_default_path() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default config: {}", e);
                Self::default()
            }
        }
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("quill").join("config.toml"))
    }

    /// Saves the config to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

/// Tab and quota configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quota granted to a fresh session
    pub default_quota: u64,

    /// Content given to newly created tabs
    pub new_tab_content: String,

    /// How `add_tab` picks names
    pub naming: TabNaming,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_quota: 1000,
            new_tab_content: "// New File\n".to_string(),
            naming: TabNaming::Count,
        }
    }
}

/// Naming strategy for new tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabNaming {
    /// `file<count + 1>.js`; may collide after closes
    #[default]
    Count,
    /// First free `file<N>.js` with `N >= count + 1`
    Monotonic,
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Session file override
    pub path: Option<PathBuf>,

    /// Prefix for persisted keys (`<prefix>-tabs`, ...)
    pub key_prefix: String,
}

impl StorageConfig {
    /// Resolves the session file path.
    pub fn resolve_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join("quill").join("session.json"))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            key_prefix: "editor".to_string(),
        }
    }
}

/// Editing surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Theme the surface starts with
    pub theme: String,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            theme: "vs-dark".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Data directory not found")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.default_quota, 1000);
        assert_eq!(config.session.naming, TabNaming::Count);
        assert_eq!(config.storage.key_prefix, "editor");
        assert_eq!(config.surface.theme, "vs-dark");
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [session]
            default_quota = 50
            naming = "monotonic"
            "#,
        )
        .unwrap();
        assert_eq!(config.session.default_quota, 50);
        assert_eq!(config.session.naming, TabNaming::Monotonic);
        assert_eq!(config.session.new_tab_content, "// New File\n");
    }

    #[test]
    fn test_storage_path_override() {
        let storage = StorageConfig {
            path: Some(PathBuf::from("/tmp/quill-session.json")),
            ..Default::default()
        };
        assert_eq!(
            storage.resolve_path().unwrap(),
            PathBuf::from("/tmp/quill-session.json")
        );
    }
}
