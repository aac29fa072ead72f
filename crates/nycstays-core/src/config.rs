use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

pub const REGISTRY_ROOT_ENV: &str = "NYCSTAYS_REGISTRY_ROOT";
pub const CONFIG_PATH_ENV: &str = "NYCSTAYS_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "nycstays.toml";
const DEFAULT_REGISTRY_ROOT: &str = "registry";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub registry_root: PathBuf,
}

impl Settings {
    /// Resolve settings for one invocation: the `NYCSTAYS_REGISTRY_ROOT`
    /// environment variable wins, then a TOML settings file
    /// (`NYCSTAYS_CONFIG` or `./nycstays.toml`), then `./registry`.
    pub fn load() -> Result<Self> {
        if let Ok(root) = std::env::var(REGISTRY_ROOT_ENV) {
            return Ok(Settings {
                registry_root: PathBuf::from(root),
            });
        }

        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        if config_path.exists() {
            return Self::from_file(&config_path);
        }

        Ok(Settings {
            registry_root: PathBuf::from(DEFAULT_REGISTRY_ROOT),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let settings = toml::from_str(text)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_registry_root_from_toml() {
        let settings = Settings::from_toml("registry_root = \"/data/registry\"").unwrap();
        assert_eq!(settings.registry_root, PathBuf::from("/data/registry"));
    }

    #[test]
    fn rejects_settings_without_registry_root() {
        assert!(Settings::from_toml("").is_err());
    }
}
