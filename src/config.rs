//! Application configuration: a small TOML file with serde defaults, plus a
//! `DB_FILE_NAME` environment override for the database location.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bind host for the HTTP gateway.
    pub host: String,
    /// Bind port for the HTTP gateway.
    pub port: u16,
    /// sqlx database url, e.g. `sqlite:local.db`.
    pub database_url: String,
    /// Directory holding the country lookup data files.
    pub data_dir: PathBuf,
    /// Application name used to key runtime sessions.
    pub app_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_url: "sqlite:local.db".to_string(),
            data_dir: PathBuf::from("data"),
            app_name: "sample_app".to_string(),
        }
    }
}

impl Config {
    /// Load from an explicit path, from `./config.toml` when present, or fall
    /// back to defaults. `DB_FILE_NAME` overrides the database url either way.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(db_file) = std::env::var("DB_FILE_NAME") {
            config.database_url = format!("sqlite:{db_file}");
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|error| ConfigError::Load(error.to_string()))
    }
}
