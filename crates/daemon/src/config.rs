//! Daemon configuration file
//!
//! ```toml
//! [database]
//! host = "localhost"
//! port = 3306
//! user = "reader"
//! password = "secret"
//!
//! [catalog]
//! count_links = true
//!
//! [mount]
//! allow_other = false
//!
//! [log]
//! level = "info"
//! dir = "/var/log/sqlfs"
//! ```
//!
//! Every section and key is optional; command-line flags override whatever
//! the file sets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use common::LoaderOptions;

use crate::database::ConnectOptions;

pub const APP_NAME: &str = "sqlfs";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("missing required config: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: ConnectOptions,
    pub catalog: LoaderOptions,
    pub mount: MountConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Let other users see the mount (needs `user_allow_other` in fuse.conf)
    pub allow_other: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `sqlfs_daemon=debug`
    pub level: String,
    /// Write a daily-rotated log file here as well as to stderr
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl Config {
    /// Default location: `<config dir>/sqlfs/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load `path` if given, else the default file if it exists, else defaults
    ///
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "loading default config file");
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Credentials are mandatory; there is no anonymous mode
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.user.is_empty() {
            return Err(ConfigError::Missing("database user (--user)"));
        }
        if self.database.password.is_empty() {
            return Err(ConfigError::Missing(
                "database password (--password or SQLFS_PASSWORD)",
            ));
        }
        Ok(())
    }
}
