//! sqlfs daemon: the MySQL client, configuration and FUSE adapter around
//! the `common` query engine.

pub mod config;
pub mod database;
#[cfg(feature = "fuse")]
pub mod fuse;
pub mod process;

pub use config::{Config, ConfigError, LogConfig, MountConfig};
pub use database::{ConnectOptions, MySqlClient};
pub use process::{init_logging, run, start_engine};
