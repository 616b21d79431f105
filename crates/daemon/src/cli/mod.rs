use std::path::PathBuf;

use clap::Parser;

use sqlfs_daemon::Config;

/// Mount a MySQL server's databases and tables as a filesystem
///
/// Create a symlink inside a table directory whose target is a SQL
/// statement; the file named by that statement yields its result.
/// The link's extension (.csv, .json, ...) selects the output format.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlfs", version, about, long_about = None)]
pub struct Args {
    /// Directory to mount the catalog on
    pub mountpoint: PathBuf,

    /// MySQL server host
    #[arg(short = 'H', long, env = "SQLFS_HOST")]
    pub host: Option<String>,

    /// MySQL server port
    #[arg(short = 'P', long, env = "SQLFS_PORT")]
    pub port: Option<u16>,

    /// MySQL user
    #[arg(short = 'u', long, env = "SQLFS_USER")]
    pub user: Option<String>,

    /// MySQL password
    #[arg(short = 'p', long, env = "SQLFS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Config file (defaults to <config dir>/sqlfs/config.toml when present)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `sqlfs_daemon=trace`
    #[arg(long)]
    pub log_level: Option<String>,

    /// Also write logs to daily-rotated files in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Allow other users to access the mount
    #[arg(long)]
    pub allow_other: bool,

    /// Add a `count` query link to every table
    #[arg(long)]
    pub count_links: bool,
}

impl Args {
    /// Overlay command-line values on a loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.database.host = host.clone();
        }
        if let Some(port) = self.port {
            config.database.port = port;
        }
        if let Some(user) = &self.user {
            config.database.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.database.password = password.clone();
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log.dir = Some(dir.clone());
        }
        if self.allow_other {
            config.mount.allow_other = true;
        }
        if self.count_links {
            config.catalog.count_links = true;
        }
    }
}
