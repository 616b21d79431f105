//! FUSE filesystem integration for sqlfs
//!
//! This module mounts the query engine so that the catalog can be browsed
//! and queried with ordinary file tools.
//!
//! # Architecture
//!
//! - `SqlFs`: FUSE filesystem implementation using fuser
//! - `InodeTable`: Bidirectional inode ↔ catalog path mapping
//!
//! Mounting spawns fuser's session thread; the returned session unmounts
//! when dropped.

mod inode_table;
mod sql_fs;

use std::path::Path;
use std::sync::Arc;

use fuser::{BackgroundSession, MountOption};
use tokio::runtime::Handle;

use common::Engine;

use crate::config::MountConfig;

pub use inode_table::InodeTable;
pub use sql_fs::{errno, open_mode, SqlFs};

pub const FS_NAME: &str = "sqlfs";

/// Mount options for a catalog mount
pub fn mount_options(config: &MountConfig) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::FSName(FS_NAME.to_string()),
        MountOption::Subtype(FS_NAME.to_string()),
        MountOption::NoDev,
        MountOption::NoSuid,
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }
    options
}

/// Mount `engine` at `mountpoint` on a background session thread
pub fn mount(
    engine: Arc<Engine>,
    mountpoint: &Path,
    config: &MountConfig,
    runtime: Handle,
) -> std::io::Result<BackgroundSession> {
    let options = mount_options(config);
    tracing::info!(mountpoint = %mountpoint.display(), ?options, "mounting catalog");
    fuser::spawn_mount2(SqlFs::new(engine, runtime), mountpoint, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_options() {
        let options = mount_options(&MountConfig::default());
        assert!(options.contains(&MountOption::FSName(FS_NAME.to_string())));
        assert!(!options.contains(&MountOption::AllowOther));

        let options = mount_options(&MountConfig { allow_other: true });
        assert!(options.contains(&MountOption::AllowOther));
    }
}
