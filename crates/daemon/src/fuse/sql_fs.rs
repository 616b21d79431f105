//! FUSE filesystem over the query engine
//!
//! fuser hands out inode-based requests on its session thread. Each request
//! is resolved to a catalog path through the inode table and forwarded to
//! the engine; async engine calls are driven with the runtime handle.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use libc::c_int;
use tokio::runtime::Handle;

use common::{AccessMode, Attributes, Engine, FsError, OpenMode};

use super::InodeTable;

/// Attribute/entry cache lifetime handed to the kernel
const TTL: Duration = Duration::from_secs(1);

const BLOCK_SIZE: u32 = 512;

pub struct SqlFs {
    engine: Arc<Engine>,
    runtime: Handle,
    inodes: InodeTable,
    uid: u32,
    gid: u32,
    next_fh: u64,
}

impl SqlFs {
    pub fn new(engine: Arc<Engine>, runtime: Handle) -> Self {
        // SAFETY: getuid/getgid cannot fail and touch no memory
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self {
            engine,
            runtime,
            inodes: InodeTable::new(),
            uid,
            gid,
            next_fh: 1,
        }
    }

    fn file_attr(&self, ino: u64, attr: Attributes) -> FileAttr {
        let now = SystemTime::now();
        FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(BLOCK_SIZE as u64),
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
            kind: file_type(attr.meta.file_type),
            perm: attr.meta.perm,
            nlink: attr.meta.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    /// Attributes of `path`, allocating its inode on success
    fn entry(&mut self, path: &str) -> Result<FileAttr, FsError> {
        let attr = self.engine.attributes(path)?;
        let ino = self.inodes.ensure(path);
        Ok(self.file_attr(ino, attr))
    }

    fn path(&self, ino: u64) -> Result<String, FsError> {
        self.inodes
            .path(ino)
            .map(str::to_string)
            .ok_or(FsError::NotFound)
    }

    fn child(&self, parent: u64, name: &OsStr) -> Result<String, FsError> {
        let name = name
            .to_str()
            .ok_or_else(|| FsError::InvalidArgument("name is not valid UTF-8".to_string()))?;
        self.inodes.child_path(parent, name).ok_or(FsError::NotFound)
    }

    fn create_link(
        &mut self,
        parent: u64,
        name: &OsStr,
        target: &Path,
    ) -> Result<FileAttr, FsError> {
        let path = self.child(parent, name)?;
        let text = target
            .to_str()
            .ok_or_else(|| FsError::InvalidArgument("query is not valid UTF-8".to_string()))?;
        self.engine.create_link(&path, text)?;
        self.entry(&path)
    }

    fn dir_entries(&mut self, ino: u64) -> Result<Vec<(u64, FileType, String)>, FsError> {
        let path = self.path(ino)?;
        let names = self.engine.list_directory(&path)?;

        let parent_ino = self
            .inodes
            .inode(&common::path::parent(&path))
            .unwrap_or(InodeTable::ROOT);

        let mut entries = Vec::with_capacity(names.len() + 2);
        entries.push((ino, FileType::Directory, ".".to_string()));
        entries.push((parent_ino, FileType::Directory, "..".to_string()));

        for name in names {
            let child = common::path::join(&path, &name);
            // a query may be removed between listing and stat
            let Ok(attr) = self.engine.attributes(&child) else {
                continue;
            };
            let child_ino = self.inodes.ensure(&child);
            entries.push((child_ino, file_type(attr.meta.file_type), name));
        }

        Ok(entries)
    }
}

impl Filesystem for SqlFs {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let result = self.child(parent, name).and_then(|path| self.entry(&path));
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let result = self
            .path(ino)
            .and_then(|path| self.engine.attributes(&path));
        match result {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(ino, attr)),
            Err(e) => reply.error(errno(&e)),
        }
    }

    /// Truncation and mode changes are accepted and ignored
    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        _size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        self.getattr(req, ino, None, reply);
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let result = self.path(ino).and_then(|path| self.engine.read_link(&path));
        match result {
            Ok(text) => reply.data(text.as_bytes()),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        match self.create_link(parent, link_name, target) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => {
                tracing::debug!(error = %e, "symlink rejected");
                reply.error(errno(&e))
            }
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self
            .child(parent, name)
            .and_then(|path| self.engine.unlink(&path));
        match result {
            Ok(removed) => {
                for path in &removed {
                    self.inodes.remove(path);
                }
                reply.ok()
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let path = match self.path(ino) {
            Ok(path) => path,
            Err(e) => return reply.error(errno(&e)),
        };
        let mode = open_mode(flags);

        match self.runtime.block_on(self.engine.open(&path, mode)) {
            Ok(()) => {
                let fh = self.next_fh;
                self.next_fh += 1;
                // results have no size until opened; never trust the page cache
                reply.opened(fh, fuser::consts::FOPEN_DIRECT_IO);
            }
            Err(e) => {
                tracing::debug!(path = %path, ?mode, error = %e, "open failed");
                reply.error(errno(&e))
            }
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            return reply.error(libc::EINVAL);
        };
        let result = self
            .path(ino)
            .and_then(|path| self.engine.read(&path, size as usize, offset));
        match result {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let path = match self.path(ino) {
            Ok(path) => path,
            Err(e) => return reply.error(errno(&e)),
        };
        let offset = u64::try_from(offset).unwrap_or(0);

        match self.runtime.block_on(self.engine.write(&path, data, offset)) {
            Ok(written) => reply.written(written as u32),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "write failed");
                reply.error(errno(&e))
            }
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        let path = match self.path(ino) {
            Ok(path) => path,
            Err(e) => return reply.error(errno(&e)),
        };

        match self.runtime.block_on(self.engine.close(&path)) {
            Ok(()) => reply.ok(),
            // unlinked while open
            Err(FsError::NotFound) => reply.ok(),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "close failed");
                reply.error(errno(&e))
            }
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let entries = match self.dir_entries(ino) {
            Ok(entries) => entries,
            Err(e) => return reply.error(errno(&e)),
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (child_ino, kind, name)) in entries.into_iter().enumerate().skip(skip) {
            // buffer full
            if reply.add(child_ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }
}

fn file_type(file_type: common::FileType) -> FileType {
    match file_type {
        common::FileType::Directory => FileType::Directory,
        common::FileType::Symlink => FileType::Symlink,
        common::FileType::RegularFile => FileType::RegularFile,
    }
}

/// Translate open(2) flags into the engine's open mode
pub fn open_mode(flags: i32) -> OpenMode {
    let access = match flags & libc::O_ACCMODE {
        libc::O_WRONLY => AccessMode::WriteOnly,
        libc::O_RDWR => AccessMode::ReadWrite,
        _ => AccessMode::ReadOnly,
    };
    OpenMode {
        access,
        append: flags & libc::O_APPEND != 0,
    }
}

pub fn errno(err: &FsError) -> c_int {
    match err {
        FsError::NotFound => libc::ENOENT,
        FsError::PermissionDenied => libc::EACCES,
        FsError::BadFileDescriptor => libc::EBADF,
        FsError::AlreadyExists => libc::EEXIST,
        FsError::CatalogUnavailable(_) => libc::EIO,
        FsError::Database(_) => libc::EACCES,
        FsError::NotADirectory => libc::ENOTDIR,
        FsError::InvalidArgument(_) => libc::EINVAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_mode() {
        assert_eq!(open_mode(libc::O_RDONLY), OpenMode::READ_ONLY);
        assert_eq!(open_mode(libc::O_WRONLY), OpenMode::WRITE_ONLY);
        assert_eq!(open_mode(libc::O_RDWR), OpenMode::READ_WRITE);
        assert_eq!(
            open_mode(libc::O_WRONLY | libc::O_APPEND | libc::O_CREAT),
            OpenMode::WRITE_ONLY.with_append()
        );
    }

    #[test]
    fn test_errno() {
        assert_eq!(errno(&FsError::NotFound), libc::ENOENT);
        assert_eq!(errno(&FsError::PermissionDenied), libc::EACCES);
        assert_eq!(errno(&FsError::Database("gone".into())), libc::EACCES);
        assert_eq!(errno(&FsError::BadFileDescriptor), libc::EBADF);
        assert_eq!(errno(&FsError::AlreadyExists), libc::EEXIST);
        assert_eq!(errno(&FsError::NotADirectory), libc::ENOTDIR);
    }

    #[test]
    fn test_file_type() {
        assert_eq!(file_type(common::FileType::Symlink), FileType::Symlink);
        assert_eq!(file_type(common::FileType::Directory), FileType::Directory);
    }
}
