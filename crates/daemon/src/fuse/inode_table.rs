//! Inode ↔ catalog path mapping
//!
//! The kernel addresses nodes by 64-bit inode while the catalog is keyed by
//! path. Inodes are handed out on first sight of a path and never reused.

use std::collections::HashMap;

use common::path;

#[derive(Debug)]
pub struct InodeTable {
    by_path: HashMap<String, u64>,
    by_inode: HashMap<u64, String>,
    /// Next inode to hand out; 1 is the root
    next: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// Root inode number (always 1 in FUSE)
    pub const ROOT: u64 = fuser::FUSE_ROOT_ID;

    pub fn new() -> Self {
        let mut table = Self {
            by_path: HashMap::new(),
            by_inode: HashMap::new(),
            next: Self::ROOT + 1,
        };
        table.by_path.insert(path::ROOT.to_string(), Self::ROOT);
        table.by_inode.insert(Self::ROOT, path::ROOT.to_string());
        table
    }

    /// Inode for `path`, allocating one if the path is new
    pub fn ensure(&mut self, path: &str) -> u64 {
        let key = path::normalize(path);
        if let Some(&inode) = self.by_path.get(&key) {
            return inode;
        }

        let inode = self.next;
        self.next += 1;
        self.by_path.insert(key.clone(), inode);
        self.by_inode.insert(inode, key);
        inode
    }

    pub fn inode(&self, path: &str) -> Option<u64> {
        self.by_path.get(&path::normalize(path)).copied()
    }

    pub fn path(&self, inode: u64) -> Option<&str> {
        self.by_inode.get(&inode).map(String::as_str)
    }

    /// Path of the child `name` under directory inode `parent`
    pub fn child_path(&self, parent: u64, name: &str) -> Option<String> {
        self.path(parent).map(|dir| path::join(dir, name))
    }

    /// Drop the mapping for a removed path; the root is never dropped
    pub fn remove(&mut self, path: &str) -> Option<u64> {
        let key = path::normalize(path);
        if key == path::ROOT {
            return None;
        }
        let inode = self.by_path.remove(&key)?;
        self.by_inode.remove(&inode);
        Some(inode)
    }

    pub fn len(&self) -> usize {
        self.by_inode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_inode.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_inode() {
        let table = InodeTable::new();
        assert_eq!(table.inode("/"), Some(InodeTable::ROOT));
        assert_eq!(table.path(InodeTable::ROOT), Some("/"));
    }

    #[test]
    fn test_ensure_is_stable() {
        let mut table = InodeTable::new();

        let orders = table.ensure("/shop/orders");
        assert_eq!(table.ensure("/shop/orders/"), orders);
        let users = table.ensure("/shop/users");

        assert_ne!(orders, users);
        assert_ne!(orders, InodeTable::ROOT);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_child_path() {
        let mut table = InodeTable::new();
        let shop = table.ensure("/shop");

        assert_eq!(
            table.child_path(InodeTable::ROOT, "shop").as_deref(),
            Some("/shop")
        );
        assert_eq!(
            table.child_path(shop, "SELECT 1").as_deref(),
            Some("/shop/SELECT 1")
        );
        assert_eq!(table.child_path(999, "x"), None);
    }

    #[test]
    fn test_remove_never_reuses() {
        let mut table = InodeTable::new();
        let first = table.ensure("/shop/orders/q");

        assert_eq!(table.remove("/shop/orders/q"), Some(first));
        assert!(table.path(first).is_none());
        assert_ne!(table.ensure("/shop/orders/q"), first);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut table = InodeTable::new();
        assert_eq!(table.remove("/"), None);
        assert_eq!(table.inode("/"), Some(InodeTable::ROOT));
    }
}
