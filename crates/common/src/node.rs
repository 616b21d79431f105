//! Catalog nodes: shared POSIX-like metadata plus a kind-specific payload

use crate::classify::Classification;
use crate::query::QueryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Directory,
    Symlink,
    RegularFile,
}

/// Metadata reported through getattr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMeta {
    pub file_type: FileType,
    /// Permission bits, e.g. `0o755`
    pub perm: u16,
    pub nlink: u32,
}

impl NodeMeta {
    pub const DIRECTORY: NodeMeta = NodeMeta {
        file_type: FileType::Directory,
        perm: 0o755,
        nlink: 2,
    };

    pub const SYMLINK: NodeMeta = NodeMeta {
        file_type: FileType::Symlink,
        perm: 0o755,
        nlink: 1,
    };

    /// Regular file whose permission bits reflect what the query allows
    pub fn query_file(class: Classification) -> NodeMeta {
        let mut perm = 0;
        if class.read {
            perm |= 0o444;
        }
        if class.write {
            perm |= 0o222;
        }
        if perm == 0 {
            perm = 0o444;
        }
        NodeMeta {
            file_type: FileType::RegularFile,
            perm,
            nlink: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Database,
    Table,
    /// Symlink whose target text is the query
    QueryLink { query: QueryId },
    /// File yielding the query's formatted result
    QueryTarget { query: QueryId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub meta: NodeMeta,
    pub kind: NodeKind,
}

impl Node {
    pub fn root() -> Self {
        Self {
            meta: NodeMeta::DIRECTORY,
            kind: NodeKind::Root,
        }
    }

    pub fn database() -> Self {
        Self {
            meta: NodeMeta::DIRECTORY,
            kind: NodeKind::Database,
        }
    }

    pub fn table() -> Self {
        Self {
            meta: NodeMeta::DIRECTORY,
            kind: NodeKind::Table,
        }
    }

    pub fn query_link(query: QueryId) -> Self {
        Self {
            meta: NodeMeta::SYMLINK,
            kind: NodeKind::QueryLink { query },
        }
    }

    pub fn query_target(query: QueryId, class: Classification) -> Self {
        Self {
            meta: NodeMeta::query_file(class),
            kind: NodeKind::QueryTarget { query },
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Root | NodeKind::Database | NodeKind::Table
        )
    }

    /// The query this node belongs to, for links and targets
    pub fn query(&self) -> Option<QueryId> {
        match self.kind {
            NodeKind::QueryLink { query } | NodeKind::QueryTarget { query } => Some(query),
            NodeKind::Root | NodeKind::Database | NodeKind::Table => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_file_perms() {
        let read = Classification::of("SELECT 1");
        let insert = Classification::of("INSERT INTO t VALUES (?)");
        let inert = Classification::of("DROP TABLE t");

        assert_eq!(NodeMeta::query_file(read).perm, 0o444);
        assert_eq!(NodeMeta::query_file(insert).perm, 0o222);
        assert_eq!(NodeMeta::query_file(inert).perm, 0o444);
        assert_eq!(
            NodeMeta::query_file(read).file_type,
            FileType::RegularFile
        );
    }

    #[test]
    fn test_query_backref() {
        let id = QueryId(7);
        assert_eq!(Node::query_link(id).query(), Some(id));
        assert_eq!(
            Node::query_target(id, Classification::default()).query(),
            Some(id)
        );
        assert_eq!(Node::table().query(), None);
        assert!(Node::database().is_dir());
        assert!(!Node::query_link(id).is_dir());
    }
}
