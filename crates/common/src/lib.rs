//! Core of sqlfs: a SQL server's catalog exposed as a filesystem namespace.
//!
//! Databases and tables are directories. Users create symlinks whose target
//! text is a SQL statement; the paired file next to the link yields the
//! formatted result of that statement when opened and read.
//!
//! # Architecture
//!
//! - [`store::NodeStore`]: path → node map with prefix-scan listings
//! - [`catalog::Catalog`]: node store plus the live query table, filled by
//!   [`catalog::Catalog::refresh`]
//! - [`engine::Engine`]: the filesystem operations and the query
//!   open/read/write/close state machine
//! - [`format::OutputFormat`]: result serialization per file extension
//! - [`classify::Classification`]: read/write/append capabilities of a query
//! - [`client::SqlClient`]: the database boundary implemented by the daemon

pub mod catalog;
pub mod classify;
pub mod client;
pub mod engine;
pub mod error;
pub mod format;
pub mod node;
pub mod path;
pub mod query;
pub mod store;
pub mod write;

pub use catalog::{Catalog, LoaderOptions, RefreshStats};
pub use classify::Classification;
pub use client::{ClientError, Datum, Row, RowSet, SqlClient};
pub use engine::{AccessMode, Attributes, Engine, OpenMode};
pub use error::FsError;
pub use format::OutputFormat;
pub use node::{FileType, Node, NodeKind, NodeMeta};
pub use query::{Query, QueryId, QueryState};
pub use store::NodeStore;
