//! Filesystem operations over the catalog
//!
//! The engine owns the catalog and the single database session. Every call
//! that reaches the database holds the session lock for its whole duration,
//! so concurrent opens and writes are serialized. The catalog lock is never
//! held across a database call.
//!
//! # Query lifecycle
//!
//! A query target starts `Closed`. `open` validates the requested mode
//! against the query's classification, resets the query to `Opening`, runs
//! read-class queries immediately and buffers the formatted result, then
//! moves to `Ready`. `read` serves bytes from that buffer; `write` feeds the
//! row writer. `close` returns to `Closed` and drops the buffer.

use parking_lot::{RwLock, RwLockReadGuard};
use tokio::sync::Mutex;

use crate::catalog::{self, Catalog, LoaderOptions, RefreshStats};
use crate::classify::Classification;
use crate::client::SqlClient;
use crate::error::{FsError, Result};
use crate::format::OutputFormat;
use crate::node::{FileType, NodeKind, NodeMeta};
use crate::query::{QueryId, QueryState};
use crate::write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Flags an open request was made with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub access: AccessMode,
    pub append: bool,
}

impl OpenMode {
    pub const READ_ONLY: OpenMode = OpenMode {
        access: AccessMode::ReadOnly,
        append: false,
    };

    pub const WRITE_ONLY: OpenMode = OpenMode {
        access: AccessMode::WriteOnly,
        append: false,
    };

    pub const READ_WRITE: OpenMode = OpenMode {
        access: AccessMode::ReadWrite,
        append: false,
    };

    pub fn with_append(mut self) -> Self {
        self.append = true;
        self
    }

    /// Whether a query with `class` may be opened this way
    pub fn permits(&self, class: Classification) -> bool {
        let access = match self.access {
            AccessMode::ReadOnly => class.read,
            AccessMode::WriteOnly => class.write,
            AccessMode::ReadWrite => class.read || class.write,
        };
        access && (!self.append || class.append)
    }

    fn executes(&self, class: Classification) -> bool {
        self.access != AccessMode::WriteOnly && class.read
    }
}

/// Result of getattr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub meta: NodeMeta,
    pub size: u64,
}

pub struct Engine {
    catalog: RwLock<Catalog>,
    client: Mutex<Box<dyn SqlClient>>,
    options: LoaderOptions,
}

impl Engine {
    pub fn new(client: Box<dyn SqlClient>, options: LoaderOptions) -> Self {
        Self {
            catalog: RwLock::new(Catalog::new()),
            client: Mutex::new(client),
            options,
        }
    }

    /// Read access to the catalog snapshot
    pub fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read()
    }

    /// Discover databases and tables; run once before serving
    pub async fn refresh(&self) -> Result<RefreshStats> {
        let mut client = self.client.lock().await;
        catalog::refresh(&self.catalog, client.as_mut(), &self.options).await
    }

    pub fn attributes(&self, path: &str) -> Result<Attributes> {
        let catalog = self.catalog.read();
        let node = catalog.nodes().get(path).ok_or(FsError::NotFound)?;

        let size = match node.kind {
            NodeKind::QueryLink { query } => {
                catalog.query(query).map_or(0, |q| q.text.len() as u64)
            }
            NodeKind::QueryTarget { query } => catalog
                .query(query)
                .filter(|q| q.is_ready())
                .map_or(0, |q| q.buffer.len() as u64),
            NodeKind::Root | NodeKind::Database | NodeKind::Table => 0,
        };

        Ok(Attributes {
            meta: node.meta,
            size,
        })
    }

    pub fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        self.catalog.read().nodes().children(path)
    }

    /// Create a query link at `path` whose target text is `query_text`
    pub fn create_link(&self, path: &str, query_text: &str) -> Result<QueryId> {
        let id = self.catalog.write().create_query(path, query_text)?;
        tracing::info!(path = %path, query = %query_text, id = %id, "query link created");
        Ok(id)
    }

    /// Query text stored in the link at `path`
    pub fn read_link(&self, path: &str) -> Result<String> {
        let catalog = self.catalog.read();
        let node = catalog.nodes().get(path).ok_or(FsError::NotFound)?;
        match node.kind {
            NodeKind::QueryLink { query } => catalog
                .query(query)
                .map(|q| q.text.clone())
                .ok_or(FsError::NotFound),
            _ => Err(FsError::InvalidArgument("not a query link".to_string())),
        }
    }

    /// Remove a query link (or its target) together with its pair
    ///
    /// Returns the removed link and target paths.
    pub fn unlink(&self, path: &str) -> Result<[String; 2]> {
        let mut catalog = self.catalog.write();
        let id = catalog
            .nodes()
            .get(path)
            .and_then(|node| node.query())
            .ok_or(FsError::NotFound)?;

        let query = catalog.remove_query(id).ok_or(FsError::NotFound)?;
        tracing::info!(
            link = %query.link_path,
            target = %query.target_path,
            "query removed"
        );
        Ok([query.link_path, query.target_path])
    }

    pub async fn open(&self, path: &str, mode: OpenMode) -> Result<()> {
        let (id, text, format, execute) = {
            let mut catalog = self.catalog.write();
            let node = catalog.nodes().get(path).ok_or(FsError::NotFound)?;
            let id = match node.kind {
                NodeKind::QueryTarget { query } if node.meta.file_type == FileType::RegularFile => {
                    query
                }
                _ => return Err(FsError::PermissionDenied),
            };

            let query = catalog.query_mut(id).ok_or(FsError::NotFound)?;
            if !mode.permits(query.class) {
                tracing::debug!(path = %path, ?mode, class = ?query.class, "open mode not permitted");
                return Err(FsError::PermissionDenied);
            }

            query.reset(QueryState::Opening);
            (id, query.text.clone(), query.format, mode.executes(query.class))
        };

        tracing::debug!(path = %path, query = %text, execute, "opening query");

        let buffer = if execute {
            match self.run_query(&text, format).await {
                Ok(buffer) => buffer,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "query failed");
                    if let Some(query) = self.catalog.write().query_mut(id) {
                        query.reset(QueryState::Closed);
                    }
                    return Err(e);
                }
            }
        } else {
            Vec::new()
        };

        let mut catalog = self.catalog.write();
        let query = catalog.query_mut(id).ok_or(FsError::NotFound)?;
        query.buffer = buffer;
        query.state = QueryState::Ready;
        tracing::debug!(path = %path, bytes = query.buffer.len(), "query ready");
        Ok(())
    }

    /// Up to `size` bytes of the buffered result from `offset`
    pub fn read(&self, path: &str, size: usize, offset: u64) -> Result<Vec<u8>> {
        let catalog = self.catalog.read();
        let id = Self::query_at(&catalog, path)?;
        let query = catalog.query(id).ok_or(FsError::NotFound)?;
        if !query.is_ready() {
            return Err(FsError::BadFileDescriptor);
        }
        Ok(query.read_at(offset, size).to_vec())
    }

    /// Accept row data for a write-class query
    ///
    /// The stream is append-only, so `offset` is not used. Every completed
    /// line is executed before returning. If a row fails, the rows after it
    /// stay pending and run on the next write or on close.
    pub async fn write(&self, path: &str, data: &[u8], offset: u64) -> Result<usize> {
        let (id, text, format, lines) = {
            let mut catalog = self.catalog.write();
            let id = Self::query_at(&catalog, path)?;
            let query = catalog.query_mut(id).ok_or(FsError::NotFound)?;
            if !query.is_ready() {
                return Err(FsError::BadFileDescriptor);
            }
            if !query.class.write {
                return Err(FsError::PermissionDenied);
            }

            query.pending.extend_from_slice(data);
            let lines = write::take_complete_lines(&mut query.pending);
            (id, query.text.clone(), query.format, lines)
        };

        tracing::trace!(path = %path, offset, bytes = data.len(), rows = lines.len(), "write");
        if let Err((e, rest)) = self.execute_rows(&text, format, lines).await {
            tracing::warn!(path = %path, error = %e, requeued = rest.len(), "row failed");
            if let Some(query) = self.catalog.write().query_mut(id) {
                if query.is_ready() {
                    write::restore_lines(&mut query.pending, &rest);
                }
            }
            return Err(e);
        }
        Ok(data.len())
    }

    /// Close the query target at `path`
    ///
    /// Pending rows, including an unterminated final one, are executed
    /// before the state is reset. A failing row does not stop the rows
    /// after it; the first failure is reported.
    pub async fn close(&self, path: &str) -> Result<()> {
        let (text, format, mut lines) = {
            let mut catalog = self.catalog.write();
            let id = Self::query_at(&catalog, path)?;
            let query = catalog.query_mut(id).ok_or(FsError::NotFound)?;
            let lines = if query.is_ready() && query.class.write {
                write::take_remaining_lines(&mut query.pending)
            } else {
                Vec::new()
            };
            query.reset(QueryState::Closed);
            (query.text.clone(), query.format, lines)
        };

        let mut first_error = None;
        while let Err((e, rest)) = self.execute_rows(&text, format, lines).await {
            tracing::warn!(path = %path, error = %e, "row failed on close");
            first_error.get_or_insert(e);
            lines = rest;
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// The query behind a query target; links and directories have no buffer
    fn query_at(catalog: &Catalog, path: &str) -> Result<QueryId> {
        let node = catalog.nodes().get(path).ok_or(FsError::NotFound)?;
        match node.kind {
            NodeKind::QueryTarget { query } => Ok(query),
            NodeKind::Root
            | NodeKind::Database
            | NodeKind::Table
            | NodeKind::QueryLink { .. } => Err(FsError::PermissionDenied),
        }
    }

    async fn run_query(&self, text: &str, format: OutputFormat) -> Result<Vec<u8>> {
        let mut client = self.client.lock().await;
        let mut rows = client.execute(text).await?;
        Ok(format.render(&mut rows))
    }

    /// Execute rows in order, stopping at the first failure
    ///
    /// On failure, returns the error together with the rows after the
    /// failing one, which were not attempted.
    async fn execute_rows(
        &self,
        template: &str,
        format: OutputFormat,
        lines: Vec<String>,
    ) -> std::result::Result<(), (FsError, Vec<String>)> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut client = self.client.lock().await;
        let mut lines = lines.into_iter();
        while let Some(line) = lines.next() {
            let result = match write::parse_record(format, &line) {
                Ok(values) => {
                    tracing::debug!(template = %template, ?values, "executing row");
                    client
                        .execute_bound(template, &values)
                        .await
                        .map(|_| ())
                        .map_err(FsError::from)
                }
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                return Err((e, lines.collect()));
            }
        }
        Ok(())
    }
}
