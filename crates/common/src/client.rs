//! Database boundary consumed by the catalog and the query engine
//!
//! The daemon provides the real implementation over a single MySQL
//! session; tests script one in memory.

use async_trait::async_trait;
use thiserror::Error;

/// A single present cell value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datum {
    /// Numeric value, kept in the server's textual rendering
    Number(String),
    /// Character or binary value
    Text(String),
}

impl Datum {
    pub fn number(value: impl ToString) -> Self {
        Datum::Number(value.to_string())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Datum::Text(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Datum::Number(s) | Datum::Text(s) => s,
        }
    }
}

/// One result row; `None` is SQL NULL
pub type Row = Vec<Option<Datum>>;

/// Result of executing a statement
///
/// Rows are consumed once, in order. Statements without a result set
/// yield no columns and no rows.
pub struct RowSet {
    columns: Vec<String>,
    rows: Box<dyn Iterator<Item = Row> + Send>,
}

impl RowSet {
    pub fn new<I>(columns: Vec<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = Row>,
        I::IntoIter: Send + 'static,
    {
        Self {
            columns,
            rows: Box::new(rows.into_iter()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Next row, or `None` once the set is exhausted
    pub fn next_row(&mut self) -> Option<Row> {
        self.rows.next()
    }
}

impl std::fmt::Debug for RowSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowSet")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),
}

/// Primitives the catalog needs from a database session
///
/// Implementations are not required to be safe for concurrent use; the
/// engine serializes every call behind one lock.
#[async_trait]
pub trait SqlClient: Send {
    async fn list_databases(&mut self) -> Result<Vec<String>, ClientError>;

    async fn list_tables(&mut self, database: &str) -> Result<Vec<String>, ClientError>;

    async fn execute(&mut self, sql: &str) -> Result<RowSet, ClientError>;

    /// Execute `template` with one value bound to each `?` placeholder
    ///
    /// `None` binds SQL NULL. Returns the number of affected rows; a
    /// placeholder/value count mismatch is a [`ClientError::Query`].
    async fn execute_bound(
        &mut self,
        template: &str,
        values: &[Option<String>],
    ) -> Result<u64, ClientError>;
}
