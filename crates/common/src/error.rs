use thiserror::Error;

use crate::client::ClientError;

/// Errors returned by filesystem operations on the catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    /// No node exists at the path
    #[error("no such node")]
    NotFound,

    /// Mode/classification mismatch or wrong node kind for the operation
    #[error("permission denied")]
    PermissionDenied,

    /// Read or write on a query that is not open
    #[error("query is not open")]
    BadFileDescriptor,

    /// A link or its paired target collides with an existing node
    #[error("node already exists")]
    AlreadyExists,

    /// The catalog could not be listed from the database
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Query execution failed; no content is readable
    #[error("database error: {0}")]
    Database(String),

    /// Directory listing requested on a file or link
    #[error("not a directory")]
    NotADirectory,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<ClientError> for FsError {
    fn from(err: ClientError) -> Self {
        FsError::Database(err.to_string())
    }
}

pub type Result<T, E = FsError> = std::result::Result<T, E>;
