//! Content Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;
use uuid::Uuid;

/// A content store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for content store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The store has no node with this identifier.
    #[display("node not found: {_0}")]
    NotFound(#[error(not(source))] Uuid),
    /// The node exists but the store could not be reached to resolve it.
    #[display("node unreachable: {_0}")]
    Unreachable(#[error(not(source))] Uuid),
    /// The operation requires a different kind of node (e.g. reading the
    /// contents of a directory).
    #[display("unexpected node kind for {_0}")]
    WrongKind(#[error(not(source))] Uuid),
    /// A paging token was not issued by this store.
    #[display("invalid page token: {_0}")]
    InvalidPageToken(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Path contains invalid characters or escapes the store root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    Backend(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Io(_) | Self::Backend(_))
    }
}
