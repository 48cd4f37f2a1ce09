//! Ingestion Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Only fatal conditions are errors;
//! recoverable per-node problems are [`Warning`](crate::Warning)s.

use derive_more::{Display, Error};

/// An ingestion error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The collection can't be ingested as configured. Raised before any
    /// traversal, so nothing was read or written.
    #[display("invalid configuration: {_0}")]
    InvalidConfiguration(#[error(not(source))] String),
    /// The content store failed mid-walk. Raised before any catalog write.
    #[display("content store unreachable")]
    StoreUnreachable,
    /// The run was cancelled at a directory expansion.
    #[display("ingestion cancelled")]
    Cancelled,
    /// The catalog database failed. Batches committed before the failure
    /// remain.
    #[display("catalog error")]
    Catalog,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnreachable | Self::Catalog)
    }
}
