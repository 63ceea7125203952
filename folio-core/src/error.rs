//! Error types for document operations.

use thiserror::Error;

/// Result type for document operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur while reading or mutating a live document.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Element not found in the document.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Asset not found in the document.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// A record with the same identifier already exists.
    #[error("Duplicate identifier: {0}")]
    DuplicateId(String),

    /// Invalid element operation.
    #[error("Invalid operation on element: {0}")]
    InvalidOperation(String),

    /// Ordering index could not be generated or parsed.
    #[error("Invalid ordering index: {0}")]
    InvalidIndex(String),

    /// Scene serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An update batch kept losing races with other writers.
    #[error("Update abandoned after {0} attempts under contention")]
    Conflict(usize),

    /// The editor has been torn down.
    #[error("Editor has been disposed")]
    Disposed,
}
