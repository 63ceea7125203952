//! Import error types.

use folio_core::CanvasError;
use thiserror::Error;

/// Result type for import operations.
pub type PipelineResult<T> = Result<T, ImportError>;

/// Errors that can occur while importing a paginated document.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The source document could not be opened.
    #[error("Failed to decode document: {0}")]
    Decode(String),

    /// Every page failed to render.
    #[error("No pages could be rendered ({failed} of {total} failed)")]
    NoPagesRendered {
        /// Pages that failed.
        failed: u32,
        /// Pages in the document.
        total: u32,
    },

    /// One page failed to render. Recovered by the pipeline.
    #[error("Page {page} failed to render: {reason}")]
    PageRender {
        /// 1-based page number.
        page: u32,
        /// Failure description.
        reason: String,
    },

    /// A rendered bitmap could not be encoded.
    #[error("Bitmap encoding failed: {0}")]
    Encode(String),

    /// The requested render scale is not a positive finite number.
    #[error("Invalid render scale: {0}")]
    InvalidScale(f32),

    /// The live editor never became available.
    #[error("Editor not available after {attempts} attempts")]
    ReadinessTimeout {
        /// Number of polls performed.
        attempts: u32,
    },

    /// The batch creation of assets and page objects was rejected.
    #[error("Failed to materialize pages: {0}")]
    Materialization(#[source] CanvasError),

    /// The live document was torn down while the import was in flight.
    #[error("Import cancelled: the document was closed")]
    Cancelled,

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A live-document operation failed outside of materialization.
    #[error("Canvas error: {0}")]
    Canvas(#[from] CanvasError),
}

impl ImportError {
    /// Create a per-page render error.
    pub fn page(page: u32, reason: impl std::fmt::Display) -> Self {
        Self::PageRender {
            page,
            reason: reason.to_string(),
        }
    }

    /// Whether the import as a whole can continue after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PageRender { .. })
    }

    /// The single message presented to the user when an import fails.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Decode(reason) => format!("Failed to load PDF: {reason}"),
            Self::ReadinessTimeout { .. } => {
                "Failed to initialize the editor. Please try again.".to_string()
            }
            other => format!("Failed to render PDF: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ImportError::Decode("bad header".into()).user_message(),
            "Failed to load PDF: bad header"
        );
        assert_eq!(
            ImportError::ReadinessTimeout { attempts: 10 }.user_message(),
            "Failed to initialize the editor. Please try again."
        );
        assert!(ImportError::NoPagesRendered { failed: 3, total: 3 }
            .user_message()
            .starts_with("Failed to render PDF: "));
    }

    #[test]
    fn test_only_page_failures_are_recoverable() {
        assert!(ImportError::page(2, "out of memory").is_recoverable());
        assert!(!ImportError::Cancelled.is_recoverable());
    }
}
