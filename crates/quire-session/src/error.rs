//! Error types for the editing session manager.
//!
//! Nothing here is fatal. Remote and clipboard failures leave session state
//! untouched and are handed to the [`FailureNotifier`](crate::FailureNotifier);
//! validation failures are surfaced inline and never reach the notifier.

use thiserror::Error;

use quire_types::BlockId;

/// Failure reported by a remote collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The server answered and refused the request.
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never got an answer.
    #[error("server unavailable: {0}")]
    Unavailable(String),

    /// The addressed block, chapter, or version does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Failure writing to the clipboard.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by editing operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Clipboard(#[from] ClipboardError),

    /// Local validation (e.g. empty suggestion instructions).
    #[error("{0}")]
    Validation(String),

    /// A block always keeps at least one version.
    #[error("cannot delete the only version of block {0}")]
    LastVersion(BlockId),

    #[error("block {block_id} has no version {version} (count {count})")]
    VersionOutOfRange {
        block_id: BlockId,
        version: u32,
        count: u32,
    },
}

impl EditorError {
    /// Validation errors stay inline; everything else is reported.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EditorError::Validation(_)
                | EditorError::LastVersion(_)
                | EditorError::VersionOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = EditorError::from(RemoteError::Rejected {
            status: 409,
            message: "stale version".into(),
        });
        assert_eq!(
            err.to_string(),
            "remote call failed: server rejected request (409): stale version"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_classification() {
        assert!(EditorError::Validation("empty".into()).is_validation());
        assert!(EditorError::LastVersion(BlockId::new("b")).is_validation());
        assert!(!EditorError::from(ClipboardError::Unavailable("x".into())).is_validation());
    }
}
