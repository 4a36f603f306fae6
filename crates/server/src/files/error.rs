//! Error type shared by the file operations.

use std::io;

use thiserror::Error;

/// Errors that can occur while resolving, listing, archiving or streaming.
///
/// Messages only ever contain the path the client supplied, never the
/// absolute filesystem path behind it.
#[derive(Debug, Error)]
pub enum FileError {
    /// The requested path resolves outside the served root.
    #[error("access denied: path outside root directory")]
    Forbidden,

    /// The requested path does not exist.
    #[error("path not found: {0}")]
    NotFound(String),

    /// The path exists but has the wrong kind for the operation.
    #[error("{reason}: {path}")]
    InvalidType {
        /// The client-supplied path.
        path: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Writing the archive container failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The operation was abandoned because its consumer went away.
    #[error("operation cancelled")]
    Cancelled,

    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FileError {
    /// Build an [`FileError::InvalidType`].
    pub fn invalid_type(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidType {
            path: path.into(),
            reason,
        }
    }

    /// Whether the message is safe and useful to show to the client.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Forbidden | Self::NotFound(_) | Self::InvalidType { .. }
        )
    }
}
