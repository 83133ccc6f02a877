//! Domain errors for archive operations
//!
//! Every failure that can end a download is expressed here. Infrastructure
//! adapters convert their own error types (AWS SDK, zip, io) into these
//! variants, keeping the key or prefix involved in the message.

use thiserror::Error;

/// Errors that can occur while building an archive for a folder
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The object source could not list a prefix
    #[error("Listing failed for prefix '{prefix}': {message}")]
    Listing { prefix: String, message: String },

    /// The object source could not read the content of a known key
    #[error("Fetch failed for key '{key}': {message}")]
    Fetch { key: String, message: String },

    /// The archive writer reported an internal error
    #[error("Archive write failed: {0}")]
    ArchiveWrite(String),

    /// The download was aborted (client disconnect or failure elsewhere)
    #[error("Archive aborted")]
    Aborted,

    /// A discovered key does not live under the walk root
    #[error("Key '{key}' is outside walk root '{root}'")]
    KeyOutsideRoot { key: String, root: String },

    /// A path identifier cannot be used to build a storage prefix
    #[error("Invalid {kind} identifier: '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },
}

impl ArchiveError {
    /// Create a listing failure for a prefix
    pub fn listing(prefix: impl Into<String>, message: impl ToString) -> Self {
        Self::Listing {
            prefix: prefix.into(),
            message: message.to_string(),
        }
    }

    /// Create a fetch failure for a key
    pub fn fetch(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Create an archive write failure with a message
    pub fn archive_write(msg: impl Into<String>) -> Self {
        Self::ArchiveWrite(msg.into())
    }

    /// Whether this error is the cancellation signal rather than a real failure
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_error_message() {
        let err = ArchiveError::listing("photosession/u1/f1/", "AccessDenied");
        assert!(matches!(err, ArchiveError::Listing { .. }));
        assert_eq!(
            err.to_string(),
            "Listing failed for prefix 'photosession/u1/f1/': AccessDenied"
        );
    }

    #[test]
    fn test_fetch_error_message() {
        let err = ArchiveError::fetch("photosession/u1/f1/a.jpg", "timeout");
        assert!(err.to_string().contains("a.jpg"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_aborted_is_not_a_failure_kind() {
        assert!(ArchiveError::Aborted.is_aborted());
        assert!(!ArchiveError::archive_write("broken").is_aborted());
    }
}
