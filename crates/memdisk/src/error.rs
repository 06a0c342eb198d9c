//! Error types for MemDisk

use thiserror::Error;

use crate::backend::BackendError;
use crate::disk::DiskError;

/// Main error type for MemDisk operations
#[derive(Error, Debug)]
pub enum MemdiskError {
    /// Disk store errors (listing, loading, decrypting)
    #[error(transparent)]
    Disk(#[from] DiskError),

    /// The relevance classifier could not reach its text-generation backend
    #[error("Relevance classifier failed: {0}")]
    Classifier(BackendError),

    /// Dispatch backend errors
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an unusable request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MemdiskError {
    fn from(e: serde_json::Error) -> Self {
        MemdiskError::Serialization(e.to_string())
    }
}

/// Result type alias for MemDisk operations
pub type Result<T> = std::result::Result<T, MemdiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_error_display() {
        let err = MemdiskError::Classifier(BackendError::Request("connection refused".into()));
        assert_eq!(
            err.to_string(),
            "Relevance classifier failed: Request failed: connection refused"
        );
    }

    #[test]
    fn test_disk_error_is_transparent() {
        let err: MemdiskError = DiskError::NotFound("a.dsk".into()).into();
        assert_eq!(err.to_string(), "Disk not found: a.dsk");
    }

    #[test]
    fn test_missing_credential_names_variable() {
        let err: MemdiskError = BackendError::MissingCredential {
            var: "OPENROUTER_API_KEY".into(),
        }
        .into();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }
}
