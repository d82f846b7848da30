//! Object storage errors.

use std::path::PathBuf;

use synchorus_core::Fingerprint;
use thiserror::Error;

/// Errors returned by object stores and the uploader.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No object under this bucket and key.
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The key cannot be used as an object name.
    #[error("Invalid object key: {key:?}")]
    InvalidKey { key: String },

    /// The bucket id cannot be used as a bucket name.
    #[error("Invalid bucket: {bucket:?}")]
    InvalidBucket { bucket: String },

    /// The object carries no usable content hash.
    #[error("Object {bucket}/{key} has no valid content hash")]
    MissingContentHash { bucket: String, key: String },

    /// The object's bytes do not match its recorded content hash.
    #[error("Content hash mismatch for {bucket}/{key}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        bucket: String,
        key: String,
        expected: Fingerprint,
        actual: Fingerprint,
    },

    /// Local I/O failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Object metadata could not be encoded or decoded.
    #[error("Bad object metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    /// The backend rejected the credentials.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// The backend could not be reached or returned an error.
    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl StoreError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
