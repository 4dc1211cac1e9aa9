//! Error types for the asset lookup service.
//!
//! Cache-side variants are never surfaced to callers of [`crate::AssetService`];
//! the service downgrades them to warnings. Backend variants always propagate.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for asset lookups.
#[derive(Debug, Error)]
pub enum AssetError {
    // Cache store errors
    #[error("Cache store unavailable at {path:?}: {message}")]
    StorageUnavailable {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Cache storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Corrupt cache entry for key {key}: {message}")]
    CorruptEntry { key: String, message: String },

    // Serialization errors
    #[error("Deserialization error: {message}")]
    Deserialization {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Backing database errors
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Asset database error: {message}")]
    Backend { message: String },

}

/// Result type alias for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

impl From<serde_json::Error> for AssetError {
    fn from(err: serde_json::Error) -> Self {
        AssetError::Deserialization {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for AssetError {
    fn from(err: rusqlite::Error) -> Self {
        AssetError::Storage {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl AssetError {
    /// Create a backend error from any displayable cause.
    pub fn backend(message: impl Into<String>) -> Self {
        AssetError::Backend {
            message: message.into(),
        }
    }

    /// Create an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        AssetError::InvalidQuery {
            message: message.into(),
        }
    }

    /// Whether this error originated in the cache layer.
    ///
    /// Such errors degrade to a cache miss and must never fail a request.
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            AssetError::StorageUnavailable { .. }
                | AssetError::Storage { .. }
                | AssetError::CorruptEntry { .. }
                | AssetError::Deserialization { .. }
        )
    }

    /// Whether the caller is at fault (underspecified request).
    pub fn is_client_error(&self) -> bool {
        matches!(self, AssetError::InvalidQuery { .. })
    }
}
