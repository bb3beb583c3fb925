//! Error types for RetainerTrack infrastructure

use thiserror::Error;

use crate::codec::DecodeError;

/// Errors that can occur while persisting or rebuilding the resolution cache
#[derive(Error, Debug)]
pub enum RetainerTrackError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error
    #[error("migration error: {0}")]
    Migration(String),

    /// Packet decode error
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for RetainerTrack operations
pub type Result<T> = std::result::Result<T, RetainerTrackError>;
