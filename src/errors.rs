//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`Error`] covers every failure mode of the playback
//! core:
//! - Asset fetching, decoding and load timeouts
//! - Skeleton incompatibility during clip adaptation
//! - Playback instance lookups
//! - Configuration parsing
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, Error>`.
//!
//! ```rust,ignore
//! use myth_avatar::errors::{Error, Result};
//!
//! async fn load(server: &AssetServer, reference: &AssetRef) -> Result<()> {
//!     let mesh = server.load_mesh(reference).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use thiserror::Error;

/// The main error type for the avatar playback core.
///
/// Loader and adapter failures are never fatal to the process: the
/// playback controller keeps the affected instance in its last good state
/// and surfaces the error to the caller.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Asset Loading Errors
    // ========================================================================
    /// The bytes behind a reference could not be decoded (corrupt file or
    /// unsupported format).
    #[error("Failed to decode asset '{reference}': {reason}")]
    AssetDecode {
        /// Label of the offending reference
        reference: String,
        /// What the decoder rejected
        reason: String,
    },

    /// A load did not finish within the configured bound.
    #[error("Loading asset '{reference}' timed out after {timeout:?}")]
    AssetLoadTimeout {
        /// Label of the offending reference
        reference: String,
        /// The bound that elapsed
        timeout: Duration,
    },

    /// The requested asset was not found by the reader.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// A `data:` URL could not be parsed.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    // ========================================================================
    // Animation Errors
    // ========================================================================
    /// Not a single track of the clip matched a joint of the target skeleton.
    #[error("Clip '{clip}' shares no joints with the skeleton of '{mesh}'")]
    IncompatibleSkeleton {
        /// Name of the raw clip
        clip: String,
        /// Name of the target mesh asset
        mesh: String,
    },

    /// The playback instance key is stale or was never bound.
    #[error("Playback instance not found")]
    InstanceNotFound,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid stage configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // I/O & Async Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task join error (when a decode task panics or is cancelled).
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl Error {
    /// Shorthand for an [`Error::AssetDecode`].
    pub fn decode(reference: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::AssetDecode {
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this failure came out of the asset loader (decode, missing
    /// file or timeout) rather than adaptation or playback.
    #[must_use]
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::AssetDecode { .. }
                | Self::AssetLoadTimeout { .. }
                | Self::AssetNotFound(_)
                | Self::InvalidDataUri(_)
                | Self::Io(_)
        )
    }
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::TaskJoin(err.to_string())
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
