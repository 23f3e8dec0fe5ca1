//! Error types for the publisher engine.

use ipni_publisher_core::CoreError;
use ipni_publisher_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while publishing a batch.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// Encoding, signing or parsing failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The head endpoint answered with something other than 200, 403 or 404.
    #[error("downloading previous head failed with status code {status} and body: {body}")]
    HeadFetch { status: u16, body: String },

    /// The indexer answered with something other than 204.
    #[error("announcing to the indexer node failed with status code {status} and body: {body}")]
    Announce { status: u16, body: String },

    /// A peer identity could not be loaded.
    #[error("identity error: {0}")]
    Identity(String),

    /// A queued record could not be turned into an advertisement.
    #[error("record {index}: {source}")]
    Record { index: usize, source: CoreError },
}

/// Result type for publisher operations.
pub type Result<T> = std::result::Result<T, PublisherError>;
