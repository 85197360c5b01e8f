//! Upstream catalog feed: fetching, caching and parsing.
//!
//! The feed is fetched at most once. After the first successful download the
//! raw document lives in a local cache file that is never invalidated; remove
//! the file to force a refetch.

mod cache;
mod types;

pub use cache::CachedCatalogSource;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when obtaining the upstream catalog.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Reading or writing the cache file failed.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not a plugin catalog.
    #[error("Failed to parse catalog: {0}")]
    Parse(String),
}

/// A source of upstream catalog snapshots.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Obtain the current snapshot.
    async fn fetch(&self) -> Result<UpstreamSnapshot, UpstreamError>;
}
