//! File-cached HTTP catalog source.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{CatalogSource, UpstreamError, UpstreamSnapshot};
use crate::config::UpstreamConfig;
use crate::metrics;

/// Downloads the upstream catalog once and serves it from disk afterwards.
pub struct CachedCatalogSource {
    client: Client,
    url: String,
    cache_path: PathBuf,
}

impl CachedCatalogSource {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(concat!("plugin-store/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            cache_path: config.cache.clone(),
        })
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Returns `None` when no cache file exists yet.
    async fn read_cache(&self) -> Result<Option<Vec<u8>>, UpstreamError> {
        match fs::read(&self.cache_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(UpstreamError::Io(e)),
        }
    }

    async fn download(&self) -> Result<Vec<u8>, UpstreamError> {
        debug!(url = %self.url, "Fetching upstream catalog");

        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Write through a temp file in the same directory, then rename over the
    /// cache path, so readers never observe a partial document.
    async fn persist(&self, bytes: &[u8]) -> Result<(), UpstreamError> {
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file_name = self
            .cache_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "catalog".to_string());
        let temp_path = self
            .cache_path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        fs::write(&temp_path, bytes).await?;
        if let Err(e) = fs::rename(&temp_path, &self.cache_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(UpstreamError::Io(e));
        }

        Ok(())
    }
}

#[async_trait]
impl CatalogSource for CachedCatalogSource {
    async fn fetch(&self) -> Result<UpstreamSnapshot, UpstreamError> {
        if let Some(bytes) = self.read_cache().await? {
            metrics::UPSTREAM_FETCHES.with_label_values(&["cache"]).inc();
            return UpstreamSnapshot::from_slice(&bytes);
        }

        let bytes = match self.download().await {
            Ok(bytes) => bytes,
            Err(e) => {
                metrics::UPSTREAM_FETCHES.with_label_values(&["failed"]).inc();
                warn!(url = %self.url, error = %e, "Upstream catalog fetch failed");
                return Err(e);
            }
        };
        metrics::UPSTREAM_FETCHES.with_label_values(&["remote"]).inc();

        // Never cache something that is not a catalog
        let snapshot = UpstreamSnapshot::from_slice(&bytes)?;
        self.persist(&bytes).await?;

        info!(
            url = %self.url,
            path = %self.cache_path.display(),
            entries = snapshot.len(),
            "Cached upstream catalog"
        );

        Ok(snapshot)
    }
}
