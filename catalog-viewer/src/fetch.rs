//! Asset acquisition
//!
//! Everything the viewer downloads (manifest, page images, the fallback
//! document) goes through [`AssetFetcher`], so tests can serve assets from
//! memory.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::FetchError;

pub trait AssetFetcher: Send + Sync + 'static {
    /// Fetch the full body behind `url`
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Fetch with an optional upper bound on how long the load may take
pub async fn fetch_within<F: AssetFetcher>(
    fetcher: &F,
    url: &str,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, FetchError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fetcher.fetch(url))
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::TimedOut {
                    url: url.to_string(),
                })
            }),
        None => fetcher.fetch(url).await,
    }
}

/// Fetches `http(s)://` URLs with reqwest and everything else from disk
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(network)?;
        Ok(body.to_vec())
    }
}

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            tracing::debug!("GET {}", url);
            return self.fetch_http(url).await;
        }
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        tokio::fs::read(&path)
            .await
            .map_err(|source| FetchError::Io { path, source })
    }
}
