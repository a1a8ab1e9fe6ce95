//! Network fetcher with an optional disk cache in front.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::entities::{DataSource, ImageData};
use crate::domain::errors::PipelineError;
use crate::domain::ports::{FetchOptions, FetchResult, Fetcher};
use crate::infrastructure::cache::DiskCache;
use crate::infrastructure::dispatch::cancellable;

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User agent header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("{}/{}", crate::NAME, crate::VERSION)
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Fetches `http` and `https` URLs, reading and writing the disk cache
/// according to the request's disk cache policy.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    disk_cache: Option<Arc<DiskCache>>,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &HttpConfig, disk_cache: Option<Arc<DiskCache>>) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PipelineError::fetch(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, disk_cache })
    }

    /// Creates a fetcher around an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, disk_cache: Option<Arc<DiskCache>>) -> Self {
        Self { client, disk_cache }
    }

    /// Downloads `url`, returning the body and its content type.
    async fn download(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<(Bytes, Option<String>), PipelineError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::fetch(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::fetch(format!("Failed to read body: {e}")))?;

        Ok((bytes, content_type))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    fn handles(&self, data: &ImageData) -> bool {
        matches!(data, ImageData::Url(url) if is_http_url(url))
    }

    async fn cache_key(&self, data: &ImageData) -> Option<String> {
        match data {
            ImageData::Url(url) => Some(url.clone()),
            _ => None,
        }
    }

    async fn fetch(
        &self,
        data: &ImageData,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<FetchResult, PipelineError> {
        let ImageData::Url(url) = data else {
            return Err(PipelineError::fetch(format!(
                "http fetcher cannot load '{data}'"
            )));
        };

        if options.disk_cache_policy.read_enabled()
            && let Some(disk) = &self.disk_cache
            && let Some(bytes) = disk.get(url).await
        {
            debug!(url = %url, "Serving image from disk cache");
            return Ok(FetchResult::Source {
                bytes,
                mime_type: None,
                data_source: DataSource::Disk,
            });
        }

        debug!(url = %url, "Downloading image from network");
        let (bytes, content_type) = cancellable(cancel, self.download(url, &options.headers))
            .await
            .map_err(|_| PipelineError::fetch("download cancelled"))??;

        if options.disk_cache_policy.write_enabled()
            && let Some(disk) = self.disk_cache.clone()
        {
            let key = url.clone();
            let bytes_for_disk = bytes.clone();
            tokio::spawn(async move {
                if let Err(e) = disk.put(&key, &bytes_for_disk).await {
                    warn!(url = %key, error = %e, "Failed to cache to disk");
                }
            });
        }

        Ok(FetchResult::Source {
            bytes,
            mime_type: content_type,
            data_source: DataSource::Network,
        })
    }
}

fn is_http_url(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
