//! Port for fetching raw image data.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::domain::entities::{Artifact, CachePolicy, DataSource, ImageData, Scale, Size};
use crate::domain::errors::PipelineError;

/// Options passed to a fetcher.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Resolved target size.
    pub size: Size,
    /// Scale policy.
    pub scale: Scale,
    /// Whether output may be smaller than requested.
    pub allow_inexact: bool,
    /// Disk cache policy for fetchers backed by one.
    pub disk_cache_policy: CachePolicy,
    /// Extra request headers for network fetchers.
    pub headers: Vec<(String, String)>,
}

/// Output of a fetcher.
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// Encoded bytes that still need decoding.
    Source {
        /// Raw bytes.
        bytes: Bytes,
        /// Content type if known.
        mime_type: Option<String>,
        /// Where the bytes came from.
        data_source: DataSource,
    },
    /// An artifact that needs no decoding.
    Image {
        /// The artifact.
        artifact: Artifact,
        /// Whether the artifact is downsampled.
        is_sampled: bool,
        /// Where the artifact came from.
        data_source: DataSource,
    },
}

/// Port for fetching image data from a source.
/// Implementations must be thread-safe.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if this fetcher can load `data`.
    fn handles(&self, data: &ImageData) -> bool;

    /// Stable identity of `data` for memory caching, or `None` if the data
    /// has no addressable identity.
    async fn cache_key(&self, data: &ImageData) -> Option<String>;

    /// Fetches `data`. Implementations should abort promptly when `cancel`
    /// fires; the pipeline also stops waiting on its own.
    async fn fetch(
        &self,
        data: &ImageData,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<FetchResult, PipelineError>;
}
