//! Fetcher for bytes already in memory.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::entities::{DataSource, ImageData};
use crate::domain::errors::PipelineError;
use crate::domain::ports::{FetchOptions, FetchResult, Fetcher};

/// Serves [`ImageData::Bytes`]. Such data has no stable identity, so results
/// are never memory cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryFetcher;

#[async_trait]
impl Fetcher for MemoryFetcher {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn handles(&self, data: &ImageData) -> bool {
        matches!(data, ImageData::Bytes(_))
    }

    async fn cache_key(&self, _data: &ImageData) -> Option<String> {
        None
    }

    async fn fetch(
        &self,
        data: &ImageData,
        _options: &FetchOptions,
        _cancel: &CancellationToken,
    ) -> Result<FetchResult, PipelineError> {
        match data {
            ImageData::Bytes(bytes) => Ok(FetchResult::Source {
                bytes: bytes.clone(),
                mime_type: None,
                data_source: DataSource::Memory,
            }),
            other => Err(PipelineError::fetch(format!(
                "memory fetcher cannot load '{other}'"
            ))),
        }
    }
}
