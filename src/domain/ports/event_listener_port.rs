//! Port for observing pipeline stage boundaries.

use crate::domain::entities::{CacheKey, DataSource, ErrorResult, ImageData, ImageRequest, Size, SuccessResult};

/// Receives stage-boundary notifications.
///
/// Purely observational: every method has an empty default, callbacks must
/// not block, and delivery is best-effort.
#[allow(unused_variables)]
pub trait EventListener: Send + Sync {
    /// The request entered the pipeline.
    fn on_start(&self, request: &ImageRequest) {}

    /// Input mapping is about to run.
    fn map_start(&self, request: &ImageRequest, input: &ImageData) {}

    /// Input mapping finished.
    fn map_end(&self, request: &ImageRequest, output: &ImageData, key: Option<&CacheKey>) {}

    /// A fetcher is about to run.
    fn fetch_start(&self, request: &ImageRequest, fetcher: &str) {}

    /// The fetcher finished.
    fn fetch_end(&self, request: &ImageRequest, fetcher: &str, source: DataSource) {}

    /// A decoder is about to run.
    fn decode_start(&self, request: &ImageRequest, decoder: &str) {}

    /// The decoder finished.
    fn decode_end(&self, request: &ImageRequest, decoder: &str, is_sampled: bool) {}

    /// Transformations are about to run.
    fn transform_start(&self, request: &ImageRequest, size: Size) {}

    /// Transformations finished.
    fn transform_end(&self, request: &ImageRequest) {}

    /// The request succeeded.
    fn on_success(&self, request: &ImageRequest, result: &SuccessResult) {}

    /// The request failed.
    fn on_error(&self, request: &ImageRequest, result: &ErrorResult) {}

    /// The request was cancelled.
    fn on_cancel(&self, request: &ImageRequest) {}
}
