//! Event listener that reports stage boundaries through `tracing`.

use tracing::{debug, trace};

use crate::domain::entities::{
    CacheKey, DataSource, ErrorResult, ImageData, ImageRequest, Size, SuccessResult,
};
use crate::domain::ports::EventListener;

/// Logs every pipeline stage at trace level and terminal states at debug.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_start(&self, request: &ImageRequest) {
        trace!(data = %request.data, "start");
    }

    fn map_start(&self, _request: &ImageRequest, input: &ImageData) {
        trace!(input = %input, "map start");
    }

    fn map_end(&self, _request: &ImageRequest, output: &ImageData, key: Option<&CacheKey>) {
        match key {
            Some(key) => trace!(output = %output, key = %key, "map end"),
            None => trace!(output = %output, "map end, uncacheable"),
        }
    }

    fn fetch_start(&self, _request: &ImageRequest, fetcher: &str) {
        trace!(fetcher, "fetch start");
    }

    fn fetch_end(&self, _request: &ImageRequest, fetcher: &str, source: DataSource) {
        trace!(fetcher, source = %source, "fetch end");
    }

    fn decode_start(&self, _request: &ImageRequest, decoder: &str) {
        trace!(decoder, "decode start");
    }

    fn decode_end(&self, _request: &ImageRequest, decoder: &str, is_sampled: bool) {
        trace!(decoder, is_sampled, "decode end");
    }

    fn transform_start(&self, request: &ImageRequest, size: Size) {
        trace!(size = %size, keys = ?request.transformation_keys(), "transform start");
    }

    fn transform_end(&self, _request: &ImageRequest) {
        trace!("transform end");
    }

    fn on_success(&self, request: &ImageRequest, result: &SuccessResult) {
        let (width, height) = result.artifact.dimensions();
        debug!(
            data = %request.data,
            source = %result.data_source,
            width,
            height,
            sampled = result.is_sampled,
            "success"
        );
    }

    fn on_error(&self, request: &ImageRequest, result: &ErrorResult) {
        debug!(data = %request.data, error = %result.error, "error");
    }

    fn on_cancel(&self, request: &ImageRequest) {
        debug!(data = %request.data, "cancel");
    }
}
