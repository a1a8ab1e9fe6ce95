use std::sync::Arc;

use crate::domain::entities::{
    CacheKey, DataSource, ErrorResult, ImageData, ImageRequest, Size, SuccessResult,
};
use crate::domain::ports::EventListener;

/// Fans stage notifications out to the loader-wide listener and the
/// request's own listener, in that order.
#[derive(Clone, Default)]
pub(crate) struct Events {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl Events {
    pub(crate) fn new(
        global: Option<Arc<dyn EventListener>>,
        request: Option<Arc<dyn EventListener>>,
    ) -> Self {
        Self {
            listeners: global.into_iter().chain(request).collect(),
        }
    }

    fn each(&self, f: impl Fn(&dyn EventListener)) {
        for listener in &self.listeners {
            f(listener.as_ref());
        }
    }
}

impl EventListener for Events {
    fn on_start(&self, request: &ImageRequest) {
        self.each(|l| l.on_start(request));
    }

    fn map_start(&self, request: &ImageRequest, input: &ImageData) {
        self.each(|l| l.map_start(request, input));
    }

    fn map_end(&self, request: &ImageRequest, output: &ImageData, key: Option<&CacheKey>) {
        self.each(|l| l.map_end(request, output, key));
    }

    fn fetch_start(&self, request: &ImageRequest, fetcher: &str) {
        self.each(|l| l.fetch_start(request, fetcher));
    }

    fn fetch_end(&self, request: &ImageRequest, fetcher: &str, source: DataSource) {
        self.each(|l| l.fetch_end(request, fetcher, source));
    }

    fn decode_start(&self, request: &ImageRequest, decoder: &str) {
        self.each(|l| l.decode_start(request, decoder));
    }

    fn decode_end(&self, request: &ImageRequest, decoder: &str, is_sampled: bool) {
        self.each(|l| l.decode_end(request, decoder, is_sampled));
    }

    fn transform_start(&self, request: &ImageRequest, size: Size) {
        self.each(|l| l.transform_start(request, size));
    }

    fn transform_end(&self, request: &ImageRequest) {
        self.each(|l| l.transform_end(request));
    }

    fn on_success(&self, request: &ImageRequest, result: &SuccessResult) {
        self.each(|l| l.on_success(request, result));
    }

    fn on_error(&self, request: &ImageRequest, result: &ErrorResult) {
        self.each(|l| l.on_error(request, result));
    }

    fn on_cancel(&self, request: &ImageRequest) {
        self.each(|l| l.on_cancel(request));
    }
}
