//! Interceptor chain that every request travels through.
//!
//! User interceptors run in registration order and the [`EngineInterceptor`]
//! always runs last. An interceptor may rewrite the request before calling
//! [`Chain::proceed`], or return a result without proceeding.

mod engine;
mod events;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::entities::{ErrorResult, ImageRequest, ImageResult, Size};
use crate::domain::errors::{Cancelled, PipelineError};

pub use engine::EngineInterceptor;
pub(crate) use events::Events;

/// Terminal outcome of a request: a result, or cancellation.
pub type Outcome = Result<ImageResult, Cancelled>;

/// A stage wrapped around the rest of the pipeline.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Handles the request, usually by calling `chain.proceed(..)`.
    async fn intercept(&self, chain: Chain) -> Outcome;
}

/// In-flight request state handed from one interceptor to the next.
pub struct Chain {
    request: ImageRequest,
    size: Size,
    index: usize,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    cancel: CancellationToken,
    events: Events,
}

impl Chain {
    pub(crate) fn new(
        request: ImageRequest,
        size: Size,
        interceptors: Arc<[Arc<dyn Interceptor>]>,
        cancel: CancellationToken,
        events: Events,
    ) -> Self {
        Self {
            request,
            size,
            index: 0,
            interceptors,
            cancel,
            events,
        }
    }

    /// The request as seen by the current interceptor.
    #[must_use]
    pub const fn request(&self) -> &ImageRequest {
        &self.request
    }

    /// The resolved target size.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Replaces the resolved size for the remaining stages.
    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Token that fires when the request is cancelled.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) const fn events(&self) -> &Events {
        &self.events
    }

    /// Passes `request` to the next interceptor.
    pub async fn proceed(self, request: ImageRequest) -> Outcome {
        let Some(next) = self.interceptors.get(self.index).cloned() else {
            return Ok(ImageResult::Error(ErrorResult {
                error: Arc::new(PipelineError::dispatch("interceptor chain ended without a result")),
                request,
            }));
        };
        let chain = Self {
            request,
            index: self.index + 1,
            ..self
        };
        next.intercept(chain).await
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("request", &self.request)
            .field("size", &self.size)
            .field("index", &self.index)
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}
