//! Request entry points: awaitable execution and fire-and-forget enqueueing.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::domain::entities::{
    ErrorResult, ImageData, ImageRequest, ImageRequestBuilder, ImageResult, RequestDefaults,
};
use crate::domain::errors::{Cancelled, PipelineError};
use crate::domain::ports::EventListener;
use crate::infrastructure::cache::{CacheStats, DiskCache, MemoryCache, TrimLevel};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::dispatch::{Dispatchers, cancellable};
use crate::infrastructure::fetch::HttpFetcher;
use crate::infrastructure::lifecycle::LifecycleGate;
use crate::infrastructure::logging::LoggingEventListener;

use super::components::ComponentRegistry;
use super::pipeline::{Chain, EngineInterceptor, Events, Interceptor, Outcome};

/// Message sent when an enqueued request finishes.
#[derive(Debug, Clone)]
pub struct ImageLoadedEvent {
    /// Identifier of the request, matching [`RequestHandle::id`].
    pub id: Uuid,
    /// The requested data.
    pub data: ImageData,
    /// Terminal outcome.
    pub outcome: Outcome,
}

/// Handle to an enqueued request.
#[derive(Debug)]
pub struct RequestHandle {
    id: Uuid,
    token: CancellationToken,
    request: ImageRequest,
    task: JoinHandle<Outcome>,
}

impl RequestHandle {
    /// Request identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Cancels the request. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the request reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the terminal outcome.
    ///
    /// # Errors
    /// Returns [`Cancelled`] if the request was cancelled.
    pub async fn join(self) -> Outcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(_) if self.token.is_cancelled() => Err(Cancelled),
            Err(e) => Ok(ImageResult::Error(ErrorResult {
                error: Arc::new(PipelineError::dispatch(format!("request task failed: {e}"))),
                request: self.request,
            })),
        }
    }
}

struct LoaderInner {
    memory_cache: Arc<MemoryCache>,
    components: Arc<ComponentRegistry>,
    dispatchers: Dispatchers,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    listener: Option<Arc<dyn EventListener>>,
    defaults: RequestDefaults,
    lifecycle: LifecycleGate,
    event_tx: Option<mpsc::UnboundedSender<ImageLoadedEvent>>,
    root: CancellationToken,
}

impl LoaderInner {
    async fn run(&self, request: ImageRequest, cancel: CancellationToken) -> Outcome {
        let events = Events::new(self.listener.clone(), request.listener.clone());
        events.on_start(&request);

        let outcome = match cancellable(&cancel, request.size_resolver.size()).await {
            Ok(size) => {
                let chain = Chain::new(
                    request.clone(),
                    size,
                    self.interceptors.clone(),
                    cancel.clone(),
                    events.clone(),
                );
                chain.proceed(request.clone()).await
            }
            Err(cancelled) => Err(cancelled),
        };

        match &outcome {
            Ok(ImageResult::Success(success)) => {
                debug!(source = %success.data_source, sampled = success.is_sampled, "Image loaded");
                events.on_success(&request, success);
            }
            Ok(ImageResult::Error(failure)) => {
                warn!(error = %failure.error, "Image request failed");
                events.on_error(&failure.request, failure);
            }
            Err(_) => {
                debug!("Image request cancelled");
                events.on_cancel(&request);
            }
        }
        outcome
    }
}

/// Executes image requests against a shared memory cache.
///
/// Cheap to clone; clones share the cache, components and root cancellation.
#[derive(Clone)]
pub struct ImageLoader {
    inner: Arc<LoaderInner>,
}

impl ImageLoader {
    /// Starts building a loader.
    #[must_use]
    pub fn builder() -> ImageLoaderBuilder {
        ImageLoaderBuilder::default()
    }

    /// Builds a loader with the built-in components from configuration.
    ///
    /// A disk cache that cannot be opened is logged and skipped.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub async fn from_config(
        config: &AppConfig,
        event_tx: Option<mpsc::UnboundedSender<ImageLoadedEvent>>,
    ) -> Result<Self, PipelineError> {
        let disk_cache = if config.disk_cache.enabled {
            match DiskCache::from_config(&config.disk_cache).await {
                Ok(cache) => Some(Arc::new(cache)),
                Err(e) => {
                    warn!(error = %e, "Disk cache unavailable, continuing without it");
                    None
                }
            }
        } else {
            None
        };

        let http = HttpFetcher::new(&config.http, disk_cache)?;
        let mut builder = Self::builder()
            .memory_cache(Arc::new(MemoryCache::from_config(&config.memory_cache)))
            .components(ComponentRegistry::with_defaults(Some(http)))
            .dispatchers(Dispatchers::from_config(&config.dispatch))
            .defaults(config.defaults.clone());
        if config.log_events {
            builder = builder.listener(Arc::new(LoggingEventListener));
        }
        if let Some(tx) = event_tx {
            builder = builder.event_sender(tx);
        }
        Ok(builder.build())
    }

    /// Starts a request builder with the configured defaults applied.
    #[must_use]
    pub fn request(&self, data: impl Into<ImageData>) -> ImageRequestBuilder {
        ImageRequest::builder_with(data, &self.inner.defaults)
    }

    /// Executes `request` and waits for its outcome.
    ///
    /// Dropping the returned future cancels the request.
    ///
    /// # Errors
    /// Returns [`Cancelled`] if the request or the loader was cancelled.
    pub async fn execute(&self, request: ImageRequest) -> Outcome {
        let token = self.inner.root.child_token();
        self.execute_with_token(Uuid::new_v4(), request, token).await
    }

    async fn execute_with_token(
        &self,
        id: Uuid,
        request: ImageRequest,
        token: CancellationToken,
    ) -> Outcome {
        let _guard = token.clone().drop_guard();
        let span = info_span!("image_request", %id, data = %request.data);
        let fallback = request.clone();
        let inner = self.inner.clone();
        let work = async move { inner.run(request, token).await }.instrument(span);

        match self.inner.dispatchers.interceptor.run(work).await {
            Ok(outcome) => outcome,
            Err(e) => Ok(ImageResult::Error(ErrorResult {
                error: Arc::new(e),
                request: fallback,
            })),
        }
    }

    /// Enqueues `request` and returns immediately.
    ///
    /// The request waits for the lifecycle gate to open before it starts, and
    /// its outcome is also published on the event channel if one is set.
    #[must_use]
    pub fn enqueue(&self, request: ImageRequest) -> RequestHandle {
        let id = Uuid::new_v4();
        let token = self.inner.root.child_token();
        let loader = self.clone();
        let task_token = token.clone();
        let task_request = request.clone();

        let task = tokio::spawn(async move {
            let data = task_request.data.clone();
            let gate = loader.inner.lifecycle.clone();
            let outcome = match cancellable(&task_token, gate.wait_active()).await {
                Ok(()) => loader.execute_with_token(id, task_request, task_token).await,
                Err(cancelled) => Err(cancelled),
            };
            if let Some(tx) = &loader.inner.event_tx {
                let _ = tx.send(ImageLoadedEvent {
                    id,
                    data,
                    outcome: outcome.clone(),
                });
            }
            outcome
        });

        RequestHandle {
            id,
            token,
            request,
            task,
        }
    }

    /// Gate that holds enqueued requests back while inactive.
    #[must_use]
    pub fn lifecycle(&self) -> &LifecycleGate {
        &self.inner.lifecycle
    }

    /// The shared memory cache.
    #[must_use]
    pub fn memory_cache(&self) -> &Arc<MemoryCache> {
        &self.inner.memory_cache
    }

    /// Registered components.
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.inner.components
    }

    /// Forwards a memory pressure signal to the cache.
    pub fn trim_memory(&self, level: TrimLevel) {
        self.inner.memory_cache.trim_memory(level);
    }

    /// Memory cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.memory_cache.stats()
    }

    /// Cancels every in-flight and queued request. New requests made after
    /// shutdown complete as cancelled.
    pub fn shutdown(&self) {
        info!("Shutting down image loader");
        self.inner.root.cancel();
    }

    /// Returns true once [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.root.is_cancelled()
    }
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("memory_cache", &self.inner.memory_cache)
            .field("components", &self.inner.components)
            .field("defaults", &self.inner.defaults)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ImageLoader`].
#[derive(Default)]
pub struct ImageLoaderBuilder {
    memory_cache: Option<Arc<MemoryCache>>,
    components: Option<ComponentRegistry>,
    dispatchers: Dispatchers,
    listener: Option<Arc<dyn EventListener>>,
    defaults: RequestDefaults,
    lifecycle: LifecycleGate,
    event_tx: Option<mpsc::UnboundedSender<ImageLoadedEvent>>,
}

impl ImageLoaderBuilder {
    /// Shares an existing memory cache.
    #[must_use]
    pub fn memory_cache(mut self, cache: Arc<MemoryCache>) -> Self {
        self.memory_cache = Some(cache);
        self
    }

    /// Sets the component registry. Defaults to the built-in components
    /// without network loading.
    #[must_use]
    pub fn components(mut self, components: ComponentRegistry) -> Self {
        self.components = Some(components);
        self
    }

    /// Sets the stage dispatchers. Defaults to running everything inline.
    #[must_use]
    pub fn dispatchers(mut self, dispatchers: Dispatchers) -> Self {
        self.dispatchers = dispatchers;
        self
    }

    /// Sets a listener notified for every request.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets request defaults used by [`ImageLoader::request`].
    #[must_use]
    pub fn defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the lifecycle gate for enqueued requests.
    #[must_use]
    pub fn lifecycle(mut self, gate: LifecycleGate) -> Self {
        self.lifecycle = gate;
        self
    }

    /// Publishes enqueued outcomes on `tx`.
    #[must_use]
    pub fn event_sender(mut self, tx: mpsc::UnboundedSender<ImageLoadedEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Builds the loader.
    #[must_use]
    pub fn build(self) -> ImageLoader {
        let memory_cache = self
            .memory_cache
            .unwrap_or_else(|| Arc::new(MemoryCache::default()));
        let components = Arc::new(
            self.components
                .unwrap_or_else(|| ComponentRegistry::with_defaults(None)),
        );

        let engine: Arc<dyn Interceptor> = Arc::new(EngineInterceptor::new(
            memory_cache.clone(),
            components.clone(),
            self.dispatchers.clone(),
        ));
        let interceptors: Arc<[Arc<dyn Interceptor>]> = components
            .interceptors()
            .iter()
            .cloned()
            .chain(std::iter::once(engine))
            .collect();

        ImageLoader {
            inner: Arc::new(LoaderInner {
                memory_cache,
                components,
                dispatchers: self.dispatchers,
                interceptors,
                listener: self.listener,
                defaults: self.defaults,
                lifecycle: self.lifecycle,
                event_tx: self.event_tx,
                root: CancellationToken::new(),
            }),
        }
    }
}
