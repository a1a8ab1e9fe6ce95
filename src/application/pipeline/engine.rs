//! The terminal pipeline stage: key resolution, cache, fetch, decode and transform.

use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::application::components::ComponentRegistry;
use crate::domain::entities::{
    Artifact, CacheKey, CacheValue, DataSource, ErrorResult, ImageRequest, ImageResult, Size,
    SuccessResult, is_format_allowed,
};
use crate::domain::errors::{Cancelled, PipelineError, StageError};
use crate::domain::ports::{
    DecodeOptions, EventListener, FetchOptions, FetchResult, Transformation,
};
use crate::domain::services::SizeMatcher;
use crate::infrastructure::cache::MemoryCache;
use crate::infrastructure::dispatch::{Dispatchers, cancellable, ensure_active};

use super::{Chain, Events, Interceptor, Outcome};

/// Terminal interceptor: resolves the key, consults the memory cache, and
/// otherwise runs fetch, decode and transform before writing back.
pub struct EngineInterceptor {
    memory_cache: Arc<MemoryCache>,
    components: Arc<ComponentRegistry>,
    dispatchers: Dispatchers,
}

impl EngineInterceptor {
    /// Creates the engine.
    #[must_use]
    pub const fn new(
        memory_cache: Arc<MemoryCache>,
        components: Arc<ComponentRegistry>,
        dispatchers: Dispatchers,
    ) -> Self {
        Self {
            memory_cache,
            components,
            dispatchers,
        }
    }

    async fn execute(
        &self,
        request: &ImageRequest,
        size: Size,
        cancel: &CancellationToken,
        events: &Events,
    ) -> Result<SuccessResult, StageError> {
        ensure_active(cancel)?;

        events.map_start(request, &request.data);
        let data = self.components.map(request.data.clone());
        let fetcher = self
            .components
            .fetcher_for(&data)
            .cloned()
            .ok_or_else(|| PipelineError::NoApplicableFetcher {
                data: data.to_string(),
            })?;
        let key = match &request.memory_cache_key {
            Some(key) => Some(key.clone()),
            None => CacheKey::compute(
                fetcher.cache_key(&data).await,
                request.transformation_keys(),
                size,
                &request.parameters,
            ),
        };
        events.map_end(request, &data, key.as_ref());

        let allow_inexact = request
            .precision
            .allows_inexact(request.size_resolver.is_deferred());

        if request.memory_cache_policy.read_enabled()
            && let Some(key) = &key
            && let Some(value) = self.memory_cache.get(key)
        {
            if is_cached_value_valid(key, &value, request, size, allow_inexact) {
                debug!(key = %key, "Serving image from memory cache");
                return Ok(SuccessResult {
                    artifact: Artifact::Static(value.image),
                    is_sampled: value.is_sampled,
                    data_source: DataSource::MemoryCache,
                    memory_cache_key: Some(key.clone()),
                });
            }
            trace!(key = %key, "Cached image does not satisfy request");
        }

        ensure_active(cancel)?;
        let fetcher_name = fetcher.name();
        events.fetch_start(request, fetcher_name);
        let options = FetchOptions {
            size,
            scale: request.scale,
            allow_inexact,
            disk_cache_policy: request.disk_cache_policy,
            headers: request.headers.clone(),
        };
        let fetched = {
            let data = data.clone();
            let token = cancel.clone();
            let work = async move { fetcher.fetch(&data, &options, &token).await };
            cancellable(cancel, self.dispatchers.fetch.run(work)).await???
        };

        let (artifact, is_sampled, data_source) = match fetched {
            FetchResult::Image {
                artifact,
                is_sampled,
                data_source,
            } => {
                events.fetch_end(request, fetcher_name, data_source);
                (artifact, is_sampled, data_source)
            }
            FetchResult::Source {
                bytes,
                mime_type,
                data_source,
            } => {
                events.fetch_end(request, fetcher_name, data_source);
                ensure_active(cancel)?;

                let decoder = self
                    .components
                    .decoder_for(&bytes, mime_type.as_deref())
                    .cloned()
                    .ok_or(PipelineError::NoApplicableDecoder { mime_type })?;
                let decoder_name = decoder.name();
                events.decode_start(request, decoder_name);

                let options = DecodeOptions {
                    size,
                    scale: request.scale,
                    allow_inexact,
                    allowed_formats: request.allowed_formats.clone(),
                };
                let decoded = cancellable(
                    cancel,
                    self.dispatchers
                        .decode
                        .run_blocking(move || decoder.decode(&bytes, &options)),
                )
                .await???;
                events.decode_end(request, decoder_name, decoded.is_sampled);
                (decoded.artifact, decoded.is_sampled, data_source)
            }
        };

        let artifact = if request.transformations.is_empty() {
            artifact
        } else {
            ensure_active(cancel)?;
            if matches!(artifact, Artifact::Animated(_)) {
                debug!("Flattening animation to its first frame for transformations");
            }
            events.transform_start(request, size);
            let input = artifact.to_static();
            let transformations = request.transformations.clone();
            let token = cancel.clone();
            let output = cancellable(
                cancel,
                self.dispatchers.transform.run_blocking(move || {
                    apply_transformations(&input, &transformations, size, &token)
                }),
            )
            .await???;
            events.transform_end(request);
            Artifact::Static(Arc::new(output))
        };

        // Never publish a result for a request that was cancelled meanwhile.
        ensure_active(cancel)?;

        let mut memory_cache_key = None;
        if request.memory_cache_policy.write_enabled()
            && let Some(key) = key
            && let Artifact::Static(image) = &artifact
        {
            self.memory_cache
                .set(key.clone(), CacheValue::new(image.clone(), is_sampled, size));
            memory_cache_key = Some(key);
        }

        Ok(SuccessResult {
            artifact,
            is_sampled,
            data_source,
            memory_cache_key,
        })
    }
}

/// A cached value is reusable when its pixel format is acceptable and its
/// size satisfies the request.
fn is_cached_value_valid(
    key: &CacheKey,
    value: &CacheValue,
    request: &ImageRequest,
    size: Size,
    allow_inexact: bool,
) -> bool {
    is_format_allowed(&value.image, &request.allowed_formats)
        && SizeMatcher::is_cache_value_valid(key, value, size, request.scale, allow_inexact)
}

/// Applies `transformations` in order, checking for cancellation between
/// each one.
fn apply_transformations(
    input: &DynamicImage,
    transformations: &[Arc<dyn Transformation>],
    size: Size,
    cancel: &CancellationToken,
) -> Result<DynamicImage, StageError> {
    let mut current: Option<DynamicImage> = None;
    for transformation in transformations {
        ensure_active(cancel)?;
        let source = current.as_ref().unwrap_or(input);
        let next = transformation.transform(source, size)?;
        current = Some(next);
    }
    Ok(current.unwrap_or_else(|| input.clone()))
}

#[async_trait]
impl Interceptor for EngineInterceptor {
    async fn intercept(&self, chain: Chain) -> Outcome {
        let size = chain.size();
        let cancel = chain.cancellation_token().clone();
        let request = chain.request();

        match self.execute(request, size, &cancel, chain.events()).await {
            Ok(success) => Ok(ImageResult::Success(success)),
            Err(StageError::Cancelled(cancelled)) => Err(cancelled),
            // A stage that failed because it was torn down is still a cancellation.
            Err(StageError::Failed(_)) if cancel.is_cancelled() => Err(Cancelled),
            Err(StageError::Failed(error)) => Ok(ImageResult::Error(ErrorResult {
                error: Arc::new(error),
                request: request.clone(),
            })),
        }
    }
}

impl std::fmt::Debug for EngineInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineInterceptor")
            .field("components", &self.components)
            .field("dispatchers", &self.dispatchers)
            .finish_non_exhaustive()
    }
}
