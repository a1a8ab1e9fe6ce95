//! Image requests and their results.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::errors::PipelineError;
use crate::domain::ports::{EventListener, FixedSizeResolver, SizeResolver, Transformation};

use super::artifact::{Artifact, DataSource, ImageData, PixelFormat};
use super::cache_key::CacheKey;
use super::size::{CachePolicy, Precision, Scale, Size};

/// Describes what to load and how.
#[derive(Clone)]
pub struct ImageRequest {
    /// Source of the image.
    pub data: ImageData,
    /// Ordered transformations applied after decoding.
    pub transformations: Vec<Arc<dyn Transformation>>,
    /// Resolves the target size.
    pub size_resolver: Arc<dyn SizeResolver>,
    /// Size matching strictness.
    pub precision: Precision,
    /// Scale policy.
    pub scale: Scale,
    /// Memory cache read/write policy.
    pub memory_cache_policy: CachePolicy,
    /// Disk cache read/write policy.
    pub disk_cache_policy: CachePolicy,
    /// Acceptable pixel formats; empty accepts any.
    pub allowed_formats: Vec<PixelFormat>,
    /// Extra parameters that qualify the memory cache key.
    pub parameters: BTreeMap<String, String>,
    /// Explicit memory cache key, bypassing key computation.
    pub memory_cache_key: Option<CacheKey>,
    /// Extra headers for network fetchers.
    pub headers: Vec<(String, String)>,
    /// Per-request event listener, notified in addition to the loader's.
    pub listener: Option<Arc<dyn EventListener>>,
}

impl ImageRequest {
    /// Starts building a request for `data`.
    #[must_use]
    pub fn builder(data: impl Into<ImageData>) -> ImageRequestBuilder {
        ImageRequestBuilder::new(data.into())
    }

    /// Starts building a request pre-populated with configured defaults.
    #[must_use]
    pub fn builder_with(data: impl Into<ImageData>, defaults: &RequestDefaults) -> ImageRequestBuilder {
        Self::builder(data)
            .precision(defaults.precision)
            .scale(defaults.scale)
            .memory_cache_policy(defaults.memory_cache_policy)
            .disk_cache_policy(defaults.disk_cache_policy)
            .allowed_formats(defaults.allowed_formats.clone())
    }

    /// Creates a request with default options.
    #[must_use]
    pub fn new(data: impl Into<ImageData>) -> Self {
        Self::builder(data).build()
    }

    /// Ordered cache keys of the configured transformations.
    #[must_use]
    pub fn transformation_keys(&self) -> Vec<String> {
        self.transformations.iter().map(|t| t.cache_key()).collect()
    }
}

impl std::fmt::Debug for ImageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRequest")
            .field("data", &self.data)
            .field("transformations", &self.transformation_keys())
            .field("precision", &self.precision)
            .field("scale", &self.scale)
            .field("memory_cache_policy", &self.memory_cache_policy)
            .field("disk_cache_policy", &self.disk_cache_policy)
            .field("allowed_formats", &self.allowed_formats)
            .field("parameters", &self.parameters)
            .field("memory_cache_key", &self.memory_cache_key)
            .finish_non_exhaustive()
    }
}

/// Option values applied to requests built through a loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDefaults {
    /// Default precision.
    #[serde(default)]
    pub precision: Precision,

    /// Default scale.
    #[serde(default)]
    pub scale: Scale,

    /// Default memory cache policy.
    #[serde(default)]
    pub memory_cache_policy: CachePolicy,

    /// Default disk cache policy.
    #[serde(default)]
    pub disk_cache_policy: CachePolicy,

    /// Default pixel format restriction; empty accepts any.
    #[serde(default)]
    pub allowed_formats: Vec<PixelFormat>,
}

/// Builder for [`ImageRequest`].
pub struct ImageRequestBuilder {
    request: ImageRequest,
}

impl ImageRequestBuilder {
    fn new(data: ImageData) -> Self {
        Self {
            request: ImageRequest {
                data,
                transformations: Vec::new(),
                size_resolver: Arc::new(FixedSizeResolver(Size::Original)),
                precision: Precision::default(),
                scale: Scale::default(),
                memory_cache_policy: CachePolicy::default(),
                disk_cache_policy: CachePolicy::default(),
                allowed_formats: Vec::new(),
                parameters: BTreeMap::new(),
                memory_cache_key: None,
                headers: Vec::new(),
                listener: None,
            },
        }
    }

    /// Sets a fixed target size.
    #[must_use]
    pub fn size(mut self, size: Size) -> Self {
        self.request.size_resolver = Arc::new(FixedSizeResolver(size));
        self
    }

    /// Sets a custom size resolver.
    #[must_use]
    pub fn size_resolver(mut self, resolver: Arc<dyn SizeResolver>) -> Self {
        self.request.size_resolver = resolver;
        self
    }

    /// Appends a transformation.
    #[must_use]
    pub fn transformation(mut self, transformation: Arc<dyn Transformation>) -> Self {
        self.request.transformations.push(transformation);
        self
    }

    /// Replaces the transformation list.
    #[must_use]
    pub fn transformations(mut self, transformations: Vec<Arc<dyn Transformation>>) -> Self {
        self.request.transformations = transformations;
        self
    }

    /// Sets the precision policy.
    #[must_use]
    pub const fn precision(mut self, precision: Precision) -> Self {
        self.request.precision = precision;
        self
    }

    /// Sets the scale policy.
    #[must_use]
    pub const fn scale(mut self, scale: Scale) -> Self {
        self.request.scale = scale;
        self
    }

    /// Sets the memory cache policy.
    #[must_use]
    pub const fn memory_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.request.memory_cache_policy = policy;
        self
    }

    /// Sets the disk cache policy.
    #[must_use]
    pub const fn disk_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.request.disk_cache_policy = policy;
        self
    }

    /// Restricts acceptable pixel formats.
    #[must_use]
    pub fn allowed_formats(mut self, formats: Vec<PixelFormat>) -> Self {
        self.request.allowed_formats = formats;
        self
    }

    /// Adds a cache-key parameter.
    #[must_use]
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.parameters.insert(key.into(), value.into());
        self
    }

    /// Overrides the memory cache key.
    #[must_use]
    pub fn memory_cache_key(mut self, key: CacheKey) -> Self {
        self.request.memory_cache_key = Some(key);
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a per-request event listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.request.listener = Some(listener);
        self
    }

    /// Builds the request.
    #[must_use]
    pub fn build(self) -> ImageRequest {
        self.request
    }
}

/// A successfully loaded image.
#[derive(Debug, Clone)]
pub struct SuccessResult {
    /// The artifact.
    pub artifact: Artifact,
    /// True if the artifact is not a full-resolution exact decode.
    pub is_sampled: bool,
    /// Where the artifact came from.
    pub data_source: DataSource,
    /// The memory cache key used, if the request was cacheable.
    pub memory_cache_key: Option<CacheKey>,
}

/// A failed request.
#[derive(Debug, Clone)]
pub struct ErrorResult {
    /// The originating failure.
    pub error: Arc<PipelineError>,
    /// The request that failed.
    pub request: ImageRequest,
}

/// Terminal state of a request that was not cancelled.
#[derive(Debug, Clone)]
pub enum ImageResult {
    /// The image loaded.
    Success(SuccessResult),
    /// The image failed to load.
    Error(ErrorResult),
}

impl ImageResult {
    /// Returns the success value, if any.
    #[must_use]
    pub const fn success(&self) -> Option<&SuccessResult> {
        match self {
            Self::Success(s) => Some(s),
            Self::Error(_) => None,
        }
    }

    /// Returns the error value, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorResult> {
        match self {
            Self::Success(_) => None,
            Self::Error(e) => Some(e),
        }
    }

    /// Returns true on success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_with_applies_defaults() {
        let defaults = RequestDefaults {
            precision: Precision::Exact,
            scale: Scale::Fill,
            memory_cache_policy: CachePolicy::ReadOnly,
            disk_cache_policy: CachePolicy::Disabled,
            allowed_formats: vec![PixelFormat::Rgba8],
        };
        let request = ImageRequest::builder_with("https://example.com/a.png", &defaults)
            .scale(Scale::Fit)
            .build();

        assert_eq!(request.precision, Precision::Exact);
        assert_eq!(request.scale, Scale::Fit);
        assert_eq!(request.memory_cache_policy, CachePolicy::ReadOnly);
        assert_eq!(request.disk_cache_policy, CachePolicy::Disabled);
        assert_eq!(request.allowed_formats, vec![PixelFormat::Rgba8]);
    }

    #[test]
    fn test_defaults_deserialize_from_partial_toml() {
        let defaults: RequestDefaults = toml::from_str("scale = \"fill\"").unwrap();
        assert_eq!(defaults.scale, Scale::Fill);
        assert_eq!(defaults.precision, Precision::Automatic);
        assert!(defaults.allowed_formats.is_empty());
    }

    #[test]
    fn test_result_accessors() {
        let request = ImageRequest::new("a.png");
        let result = ImageResult::Error(ErrorResult {
            error: Arc::new(PipelineError::decode("bad")),
            request,
        });
        assert!(!result.is_success());
        assert!(result.success().is_none());
        assert!(result.error().is_some());
    }
}
