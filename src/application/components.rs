//! Registered mappers, fetchers, decoders and interceptors.

use std::sync::Arc;

use crate::domain::entities::ImageData;
use crate::domain::ports::{Decoder, Fetcher, Mapper};
use crate::infrastructure::decode::{BitmapDecoder, GifDecoder};
use crate::infrastructure::fetch::{FileFetcher, FileUrlMapper, HttpFetcher, MemoryFetcher};

use super::pipeline::Interceptor;

/// Ordered provider lists. For fetchers and decoders the first one whose
/// predicate accepts the input wins, so registration order is priority.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    interceptors: Vec<Arc<dyn Interceptor>>,
    mappers: Vec<Arc<dyn Mapper>>,
    fetchers: Vec<Arc<dyn Fetcher>>,
    decoders: Vec<Arc<dyn Decoder>>,
}

impl ComponentRegistry {
    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> ComponentRegistryBuilder {
        ComponentRegistryBuilder::default()
    }

    /// Registry with the built-in providers. Pass `None` to disable network
    /// loading.
    #[must_use]
    pub fn with_defaults(http: Option<HttpFetcher>) -> Self {
        Self::builder().add_defaults(http).build()
    }

    /// User interceptors in execution order.
    #[must_use]
    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    /// Applies every mapper in order.
    #[must_use]
    pub fn map(&self, data: ImageData) -> ImageData {
        self.mappers
            .iter()
            .fold(data, |data, mapper| mapper.map(&data).unwrap_or(data))
    }

    /// First fetcher that handles `data`.
    #[must_use]
    pub fn fetcher_for(&self, data: &ImageData) -> Option<&Arc<dyn Fetcher>> {
        self.fetchers.iter().find(|f| f.handles(data))
    }

    /// First decoder that recognises the bytes.
    #[must_use]
    pub fn decoder_for(&self, bytes: &[u8], mime_type: Option<&str>) -> Option<&Arc<dyn Decoder>> {
        self.decoders.iter().find(|d| d.handles(bytes, mime_type))
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("interceptors", &self.interceptors.len())
            .field("mappers", &self.mappers.len())
            .field(
                "fetchers",
                &self.fetchers.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field(
                "decoders",
                &self.decoders.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`ComponentRegistry`].
#[derive(Default)]
pub struct ComponentRegistryBuilder {
    registry: ComponentRegistry,
}

impl ComponentRegistryBuilder {
    /// Appends an interceptor.
    #[must_use]
    pub fn add_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.registry.interceptors.push(interceptor);
        self
    }

    /// Appends a mapper.
    #[must_use]
    pub fn add_mapper(mut self, mapper: Arc<dyn Mapper>) -> Self {
        self.registry.mappers.push(mapper);
        self
    }

    /// Appends a fetcher.
    #[must_use]
    pub fn add_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.registry.fetchers.push(fetcher);
        self
    }

    /// Appends a decoder.
    #[must_use]
    pub fn add_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.registry.decoders.push(decoder);
        self
    }

    /// Appends the built-in providers after anything already registered.
    #[must_use]
    pub fn add_defaults(mut self, http: Option<HttpFetcher>) -> Self {
        self = self.add_mapper(Arc::new(FileUrlMapper));
        if let Some(http) = http {
            self = self.add_fetcher(Arc::new(http));
        }
        self.add_fetcher(Arc::new(FileFetcher::default()))
            .add_fetcher(Arc::new(MemoryFetcher))
            .add_decoder(Arc::new(GifDecoder))
            .add_decoder(Arc::new(BitmapDecoder))
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> ComponentRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::MockFetcher;
    use bytes::Bytes;

    #[test]
    fn test_mappers_then_first_matching_fetcher() {
        let registry = ComponentRegistry::with_defaults(None);
        let mapped = registry.map(ImageData::Url("file:///tmp/a.png".into()));
        assert_eq!(mapped, ImageData::Path("/tmp/a.png".into()));
        assert_eq!(registry.fetcher_for(&mapped).map(|f| f.name()), Some("file"));
        assert_eq!(
            registry
                .fetcher_for(&ImageData::Bytes(Bytes::from_static(b"x")))
                .map(|f| f.name()),
            Some("memory")
        );
        assert!(
            registry
                .fetcher_for(&ImageData::Url("https://example.com/a.png".into()))
                .is_none()
        );
    }

    #[test]
    fn test_registration_order_is_priority() {
        let mut first = MockFetcher::new();
        first.expect_handles().return_const(true);
        first.expect_name().return_const("first");
        let mut second = MockFetcher::new();
        second.expect_handles().never();
        second.expect_name().return_const("second");

        let registry = ComponentRegistry::builder()
            .add_fetcher(Arc::new(first))
            .add_fetcher(Arc::new(second))
            .build();

        let picked = registry.fetcher_for(&ImageData::Url("anything".into()));
        assert_eq!(picked.map(|f| f.name()), Some("first"));
    }

    #[test]
    fn test_gif_decoder_precedes_bitmap() {
        let registry = ComponentRegistry::with_defaults(None);
        let decoder = registry.decoder_for(b"GIF89a....", None).unwrap();
        assert_eq!(decoder.name(), "gif");
    }
}
