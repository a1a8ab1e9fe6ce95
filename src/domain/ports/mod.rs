mod decoder_port;
mod event_listener_port;
mod fetcher_port;
mod mapper_port;
mod size_resolver_port;
mod transformation_port;

pub use decoder_port::{DecodeOptions, DecodeResult, Decoder};
pub use event_listener_port::EventListener;
pub use fetcher_port::{FetchOptions, FetchResult, Fetcher};
pub use mapper_port::Mapper;
pub use size_resolver_port::{FixedSizeResolver, SizeResolver};
pub use transformation_port::Transformation;

#[cfg(test)]
pub mod mocks {
    pub use super::fetcher_port::MockFetcher;
}
