//! Domain entity definitions.

mod artifact;
mod cache_key;
mod request;
mod size;

pub use artifact::{
    AnimatedImage, Artifact, CacheValue, DataSource, ImageData, PixelFormat, byte_size,
    is_format_allowed,
};
pub use cache_key::CacheKey;
pub use request::{
    ErrorResult, ImageRequest, ImageRequestBuilder, ImageResult, RequestDefaults, SuccessResult,
};
pub use size::{CachePolicy, Precision, Scale, Size};
