//! Port for image transformations.

use image::DynamicImage;

use crate::domain::entities::Size;
use crate::domain::errors::PipelineError;

/// A pure image-to-image function applied after decoding.
pub trait Transformation: Send + Sync {
    /// Identifier for this transformation and its parameters. Becomes part of
    /// the memory cache key, so it must change whenever output would change.
    fn cache_key(&self) -> String;

    /// Produces a new image from `input`.
    ///
    /// # Errors
    /// Returns error if the transformation cannot be applied.
    fn transform(&self, input: &DynamicImage, size: Size) -> Result<DynamicImage, PipelineError>;
}
