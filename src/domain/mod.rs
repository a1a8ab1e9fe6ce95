//! Domain layer with core entities, errors, services and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Pure domain services.
pub mod services;

pub use entities::{CacheKey, ImageRequest, ImageResult, Size};
pub use errors::{Cancelled, PipelineError};
pub use services::SizeMatcher;
