//! Port for input mapping.

use crate::domain::entities::ImageData;

/// Rewrites request data into a form a fetcher can handle.
///
/// Mappers run in registration order; each sees the output of the previous
/// one. Returning `None` leaves the data unchanged.
pub trait Mapper: Send + Sync {
    /// Maps `data`, or returns `None` if this mapper does not apply.
    fn map(&self, data: &ImageData) -> Option<ImageData>;
}
