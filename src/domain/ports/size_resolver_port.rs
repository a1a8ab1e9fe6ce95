//! Port for resolving a request's target size.

use async_trait::async_trait;

use crate::domain::entities::Size;

/// Resolves the size a request should be loaded at.
#[async_trait]
pub trait SizeResolver: Send + Sync {
    /// Returns the target size, suspending until it is known.
    async fn size(&self) -> Size;

    /// True if the size is derived from a display surface rather than given
    /// explicitly. Drives [`Precision::Automatic`](crate::domain::entities::Precision).
    fn is_deferred(&self) -> bool {
        false
    }
}

/// Resolves to a fixed size.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSizeResolver(pub Size);

#[async_trait]
impl SizeResolver for FixedSizeResolver {
    async fn size(&self) -> Size {
        self.0
    }
}
