//! Domain error types.

mod cache_error;
mod pipeline_error;

pub use cache_error::{CacheError, CacheResult};
pub use pipeline_error::{Cancelled, FailureKind, PipelineError, StageError};
