//! Application layer: the request pipeline and its entry points.

/// Registered providers.
pub mod components;
/// Request entry points.
pub mod loader;
/// Interceptor chain and the engine stage.
pub mod pipeline;

pub use components::{ComponentRegistry, ComponentRegistryBuilder};
pub use loader::{ImageLoadedEvent, ImageLoader, ImageLoaderBuilder, RequestHandle};
pub use pipeline::{Chain, EngineInterceptor, Interceptor, Outcome};
