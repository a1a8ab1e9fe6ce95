//! imgpipe - an image request pipeline.
//!
//! Requests travel through an interceptor chain into an engine that maps the
//! input, consults a two-tier memory cache, and otherwise fetches, decodes and
//! transforms the image before caching it. Every stage is cancellable.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the pipeline and loader.
pub mod application;
/// Domain layer containing entities, errors, ports and services.
pub mod domain;
/// Infrastructure layer containing caches, providers and configuration.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "imgpipe";

/// Qualifier used for platform directories.
pub const APP_QUALIFIER: &str = "com";

/// Organization used for platform directories.
pub const APP_ORGANIZATION: &str = "linuxmobile";
