//! Built-in fetchers and mappers.

pub mod file;
pub mod http;
pub mod mapper;
pub mod memory;

pub use file::{FileFetcher, mime_from_path};
pub use http::{HttpConfig, HttpFetcher};
pub use mapper::FileUrlMapper;
pub use memory::MemoryFetcher;
