//! Built-in decoders.

pub mod bitmap;
pub mod gif;

pub use bitmap::BitmapDecoder;
pub use gif::GifDecoder;
