//! Decoded artifacts, their pixel formats and provenance.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use image::{ColorType, DynamicImage, Frame};
use serde::{Deserialize, Serialize};

use super::size::Size;

/// Input describing where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// A URL (`http`, `https` or `file`).
    Url(String),
    /// A local file path.
    Path(PathBuf),
    /// Raw encoded bytes already in memory.
    Bytes(Bytes),
}

impl std::fmt::Display for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<&str> for ImageData {
    fn from(s: &str) -> Self {
        Self::Url(s.to_string())
    }
}

impl From<String> for ImageData {
    fn from(s: String) -> Self {
        Self::Url(s)
    }
}

impl From<PathBuf> for ImageData {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

impl From<Bytes> for ImageData {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

/// In-memory pixel layout of a decoded image.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum PixelFormat {
    L8,
    La8,
    Rgb8,
    Rgba8,
    L16,
    La16,
    Rgb16,
    Rgba16,
    Rgb32f,
    Rgba32f,
}

impl PixelFormat {
    /// Returns the pixel format of a decoded image.
    #[must_use]
    pub fn of(image: &DynamicImage) -> Option<Self> {
        Self::from_color_type(image.color())
    }

    /// Maps an `image` color type to a pixel format.
    #[must_use]
    pub const fn from_color_type(color: ColorType) -> Option<Self> {
        Some(match color {
            ColorType::L8 => Self::L8,
            ColorType::La8 => Self::La8,
            ColorType::Rgb8 => Self::Rgb8,
            ColorType::Rgba8 => Self::Rgba8,
            ColorType::L16 => Self::L16,
            ColorType::La16 => Self::La16,
            ColorType::Rgb16 => Self::Rgb16,
            ColorType::Rgba16 => Self::Rgba16,
            ColorType::Rgb32F => Self::Rgb32f,
            ColorType::Rgba32F => Self::Rgba32f,
            _ => return None,
        })
    }

    /// Converts an image into this pixel format.
    #[must_use]
    pub fn convert(self, image: &DynamicImage) -> DynamicImage {
        match self {
            Self::L8 => DynamicImage::ImageLuma8(image.to_luma8()),
            Self::La8 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
            Self::Rgb8 => DynamicImage::ImageRgb8(image.to_rgb8()),
            Self::Rgba8 => DynamicImage::ImageRgba8(image.to_rgba8()),
            Self::L16 => DynamicImage::ImageLuma16(image.to_luma16()),
            Self::La16 => DynamicImage::ImageLumaA16(image.to_luma_alpha16()),
            Self::Rgb16 => DynamicImage::ImageRgb16(image.to_rgb16()),
            Self::Rgba16 => DynamicImage::ImageRgba16(image.to_rgba16()),
            Self::Rgb32f => DynamicImage::ImageRgb32F(image.to_rgb32f()),
            Self::Rgba32f => DynamicImage::ImageRgba32F(image.to_rgba32f()),
        }
    }
}

/// Returns true if `image` may be served to a request allowing `allowed`.
/// An empty allow-list accepts every format.
#[must_use]
pub fn is_format_allowed(image: &DynamicImage, allowed: &[PixelFormat]) -> bool {
    allowed.is_empty() || PixelFormat::of(image).is_some_and(|f| allowed.contains(&f))
}

/// Byte footprint of a decoded image's pixel buffer.
#[must_use]
pub fn byte_size(image: &DynamicImage) -> usize {
    image.as_bytes().len()
}

/// Decoded multi-frame image.
pub struct AnimatedImage {
    frames: Vec<Frame>,
}

impl AnimatedImage {
    /// Wraps decoded frames. Returns `None` if there are none.
    #[must_use]
    pub fn new(frames: Vec<Frame>) -> Option<Self> {
        if frames.is_empty() {
            None
        } else {
            Some(Self { frames })
        }
    }

    /// All frames in display order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Flattens to the first frame.
    #[must_use]
    pub fn first_frame(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.frames[0].buffer().clone())
    }

    /// Dimensions of the first frame.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.frames[0].buffer().dimensions()
    }
}

impl std::fmt::Debug for AnimatedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("AnimatedImage")
            .field("frames", &self.frames.len())
            .field("width", &width)
            .field("height", &height)
            .finish()
    }
}

/// Result of decoding.
#[derive(Debug, Clone)]
pub enum Artifact {
    /// Single still image. Cacheable.
    Static(Arc<DynamicImage>),
    /// Animated image. Never cached.
    Animated(Arc<AnimatedImage>),
}

impl Artifact {
    /// Returns `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Static(img) => (img.width(), img.height()),
            Self::Animated(anim) => anim.dimensions(),
        }
    }

    /// Returns the still image if this is a static artifact.
    #[must_use]
    pub const fn as_static(&self) -> Option<&Arc<DynamicImage>> {
        match self {
            Self::Static(img) => Some(img),
            Self::Animated(_) => None,
        }
    }

    /// Returns a still image, flattening animations to the first frame.
    #[must_use]
    pub fn to_static(&self) -> Arc<DynamicImage> {
        match self {
            Self::Static(img) => img.clone(),
            Self::Animated(anim) => Arc::new(anim.first_frame()),
        }
    }
}

/// A value stored in the memory cache.
#[derive(Debug, Clone)]
pub struct CacheValue {
    /// The decoded image.
    pub image: Arc<DynamicImage>,
    /// True if the image is not a full-resolution exact decode of its source.
    pub is_sampled: bool,
    /// The size the image was produced for.
    pub size: Size,
}

impl CacheValue {
    /// Creates a new cache value.
    #[must_use]
    pub const fn new(image: Arc<DynamicImage>, is_sampled: bool, size: Size) -> Self {
        Self {
            image,
            is_sampled,
            size,
        }
    }

    /// Byte cost of the image.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        byte_size(&self.image)
    }
}

/// Which layer ultimately supplied a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Served from the in-memory cache.
    MemoryCache,
    /// Decoded from bytes already in memory.
    Memory,
    /// Read from the local file system or disk cache.
    Disk,
    /// Downloaded from network.
    Network,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryCache => write!(f, "memory-cache"),
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_counts_pixels() {
        let rgba = DynamicImage::new_rgba8(10, 5);
        let rgb = DynamicImage::new_rgb8(10, 5);
        assert_eq!(byte_size(&rgba), 200);
        assert_eq!(byte_size(&rgb), 150);
    }

    #[test]
    fn test_format_allowed() {
        let img = DynamicImage::new_rgb8(1, 1);
        assert!(is_format_allowed(&img, &[]));
        assert!(is_format_allowed(&img, &[PixelFormat::Rgba8, PixelFormat::Rgb8]));
        assert!(!is_format_allowed(&img, &[PixelFormat::Rgba8]));
    }

    #[test]
    fn test_convert_changes_format() {
        let img = DynamicImage::new_rgb8(4, 4);
        let converted = PixelFormat::Rgba8.convert(&img);
        assert_eq!(PixelFormat::of(&converted), Some(PixelFormat::Rgba8));
        assert_eq!(converted.width(), 4);
    }

    #[test]
    fn test_animated_requires_frames() {
        assert!(AnimatedImage::new(Vec::new()).is_none());
        let frame = Frame::new(image::RgbaImage::new(3, 2));
        let anim = AnimatedImage::new(vec![frame]).unwrap();
        assert_eq!(anim.dimensions(), (3, 2));
        let artifact = Artifact::Animated(Arc::new(anim));
        assert!(artifact.as_static().is_none());
        assert_eq!(artifact.to_static().width(), 3);
    }
}
