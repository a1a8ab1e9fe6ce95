//! Still image decoder built on the `image` crate.

use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::trace;

use crate::domain::entities::{Artifact, is_format_allowed};
use crate::domain::errors::PipelineError;
use crate::domain::ports::{DecodeOptions, DecodeResult, Decoder};
use crate::domain::services::SizeMatcher;

/// Decodes PNG, JPEG, WebP and still GIF data, scaling to the requested size.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapDecoder;

impl Decoder for BitmapDecoder {
    fn name(&self) -> &'static str {
        "bitmap"
    }

    fn handles(&self, bytes: &[u8], mime_type: Option<&str>) -> bool {
        image::guess_format(bytes).is_ok() || mime_type.is_some_and(|m| m.starts_with("image/"))
    }

    fn decode(&self, bytes: &Bytes, options: &DecodeOptions) -> Result<DecodeResult, PipelineError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| PipelineError::decode(format!("Failed to decode image: {e}")))?;
        let (image, is_sampled) = fit_to_request(decoded, options)?;
        Ok(DecodeResult {
            artifact: Artifact::Static(Arc::new(image)),
            is_sampled,
        })
    }
}

/// Scales a decoded image per the request and converts it to an allowed
/// pixel format.
pub(crate) fn fit_to_request(
    image: DynamicImage,
    options: &DecodeOptions,
) -> Result<(DynamicImage, bool), PipelineError> {
    let (src_width, src_height) = (image.width(), image.height());
    if src_width == 0 || src_height == 0 {
        return Err(PipelineError::decode(format!(
            "Image has zero dimensions ({src_width}x{src_height})"
        )));
    }

    let plan = SizeMatcher::plan_decode(
        src_width,
        src_height,
        options.size,
        options.scale,
        options.allow_inexact,
    );

    let image = if plan.width == src_width && plan.height == src_height {
        image
    } else {
        trace!(
            src_width,
            src_height,
            width = plan.width,
            height = plan.height,
            "Resizing decoded image"
        );
        image.resize_exact(plan.width, plan.height, FilterType::Lanczos3)
    };

    let image = match options.allowed_formats.first() {
        Some(preferred) if !is_format_allowed(&image, &options.allowed_formats) => {
            preferred.convert(&image)
        }
        _ => image,
    };

    Ok((image, plan.is_sampled()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::entities::{PixelFormat, Scale, Size};
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Bytes {
        let mut out = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(out)
    }

    #[test]
    fn test_handles_png_signature() {
        let bytes = png_bytes(2, 2);
        assert!(BitmapDecoder.handles(&bytes, None));
        assert!(!BitmapDecoder.handles(b"plain text", Some("text/plain")));
    }

    #[test]
    fn test_decode_original() {
        let result = BitmapDecoder
            .decode(&png_bytes(40, 20), &DecodeOptions::default())
            .unwrap();
        assert_eq!(result.artifact.dimensions(), (40, 20));
        assert!(!result.is_sampled);
    }

    #[test]
    fn test_decode_downsamples() {
        let options = DecodeOptions {
            size: Size::pixels(10, 10).unwrap(),
            scale: Scale::Fit,
            allow_inexact: true,
            allowed_formats: Vec::new(),
        };
        let result = BitmapDecoder.decode(&png_bytes(40, 20), &options).unwrap();
        assert_eq!(result.artifact.dimensions(), (10, 5));
        assert!(result.is_sampled);
    }

    #[test]
    fn test_decode_converts_disallowed_format() {
        let options = DecodeOptions {
            allowed_formats: vec![PixelFormat::Rgba8],
            ..DecodeOptions::default()
        };
        let result = BitmapDecoder.decode(&png_bytes(4, 4), &options).unwrap();
        let image = result.artifact.as_static().unwrap();
        assert_eq!(PixelFormat::of(image), Some(PixelFormat::Rgba8));
    }

    #[test]
    fn test_corrupt_data_is_decode_error() {
        let err = BitmapDecoder
            .decode(&Bytes::from_static(b"\x89PNG\r\n\x1a\ngarbage"), &DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }
}
