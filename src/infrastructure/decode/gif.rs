//! Animated GIF decoder.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::codecs::gif::GifDecoder as ImageGifDecoder;
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, DynamicImage, Frame};

use crate::domain::entities::{AnimatedImage, Artifact};
use crate::domain::errors::PipelineError;
use crate::domain::ports::{DecodeOptions, DecodeResult, Decoder};
use crate::domain::services::SizeMatcher;

use super::bitmap::fit_to_request;

/// Decodes GIF data into an animated artifact. Single-frame GIFs become
/// still images.
#[derive(Debug, Clone, Copy, Default)]
pub struct GifDecoder;

impl Decoder for GifDecoder {
    fn name(&self) -> &'static str {
        "gif"
    }

    fn handles(&self, bytes: &[u8], mime_type: Option<&str>) -> bool {
        bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") || mime_type == Some("image/gif")
    }

    fn decode(&self, bytes: &Bytes, options: &DecodeOptions) -> Result<DecodeResult, PipelineError> {
        let decoder = ImageGifDecoder::new(Cursor::new(bytes.as_ref()))
            .map_err(|e| PipelineError::decode(format!("Invalid GIF: {e}")))?;
        let mut frames = decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| PipelineError::decode(format!("Failed to decode GIF frames: {e}")))?;

        if frames.len() <= 1 {
            let frame = frames
                .pop()
                .ok_or_else(|| PipelineError::decode("GIF has no frames"))?;
            let (image, is_sampled) =
                fit_to_request(DynamicImage::ImageRgba8(frame.into_buffer()), options)?;
            return Ok(DecodeResult {
                artifact: Artifact::Static(Arc::new(image)),
                is_sampled,
            });
        }

        let (src_width, src_height) = frames[0].buffer().dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(PipelineError::decode("GIF has zero dimensions"));
        }
        let plan = SizeMatcher::plan_decode(
            src_width,
            src_height,
            options.size,
            options.scale,
            options.allow_inexact,
        );

        if plan.is_sampled() {
            frames = frames
                .into_iter()
                .map(|frame| {
                    let delay = frame.delay();
                    let resized =
                        imageops::resize(frame.buffer(), plan.width, plan.height, FilterType::Triangle);
                    Frame::from_parts(resized, 0, 0, delay)
                })
                .collect();
        }

        let animated =
            AnimatedImage::new(frames).ok_or_else(|| PipelineError::decode("GIF has no frames"))?;
        Ok(DecodeResult {
            artifact: Artifact::Animated(Arc::new(animated)),
            is_sampled: plan.is_sampled(),
        })
    }
}
