//! Port for decoding fetched bytes.

use bytes::Bytes;

use crate::domain::entities::{Artifact, PixelFormat, Scale, Size};
use crate::domain::errors::PipelineError;

/// Options passed to a decoder.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Resolved target size.
    pub size: Size,
    /// Scale policy.
    pub scale: Scale,
    /// Whether output may be smaller than requested.
    pub allow_inexact: bool,
    /// Acceptable pixel formats; empty accepts any.
    pub allowed_formats: Vec<PixelFormat>,
}

/// Output of a decoder.
#[derive(Debug, Clone)]
pub struct DecodeResult {
    /// Decoded artifact.
    pub artifact: Artifact,
    /// True if the artifact is not a full-resolution exact decode.
    pub is_sampled: bool,
}

/// Port for turning encoded bytes into an artifact.
///
/// Decoding is CPU-bound and runs on the decode dispatcher.
pub trait Decoder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if this decoder recognises the data.
    fn handles(&self, bytes: &[u8], mime_type: Option<&str>) -> bool;

    /// Decodes `bytes`.
    ///
    /// # Errors
    /// Returns error if the data is corrupt or has zero dimensions.
    fn decode(&self, bytes: &Bytes, options: &DecodeOptions) -> Result<DecodeResult, PipelineError>;
}
