//! Size arithmetic for decode planning and memory cache validation.

use crate::domain::entities::{CacheKey, CacheValue, Scale, Size};

/// Size arithmetic shared by decoding and cache validation.
pub struct SizeMatcher;

/// Planned output of a decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodePlan {
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Applied multiplier.
    pub multiplier: f64,
}

impl DecodePlan {
    /// True if the output is not a full-resolution decode.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_sampled(&self) -> bool {
        self.multiplier != 1.0
    }
}

impl SizeMatcher {
    /// Returns the multiplier that scales `src` into `dst` under `scale`.
    ///
    /// Callers guarantee `src_width` and `src_height` are non-zero.
    #[must_use]
    pub fn compute_size_multiplier(
        src_width: u32,
        src_height: u32,
        dst_width: u32,
        dst_height: u32,
        scale: Scale,
    ) -> f64 {
        let width_percent = f64::from(dst_width) / f64::from(src_width);
        let height_percent = f64::from(dst_height) / f64::from(src_height);
        match scale {
            Scale::Fit => width_percent.min(height_percent),
            Scale::Fill => width_percent.max(height_percent),
        }
    }

    /// Returns true if an image of `cached_width`x`cached_height` may be
    /// served for `requested`.
    ///
    /// A 1px slack on both axes absorbs rounding. Beyond that, any scaling is
    /// rejected unless inexact sizes are allowed, and a sampled image is
    /// never upscaled.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_size_valid(
        cached_width: u32,
        cached_height: u32,
        is_sampled: bool,
        requested: Size,
        scale: Scale,
        allow_inexact: bool,
    ) -> bool {
        let Some((width, height)) = requested.dimensions() else {
            return !is_sampled;
        };

        if cached_width.abs_diff(width) <= 1 && cached_height.abs_diff(height) <= 1 {
            return true;
        }

        let multiple =
            Self::compute_size_multiplier(cached_width, cached_height, width, height, scale);
        if multiple != 1.0 && !allow_inexact {
            return false;
        }
        if multiple > 1.0 && is_sampled {
            return false;
        }
        true
    }

    /// Validates a cached value stored under `key` against a request.
    ///
    /// Transformed keys carry the size they were produced for, and their
    /// output dimensions need not relate to it, so only the recorded size is
    /// compared.
    #[must_use]
    pub fn is_cache_value_valid(
        key: &CacheKey,
        value: &CacheValue,
        requested: Size,
        scale: Scale,
        allow_inexact: bool,
    ) -> bool {
        if let Some(size) = key.size() {
            return size == requested;
        }
        Self::is_size_valid(
            value.image.width(),
            value.image.height(),
            value.is_sampled,
            requested,
            scale,
            allow_inexact,
        )
    }

    /// Plans the output dimensions for decoding a `src_width`x`src_height`
    /// source at `requested`.
    ///
    /// Inexact requests never upscale.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn plan_decode(
        src_width: u32,
        src_height: u32,
        requested: Size,
        scale: Scale,
        allow_inexact: bool,
    ) -> DecodePlan {
        let Some((width, height)) = requested.dimensions() else {
            return DecodePlan {
                width: src_width,
                height: src_height,
                multiplier: 1.0,
            };
        };

        let mut multiplier =
            Self::compute_size_multiplier(src_width, src_height, width, height, scale);
        if allow_inexact {
            multiplier = multiplier.min(1.0);
        }

        let scaled = |v: u32| ((f64::from(v) * multiplier).round() as u32).max(1);
        DecodePlan {
            width: scaled(src_width),
            height: scaled(src_height),
            multiplier,
        }
    }
}
