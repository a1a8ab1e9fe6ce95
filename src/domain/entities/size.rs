//! Requested and decoded output sizes plus the policies that interpret them.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Requested or produced output size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Size {
    /// Keep the source dimensions.
    #[default]
    Original,
    /// Fit/fill into the given pixel box.
    Pixels {
        /// Target width in pixels.
        width: NonZeroU32,
        /// Target height in pixels.
        height: NonZeroU32,
    },
}

impl Size {
    /// Creates a pixel size, returning `None` when either dimension is zero.
    #[must_use]
    pub fn pixels(width: u32, height: u32) -> Option<Self> {
        Some(Self::Pixels {
            width: NonZeroU32::new(width)?,
            height: NonZeroU32::new(height)?,
        })
    }

    /// Returns `(width, height)` for pixel sizes.
    #[must_use]
    pub const fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Original => None,
            Self::Pixels { width, height } => Some((width.get(), height.get())),
        }
    }

    /// Returns true for [`Size::Original`].
    #[must_use]
    pub const fn is_original(&self) -> bool {
        matches!(self, Self::Original)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Pixels { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

impl std::str::FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("original") {
            return Ok(Self::Original);
        }
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT or 'original', got '{s}'"))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid width '{w}': {e}"))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid height '{h}': {e}"))?;
        Self::pixels(width, height).ok_or_else(|| format!("dimensions must be non-zero: '{s}'"))
    }
}

/// How source dimensions are scaled into the target box.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Scale so the whole image fits inside the box.
    #[default]
    Fit,
    /// Scale so the image covers the whole box.
    Fill,
}

/// How strictly output dimensions must match the request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Output must match the requested size exactly.
    Exact,
    /// Output may be smaller than requested if that avoids upscaling.
    Inexact,
    /// Inexact when the size came from a deferred viewport, exact otherwise.
    #[default]
    Automatic,
}

impl Precision {
    /// Resolves whether inexact sizes are acceptable.
    #[must_use]
    pub const fn allows_inexact(self, deferred_size: bool) -> bool {
        match self {
            Self::Exact => false,
            Self::Inexact => true,
            Self::Automatic => deferred_size,
        }
    }
}

/// Read/write policy for a cache layer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Read and write.
    #[default]
    Enabled,
    /// Read only.
    ReadOnly,
    /// Write only.
    WriteOnly,
    /// Neither.
    Disabled,
}

impl CachePolicy {
    /// Returns true if lookups are allowed.
    #[must_use]
    pub const fn read_enabled(self) -> bool {
        matches!(self, Self::Enabled | Self::ReadOnly)
    }

    /// Returns true if writes are allowed.
    #[must_use]
    pub const fn write_enabled(self) -> bool {
        matches!(self, Self::Enabled | Self::WriteOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_pixels_rejects_zero() {
        assert!(Size::pixels(0, 10).is_none());
        assert!(Size::pixels(10, 0).is_none());
        assert_eq!(Size::pixels(10, 20).and_then(|s| s.dimensions()), Some((10, 20)));
    }

    #[test_case("original", Some(Size::Original) ; "original")]
    #[test_case("100x200", Size::pixels(100, 200) ; "pixels")]
    #[test_case("64X64", Size::pixels(64, 64) ; "uppercase_separator")]
    #[test_case("0x10", None ; "zero_width")]
    #[test_case("abc", None ; "garbage")]
    fn test_parse_size(input: &str, expected: Option<Size>) {
        assert_eq!(input.parse::<Size>().ok(), expected);
    }

    #[test_case(Precision::Exact, false, false ; "exact_fixed")]
    #[test_case(Precision::Exact, true, false ; "exact_deferred")]
    #[test_case(Precision::Inexact, false, true ; "inexact_fixed")]
    #[test_case(Precision::Automatic, false, false ; "automatic_fixed")]
    #[test_case(Precision::Automatic, true, true ; "automatic_deferred")]
    fn test_precision_resolution(precision: Precision, deferred: bool, expected: bool) {
        assert_eq!(precision.allows_inexact(deferred), expected);
    }

    #[test]
    fn test_cache_policy_flags() {
        assert!(CachePolicy::Enabled.read_enabled() && CachePolicy::Enabled.write_enabled());
        assert!(CachePolicy::ReadOnly.read_enabled() && !CachePolicy::ReadOnly.write_enabled());
        assert!(!CachePolicy::WriteOnly.read_enabled() && CachePolicy::WriteOnly.write_enabled());
        assert!(!CachePolicy::Disabled.read_enabled() && !CachePolicy::Disabled.write_enabled());
    }
}
