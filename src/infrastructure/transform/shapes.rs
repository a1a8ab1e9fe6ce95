//! Shape masking transformations.

use image::{DynamicImage, Rgba, RgbaImage};

use crate::domain::entities::Size;
use crate::domain::errors::PipelineError;
use crate::domain::ports::Transformation;

/// Crops the center square and masks everything outside the inscribed
/// circle to transparent.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircleCrop;

impl Transformation for CircleCrop {
    fn cache_key(&self) -> String {
        "circle_crop".to_string()
    }

    fn transform(&self, input: &DynamicImage, _size: Size) -> Result<DynamicImage, PipelineError> {
        let side = input.width().min(input.height());
        let left = (input.width() - side) / 2;
        let top = (input.height() - side) / 2;
        let mut square = input.crop_imm(left, top, side, side).to_rgba8();

        let radius = f64::from(side) / 2.0;
        mask(&mut square, |x, y| {
            let dx = f64::from(x) + 0.5 - radius;
            let dy = f64::from(y) + 0.5 - radius;
            dx * dx + dy * dy <= radius * radius
        });
        Ok(DynamicImage::ImageRgba8(square))
    }
}

/// Rounds each corner with its own radius in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedCorners {
    /// Top-left radius.
    pub top_left: f32,
    /// Top-right radius.
    pub top_right: f32,
    /// Bottom-left radius.
    pub bottom_left: f32,
    /// Bottom-right radius.
    pub bottom_right: f32,
}

impl RoundedCorners {
    /// Same radius on every corner.
    #[must_use]
    pub const fn uniform(radius: f32) -> Self {
        Self {
            top_left: radius,
            top_right: radius,
            bottom_left: radius,
            bottom_right: radius,
        }
    }
}

impl Transformation for RoundedCorners {
    fn cache_key(&self) -> String {
        format!(
            "rounded_corners({},{},{},{})",
            self.top_left, self.top_right, self.bottom_left, self.bottom_right
        )
    }

    fn transform(&self, input: &DynamicImage, _size: Size) -> Result<DynamicImage, PipelineError> {
        let radii = [self.top_left, self.top_right, self.bottom_left, self.bottom_right];
        if radii.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(PipelineError::transform(
                self.cache_key(),
                "corner radii must be finite and non-negative",
            ));
        }

        let mut out = input.to_rgba8();
        let (w, h) = (f64::from(out.width()), f64::from(out.height()));
        let max_radius = w.min(h) / 2.0;
        let [tl, tr, bl, br] = radii.map(|r| f64::from(r).min(max_radius));

        mask(&mut out, |x, y| {
            let (px, py) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
            let corner = if px < tl && py < tl {
                Some((tl, tl, tl))
            } else if px > w - tr && py < tr {
                Some((w - tr, tr, tr))
            } else if px < bl && py > h - bl {
                Some((bl, h - bl, bl))
            } else if px > w - br && py > h - br {
                Some((w - br, h - br, br))
            } else {
                None
            };
            corner.is_none_or(|(cx, cy, r)| {
                let (dx, dy) = (px - cx, py - cy);
                dx * dx + dy * dy <= r * r
            })
        });
        Ok(DynamicImage::ImageRgba8(out))
    }
}

fn mask(image: &mut RgbaImage, keep: impl Fn(u32, u32) -> bool) {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if !keep(x, y) {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])))
    }

    #[test]
    fn test_circle_crop_squares_and_masks() {
        let out = CircleCrop.transform(&opaque(20, 10), Size::Original).unwrap().to_rgba8();
        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(5, 5)[3], 255);
    }

    #[test]
    fn test_rounded_corners() {
        let out = RoundedCorners::uniform(4.0)
            .transform(&opaque(20, 20), Size::Original)
            .unwrap()
            .to_rgba8();
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(19, 19)[3], 0);
        assert_eq!(out.get_pixel(10, 0)[3], 255);
        assert_eq!(out.get_pixel(10, 10)[3], 255);
    }

    #[test]
    fn test_rounded_corners_rejects_negative_radius() {
        let err = RoundedCorners::uniform(-1.0)
            .transform(&opaque(4, 4), Size::Original)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transform { .. }));
    }

    #[test]
    fn test_cache_keys_distinguish_parameters() {
        assert_ne!(
            RoundedCorners::uniform(1.0).cache_key(),
            RoundedCorners::uniform(2.0).cache_key()
        );
    }
}
