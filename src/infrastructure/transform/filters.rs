//! Color and convolution filters.

use image::DynamicImage;

use crate::domain::entities::Size;
use crate::domain::errors::PipelineError;
use crate::domain::ports::Transformation;

/// Converts to grayscale, keeping alpha.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grayscale;

impl Transformation for Grayscale {
    fn cache_key(&self) -> String {
        "grayscale".to_string()
    }

    fn transform(&self, input: &DynamicImage, _size: Size) -> Result<DynamicImage, PipelineError> {
        Ok(input.grayscale())
    }
}

/// Gaussian blur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blur {
    /// Standard deviation of the Gaussian, in pixels.
    pub sigma: f32,
}

impl Transformation for Blur {
    fn cache_key(&self) -> String {
        format!("blur({})", self.sigma)
    }

    fn transform(&self, input: &DynamicImage, _size: Size) -> Result<DynamicImage, PipelineError> {
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(PipelineError::transform(
                self.cache_key(),
                format!("sigma must be positive, got {}", self.sigma),
            ));
        }
        Ok(input.blur(self.sigma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_grayscale_equalises_channels() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([200, 10, 30])));
        let out = Grayscale.transform(&img, Size::Original).unwrap().to_rgb8();
        let p = out.get_pixel(0, 0);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
    }

    #[test]
    fn test_blur_keeps_dimensions() {
        let img = DynamicImage::new_rgb8(16, 9);
        let out = Blur { sigma: 1.5 }.transform(&img, Size::Original).unwrap();
        assert_eq!((out.width(), out.height()), (16, 9));
    }

    #[test]
    fn test_blur_rejects_bad_sigma() {
        let img = DynamicImage::new_rgb8(2, 2);
        assert!(Blur { sigma: 0.0 }.transform(&img, Size::Original).is_err());
        assert!(Blur { sigma: f32::NAN }.transform(&img, Size::Original).is_err());
    }
}
