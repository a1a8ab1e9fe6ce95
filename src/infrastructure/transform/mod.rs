//! Built-in transformations.

pub mod filters;
pub mod shapes;

use std::sync::Arc;

use crate::domain::ports::Transformation;

pub use filters::{Blur, Grayscale};
pub use shapes::{CircleCrop, RoundedCorners};

/// Parses a transformation spec such as `grayscale`, `circle`, `blur:2.5` or
/// `rounded:8`.
///
/// # Errors
/// Returns error for unknown names or malformed arguments.
pub fn parse_transformation(spec: &str) -> Result<Arc<dyn Transformation>, String> {
    let (name, arg) = match spec.split_once(':') {
        Some((name, arg)) => (name.trim(), Some(arg.trim())),
        None => (spec.trim(), None),
    };
    let number = |what: &str| -> Result<f32, String> {
        arg.ok_or_else(|| format!("'{name}' needs a {what}, e.g. {name}:4"))?
            .parse::<f32>()
            .map_err(|e| format!("invalid {what} for '{name}': {e}"))
    };

    match name.to_ascii_lowercase().as_str() {
        "grayscale" | "greyscale" => Ok(Arc::new(Grayscale)),
        "circle" | "circle_crop" => Ok(Arc::new(CircleCrop)),
        "blur" => Ok(Arc::new(Blur {
            sigma: number("sigma")?,
        })),
        "rounded" | "rounded_corners" => Ok(Arc::new(RoundedCorners::uniform(number("radius")?))),
        other => Err(format!("unknown transformation '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("grayscale", "grayscale" ; "grayscale")]
    #[test_case("circle", "circle_crop" ; "circle")]
    #[test_case("blur:2.5", "blur(2.5)" ; "blur")]
    #[test_case("rounded: 8", "rounded_corners(8,8,8,8)" ; "rounded")]
    fn test_parse(spec: &str, key: &str) {
        assert_eq!(parse_transformation(spec).unwrap().cache_key(), key);
    }

    #[test_case("blur" ; "missing_arg")]
    #[test_case("blur:abc" ; "bad_number")]
    #[test_case("sepia" ; "unknown")]
    fn test_parse_errors(spec: &str) {
        assert!(parse_transformation(spec).is_err());
    }
}
