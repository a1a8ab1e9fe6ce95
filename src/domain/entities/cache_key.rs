//! Memory cache key.

use std::collections::BTreeMap;

use super::size::Size;

/// Identifies a cached artifact.
///
/// Two keys are equal only if the base identity, the ordered transformation
/// identifiers, the resolved size and the extras all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    base: String,
    transformation_keys: Vec<String>,
    size: Option<Size>,
    extras: BTreeMap<String, String>,
}

impl CacheKey {
    /// Creates a plain key with no qualifiers. Returns `None` for an empty base.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Option<Self> {
        Self::with_qualifiers(base, Vec::new(), None, BTreeMap::new())
    }

    /// Creates a fully qualified key. Returns `None` for an empty base.
    #[must_use]
    pub fn with_qualifiers(
        base: impl Into<String>,
        transformation_keys: Vec<String>,
        size: Option<Size>,
        extras: BTreeMap<String, String>,
    ) -> Option<Self> {
        let base = base.into();
        if base.is_empty() {
            return None;
        }
        Some(Self {
            base,
            transformation_keys,
            size,
            extras,
        })
    }

    /// Computes the key for a request.
    ///
    /// Untransformed requests omit the size so that differently sized requests
    /// for the same source share an entry; transformed output depends on the
    /// size, so it is part of the key.
    #[must_use]
    pub fn compute(
        base: Option<String>,
        transformation_keys: Vec<String>,
        size: Size,
        parameters: &BTreeMap<String, String>,
    ) -> Option<Self> {
        let size = (!transformation_keys.is_empty()).then_some(size);
        Self::with_qualifiers(base?, transformation_keys, size, parameters.clone())
    }

    /// Base identity.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Ordered transformation identifiers.
    #[must_use]
    pub fn transformation_keys(&self) -> &[String] {
        &self.transformation_keys
    }

    /// Resolved size, only present for transformed keys.
    #[must_use]
    pub const fn size(&self) -> Option<Size> {
        self.size
    }

    /// Extra qualifiers.
    #[must_use]
    pub const fn extras(&self) -> &BTreeMap<String, String> {
        &self.extras
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)?;
        if !self.transformation_keys.is_empty() {
            write!(f, "[{}]", self.transformation_keys.join(","))?;
        }
        if let Some(size) = self.size {
            write!(f, "@{size}")?;
        }
        for (k, v) in &self.extras {
            write!(f, ";{k}={v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(w: u32, h: u32) -> Size {
        Size::pixels(w, h).unwrap()
    }

    #[test]
    fn test_empty_base_rejected() {
        assert!(CacheKey::new("").is_none());
        assert!(CacheKey::compute(None, vec![], Size::Original, &BTreeMap::new()).is_none());
    }

    #[test]
    fn test_untransformed_keys_ignore_size() {
        let params = BTreeMap::new();
        let a = CacheKey::compute(Some("img".into()), vec![], size(100, 100), &params);
        let b = CacheKey::compute(Some("img".into()), vec![], size(300, 50), &params);
        assert_eq!(a, b);
        assert_eq!(a.unwrap().size(), None);
    }

    #[test]
    fn test_transformed_keys_include_size() {
        let params = BTreeMap::new();
        let t = vec!["grayscale".to_string()];
        let a = CacheKey::compute(Some("img".into()), t.clone(), size(100, 100), &params);
        let b = CacheKey::compute(Some("img".into()), t, size(300, 50), &params);
        assert_ne!(a, b);
    }

    #[test]
    fn test_transformation_order_matters() {
        let params = BTreeMap::new();
        let a = CacheKey::compute(
            Some("img".into()),
            vec!["blur".into(), "grayscale".into()],
            Size::Original,
            &params,
        );
        let b = CacheKey::compute(
            Some("img".into()),
            vec!["grayscale".into(), "blur".into()],
            Size::Original,
            &params,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_parameters_are_extras() {
        let mut params = BTreeMap::new();
        params.insert("theme".to_string(), "dark".to_string());
        let a = CacheKey::compute(Some("img".into()), vec![], Size::Original, &params).unwrap();
        let b = CacheKey::new("img").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "img;theme=dark");
    }
}
