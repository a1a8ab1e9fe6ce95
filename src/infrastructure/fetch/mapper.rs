//! Built-in input mappers.

use std::path::PathBuf;

use crate::domain::entities::ImageData;
use crate::domain::ports::Mapper;

/// Maps `file://` URLs to file paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileUrlMapper;

impl Mapper for FileUrlMapper {
    fn map(&self, data: &ImageData) -> Option<ImageData> {
        let ImageData::Url(url) = data else {
            return None;
        };
        let path = url.strip_prefix("file://")?;
        // file://localhost/tmp/a.png and file:///tmp/a.png both name /tmp/a.png
        let path = path.strip_prefix("localhost").unwrap_or(path);
        if path.is_empty() {
            return None;
        }
        Some(ImageData::Path(PathBuf::from(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("file:///tmp/a.png", Some("/tmp/a.png") ; "absolute")]
    #[test_case("file://localhost/tmp/a.png", Some("/tmp/a.png") ; "localhost")]
    #[test_case("file://", None ; "empty")]
    #[test_case("https://example.com/a.png", None ; "http")]
    fn test_file_url_mapping(input: &str, expected: Option<&str>) {
        let mapped = FileUrlMapper.map(&ImageData::Url(input.to_string()));
        assert_eq!(mapped, expected.map(|p| ImageData::Path(PathBuf::from(p))));
    }

    #[test]
    fn test_ignores_paths() {
        assert!(FileUrlMapper.map(&ImageData::Path("/a".into())).is_none());
    }
}
