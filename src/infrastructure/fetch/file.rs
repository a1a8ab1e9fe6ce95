//! Fetcher for local files.

use std::path::Path;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::domain::entities::{DataSource, ImageData};
use crate::domain::errors::PipelineError;
use crate::domain::ports::{FetchOptions, FetchResult, Fetcher};
use crate::infrastructure::dispatch::cancellable;

/// Reads [`ImageData::Path`] from the file system.
#[derive(Debug, Clone, Copy)]
pub struct FileFetcher {
    /// Include the modification time in the cache key, so edits on disk
    /// invalidate cached results.
    pub include_modified_time: bool,
}

impl Default for FileFetcher {
    fn default() -> Self {
        Self {
            include_modified_time: true,
        }
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    fn name(&self) -> &'static str {
        "file"
    }

    fn handles(&self, data: &ImageData) -> bool {
        matches!(data, ImageData::Path(_))
    }

    /// The path, suffixed with the modification time when
    /// `include_modified_time` is set.
    async fn cache_key(&self, data: &ImageData) -> Option<String> {
        let ImageData::Path(path) = data else {
            return None;
        };
        let base = path.to_string_lossy().into_owned();
        if !self.include_modified_time {
            return Some(base);
        }
        let modified = tokio::fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok());
        Some(match modified {
            Some(d) => format!("{base}:{}", d.as_millis()),
            None => base,
        })
    }

    async fn fetch(
        &self,
        data: &ImageData,
        _options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<FetchResult, PipelineError> {
        let ImageData::Path(path) = data else {
            return Err(PipelineError::fetch(format!(
                "file fetcher cannot load '{data}'"
            )));
        };

        let bytes = cancellable(cancel, tokio::fs::read(path))
            .await
            .map_err(|_| PipelineError::fetch("file read cancelled"))?
            .map_err(|source| PipelineError::Io {
                path: path.display().to_string(),
                source,
            })?;
        trace!(path = %path.display(), size = bytes.len(), "Read image file");

        Ok(FetchResult::Source {
            bytes: Bytes::from(bytes),
            mime_type: mime_from_path(path).map(String::from),
            data_source: DataSource::Disk,
        })
    }
}

/// Guesses a mime type from a file extension.
#[must_use]
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pic.PNG");
        std::fs::write(&path, b"not really a png").unwrap();

        let data = ImageData::Path(path.clone());
        let fetcher = FileFetcher::default();
        assert!(fetcher.handles(&data));

        let result = fetcher
            .fetch(&data, &FetchOptions::default(), &CancellationToken::new())
            .await
            .unwrap();
        let FetchResult::Source {
            bytes,
            mime_type,
            data_source,
        } = result
        else {
            panic!("expected source result");
        };
        assert_eq!(&bytes[..], b"not really a png");
        assert_eq!(mime_type.as_deref(), Some("image/png"));
        assert_eq!(data_source, DataSource::Disk);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let data = ImageData::Path("/definitely/not/here.png".into());
        let err = FileFetcher::default()
            .fetch(&data, &FetchOptions::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[tokio::test]
    async fn test_cache_key_tracks_modification() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"x").unwrap();
        let data = ImageData::Path(path.clone());

        let with_time = FileFetcher::default().cache_key(&data).await.unwrap();
        let without = FileFetcher {
            include_modified_time: false,
        }
        .cache_key(&data)
        .await
        .unwrap();

        assert_eq!(without, path.to_string_lossy());
        assert!(with_time.starts_with(&without));
        assert_ne!(with_time, without);
    }

    #[tokio::test]
    async fn test_cache_key_without_metadata_is_the_path() {
        let data = ImageData::Path("/definitely/not/here.png".into());
        let key = FileFetcher::default().cache_key(&data).await;
        assert_eq!(key.as_deref(), Some("/definitely/not/here.png"));
    }
}
