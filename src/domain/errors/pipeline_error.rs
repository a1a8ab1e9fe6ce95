//! Request pipeline error types.

use thiserror::Error;

/// Broad category of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No provider accepts the input.
    Mapping,
    /// Fetching raw data failed.
    Fetch,
    /// Decoding failed or no decoder accepted the data.
    Decode,
    /// A transformation failed.
    Transform,
    /// A worker task panicked or was aborted.
    Dispatch,
}

/// Pipeline error variants.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum PipelineError {
    #[error("no fetcher is registered for '{data}'")]
    NoApplicableFetcher { data: String },

    #[error("fetch failed: {message}")]
    Fetch { message: String },

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no decoder accepts the fetched data (mime type: {mime_type:?})")]
    NoApplicableDecoder { mime_type: Option<String> },

    #[error("decode failed: {message}")]
    Decode { message: String },

    #[error("transformation '{key}' failed: {message}")]
    Transform { key: String, message: String },

    #[error("worker task failed: {message}")]
    Dispatch { message: String },
}

impl PipelineError {
    /// Creates fetch error.
    #[must_use]
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates transformation error.
    #[must_use]
    pub fn transform(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates dispatch error.
    #[must_use]
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Returns the failure category.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NoApplicableFetcher { .. } => FailureKind::Mapping,
            Self::Fetch { .. } | Self::Http { .. } | Self::Io { .. } => FailureKind::Fetch,
            Self::NoApplicableDecoder { .. } | Self::Decode { .. } => FailureKind::Decode,
            Self::Transform { .. } => FailureKind::Transform,
            Self::Dispatch { .. } => FailureKind::Dispatch,
        }
    }
}

/// Cooperative cancellation. Not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request was cancelled")]
pub struct Cancelled;

/// Either a pipeline failure or cancellation, used inside the pipeline so `?`
/// can carry both.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage failed.
    #[error(transparent)]
    Failed(#[from] PipelineError),
    /// The request was cancelled.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            PipelineError::NoApplicableFetcher { data: "x".into() }.kind(),
            FailureKind::Mapping
        );
        assert_eq!(
            PipelineError::Http {
                status: 404,
                url: "u".into()
            }
            .kind(),
            FailureKind::Fetch
        );
        assert_eq!(PipelineError::decode("bad").kind(), FailureKind::Decode);
        assert_eq!(
            PipelineError::transform("blur", "oops").kind(),
            FailureKind::Transform
        );
    }

    #[test]
    fn test_messages() {
        let err = PipelineError::transform("blur(2)", "out of memory");
        assert_eq!(err.to_string(), "transformation 'blur(2)' failed: out of memory");
        assert_eq!(Cancelled.to_string(), "request was cancelled");
    }
}
