//! Execution contexts for pipeline stages.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{Cancelled, PipelineError};

/// Where a unit of pipeline work runs.
#[derive(Debug, Clone, Default)]
pub enum Dispatcher {
    /// On the caller's task.
    #[default]
    Inline,
    /// On a runtime: futures as spawned tasks, closures on the blocking pool.
    /// `permits` bounds how many units run at once.
    Pool {
        /// Runtime to spawn on; the ambient runtime when `None`.
        handle: Option<Handle>,
        /// Concurrency limit.
        permits: Option<Arc<Semaphore>>,
    },
}

impl Dispatcher {
    /// A pool dispatcher on the ambient runtime with at most `limit`
    /// concurrent units (unbounded for zero).
    #[must_use]
    pub fn pool(limit: usize) -> Self {
        Self::Pool {
            handle: None,
            permits: (limit > 0).then(|| Arc::new(Semaphore::new(limit))),
        }
    }

    /// Runs an async unit of work and resumes with its output.
    ///
    /// # Errors
    /// Returns error if the spawned task panics.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, PipelineError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match self {
            Self::Inline => Ok(fut.await),
            Self::Pool { handle, permits } => {
                let _permit = acquire(permits.as_ref()).await?;
                let task = match handle {
                    Some(h) => h.spawn(fut),
                    None => tokio::spawn(fut),
                };
                task.await
                    .map_err(|e| PipelineError::dispatch(format!("task failed: {e}")))
            }
        }
    }

    /// Runs a CPU-bound closure and resumes with its output.
    ///
    /// # Errors
    /// Returns error if the closure panics.
    pub async fn run_blocking<F, T>(&self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        match self {
            Self::Inline => Ok(f()),
            Self::Pool { handle, permits } => {
                let _permit = acquire(permits.as_ref()).await?;
                let task = match handle {
                    Some(h) => h.spawn_blocking(f),
                    None => tokio::task::spawn_blocking(f),
                };
                task.await
                    .map_err(|e| PipelineError::dispatch(format!("blocking task failed: {e}")))
            }
        }
    }
}

async fn acquire(
    permits: Option<&Arc<Semaphore>>,
) -> Result<Option<tokio::sync::OwnedSemaphorePermit>, PipelineError> {
    match permits {
        Some(sem) => sem
            .clone()
            .acquire_owned()
            .await
            .map(Some)
            .map_err(|e| PipelineError::dispatch(format!("dispatcher closed: {e}"))),
        None => Ok(None),
    }
}

/// Races `fut` against `token`.
///
/// # Errors
/// Returns [`Cancelled`] if the token fires first or was already cancelled.
pub async fn cancellable<F: Future>(
    token: &CancellationToken,
    fut: F,
) -> Result<F::Output, Cancelled> {
    if token.is_cancelled() {
        return Err(Cancelled);
    }
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Cancelled),
        out = fut => Ok(out),
    }
}

/// Fails with [`Cancelled`] if `token` has fired.
///
/// # Errors
/// Returns [`Cancelled`] if the token is cancelled.
pub fn ensure_active(token: &CancellationToken) -> Result<(), Cancelled> {
    if token.is_cancelled() {
        Err(Cancelled)
    } else {
        Ok(())
    }
}

/// Dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum concurrent fetches (0 = unbounded).
    #[serde(default = "default_fetches")]
    pub max_concurrent_fetches: usize,

    /// Maximum concurrent decodes (0 = unbounded).
    #[serde(default = "default_decodes")]
    pub max_concurrent_decodes: usize,

    /// Maximum concurrent transformation chains (0 = unbounded).
    #[serde(default = "default_decodes")]
    pub max_concurrent_transforms: usize,
}

const fn default_fetches() -> usize {
    4
}

const fn default_decodes() -> usize {
    2
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_fetches(),
            max_concurrent_decodes: default_decodes(),
            max_concurrent_transforms: default_decodes(),
        }
    }
}

/// Named execution contexts for each stage.
#[derive(Debug, Clone, Default)]
pub struct Dispatchers {
    /// Runs the interceptor chain.
    pub interceptor: Dispatcher,
    /// Runs fetchers.
    pub fetch: Dispatcher,
    /// Runs decoders.
    pub decode: Dispatcher,
    /// Runs transformations.
    pub transform: Dispatcher,
}

impl Dispatchers {
    /// Builds dispatchers from configuration.
    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            interceptor: Dispatcher::Inline,
            fetch: Dispatcher::pool(config.max_concurrent_fetches),
            decode: Dispatcher::pool(config.max_concurrent_decodes),
            transform: Dispatcher::pool(config.max_concurrent_transforms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_inline_runs_in_place() {
        let out = Dispatcher::Inline.run(async { 2 + 2 }).await.unwrap();
        assert_eq!(out, 4);
        let out = Dispatcher::Inline.run_blocking(|| "done").await.unwrap();
        assert_eq!(out, "done");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_limits_concurrency() {
        let dispatcher = Dispatcher::pool(1);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs = (0..4).map(|_| {
            let dispatcher = dispatcher.clone();
            let running = running.clone();
            let peak = peak.clone();
            async move {
                dispatcher
                    .run_blocking(move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(10));
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }
        });
        for result in futures_util::future::join_all(jobs).await {
            result.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panics_become_dispatch_errors() {
        let err = Dispatcher::pool(0)
            .run_blocking(|| -> u32 { panic!("boom") })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::domain::errors::FailureKind::Dispatch);
    }

    #[tokio::test]
    async fn test_cancellable() {
        let token = CancellationToken::new();
        assert_eq!(cancellable(&token, async { 1 }).await, Ok(1));

        let child = token.child_token();
        let pending = cancellable(&child, std::future::pending::<()>());
        token.cancel();
        assert_eq!(pending.await, Err(Cancelled));
        assert_eq!(ensure_active(&child), Err(Cancelled));
    }
}
