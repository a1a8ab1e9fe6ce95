//! Lifecycle gating and deferred size resolution backed by watch channels.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::trace;

use crate::domain::entities::Size;
use crate::domain::ports::SizeResolver;

/// Holds enqueued requests back until their owner is active.
#[derive(Debug, Clone)]
pub struct LifecycleGate {
    state: Arc<watch::Sender<bool>>,
}

impl LifecycleGate {
    /// Creates a gate in the given state.
    #[must_use]
    pub fn new(active: bool) -> Self {
        Self {
            state: Arc::new(watch::Sender::new(active)),
        }
    }

    /// A gate that never blocks.
    #[must_use]
    pub fn always_active() -> Self {
        Self::new(true)
    }

    /// Opens or closes the gate.
    pub fn set_active(&self, active: bool) {
        let changed = self.state.send_if_modified(|state| {
            let changed = *state != active;
            *state = active;
            changed
        });
        if changed {
            trace!(active, "Lifecycle gate changed");
        }
    }

    /// Returns true if the gate is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self.state.borrow()
    }

    /// Suspends until the gate is open.
    pub async fn wait_active(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|active| *active).await;
    }
}

impl Default for LifecycleGate {
    fn default() -> Self {
        Self::always_active()
    }
}

/// Publishes the measured size of a display surface.
#[derive(Debug, Clone)]
pub struct Viewport {
    tx: Arc<watch::Sender<Option<Size>>>,
}

impl Viewport {
    /// Publishes a measured size. Zero dimensions are ignored.
    pub fn set_size(&self, width: u32, height: u32) {
        if let Some(size) = Size::pixels(width, height) {
            self.tx.send_replace(Some(size));
        }
    }
}

/// Resolves to a display surface's size once it has been measured.
#[derive(Debug, Clone)]
pub struct ViewportSizeResolver {
    rx: watch::Receiver<Option<Size>>,
}

impl ViewportSizeResolver {
    /// Creates a resolver and the handle used to publish sizes to it.
    #[must_use]
    pub fn new() -> (Arc<Self>, Viewport) {
        let (tx, rx) = watch::channel(None);
        (Arc::new(Self { rx }), Viewport { tx: Arc::new(tx) })
    }
}

#[async_trait]
impl SizeResolver for ViewportSizeResolver {
    async fn size(&self) -> Size {
        let mut rx = self.rx.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(size) => (*size).unwrap_or_default(),
            // The viewport went away before it was measured.
            Err(_) => Size::Original,
        }
    }

    fn is_deferred(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_gate_blocks_until_active() {
        let gate = LifecycleGate::new(false);
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait_active().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        gate.set_active(true);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(gate.is_active());
    }

    #[test]
    fn test_gate_wakes_waiter_on_open() {
        let gate = LifecycleGate::new(false);
        let mut waiter = tokio_test::task::spawn(gate.wait_active());
        tokio_test::assert_pending!(waiter.poll());

        gate.set_active(false);
        assert!(!waiter.is_woken());

        gate.set_active(true);
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_viewport_resolves_after_measure() {
        let (resolver, viewport) = ViewportSizeResolver::new();
        assert!(resolver.is_deferred());

        let pending = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.size().await }
        });
        viewport.set_size(0, 10);
        viewport.set_size(320, 240);

        let size = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(size, Size::pixels(320, 240).unwrap());
    }

    #[tokio::test]
    async fn test_viewport_dropped_falls_back_to_original() {
        let (resolver, viewport) = ViewportSizeResolver::new();
        drop(viewport);
        assert_eq!(resolver.size().await, Size::Original);
    }
}
