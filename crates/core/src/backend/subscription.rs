use tokio::sync::mpsc;

/// Releases a backend-side subscriber registration when dropped.
///
/// Every exit path — explicit unsubscribe, session teardown, panic
/// unwinding — runs the release closure exactly once.
pub struct SubscriptionGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A guard with nothing to release (used by fallback subscriptions).
    pub fn noop() -> Self {
        Self { release: None }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("armed", &self.release.is_some())
            .finish()
    }
}

/// A live snapshot feed from the external store.
///
/// Each delivered value is a full authoritative replacement of the
/// subscribed data, applied in arrival order. The backend registration
/// is released when the subscription is dropped.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    _guard: SubscriptionGuard,
}

impl<T> Subscription<T> {
    pub fn new(rx: mpsc::UnboundedReceiver<T>, guard: SubscriptionGuard) -> Self {
        Self { rx, _guard: guard }
    }

    /// A subscription that never delivers anything.
    /// Used as the fallback when subscribing to the store fails.
    pub fn empty() -> Self {
        let (_tx, rx) = mpsc::unbounded_channel();
        Self {
            rx,
            _guard: SubscriptionGuard::noop(),
        }
    }

    /// Take the next pending snapshot without waiting.
    /// Returns `None` when nothing is queued or the feed has ended.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next snapshot.
    /// Returns `None` once the backend has dropped the feed.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Explicitly release the backend registration.
    /// Equivalent to dropping the subscription; provided for readability
    /// at teardown sites.
    pub fn unsubscribe(self) {}
}

/// Channel pair used by backends to construct a subscription feed.
pub fn feed_channel<T>() -> (mpsc::UnboundedSender<T>, mpsc::UnboundedReceiver<T>) {
    mpsc::unbounded_channel()
}
