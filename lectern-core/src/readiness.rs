//! Set-once readiness signal shared by any number of waiters

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// A value that becomes available exactly once, at some unknown point.
///
/// Loaders call [`Readiness::set`] when the capability (a typesetting engine,
/// the page itself) is usable. Consumers either await it without limit or
/// with [`Readiness::wait_bounded`], which checks at a fixed interval and also
/// wakes as soon as the value arrives.
pub struct Readiness<T> {
    tx: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for Readiness<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Readiness<T> {
    /// Create a signal that is not ready yet
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Create a signal that is already resolved
    pub fn ready(value: T) -> Self {
        let signal = Self::new();
        signal.set(value);
        signal
    }

    /// Resolve the signal. Returns `false` if it was already resolved,
    /// in which case the first value is kept.
    pub fn set(&self, value: T) -> bool {
        let mut stored = false;
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            stored = true;
            true
        });
        stored
    }

    /// Current value, if resolved
    pub fn get(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Check whether the signal has been resolved
    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Wait until the signal resolves
    pub async fn wait(&self) -> T {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(value) = rx.borrow_and_update().as_ref() {
                return value.clone();
            }
            // `self` owns the sender, so the channel stays open while we wait.
            let _ = rx.changed().await;
        }
    }

    /// Wait for at most `attempts` intervals. Returns `None` when the value
    /// never showed up.
    pub async fn wait_bounded(&self, attempts: u32, interval: Duration) -> Option<T> {
        let mut rx = self.tx.subscribe();
        for attempt in 0..=attempts {
            if let Some(value) = rx.borrow_and_update().as_ref() {
                return Some(value.clone());
            }
            if attempt == attempts {
                break;
            }
            tracing::trace!(attempt, "readiness not resolved yet");
            let _ = tokio::time::timeout(interval, rx.changed()).await;
        }
        None
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Readiness<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Readiness<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Readiness")
            .field("ready", &self.tx.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_only_once() {
        let signal = Readiness::new();
        assert!(!signal.is_ready());
        assert!(signal.set(1));
        assert!(!signal.set(2));
        assert_eq!(signal.get(), Some(1));
    }

    #[tokio::test]
    async fn test_wait_resolves_for_every_waiter() {
        let signal: Readiness<&'static str> = Readiness::new();
        let first = tokio::spawn({
            let signal = signal.clone();
            async move { signal.wait().await }
        });
        let second = tokio::spawn({
            let signal = signal.clone();
            async move { signal.wait().await }
        });

        tokio::task::yield_now().await;
        signal.set("loaded");

        assert_eq!(first.await.unwrap(), "loaded");
        assert_eq!(second.await.unwrap(), "loaded");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_bounded_gives_up() {
        let signal: Readiness<u8> = Readiness::new();
        let started = tokio::time::Instant::now();

        let result = signal.wait_bounded(15, Duration::from_millis(300)).await;

        assert_eq!(result, None);
        assert_eq!(started.elapsed(), Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_bounded_wakes_early() {
        let signal: Readiness<u8> = Readiness::new();
        let setter = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            setter.set(7);
        });

        let started = tokio::time::Instant::now();
        let result = signal.wait_bounded(15, Duration::from_millis(300)).await;

        assert_eq!(result, Some(7));
        assert!(started.elapsed() < Duration::from_millis(900));
    }
}
