// ── Reactive subscriptions ──
//
// Subscription types for consuming snapshot changes from the stores.

use std::sync::Arc;

use tokio::sync::watch;

/// A subscription to a replaced-wholesale snapshot.
///
/// Provides point-in-time access and change notification via
/// [`changed()`](Self::changed).
pub struct Subscription<T: Send + Sync + 'static> {
    current: Arc<T>,
    receiver: watch::Receiver<Arc<T>>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot seen at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<T> {
        &self.current
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> Arc<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the publisher is gone.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn changed_advances_current() {
        let (tx, rx) = watch::channel(Arc::new(1));
        let mut sub = Subscription::new(rx);
        assert_eq!(**sub.current(), 1);

        tx.send_replace(Arc::new(2));
        assert_eq!(*sub.latest(), 2);
        assert_eq!(**sub.current(), 1);

        assert_eq!(*sub.changed().await.unwrap(), 2);
        assert_eq!(**sub.current(), 2);

        drop(tx);
        assert!(sub.changed().await.is_none());
    }
}
