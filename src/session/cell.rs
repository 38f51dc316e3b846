//! Observable value cell: a holder with a synchronous current-value read, an
//! atomic replace, and a replay-latest subscription stream. New subscribers
//! immediately receive the current value, then every subsequent change; slow
//! subscribers observe the latest value rather than the full history
//! (last-write-wins, matching the store's ordering guarantee).

use futures_util::Stream;
use tokio::sync::watch;

pub struct ObservedCell<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + Send + Sync + 'static> ObservedCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Single-step replacement; delivered to subscribers even when none were
    /// registered at the previous set.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Lazy, infinite stream of values. Ends only when the cell is dropped.
    pub fn stream(&self) -> impl Stream<Item = T> + Send + Unpin {
        let rx = self.tx.subscribe();
        Box::pin(futures_util::stream::unfold(
            (rx, true),
            |(mut rx, first)| async move {
                if first {
                    let current = rx.borrow_and_update().clone();
                    return Some((current, (rx, false)));
                }
                match rx.changed().await {
                    Ok(()) => {
                        let next = rx.borrow_and_update().clone();
                        Some((next, (rx, false)))
                    }
                    Err(_) => None,
                }
            },
        ))
    }
}
