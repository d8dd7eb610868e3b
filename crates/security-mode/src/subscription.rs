//! Ordered, bounded delivery of committed transitions.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::error::ModeError;
use crate::store::{ModeState, StoreInner, write_inner};

/// Store-side half of a subscription.
pub(crate) struct Subscriber {
    pub(crate) id: u64,
    pub(crate) tx: mpsc::Sender<ModeState>,
    overflowed: Arc<AtomicBool>,
}

impl Subscriber {
    pub(crate) fn new(id: u64, tx: mpsc::Sender<ModeState>) -> Self {
        Self {
            id,
            tx,
            overflowed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn overflow_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.overflowed)
    }

    /// Must be called before the sender is dropped so the receiver sees the
    /// flag once the channel reports closed.
    pub(crate) fn mark_overflowed(&self) {
        self.overflowed.store(true, Ordering::Release);
    }
}

/// Consumer half: yields every transition committed after it was created,
/// in commit order.
///
/// Buffered events are always delivered before the subscription reports that
/// it ended. The end is either [`ModeError::SubscriberOverflow`] (it fell
/// behind and must resynchronize) or [`ModeError::Closed`] (the store is gone).
/// Dropping the subscription unsubscribes it.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<ModeState>,
    overflowed: Arc<AtomicBool>,
    store: Weak<RwLock<StoreInner>>,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        rx: mpsc::Receiver<ModeState>,
        overflowed: Arc<AtomicBool>,
        store: &Arc<RwLock<StoreInner>>,
    ) -> Self {
        Self {
            id,
            rx,
            overflowed,
            store: Arc::downgrade(store),
        }
    }

    /// Waits for the next committed transition.
    pub async fn recv(&mut self) -> Result<ModeState, ModeError> {
        match self.rx.recv().await {
            Some(state) => Ok(state),
            None => Err(self.end_reason()),
        }
    }

    /// Returns the next buffered transition, or `None` if nothing is waiting.
    pub fn try_recv(&mut self) -> Result<Option<ModeState>, ModeError> {
        match self.rx.try_recv() {
            Ok(state) => Ok(Some(state)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.end_reason()),
        }
    }

    /// Whether the store dropped this subscriber for falling behind.
    pub fn overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Acquire)
    }

    /// Adapts the subscription into a stream. The stream yields the terminal
    /// error once and then ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<ModeState, ModeError>> + Send {
        futures_util::stream::unfold(Some(self), |sub| async move {
            let mut sub = sub?;
            match sub.recv().await {
                Ok(state) => Some((Ok(state), Some(sub))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Unsubscribes explicitly. Equivalent to dropping.
    pub fn unsubscribe(self) {}

    fn end_reason(&self) -> ModeError {
        if self.overflowed() {
            ModeError::SubscriberOverflow
        } else {
            ModeError::Closed
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            write_inner(&store).subscribers.retain(|sub| sub.id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("overflowed", &self.overflowed())
            .finish_non_exhaustive()
    }
}
