//! The security mode store: one current level, one generation counter.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::error::{InitFault, ModeError};
use crate::level::SecurityLevel;
use crate::subscription::{Subscriber, Subscription};

/// Events buffered per subscriber before it is considered too slow.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

/// Snapshot of the store: the current level and how many transitions
/// have been committed since initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModeState {
    pub current: SecurityLevel,
    pub generation: u64,
}

pub(crate) struct StoreInner {
    state: Option<ModeState>,
    pub(crate) subscribers: Vec<Subscriber>,
    next_subscriber_id: u64,
}

impl StoreInner {
    fn state(&self) -> Result<ModeState, ModeError> {
        self.state
            .ok_or(ModeError::UninitializedState(InitFault::NotInitialized))
    }

    /// Delivers a committed state to every subscriber without waiting.
    ///
    /// Subscribers whose buffer is full are dropped and flagged so their
    /// next receive reports [`ModeError::SubscriberOverflow`].
    fn publish(&mut self, committed: ModeState) {
        self.subscribers.retain(|sub| match sub.tx.try_send(committed) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                sub.mark_overflowed();
                warn!(
                    subscriber = sub.id,
                    generation = committed.generation,
                    "subscriber buffer full, dropping subscriber"
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    fn register(&mut self, capacity: usize, store: &Arc<RwLock<StoreInner>>) -> Subscription {
        let (tx, rx) = mpsc::channel(capacity);
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;

        let subscriber = Subscriber::new(id, tx);
        let subscription = Subscription::new(id, rx, subscriber.overflow_flag(), store);
        self.subscribers.push(subscriber);
        subscription
    }
}

pub(crate) fn write_inner(lock: &RwLock<StoreInner>) -> RwLockWriteGuard<'_, StoreInner> {
    // Every critical section leaves the state whole, so a panic elsewhere
    // cannot leave it torn.
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn read_inner(lock: &RwLock<StoreInner>) -> RwLockReadGuard<'_, StoreInner> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to the authoritative security mode.
///
/// Cloning is cheap; all clones address the same state. Transitions are
/// linearizable: they are totally ordered with each other and with
/// [`current`](Self::current), and each one bumps the generation by exactly
/// one, even when the level does not change.
#[derive(Clone)]
pub struct SecurityModeStore {
    inner: Arc<RwLock<StoreInner>>,
    capacity: usize,
}

impl Default for SecurityModeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityModeStore {
    /// Creates an uninitialized store with the default subscriber buffer.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Creates an uninitialized store buffering up to `capacity` events
    /// per subscriber (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                state: None,
                subscribers: Vec::new(),
                next_subscriber_id: 0,
            })),
            capacity: capacity.max(1),
        }
    }

    /// Sets the initial level at generation 0. Allowed exactly once.
    pub fn initialize(&self, level: SecurityLevel) -> Result<(), ModeError> {
        let mut inner = write_inner(&self.inner);
        if inner.state.is_some() {
            return Err(ModeError::UninitializedState(InitFault::AlreadyInitialized));
        }
        inner.state = Some(ModeState {
            current: level,
            generation: 0,
        });
        info!(%level, "security mode initialized");
        Ok(())
    }

    /// Returns a consistent snapshot of the current level and generation.
    pub fn current(&self) -> Result<ModeState, ModeError> {
        read_inner(&self.inner).state()
    }

    /// Commits `level` as the current level and returns the new generation.
    ///
    /// Setting the level it already has still commits and notifies; callers
    /// use that to ask for the icon to be presented again.
    pub fn transition(&self, level: SecurityLevel) -> Result<u64, ModeError> {
        let mut inner = write_inner(&self.inner);
        let mut committed = inner.state()?;
        committed.current = level;
        committed.generation += 1;
        inner.state = Some(committed);
        inner.publish(committed);

        debug!(
            %level,
            generation = committed.generation,
            subscribers = inner.subscribers.len(),
            "security mode transition committed"
        );
        Ok(committed.generation)
    }

    /// Re-commits the current level, asking subscribers to present it again.
    ///
    /// Unlike reading [`current`](Self::current) and transitioning to it, no
    /// other transition can slip in between.
    pub fn refresh(&self) -> Result<u64, ModeError> {
        let mut inner = write_inner(&self.inner);
        let mut committed = inner.state()?;
        committed.generation += 1;
        inner.state = Some(committed);
        inner.publish(committed);

        debug!(
            level = %committed.current,
            generation = committed.generation,
            "security mode refreshed"
        );
        Ok(committed.generation)
    }

    /// Subscribes to transitions committed after this call.
    ///
    /// Nothing is replayed. Take the baseline from [`current`](Self::current)
    /// after subscribing and discard events at or below its generation, or use
    /// [`subscribe_with_snapshot`](Self::subscribe_with_snapshot).
    pub fn subscribe(&self) -> Result<Subscription, ModeError> {
        let mut inner = write_inner(&self.inner);
        inner.state()?;
        Ok(inner.register(self.capacity, &self.inner))
    }

    /// Takes a snapshot and subscribes in the same critical section, so the
    /// first event received has generation `snapshot.generation + 1`.
    pub fn subscribe_with_snapshot(&self) -> Result<(ModeState, Subscription), ModeError> {
        let mut inner = write_inner(&self.inner);
        let snapshot = inner.state()?;
        let subscription = inner.register(self.capacity, &self.inner);
        Ok((snapshot, subscription))
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        read_inner(&self.inner)
            .subscribers
            .iter()
            .filter(|sub| !sub.tx.is_closed())
            .count()
    }
}
