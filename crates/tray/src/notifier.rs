//! Tray notifier: keeps the tray icon in step with the security mode store.
//!
//! The notifier runs on its own tokio task. It renders the baseline level on
//! start, then renders every newer transition in commit order. Failed renders
//! are retried with [`RetryConfig`] backoff, and a newer transition replaces
//! the failing target at once. The generation it last rendered only advances
//! when the backend confirms success.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use modeguard_security_mode::{
    ModeError, ModeState, SecurityLevel, SecurityModeStore, Subscription,
};

use crate::backend::TrayBackend;
use crate::icons::resolve;
use crate::retry::RetryConfig;

/// Where the notifier stands relative to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierStatus {
    /// Started, baseline not rendered yet.
    Uninitialized,
    /// The tray shows `level` as of `generation`.
    Synced { level: SecurityLevel, generation: u64 },
    /// Rendering `level` at `generation` failed `attempts` times. Once
    /// `exhausted`, the notifier waits for the next transition.
    RenderFailed {
        level: SecurityLevel,
        generation: u64,
        attempts: u32,
        exhausted: bool,
    },
    /// Terminal. The subscription and the tray icon are released.
    Stopped,
}

/// Errors produced when starting or stopping a notifier.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error(transparent)]
    Mode(#[from] ModeError),

    #[error("notifier task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Cloneable stop switch, usable from any thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel: CancellationToken,
}

impl StopHandle {
    /// Requests the notifier to stop. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Handle to a running tray notifier.
///
/// Dropping the handle stops the notifier without waiting for it.
pub struct TrayNotifier {
    stop: StopHandle,
    status: watch::Receiver<NotifierStatus>,
    task: Option<JoinHandle<()>>,
}

impl TrayNotifier {
    /// Subscribes to `store` and spawns the notifier loop on the current
    /// tokio runtime.
    ///
    /// Fails with [`ModeError::UninitializedState`] if the store has not been
    /// initialized.
    pub fn start<B: TrayBackend>(
        store: SecurityModeStore,
        backend: B,
        retry: RetryConfig,
    ) -> Result<Self, NotifierError> {
        let (baseline, subscription) = store.subscribe_with_snapshot()?;
        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(NotifierStatus::Uninitialized);

        let worker = Worker {
            store,
            subscription,
            backend,
            retry,
            status_tx,
            cancel: cancel.clone(),
            last_rendered: None,
            store_closed: false,
        };
        let task = tokio::spawn(worker.run(baseline));

        info!(
            level = %baseline.current,
            generation = baseline.generation,
            "tray notifier started"
        );

        Ok(Self {
            stop: StopHandle { cancel },
            status: status_rx,
            task: Some(task),
        })
    }

    /// Current status.
    pub fn status(&self) -> NotifierStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<NotifierStatus> {
        self.status.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stops the notifier and waits until it has released the subscription
    /// and removed the tray icon. A pending retry wait is cancelled.
    pub async fn stop(mut self) -> Result<(), NotifierError> {
        self.stop.stop();
        if let Some(task) = self.task.take() {
            task.await?;
        }
        Ok(())
    }
}

impl Drop for TrayNotifier {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

/// How a render cycle for one target ended.
enum RenderOutcome {
    /// Rendered, or the attempt budget ran out.
    Settled,
    /// A newer transition replaced the target.
    Superseded(ModeState),
    Stopped,
}

struct Worker<B> {
    store: SecurityModeStore,
    subscription: Subscription,
    backend: B,
    retry: RetryConfig,
    status_tx: watch::Sender<NotifierStatus>,
    cancel: CancellationToken,
    last_rendered: Option<u64>,
    store_closed: bool,
}

impl<B: TrayBackend> Worker<B> {
    async fn run(mut self, baseline: ModeState) {
        let mut target = Some(baseline);
        while let Some(next) = target.take() {
            target = match self.render(next).await {
                RenderOutcome::Settled => self.next_target().await,
                RenderOutcome::Superseded(newer) => Some(newer),
                RenderOutcome::Stopped => None,
            };
        }
        self.shutdown();
    }

    /// Renders `target`, retrying with backoff until it succeeds, the budget
    /// runs out, a newer transition arrives, or the notifier is stopped.
    async fn render(&mut self, target: ModeState) -> RenderOutcome {
        let ModeState {
            current: level,
            generation,
        } = target;
        let icon = resolve(level);
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return RenderOutcome::Stopped,
                result = self.backend.set_icon(icon) => result,
            };

            let err = match result {
                Ok(()) => {
                    self.last_rendered = Some(generation);
                    self.status_tx
                        .send_replace(NotifierStatus::Synced { level, generation });
                    debug!(%level, generation, attempts, "tray icon rendered");
                    return RenderOutcome::Settled;
                }
                Err(err) => err,
            };

            let exhausted = self.retry.is_exhausted(attempts);
            self.status_tx.send_replace(NotifierStatus::RenderFailed {
                level,
                generation,
                attempts,
                exhausted,
            });

            if exhausted {
                warn!(
                    %level,
                    generation,
                    attempts,
                    error = %err,
                    "tray render failed, waiting for the next transition"
                );
                return RenderOutcome::Settled;
            }

            let delay = self.retry.delay_for_attempt(attempts);
            warn!(
                %level,
                generation,
                attempts,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "tray render failed, retrying"
            );

            if let Some(outcome) = self.wait_before_retry(delay).await {
                return outcome;
            }
        }
    }

    /// Sleeps out a backoff delay. Returns `None` when the delay elapsed and
    /// the same target should be tried again.
    async fn wait_before_retry(&mut self, delay: Duration) -> Option<RenderOutcome> {
        let backoff = tokio::time::sleep(delay);
        tokio::pin!(backoff);

        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Some(RenderOutcome::Stopped),
                () = &mut backoff => return None,
                received = self.subscription.recv(), if !self.store_closed => received,
            };

            if let Some(newer) = self.accept(received) {
                let newer = self.newest_pending(newer);
                debug!(
                    level = %newer.current,
                    generation = newer.generation,
                    "newer transition superseded pending retry"
                );
                return Some(RenderOutcome::Superseded(newer));
            }
        }
    }

    /// Waits for the next transition worth rendering. Returns `None` once
    /// stopped.
    async fn next_target(&mut self) -> Option<ModeState> {
        loop {
            if self.store_closed {
                // Nothing more can arrive; keep the last icon until stopped.
                self.cancel.cancelled().await;
                return None;
            }

            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                received = self.subscription.recv() => received,
            };

            if let Some(target) = self.accept(received) {
                return Some(self.newest_pending(target));
            }
        }
    }

    /// Drains whatever is already buffered and returns the newest state, so
    /// intermediate generations queued behind `target` are never rendered.
    fn newest_pending(&mut self, mut target: ModeState) -> ModeState {
        loop {
            let pending = match self.subscription.try_recv() {
                Ok(Some(state)) => state,
                Ok(None) => break,
                Err(ModeError::SubscriberOverflow) => match self.resync() {
                    Some(snapshot) => snapshot,
                    None => break,
                },
                Err(err) => {
                    warn!(error = %err, "mode subscription ended, keeping last icon");
                    self.store_closed = true;
                    break;
                }
            };

            if pending.generation > target.generation {
                debug!(
                    skipped = target.generation,
                    generation = pending.generation,
                    "coalesced queued transition"
                );
                target = pending;
            }
        }
        target
    }

    /// Turns a subscription result into a render target, resynchronizing on
    /// overflow and discarding anything not newer than the screen.
    fn accept(&mut self, received: Result<ModeState, ModeError>) -> Option<ModeState> {
        let candidate = match received {
            Ok(state) => state,
            Err(ModeError::SubscriberOverflow) => self.resync()?,
            Err(err) => {
                warn!(error = %err, "mode subscription ended, keeping last icon");
                self.store_closed = true;
                return None;
            }
        };

        if is_newer(self.last_rendered, candidate.generation) {
            Some(candidate)
        } else {
            debug!(
                generation = candidate.generation,
                last_rendered = ?self.last_rendered,
                "discarding stale transition"
            );
            None
        }
    }

    fn resync(&mut self) -> Option<ModeState> {
        match self.store.subscribe_with_snapshot() {
            Ok((snapshot, subscription)) => {
                warn!(
                    generation = snapshot.generation,
                    "tray notifier fell behind, resynchronized from current state"
                );
                self.subscription = subscription;
                Some(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "tray notifier could not resynchronize");
                self.store_closed = true;
                None
            }
        }
    }

    fn shutdown(self) {
        let Worker {
            subscription,
            mut backend,
            status_tx,
            last_rendered,
            ..
        } = self;

        subscription.unsubscribe();
        backend.remove_icon();
        status_tx.send_replace(NotifierStatus::Stopped);
        info!(last_rendered = ?last_rendered, "tray notifier stopped");
    }
}

fn is_newer(last_rendered: Option<u64>, generation: u64) -> bool {
    last_rendered.is_none_or(|last| generation > last)
}
