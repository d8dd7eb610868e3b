//! Application orchestrator: wires the store, the tray notifier, and the
//! decision sources together.

use std::time::Duration;

use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use modeguard_security_mode::{SecurityLevel, SecurityModeStore};
use modeguard_tray::{TrayEvent, TrayNotifier};

use crate::commands::read_commands;
use crate::config::Config;
use crate::log_tray::LogTray;

/// Runs the agent until shutdown is requested.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    // -- Store --
    let store = SecurityModeStore::with_capacity(config.subscriber_capacity);
    store.initialize(config.initial_level)?;

    // -- Tray --
    let notifier = TrayNotifier::start(
        store.clone(),
        LogTray::new(),
        config.retry.to_retry_config(),
    )?;

    // -- Commands --
    let (event_tx, event_rx) = mpsc::channel(16);
    tokio::spawn(read_commands(BufReader::new(tokio::io::stdin()), event_tx));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("SIGINT received, shutting down");
                shutdown.cancel();
            }
            Err(e) => warn!("failed to listen for SIGINT: {e}"),
        }
    });

    info!("agent ready");

    let policy = Policy::new(store, config.initial_level, config.auto_revert());
    let result = policy.run(event_rx, cancel).await;

    // -- Graceful shutdown --
    info!("stopping tray notifier...");
    notifier.stop().await?;

    result
}

/// Decision source: turns tray events and the auto-revert timer into store
/// transitions.
pub struct Policy {
    store: SecurityModeStore,
    default_level: SecurityLevel,
    revert_after: Option<Duration>,
}

impl Policy {
    pub fn new(
        store: SecurityModeStore,
        default_level: SecurityLevel,
        revert_after: Option<Duration>,
    ) -> Self {
        Self {
            store,
            default_level,
            revert_after,
        }
    }

    /// Processes events until quit is requested or `shutdown` fires.
    ///
    /// Losing the event source (e.g. stdin closed) does not end the loop.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<TrayEvent>,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        let revert = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(revert);
        let mut revert_armed = false;
        let mut events_open = true;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown signal received");
                    break;
                }

                event = events.recv(), if events_open => match event {
                    Some(TrayEvent::LevelSelected(level)) => {
                        let generation = self.store.transition(level)?;
                        info!(%level, generation, "security level selected");

                        match self.revert_after {
                            Some(after) if level != self.default_level => {
                                revert.as_mut().reset(Instant::now() + after);
                                revert_armed = true;
                                debug!(
                                    %level,
                                    revert_secs = after.as_secs(),
                                    "auto-revert armed"
                                );
                            }
                            _ => revert_armed = false,
                        }
                    }
                    Some(TrayEvent::RefreshRequested) => {
                        let generation = self.store.refresh()?;
                        info!(generation, "tray refresh requested");
                    }
                    Some(TrayEvent::QuitRequested) => {
                        info!("quit requested");
                        break;
                    }
                    None => {
                        events_open = false;
                        debug!("command source closed, waiting for shutdown signal");
                    }
                },

                () = &mut revert, if revert_armed => {
                    revert_armed = false;
                    let generation = self.store.transition(self.default_level)?;
                    info!(
                        level = %self.default_level,
                        generation,
                        "auto-revert to default level"
                    );
                }
            }
        }

        Ok(())
    }
}
