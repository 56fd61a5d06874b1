//! Background expiry sweep.
//!
//! One task per manager, ticking every `sweep_interval` and removing
//! sessions idle longer than `timeout`. Stopped through a watch channel and
//! joined on shutdown, so no sweep is left running behind the caller.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::manager::SessionManager;

pub struct SessionSweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SessionSweeper {
    /// Start sweeping. The first sweep runs one interval from now.
    pub fn spawn(manager: SessionManager) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(manager, shutdown_rx));
        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal the task and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "session sweeper task failed");
        }
    }
}

async fn run(manager: SessionManager, mut shutdown: watch::Receiver<bool>) {
    let period = manager.config().effective_sweep_interval();
    let timeout = manager.config().timeout;
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = period.as_secs(),
        timeout_secs = timeout.as_secs(),
        "session sweeper started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match manager.sweep_expired(Instant::now(), timeout).await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!(removed = n, "expired sessions swept"),
                    Err(e) => {
                        tracing::error!(error = %e, "session sweep failed, sweeper stopping");
                        break;
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("session sweeper stopped");
}
