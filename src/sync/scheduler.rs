use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use super::synchronizer::Synchronizer;

/// A sync pass that escaped the synchronizer's own error handling.
#[derive(Debug, Error)]
#[error("sync pass aborted: {0}")]
pub struct SchedulerFault(#[from] JoinError);

/// Handle to the background poll loop.
pub struct SchedulerHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask the loop to stop and wait for it.
    ///
    /// A pass already running is allowed to finish first.
    pub async fn stop(self) -> Result<(), JoinError> {
        let _ = self.cancel_tx.send(());
        self.join.await
    }
}

/// Run `synchronizer.sync_all()` now, then again `interval` after each pass
/// ends, until stopped.
pub fn spawn_scheduler(synchronizer: Synchronizer, interval: Duration) -> SchedulerHandle {
    spawn_with(interval, move || {
        let synchronizer = synchronizer.clone();
        async move { synchronizer.sync_all().await }
    })
}

/// Poll loop over an arbitrary pass.
///
/// Each pass runs in its own task so a panic inside it is caught here,
/// logged as a [`SchedulerFault`], and the loop carries on. Spacing between
/// passes is the pass duration plus `interval`.
pub fn spawn_with<F, Fut>(interval: Duration, pass: F) -> SchedulerHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::spawn(pass()).await {
                let fault = SchedulerFault::from(e);
                error!(error = %fault, "Sync pass crashed, continuing on schedule");
            }

            info!(
                next_in_secs = interval.as_secs(),
                "Next sync pass scheduled"
            );

            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("Scheduler shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    });

    SchedulerHandle { cancel_tx, join }
}
