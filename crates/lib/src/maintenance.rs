//! Periodic maintenance: session sweep and ledger purge.
//!
//! A single background task owns the timer. It holds only a weak vault
//! handle, so it never keeps a closed vault alive; it exits when the
//! [`Maintenance`] handle is dropped or, failing that, on the first tick
//! after the last strong handle is gone. Requested and timed sweeps go
//! through the same loop, so two sweeps never run concurrently.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::Result;
use crate::vault::{SweepReport, Vault, WeakVault};

/// Errors from the maintenance handle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MaintenanceError {
    /// The background task is gone, either shut down or its vault closed.
    #[error("Maintenance task has stopped")]
    TaskStopped,
}

// Conversion to the crate-level Error type
impl From<MaintenanceError> for crate::Error {
    fn from(err: MaintenanceError) -> Self {
        crate::Error::Maintenance(err)
    }
}

enum MaintenanceCommand {
    SweepNow {
        response: oneshot::Sender<Result<SweepReport>>,
    },
}

/// Handle to the running maintenance task.
///
/// Dropping the handle stops the task after its current iteration.
pub struct Maintenance {
    commands: mpsc::Sender<MaintenanceCommand>,
}

impl Maintenance {
    /// Spawn the maintenance task for `vault`, ticking every
    /// [`Policy::sweep_period`](crate::Policy).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(vault: &Vault) -> Self {
        let period = vault.policy().sweep_period;
        let (tx, rx) = mpsc::channel(8);
        let task = MaintenanceTask {
            vault: vault.downgrade(),
        };
        tokio::spawn(
            task.run(rx, period)
                .instrument(tracing::info_span!("maintenance")),
        );
        Self { commands: tx }
    }

    /// Run one sweep now and return what it removed.
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(MaintenanceCommand::SweepNow { response: tx })
            .await
            .map_err(|_| MaintenanceError::TaskStopped)?;
        rx.await.map_err(|_| MaintenanceError::TaskStopped)?
    }
}

struct MaintenanceTask {
    vault: WeakVault,
}

impl MaintenanceTask {
    async fn run(self, mut commands: mpsc::Receiver<MaintenanceCommand>, period: Duration) {
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; a just-opened vault has nothing
        // to sweep yet.
        timer.tick().await;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(MaintenanceCommand::SweepNow { response }) => {
                        let report = match self.vault.upgrade() {
                            Some(vault) => vault.sweep().await,
                            None => Err(MaintenanceError::TaskStopped.into()),
                        };
                        // The requester may have given up waiting.
                        let _ = response.send(report);
                    }
                    None => break,
                },
                _ = timer.tick() => {
                    let Some(vault) = self.vault.upgrade() else {
                        break;
                    };
                    if let Err(e) = vault.sweep().await {
                        tracing::warn!(error = %e, "Periodic sweep failed");
                    }
                }
            }
        }
        tracing::debug!("Maintenance task stopped");
    }
}
