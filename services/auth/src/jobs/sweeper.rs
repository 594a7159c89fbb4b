//! Periodic purge of expired and revoked refresh tokens.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::domain::repository::RefreshTokenRepository;
use crate::error::AuthServiceError;
use crate::infra::db::DbRefreshTokenRepository;
use crate::usecase::token::RefreshLedger;

/// Run one bounded sweep. Failures are logged and returned; the caller decides whether to go on.
pub async fn sweep_once<R: RefreshTokenRepository>(
    ledger: &RefreshLedger<R>,
    batch_limit: u64,
    now: DateTime<Utc>,
) -> Result<u64, AuthServiceError> {
    match ledger.sweep(now, batch_limit).await {
        Ok(removed) => {
            if removed > 0 {
                info!(removed, batch_limit, "swept stale refresh tokens");
            }
            Ok(removed)
        }
        Err(e) => {
            error!(error = ?e, "refresh token sweep failed");
            Err(e)
        }
    }
}

/// Background task owning its own store handle. Stop it with [`TokenSweeper::shutdown`].
pub struct TokenSweeper {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TokenSweeper {
    /// Start sweeping immediately, then every `every`.
    pub fn spawn(
        ledger: RefreshLedger<DbRefreshTokenRepository>,
        every: Duration,
        batch_limit: u64,
    ) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(every_secs = every.as_secs(), batch_limit, "token sweeper started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        // A failed run is retried on the next tick.
                        let _ = sweep_once(&ledger, batch_limit, Utc::now()).await;
                    }
                    _ = stopped.changed() => break,
                }
            }
            info!("token sweeper stopped");
        });
        Self { stop, task }
    }

    /// Signal the loop to stop and wait for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "token sweeper task failed");
        }
    }
}
