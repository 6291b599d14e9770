//! Automatic-release polling service
//!
//! Runs in the background and periodically releases held payments whose
//! hold period has elapsed. The check is state-driven, not timer-driven:
//! each tick re-queries for `held` rows past their deadline, so a dispute
//! opened moments earlier simply makes the row invisible to the poll. No
//! timer is ever cancelled.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::time::interval;
use tracing::{error, info};

use crate::config::MonitorConfig;
use crate::db::DbPool;
use crate::logging::sanitize::sanitize_id;
use crate::models::payment::Payment;
use crate::services::escrow::{EscrowService, ReleaseTrigger};

/// Background poller that applies due automatic releases.
pub struct ReleaseMonitor {
    db: DbPool,
    service: EscrowService,
    config: MonitorConfig,
}

impl ReleaseMonitor {
    pub fn new(db: DbPool, service: EscrowService, config: MonitorConfig) -> Self {
        info!(
            poll_interval_secs = config.poll_interval_secs,
            "ReleaseMonitor initialized"
        );
        Self {
            db,
            service,
            config,
        }
    }

    /// Run the polling loop until the server shuts down.
    pub async fn start_monitoring(self: Arc<Self>) {
        let mut poll_timer = interval(self.config.poll_interval());

        info!("Starting automatic-release polling loop");

        loop {
            poll_timer.tick().await;

            if let Err(e) = self.poll_once().await {
                error!("Error polling for due releases: {e:#}");
            }
        }
    }

    /// One poll tick: release every held payment past its deadline.
    ///
    /// A payment that raced into another status between the query and the
    /// transition produces a benign error; it is already handled and only
    /// logged. Anything else is reported but does not stop the batch.
    pub async fn poll_once(&self) -> Result<usize> {
        let now = Utc::now().naive_utc();
        let batch_size = self.config.batch_size;

        let db = self.db.clone();
        let due = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            Payment::find_due_for_release(&mut conn, now, batch_size)
        })
        .await
        .context("Task join error")??;

        if due.is_empty() {
            return Ok(0);
        }

        info!("Found {} payments due for automatic release", due.len());

        let mut released = 0;
        for payment in due {
            match self
                .service
                .release_payment(&payment.id, ReleaseTrigger::Auto)
                .await
            {
                Ok(_) => {
                    info!(
                        payment_id = %sanitize_id(&payment.id),
                        "Auto-released escrow after hold period"
                    );
                    released += 1;
                }
                Err(e) if e.is_benign_race() => {
                    info!(
                        payment_id = %sanitize_id(&payment.id),
                        "Payment already transitioned, skipping auto-release: {e}"
                    );
                }
                Err(e) => {
                    error!(
                        payment_id = %sanitize_id(&payment.id),
                        "Auto-release failed: {e}"
                    );
                }
            }
        }

        Ok(released)
    }
}
