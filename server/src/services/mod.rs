//! Service layer for the escrow API

pub mod escrow;
pub mod release_monitor;

pub use escrow::{EscrowService, ReleaseTrigger};
pub use release_monitor::ReleaseMonitor;

use ledger::LedgerError;
use thiserror::Error;

/// Error surface of the service layer.
///
/// `Ledger` carries the typed domain errors the HTTP layer maps to status
/// codes; `Internal` is infrastructure failure (pool exhaustion, I/O) that
/// maps to 500.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::Ledger(LedgerError::NotFound(what.into()))
    }

    /// True when a poller can log-and-continue instead of escalating.
    pub fn is_benign_race(&self) -> bool {
        matches!(self, ServiceError::Ledger(e) if e.is_benign_race())
    }
}
