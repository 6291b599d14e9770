//! Typed errors for escrow and payout transitions

use thiserror::Error;

/// Errors raised by ledger operations.
///
/// `Validation` and `InvalidTransition` are produced by the pure transition
/// functions themselves. `NotFound` and `ConcurrencyConflict` are produced at
/// the storage boundary (a referenced record is missing, or an optimistic
/// update lost a race) and surfaced through the same enum so callers match
/// on a single error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed input: missing fields, amounts out of range, evidence
    /// violating limits.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation attempted against a record whose status does not permit it.
    #[error("{operation} not allowed in status '{status}'")]
    InvalidTransition {
        operation: &'static str,
        status: &'static str,
    },

    /// Referenced transaction, dispute, or payout does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Optimistic-lock mismatch: the record changed under us.
    #[error("concurrent update detected for {0}")]
    ConcurrencyConflict(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    /// True for the benign case the release poller tolerates: the record
    /// already moved on (released by a user, disputed) between the poll
    /// query and the transition attempt.
    pub fn is_benign_race(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidTransition { .. } | LedgerError::ConcurrencyConflict(_)
        )
    }
}
