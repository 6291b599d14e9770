//! Escrow lifecycle logic for the BookYourShoot marketplace
//!
//! This crate owns the state of a payment held in escrow: status
//! transitions, the hold-period countdown shown to users, the dispute
//! interlock that suspends automatic release, and the payout ledger for
//! photographer disbursements.
//!
//! Every operation is a pure function of a supplied snapshot plus an
//! explicit `now`. The crate holds no clock and no storage; callers persist
//! the returned snapshot (with optimistic locking at the storage boundary)
//! and drive time by passing `now` on each call.

pub mod countdown;
pub mod dispute;
pub mod error;
pub mod payout;
pub mod status;
pub mod transaction;

pub use countdown::{Countdown, HoldCountdown};
pub use dispute::{
    DesiredResolution, Dispute, DisputeCategory, DisputeRequest, DisputeStatus, EvidenceFile,
    ReinstatePolicy, Verdict, ALLOWED_EVIDENCE_MIME_TYPES, MAX_EVIDENCE_FILES,
    MAX_EVIDENCE_FILE_SIZE,
};
pub use error::LedgerError;
pub use payout::{PayoutRecord, PayoutStatus};
pub use status::EscrowStatus;
pub use transaction::{EscrowTransaction, FEE_BPS_DENOMINATOR, MAX_PLATFORM_FEE_BPS};
