//! Photographer payout ledger
//!
//! A payout is created when an escrowed payment settles in the
//! photographer's favor. It follows the same optimistic-transition pattern
//! as the escrow itself, with a smaller graph: `Pending` moves one-way to
//! `Processed` or `Rejected`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Processed,
    Rejected,
}

impl PayoutStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PayoutStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processed => "processed",
            PayoutStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PayoutStatus::Pending),
            "processed" => Some(PayoutStatus::Processed),
            "rejected" => Some(PayoutStatus::Rejected),
            _ => None,
        }
    }
}

/// One pending or settled disbursement to a photographer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub id: String,
    /// The escrow payment this disbursement came from.
    pub payment_id: String,
    pub photographer_id: String,
    /// Net amount after the platform fee, smallest currency unit.
    pub amount: i64,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
}

impl PayoutRecord {
    pub fn create(
        id: impl Into<String>,
        payment_id: impl Into<String>,
        photographer_id: impl Into<String>,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::validation(format!(
                "payout amount must be positive, got {amount}"
            )));
        }
        Ok(Self {
            id: id.into(),
            payment_id: payment_id.into(),
            photographer_id: photographer_id.into(),
            amount,
            status: PayoutStatus::Pending,
            created_at: now,
            processed_at: None,
            reject_reason: None,
        })
    }

    /// Mark the payout as paid out.
    pub fn process(&self, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        if self.status != PayoutStatus::Pending {
            return Err(LedgerError::InvalidTransition {
                operation: "process",
                status: self.status.as_str(),
            });
        }
        let mut next = self.clone();
        next.status = PayoutStatus::Processed;
        next.processed_at = Some(now);
        Ok(next)
    }

    /// Reject the payout with a reason.
    pub fn reject(
        &self,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if self.status != PayoutStatus::Pending {
            return Err(LedgerError::InvalidTransition {
                operation: "reject",
                status: self.status.as_str(),
            });
        }
        let mut next = self.clone();
        next.status = PayoutStatus::Rejected;
        next.processed_at = Some(now);
        next.reject_reason = Some(reason.into());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn pending() -> PayoutRecord {
        PayoutRecord::create("po-1", "pay-1", "PH-9", 40_500, t0()).unwrap()
    }

    #[test]
    fn create_starts_pending() {
        let payout = pending();
        assert_eq!(payout.status, PayoutStatus::Pending);
        assert_eq!(payout.processed_at, None);
    }

    #[test]
    fn create_rejects_non_positive_amount() {
        assert!(PayoutRecord::create("po-2", "pay-1", "PH-9", 0, t0()).is_err());
    }

    #[test]
    fn process_is_one_way() {
        let processed = pending().process(t0()).unwrap();
        assert_eq!(processed.status, PayoutStatus::Processed);
        assert_eq!(processed.processed_at, Some(t0()));

        assert!(matches!(
            processed.process(t0()),
            Err(LedgerError::InvalidTransition {
                operation: "process",
                status: "processed",
            })
        ));
        assert!(processed.reject("late", t0()).is_err());
    }

    #[test]
    fn reject_records_reason() {
        let rejected = pending().reject("account under review", t0()).unwrap();
        assert_eq!(rejected.status, PayoutStatus::Rejected);
        assert_eq!(
            rejected.reject_reason.as_deref(),
            Some("account under review")
        );
        assert!(rejected.process(t0()).is_err());
    }
}
