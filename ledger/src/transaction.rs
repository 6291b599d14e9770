//! Escrow transaction snapshot and its core transitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::status::EscrowStatus;

/// Fee rates are expressed in basis points of the payment amount.
pub const FEE_BPS_DENOMINATOR: i64 = 10_000;

/// A fee above 100% is always a caller error.
pub const MAX_PLATFORM_FEE_BPS: u32 = 10_000;

/// Point-in-time snapshot of one payment held in escrow.
///
/// Amounts are integers in the smallest currency unit. The snapshot is
/// immutable from the ledger's point of view: transitions consume a
/// reference and return the next snapshot, which the caller persists with
/// optimistic locking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTransaction {
    pub id: String,
    /// Opaque foreign key to the booking this payment belongs to.
    pub booking_id: String,
    pub amount: i64,
    /// Platform cut applied on release, in basis points (1000 = 10%).
    pub platform_fee_bps: u32,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    /// Scheduled automatic release. Only actionable while `Held`; frozen for
    /// audit once the payment leaves `Held`.
    pub release_at: DateTime<Utc>,
    /// Configured hold duration in whole seconds.
    pub hold_period_secs: i64,
    /// Set when the payment is refunded in full or in part.
    pub refund_amount: Option<i64>,
    /// Open or last-resolved dispute on this payment.
    pub dispute_id: Option<String>,
    /// When the currently-referenced dispute was opened. Kept so a resumed
    /// hold can credit the time that was left at that moment.
    pub disputed_at: Option<DateTime<Utc>>,
}

impl EscrowTransaction {
    /// Start a new hold.
    ///
    /// Fails with `Validation` unless `amount > 0`,
    /// `platform_fee_bps <= 10_000`, and `hold_period_secs > 0`.
    pub fn create(
        id: impl Into<String>,
        booking_id: impl Into<String>,
        amount: i64,
        platform_fee_bps: u32,
        hold_period_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::validation(format!(
                "amount must be positive, got {amount}"
            )));
        }
        if platform_fee_bps > MAX_PLATFORM_FEE_BPS {
            return Err(LedgerError::validation(format!(
                "platform_fee_bps must be at most {MAX_PLATFORM_FEE_BPS}, got {platform_fee_bps}"
            )));
        }
        if hold_period_secs <= 0 {
            return Err(LedgerError::validation(format!(
                "hold_period_secs must be positive, got {hold_period_secs}"
            )));
        }

        Ok(Self {
            id: id.into(),
            booking_id: booking_id.into(),
            amount,
            platform_fee_bps,
            status: EscrowStatus::Held,
            created_at: now,
            release_at: now + Duration::seconds(hold_period_secs),
            hold_period_secs,
            refund_amount: None,
            dispute_id: None,
            disputed_at: None,
        })
    }

    /// Release the payment to the photographer.
    ///
    /// Valid only while `Held`. `release_at` is kept as-is for the audit
    /// trail; it stops being actionable because no poll selects non-`Held`
    /// rows.
    pub fn release(&self) -> Result<Self, LedgerError> {
        if self.status != EscrowStatus::Held {
            return Err(LedgerError::InvalidTransition {
                operation: "release",
                status: self.status.as_str(),
            });
        }
        let mut next = self.clone();
        next.status = EscrowStatus::Released;
        Ok(next)
    }

    /// Refund `refund_amount` to the client.
    ///
    /// Valid from `Held` (direct refund) or `Disputed` (refund verdict).
    /// A full refund yields `Refunded`, anything less yields
    /// `PartiallyRefunded`.
    pub fn refund(&self, refund_amount: i64) -> Result<Self, LedgerError> {
        if self.status != EscrowStatus::Held && self.status != EscrowStatus::Disputed {
            return Err(LedgerError::InvalidTransition {
                operation: "refund",
                status: self.status.as_str(),
            });
        }
        if refund_amount <= 0 {
            return Err(LedgerError::validation(format!(
                "refund amount must be positive, got {refund_amount}"
            )));
        }
        if refund_amount > self.amount {
            return Err(LedgerError::validation(format!(
                "refund amount {refund_amount} exceeds held amount {}",
                self.amount
            )));
        }

        let mut next = self.clone();
        next.status = if refund_amount == self.amount {
            EscrowStatus::Refunded
        } else {
            EscrowStatus::PartiallyRefunded
        };
        next.refund_amount = Some(refund_amount);
        Ok(next)
    }

    /// True once the hold deadline has passed (only meaningful while `Held`).
    pub fn is_release_due(&self, now: DateTime<Utc>) -> bool {
        self.status == EscrowStatus::Held && now >= self.release_at
    }

    /// Platform cut taken from `disbursed` at the configured rate.
    pub fn platform_fee_on(&self, disbursed: i64) -> i64 {
        disbursed * self.platform_fee_bps as i64 / FEE_BPS_DENOMINATOR
    }

    /// Amount the photographer receives on a full release.
    pub fn payout_amount(&self) -> i64 {
        self.amount - self.platform_fee_on(self.amount)
    }

    /// Amount retained for the photographer after a refund of
    /// `refund_amount`, before the platform fee.
    pub fn retained_after_refund(&self, refund_amount: i64) -> i64 {
        (self.amount - refund_amount).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    const WEEK_SECS: i64 = 7 * 86_400;

    fn held(amount: i64) -> EscrowTransaction {
        EscrowTransaction::create("pay-1", "BK-1", amount, 1000, WEEK_SECS, t0()).unwrap()
    }

    #[test]
    fn create_schedules_release_after_hold_period() {
        let tx = held(45_000);
        assert_eq!(tx.status, EscrowStatus::Held);
        assert_eq!(tx.release_at, t0() + Duration::seconds(WEEK_SECS));
        assert_eq!(tx.refund_amount, None);
    }

    #[test]
    fn create_rejects_bad_inputs() {
        assert!(matches!(
            EscrowTransaction::create("p", "b", 0, 1000, WEEK_SECS, t0()),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            EscrowTransaction::create("p", "b", 100, 10_001, WEEK_SECS, t0()),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            EscrowTransaction::create("p", "b", 100, 1000, 0, t0()),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn release_is_one_way() {
        let released = held(45_000).release().unwrap();
        assert_eq!(released.status, EscrowStatus::Released);
        assert!(matches!(
            released.release(),
            Err(LedgerError::InvalidTransition {
                operation: "release",
                ..
            })
        ));
    }

    #[test]
    fn full_refund_vs_partial_refund() {
        let tx = held(18_000);

        let full = tx.refund(18_000).unwrap();
        assert_eq!(full.status, EscrowStatus::Refunded);
        assert_eq!(full.refund_amount, Some(18_000));

        let partial = tx.refund(9_000).unwrap();
        assert_eq!(partial.status, EscrowStatus::PartiallyRefunded);
        assert_eq!(partial.refund_amount, Some(9_000));

        // Terminal after either refund.
        assert!(partial.release().is_err());
        assert!(partial.refund(1).is_err());
    }

    #[test]
    fn refund_bounds_checked() {
        let tx = held(18_000);
        assert!(matches!(tx.refund(0), Err(LedgerError::Validation(_))));
        assert!(matches!(tx.refund(-5), Err(LedgerError::Validation(_))));
        assert!(matches!(tx.refund(18_001), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn fee_math_is_integer_bps() {
        let tx = held(45_000);
        assert_eq!(tx.platform_fee_on(tx.amount), 4_500);
        assert_eq!(tx.payout_amount(), 40_500);
        assert_eq!(tx.retained_after_refund(9_000), 36_000);
    }

    #[test]
    fn release_due_only_while_held() {
        let tx = held(45_000);
        assert!(!tx.is_release_due(t0()));
        assert!(tx.is_release_due(tx.release_at));

        let released = tx.release().unwrap();
        assert!(!released.is_release_due(released.release_at + Duration::days(1)));
    }
}
