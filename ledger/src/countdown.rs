//! Hold-period countdown and progress computation
//!
//! Pure functions of `(transaction, now)`. Display layers call these on every
//! tick rather than caching: the stored transaction never changes just
//! because time passed.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::status::EscrowStatus;
use crate::transaction::EscrowTransaction;

/// Live countdown fields for a payment still in `Held`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HoldCountdown {
    pub days_left: i64,
    pub hours_left: i64,
    pub minutes_left: i64,
    pub seconds_left: i64,
    /// True once `release_at` has passed; all remaining fields are zero.
    pub expired: bool,
    /// Portion of the hold period already elapsed, clamped to [0, 100].
    pub progress_percent: f64,
}

/// What to display for a payment, depending on its status.
///
/// Only a `Held` payment has a running countdown; every other status maps to
/// a fixed label with no numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Countdown {
    Counting(HoldCountdown),
    Settled { label: &'static str },
}

impl Countdown {
    /// Compute the display view for `tx` as of `now`.
    pub fn compute(tx: &EscrowTransaction, now: DateTime<Utc>) -> Self {
        match tx.status {
            EscrowStatus::Held => Countdown::Counting(hold_countdown(tx, now)),
            settled => Countdown::Settled {
                label: settled.as_str(),
            },
        }
    }

    pub fn as_counting(&self) -> Option<&HoldCountdown> {
        match self {
            Countdown::Counting(c) => Some(c),
            Countdown::Settled { .. } => None,
        }
    }
}

/// Decompose the time remaining until `release_at` into whole
/// days/hours/minutes/seconds (floor division, elapsed-time convention) and
/// the progress through the hold period.
fn hold_countdown(tx: &EscrowTransaction, now: DateTime<Utc>) -> HoldCountdown {
    let diff_secs = (tx.release_at - now).num_seconds();

    if diff_secs <= 0 {
        return HoldCountdown {
            days_left: 0,
            hours_left: 0,
            minutes_left: 0,
            seconds_left: 0,
            expired: true,
            progress_percent: 100.0,
        };
    }

    let days_left = diff_secs / 86_400;
    let hours_left = diff_secs % 86_400 / 3_600;
    let minutes_left = diff_secs % 3_600 / 60;
    let seconds_left = diff_secs % 60;

    let elapsed = tx.hold_period_secs - diff_secs;
    let progress_percent =
        (elapsed as f64 / tx.hold_period_secs as f64 * 100.0).clamp(0.0, 100.0);

    HoldCountdown {
        days_left,
        hours_left,
        minutes_left,
        seconds_left,
        expired: false,
        progress_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::EscrowTransaction;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn week_hold() -> EscrowTransaction {
        EscrowTransaction::create("pay-1", "BK-1", 45_000, 1000, 7 * 86_400, t0()).unwrap()
    }

    #[test]
    fn progress_is_zero_at_creation() {
        let tx = week_hold();
        let c = *Countdown::compute(&tx, t0()).as_counting().unwrap();
        assert!(!c.expired);
        assert_eq!(c.days_left, 7);
        assert_eq!(c.progress_percent, 0.0);
    }

    #[test]
    fn three_days_in_reports_four_days_left() {
        let tx = week_hold();
        let c = *Countdown::compute(&tx, t0() + Duration::days(3))
            .as_counting()
            .unwrap();
        assert_eq!(c.days_left, 4);
        assert_eq!(c.hours_left, 0);
        assert!(!c.expired);
        assert!((c.progress_percent - 42.857).abs() < 0.01);
    }

    #[test]
    fn decomposition_uses_floor_division() {
        let tx = week_hold();
        // 2 days, 3 hours, 4 minutes, 5 seconds before release.
        let now = tx.release_at
            - Duration::days(2)
            - Duration::hours(3)
            - Duration::minutes(4)
            - Duration::seconds(5);
        let c = *Countdown::compute(&tx, now).as_counting().unwrap();
        assert_eq!(
            (c.days_left, c.hours_left, c.minutes_left, c.seconds_left),
            (2, 3, 4, 5)
        );
    }

    #[test]
    fn past_deadline_is_expired_with_full_progress() {
        let tx = week_hold();
        for now in [tx.release_at, t0() + Duration::days(8)] {
            let c = *Countdown::compute(&tx, now).as_counting().unwrap();
            assert!(c.expired);
            assert_eq!(c.progress_percent, 100.0);
            assert_eq!(
                (c.days_left, c.hours_left, c.minutes_left, c.seconds_left),
                (0, 0, 0, 0)
            );
        }
    }

    #[test]
    fn settled_statuses_have_fixed_labels() {
        let tx = week_hold();

        let released = tx.release().unwrap();
        assert_eq!(
            Countdown::compute(&released, t0()),
            Countdown::Settled { label: "released" }
        );

        let refunded = tx.refund(45_000).unwrap();
        assert_eq!(
            Countdown::compute(&refunded, t0()),
            Countdown::Settled { label: "refunded" }
        );

        let partial = tx.refund(10_000).unwrap();
        assert_eq!(
            Countdown::compute(&partial, t0()),
            Countdown::Settled {
                label: "partially_refunded"
            }
        );
    }

    #[test]
    fn two_day_hold_variant() {
        let tx =
            EscrowTransaction::create("pay-2", "BK-2", 12_000, 500, 2 * 86_400, t0()).unwrap();
        let c = *Countdown::compute(&tx, t0() + Duration::days(1))
            .as_counting()
            .unwrap();
        assert_eq!(c.days_left, 1);
        assert!((c.progress_percent - 50.0).abs() < f64::EPSILON);
    }
}
