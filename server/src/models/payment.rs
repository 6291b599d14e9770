//! Payment model and related database operations
//!
//! The `payments` row is the persisted form of the ledger's
//! `EscrowTransaction` snapshot. Transitions are written with a
//! compare-and-swap on the previously observed status: whoever loses the
//! race updates zero rows and reports a conflict instead of clobbering the
//! winner's transition.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use ledger::{EscrowStatus, EscrowTransaction};

use crate::schema::payments;

/// Payment row. Column order must match schema.rs exactly.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = payments)]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    pub client_id: String,
    pub photographer_id: String,
    pub amount: i64,
    pub platform_fee_bps: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub release_at: NaiveDateTime,
    pub hold_period_secs: i64,
    pub refund_amount: Option<i64>,
    pub dispute_id: Option<String>,
    pub disputed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub id: String,
    pub booking_id: String,
    pub client_id: String,
    pub photographer_id: String,
    pub amount: i64,
    pub platform_fee_bps: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub release_at: NaiveDateTime,
    pub hold_period_secs: i64,
    pub updated_at: NaiveDateTime,
}

impl Payment {
    /// Insert a freshly created hold.
    pub fn create(conn: &mut SqliteConnection, new_payment: NewPayment) -> Result<Payment> {
        let payment_id = new_payment.id.clone();

        diesel::insert_into(payments::table)
            .values(&new_payment)
            .execute(conn)
            .context("Failed to insert payment")?;

        payments::table
            .find(payment_id)
            .first(conn)
            .context("Failed to retrieve created payment")
    }

    pub fn find_by_id(conn: &mut SqliteConnection, payment_id: &str) -> Result<Option<Payment>> {
        payments::table
            .find(payment_id)
            .first(conn)
            .optional()
            .context(format!("Failed to query payment {payment_id}"))
    }

    pub fn find_by_booking(
        conn: &mut SqliteConnection,
        booking_id_val: &str,
    ) -> Result<Option<Payment>> {
        payments::table
            .filter(payments::booking_id.eq(booking_id_val))
            .order(payments::created_at.desc())
            .first(conn)
            .optional()
            .context(format!("Failed to query payment for booking {booking_id_val}"))
    }

    /// Held payments whose release deadline has passed, oldest first.
    ///
    /// The release monitor calls this every poll tick. Only `held` rows
    /// qualify, so an opened dispute removes a payment from the result set
    /// without any timer bookkeeping.
    pub fn find_due_for_release(
        conn: &mut SqliteConnection,
        now: NaiveDateTime,
        limit: i64,
    ) -> Result<Vec<Payment>> {
        payments::table
            .filter(payments::status.eq(EscrowStatus::Held.as_str()))
            .filter(payments::release_at.le(now))
            .order(payments::release_at.asc())
            .limit(limit)
            .load(conn)
            .context("Failed to load payments due for release")
    }

    /// Persist a ledger transition with optimistic locking.
    ///
    /// The update is filtered on the status this process last observed;
    /// returns the number of rows written (0 means another writer got there
    /// first).
    pub fn apply_transition(
        conn: &mut SqliteConnection,
        expected_status: EscrowStatus,
        snapshot: &EscrowTransaction,
        now: NaiveDateTime,
    ) -> Result<usize> {
        diesel::update(
            payments::table
                .filter(payments::id.eq(&snapshot.id))
                .filter(payments::status.eq(expected_status.as_str())),
        )
        .set((
            payments::status.eq(snapshot.status.as_str()),
            payments::release_at.eq(snapshot.release_at.naive_utc()),
            payments::refund_amount.eq(snapshot.refund_amount),
            payments::dispute_id.eq(snapshot.dispute_id.as_deref()),
            payments::disputed_at.eq(snapshot.disputed_at.map(|t| t.naive_utc())),
            payments::updated_at.eq(now),
        ))
        .execute(conn)
        .context(format!(
            "Failed to persist transition for payment {}",
            snapshot.id
        ))
    }

    /// Reconstruct the ledger snapshot this row represents.
    ///
    /// A row whose status column holds an unknown value is data corruption,
    /// not user error; it surfaces as an internal error.
    pub fn to_snapshot(&self) -> Result<EscrowTransaction> {
        let status = EscrowStatus::from_str(&self.status)
            .with_context(|| format!("Payment {} has unknown status '{}'", self.id, self.status))?;

        Ok(EscrowTransaction {
            id: self.id.clone(),
            booking_id: self.booking_id.clone(),
            amount: self.amount,
            platform_fee_bps: self.platform_fee_bps as u32,
            status,
            created_at: self.created_at.and_utc(),
            release_at: self.release_at.and_utc(),
            hold_period_secs: self.hold_period_secs,
            refund_amount: self.refund_amount,
            dispute_id: self.dispute_id.clone(),
            disputed_at: self.disputed_at.map(|t| t.and_utc()),
        })
    }
}

impl NewPayment {
    /// Build the insertable row for a snapshot fresh out of
    /// `EscrowTransaction::create`.
    pub fn from_snapshot(
        snapshot: &EscrowTransaction,
        client_id: &str,
        photographer_id: &str,
    ) -> Self {
        Self {
            id: snapshot.id.clone(),
            booking_id: snapshot.booking_id.clone(),
            client_id: client_id.to_string(),
            photographer_id: photographer_id.to_string(),
            amount: snapshot.amount,
            platform_fee_bps: snapshot.platform_fee_bps as i32,
            status: snapshot.status.as_str().to_string(),
            created_at: snapshot.created_at.naive_utc(),
            release_at: snapshot.release_at.naive_utc(),
            hold_period_secs: snapshot.hold_period_secs,
            updated_at: snapshot.created_at.naive_utc(),
        }
    }
}
