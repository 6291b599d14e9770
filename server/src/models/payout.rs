//! Payout model and related database operations
//!
//! Every release (or partial-refund resolution with a retained remainder)
//! appends a pending payout row. Admin processing moves it one-way to
//! processed or rejected with the same compare-and-swap discipline as
//! payments.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use ledger::{PayoutRecord, PayoutStatus};

use crate::schema::payouts;

/// Payout row. Column order must match schema.rs exactly.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = payouts)]
pub struct Payout {
    pub id: String,
    pub payment_id: String,
    pub photographer_id: String,
    pub amount: i64,
    pub status: String,
    pub reject_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payouts)]
pub struct NewPayout {
    pub id: String,
    pub payment_id: String,
    pub photographer_id: String,
    pub amount: i64,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Payout {
    pub fn create(conn: &mut SqliteConnection, new_payout: NewPayout) -> Result<Payout> {
        let payout_id = new_payout.id.clone();

        diesel::insert_into(payouts::table)
            .values(&new_payout)
            .execute(conn)
            .context("Failed to insert payout")?;

        payouts::table
            .find(payout_id)
            .first(conn)
            .context("Failed to retrieve created payout")
    }

    pub fn find_by_id(conn: &mut SqliteConnection, payout_id: &str) -> Result<Option<Payout>> {
        payouts::table
            .find(payout_id)
            .first(conn)
            .optional()
            .context(format!("Failed to query payout {payout_id}"))
    }

    pub fn find_by_payment(
        conn: &mut SqliteConnection,
        payment_id_val: &str,
    ) -> Result<Vec<Payout>> {
        payouts::table
            .filter(payouts::payment_id.eq(payment_id_val))
            .order(payouts::created_at.desc())
            .load(conn)
            .context(format!("Failed to load payouts for payment {payment_id_val}"))
    }

    pub fn find_pending(conn: &mut SqliteConnection) -> Result<Vec<Payout>> {
        payouts::table
            .filter(payouts::status.eq(PayoutStatus::Pending.as_str()))
            .order(payouts::created_at.asc())
            .load(conn)
            .context("Failed to load pending payouts")
    }

    /// Persist a payout transition with optimistic locking; returns rows
    /// written (0 = lost the race).
    pub fn apply_transition(
        conn: &mut SqliteConnection,
        expected_status: PayoutStatus,
        record: &PayoutRecord,
        now: NaiveDateTime,
    ) -> Result<usize> {
        diesel::update(
            payouts::table
                .filter(payouts::id.eq(&record.id))
                .filter(payouts::status.eq(expected_status.as_str())),
        )
        .set((
            payouts::status.eq(record.status.as_str()),
            payouts::reject_reason.eq(record.reject_reason.as_deref()),
            payouts::processed_at.eq(record.processed_at.map(|t| t.naive_utc())),
            payouts::updated_at.eq(now),
        ))
        .execute(conn)
        .context(format!("Failed to persist transition for payout {}", record.id))
    }

    pub fn to_record(&self) -> Result<PayoutRecord> {
        let status = PayoutStatus::from_str(&self.status)
            .with_context(|| format!("Payout {} has unknown status '{}'", self.id, self.status))?;

        Ok(PayoutRecord {
            id: self.id.clone(),
            payment_id: self.payment_id.clone(),
            photographer_id: self.photographer_id.clone(),
            amount: self.amount,
            status,
            created_at: self.created_at.and_utc(),
            processed_at: self.processed_at.map(|t| t.and_utc()),
            reject_reason: self.reject_reason.clone(),
        })
    }
}

impl NewPayout {
    pub fn from_record(record: &PayoutRecord) -> Self {
        Self {
            id: record.id.clone(),
            payment_id: record.payment_id.clone(),
            photographer_id: record.photographer_id.clone(),
            amount: record.amount,
            status: record.status.as_str().to_string(),
            created_at: record.created_at.naive_utc(),
            updated_at: record.created_at.naive_utc(),
        }
    }
}
