//! Escrow orchestration service
//!
//! Every operation follows the same shape: load the row, rebuild the ledger
//! snapshot, run the pure transition, then persist the result with a
//! compare-and-swap on the status that was read. A lost race never clobbers
//! another writer's transition; it surfaces as a typed error instead.

use anyhow::Context;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::{info, warn};
use uuid::Uuid;

use ledger::{
    Countdown, Dispute, DisputeRequest, EscrowStatus, EscrowTransaction, LedgerError,
    PayoutRecord, PayoutStatus, ReinstatePolicy, Verdict,
};

use crate::db::DbPool;
use crate::logging::sanitize::{sanitize_amount, sanitize_id};
use crate::models::dispute::{DisputeRow, NewDispute};
use crate::models::dispute_evidence::DisputeEvidence;
use crate::models::payment::{NewPayment, Payment};
use crate::models::payout::{NewPayout, Payout};
use crate::services::ServiceError;

/// Who asked for a release; auto releases tolerate races silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseTrigger {
    Manual,
    Auto,
}

/// Input for creating a new hold when a booking payment is captured.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub booking_id: String,
    pub client_id: String,
    pub photographer_id: String,
    pub amount: i64,
    pub platform_fee_bps: u32,
    pub hold_period_secs: i64,
}

/// Manages escrow payment operations and state transitions.
#[derive(Clone)]
pub struct EscrowService {
    db: DbPool,
    reinstate_policy: ReinstatePolicy,
}

impl EscrowService {
    pub fn new(db: DbPool, reinstate_policy: ReinstatePolicy) -> Self {
        Self {
            db,
            reinstate_policy,
        }
    }

    /// Start a new hold for a captured booking payment.
    pub async fn create_payment(&self, input: CreatePayment) -> Result<Payment, ServiceError> {
        let now = Utc::now();
        let snapshot = EscrowTransaction::create(
            Uuid::new_v4().to_string(),
            &input.booking_id,
            input.amount,
            input.platform_fee_bps,
            input.hold_period_secs,
            now,
        )?;

        let row = NewPayment::from_snapshot(&snapshot, &input.client_id, &input.photographer_id);

        let db = self.db.clone();
        let payment = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            Payment::create(&mut conn, row)
        })
        .await
        .context("Database task panicked")??;

        info!(
            payment_id = %sanitize_id(&payment.id),
            booking_id = %sanitize_id(&payment.booking_id),
            amount = %sanitize_amount(payment.amount),
            release_at = %payment.release_at,
            "Escrow hold created"
        );

        Ok(payment)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<Payment, ServiceError> {
        let db = self.db.clone();
        let id = payment_id.to_string();
        let payment = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            Payment::find_by_id(&mut conn, &id)
        })
        .await
        .context("Database task panicked")??;

        payment.ok_or_else(|| ServiceError::not_found(format!("payment {payment_id}")))
    }

    /// Countdown/progress view for display polling. Pure recomputation on
    /// every call; nothing is cached or stored.
    pub async fn get_countdown(
        &self,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Countdown, ServiceError> {
        let payment = self.get_payment(payment_id).await?;
        let snapshot = payment.to_snapshot()?;
        Ok(Countdown::compute(&snapshot, now))
    }

    /// Release a held payment to the photographer and queue the payout.
    pub async fn release_payment(
        &self,
        payment_id: &str,
        trigger: ReleaseTrigger,
    ) -> Result<Payment, ServiceError> {
        let payment = self.get_payment(payment_id).await?;
        let snapshot = payment.to_snapshot()?;
        let released = snapshot.release()?;

        let payout = PayoutRecord::create(
            Uuid::new_v4().to_string(),
            &released.id,
            &payment.photographer_id,
            released.payout_amount(),
            Utc::now(),
        )?;

        let updated = self
            .persist_payment_transition(snapshot.status, released, Some(payout))
            .await?;

        info!(
            payment_id = %sanitize_id(&updated.id),
            trigger = ?trigger,
            payout_amount = %sanitize_amount(updated.amount),
            "Escrow released"
        );

        Ok(updated)
    }

    /// Refund a held or disputed payment to the client, in full or in part.
    pub async fn refund_payment(
        &self,
        payment_id: &str,
        refund_amount: i64,
    ) -> Result<Payment, ServiceError> {
        let payment = self.get_payment(payment_id).await?;
        let snapshot = payment.to_snapshot()?;
        let refunded = snapshot.refund(refund_amount)?;

        let updated = self
            .persist_payment_transition(snapshot.status, refunded, None)
            .await?;

        info!(
            payment_id = %sanitize_id(&updated.id),
            refund_amount = %sanitize_amount(refund_amount),
            status = %updated.status,
            "Escrow refunded"
        );

        Ok(updated)
    }

    /// Open a dispute on the payment behind `booking_id`, suspending the
    /// pending auto-release.
    pub async fn open_dispute(
        &self,
        booking_id: &str,
        request: DisputeRequest,
    ) -> Result<(Payment, DisputeRow), ServiceError> {
        let db = self.db.clone();
        let booking = booking_id.to_string();
        let payment = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            Payment::find_by_booking(&mut conn, &booking)
        })
        .await
        .context("Database task panicked")??
        .ok_or_else(|| ServiceError::not_found(format!("payment for booking {booking_id}")))?;

        let snapshot = payment.to_snapshot()?;
        let (disputed, dispute) = snapshot.open_dispute(request, Utc::now())?;

        let db = self.db.clone();
        let expected = snapshot.status;
        let dispute_for_insert = dispute.clone();
        let dispute_row = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            conn.transaction::<_, anyhow::Error, _>(|conn| {
                let now = Utc::now().naive_utc();
                let rows = Payment::apply_transition(conn, expected, &disputed, now)?;
                if rows == 0 {
                    // Rolled back by the Err return; classified below.
                    anyhow::bail!(STALE_PAYMENT);
                }
                let row = DisputeRow::create(conn, NewDispute::from_ledger(&dispute_for_insert))?;
                DisputeEvidence::insert_all(conn, &row.id, &dispute_for_insert.evidence, now)?;
                Ok(row)
            })
        })
        .await
        .context("Database task panicked")?
        .map_err(|e| self.classify_stale(e, &payment.id))?;

        info!(
            payment_id = %sanitize_id(&payment.id),
            dispute_id = %dispute_row.id,
            category = %dispute_row.category,
            "Dispute opened, auto-release suspended"
        );

        Ok((self.get_payment(&payment.id).await?, dispute_row))
    }

    /// Resolve an open dispute with an admin verdict.
    pub async fn resolve_dispute(
        &self,
        dispute_id: &str,
        verdict: Verdict,
    ) -> Result<(Payment, DisputeRow), ServiceError> {
        let (dispute, payment) = self.load_dispute_with_payment(dispute_id).await?;
        let snapshot = payment.to_snapshot()?;
        let now = Utc::now();
        let (next_tx, _resolved) =
            snapshot.resolve_dispute(&dispute, verdict, self.reinstate_policy, now)?;

        // A settlement in the photographer's favor queues the payout for
        // whatever they retain, net of the platform fee on that amount.
        let payout = match verdict {
            Verdict::Release => Some(self.build_payout(&payment, snapshot.payout_amount(), now)?),
            Verdict::Refund(amount) => {
                let retained = snapshot.retained_after_refund(amount);
                let net = retained - snapshot.platform_fee_on(retained);
                if net > 0 {
                    Some(self.build_payout(&payment, net, now)?)
                } else {
                    None
                }
            }
            Verdict::ReinstateHold => None,
        };

        let verdict_label = verdict_as_str(verdict);
        let db = self.db.clone();
        let expected = snapshot.status;
        let dispute_id_owned = dispute_id.to_string();
        let next_for_write = next_tx.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            conn.transaction::<_, anyhow::Error, _>(|conn| {
                let now_naive = now.naive_utc();
                let rows = Payment::apply_transition(conn, expected, &next_for_write, now_naive)?;
                if rows == 0 {
                    anyhow::bail!(STALE_PAYMENT);
                }
                let rows =
                    DisputeRow::mark_resolved(conn, &dispute_id_owned, verdict_label, now_naive)?;
                if rows == 0 {
                    anyhow::bail!(STALE_PAYMENT);
                }
                if let Some(record) = payout {
                    Payout::create(conn, NewPayout::from_record(&record))?;
                }
                Ok(())
            })
        })
        .await
        .context("Database task panicked")?
        .map_err(|e| self.classify_stale(e, &payment.id))?;

        info!(
            payment_id = %sanitize_id(&payment.id),
            dispute_id = %dispute_id,
            verdict = %verdict_label,
            "Dispute resolved"
        );

        let payment = self.get_payment(&payment.id).await?;
        let dispute_row = self
            .find_dispute_row(dispute_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("dispute {dispute_id}")))?;
        Ok((payment, dispute_row))
    }

    /// Move an open dispute into review. Idempotent for a dispute already
    /// under review; resolved disputes are rejected.
    pub async fn begin_dispute_review(
        &self,
        dispute_id: &str,
    ) -> Result<DisputeRow, ServiceError> {
        let db = self.db.clone();
        let id = dispute_id.to_string();
        let rows = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            DisputeRow::mark_in_review(&mut conn, &id)
        })
        .await
        .context("Database task panicked")??;

        let row = self
            .find_dispute_row(dispute_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("dispute {dispute_id}")))?;

        if rows == 0 && row.status == "resolved" {
            return Err(ServiceError::Ledger(LedgerError::InvalidTransition {
                operation: "review",
                status: "resolved",
            }));
        }

        info!(dispute_id = %dispute_id, status = %row.status, "Dispute under review");
        Ok(row)
    }

    pub async fn get_dispute(
        &self,
        dispute_id: &str,
    ) -> Result<(DisputeRow, Vec<DisputeEvidence>), ServiceError> {
        let db = self.db.clone();
        let id = dispute_id.to_string();
        let found = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            let Some(row) = DisputeRow::find_by_id(&mut conn, &id)? else {
                return Ok(None);
            };
            let evidence = DisputeEvidence::find_by_dispute(&mut conn, &id)?;
            anyhow::Ok(Some((row, evidence)))
        })
        .await
        .context("Database task panicked")??;

        found.ok_or_else(|| ServiceError::not_found(format!("dispute {dispute_id}")))
    }

    /// Mark a pending payout as processed.
    pub async fn process_payout(&self, payout_id: &str) -> Result<Payout, ServiceError> {
        self.transition_payout(payout_id, |record, now| record.process(now))
            .await
    }

    /// Reject a pending payout with a reason.
    pub async fn reject_payout(
        &self,
        payout_id: &str,
        reason: String,
    ) -> Result<Payout, ServiceError> {
        self.transition_payout(payout_id, move |record, now| record.reject(reason.clone(), now))
            .await
    }

    pub async fn get_payout(&self, payout_id: &str) -> Result<Payout, ServiceError> {
        let db = self.db.clone();
        let id = payout_id.to_string();
        let payout = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            Payout::find_by_id(&mut conn, &id)
        })
        .await
        .context("Database task panicked")??;

        payout.ok_or_else(|| ServiceError::not_found(format!("payout {payout_id}")))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn transition_payout<F>(&self, payout_id: &str, op: F) -> Result<Payout, ServiceError>
    where
        F: FnOnce(&PayoutRecord, DateTime<Utc>) -> Result<PayoutRecord, LedgerError>
            + Send
            + 'static,
    {
        let payout = self.get_payout(payout_id).await?;
        let record = payout.to_record()?;
        let expected = record.status;
        let now = Utc::now();
        let next = op(&record, now)?;

        let db = self.db.clone();
        let value = next.clone();
        let rows = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            Payout::apply_transition(&mut conn, expected, &value, now.naive_utc())
        })
        .await
        .context("Database task panicked")??;

        if rows == 0 {
            // Re-read to give the caller the real current status.
            let fresh = self.get_payout(payout_id).await?;
            let status = PayoutStatus::from_str(&fresh.status)
                .map(|s| s.as_str())
                .unwrap_or("unknown");
            return Err(ServiceError::Ledger(LedgerError::InvalidTransition {
                operation: "transition",
                status,
            }));
        }

        info!(
            payout_id = %sanitize_id(payout_id),
            status = %next.status.as_str(),
            "Payout transitioned"
        );

        self.get_payout(payout_id).await
    }

    async fn persist_payment_transition(
        &self,
        expected: EscrowStatus,
        next: EscrowTransaction,
        payout: Option<PayoutRecord>,
    ) -> Result<Payment, ServiceError> {
        let db = self.db.clone();
        let payment_id = next.id.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            conn.transaction::<_, anyhow::Error, _>(|conn| {
                let now = Utc::now().naive_utc();
                let rows = Payment::apply_transition(conn, expected, &next, now)?;
                if rows == 0 {
                    anyhow::bail!(STALE_PAYMENT);
                }
                if let Some(record) = payout {
                    Payout::create(conn, NewPayout::from_record(&record))?;
                }
                Ok(())
            })
        })
        .await
        .context("Database task panicked")?
        .map_err(|e| self.classify_stale(e, &payment_id))?;

        self.get_payment(&payment_id).await
    }

    /// Turn a lost compare-and-swap into the precise domain error: the row
    /// moved to another status (report that status), vanished, or changed
    /// some other way.
    fn classify_stale(&self, err: anyhow::Error, payment_id: &str) -> ServiceError {
        if err.to_string() != STALE_PAYMENT {
            return ServiceError::Internal(err);
        }

        warn!(
            payment_id = %sanitize_id(payment_id),
            "Payment transition lost an optimistic-lock race"
        );

        let current = self
            .db
            .get()
            .ok()
            .and_then(|mut conn| Payment::find_by_id(&mut conn, payment_id).ok().flatten());

        match current {
            Some(row) => match EscrowStatus::from_str(&row.status) {
                Some(status) => ServiceError::Ledger(LedgerError::InvalidTransition {
                    operation: "transition",
                    status: status.as_str(),
                }),
                None => {
                    ServiceError::Ledger(LedgerError::ConcurrencyConflict(payment_id.to_string()))
                }
            },
            None => ServiceError::Ledger(LedgerError::NotFound(format!("payment {payment_id}"))),
        }
    }

    fn build_payout(
        &self,
        payment: &Payment,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<PayoutRecord, LedgerError> {
        PayoutRecord::create(
            Uuid::new_v4().to_string(),
            &payment.id,
            &payment.photographer_id,
            amount,
            now,
        )
    }

    async fn load_dispute_with_payment(
        &self,
        dispute_id: &str,
    ) -> Result<(Dispute, Payment), ServiceError> {
        let db = self.db.clone();
        let id = dispute_id.to_string();
        let loaded = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            let Some(row) = DisputeRow::find_by_id(&mut conn, &id)? else {
                return Ok(None);
            };
            let evidence = DisputeEvidence::find_by_dispute(&mut conn, &id)?
                .iter()
                .map(DisputeEvidence::to_ledger)
                .collect();
            let payment = Payment::find_by_id(&mut conn, &row.payment_id)?;
            anyhow::Ok(Some((row.to_ledger(evidence)?, payment)))
        })
        .await
        .context("Database task panicked")??;

        let (dispute, payment) =
            loaded.ok_or_else(|| ServiceError::not_found(format!("dispute {dispute_id}")))?;
        let payment = payment.ok_or_else(|| {
            ServiceError::not_found(format!("payment for dispute {dispute_id}"))
        })?;
        Ok((dispute, payment))
    }

    async fn find_dispute_row(&self, dispute_id: &str) -> Result<Option<DisputeRow>, ServiceError> {
        let db = self.db.clone();
        let id = dispute_id.to_string();
        let row = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            DisputeRow::find_by_id(&mut conn, &id)
        })
        .await
        .context("Database task panicked")??;
        Ok(row)
    }
}

/// Sentinel carried through `anyhow::bail!` inside CAS transactions; never
/// shown to users.
const STALE_PAYMENT: &str = "__stale_payment__";

fn verdict_as_str(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::ReinstateHold => "reinstate_hold",
        Verdict::Release => "release",
        Verdict::Refund(_) => "refund",
    }
}
