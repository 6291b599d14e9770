//! Dispute model and related database operations

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use ledger::{
    DesiredResolution, Dispute, DisputeCategory, DisputeStatus, EvidenceFile,
};

use crate::schema::disputes;

/// Dispute row. Column order must match schema.rs exactly.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = disputes)]
pub struct DisputeRow {
    pub id: String,
    pub payment_id: String,
    pub category: String,
    pub description: String,
    pub desired_resolution: Option<String>,
    pub status: String,
    pub evidence_count: i32,
    pub verdict: Option<String>,
    pub created_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = disputes)]
pub struct NewDispute {
    pub id: String,
    pub payment_id: String,
    pub category: String,
    pub description: String,
    pub desired_resolution: Option<String>,
    pub status: String,
    pub evidence_count: i32,
    pub created_at: NaiveDateTime,
}

impl DisputeRow {
    pub fn create(conn: &mut SqliteConnection, new_dispute: NewDispute) -> Result<DisputeRow> {
        let dispute_id = new_dispute.id.clone();

        diesel::insert_into(disputes::table)
            .values(&new_dispute)
            .execute(conn)
            .context("Failed to insert dispute")?;

        disputes::table
            .find(dispute_id)
            .first(conn)
            .context("Failed to retrieve created dispute")
    }

    pub fn find_by_id(conn: &mut SqliteConnection, dispute_id: &str) -> Result<Option<DisputeRow>> {
        disputes::table
            .find(dispute_id)
            .first(conn)
            .optional()
            .context(format!("Failed to query dispute {dispute_id}"))
    }

    pub fn find_by_payment(
        conn: &mut SqliteConnection,
        payment_id_val: &str,
    ) -> Result<Vec<DisputeRow>> {
        disputes::table
            .filter(disputes::payment_id.eq(payment_id_val))
            .order(disputes::created_at.desc())
            .load(conn)
            .context(format!("Failed to load disputes for payment {payment_id_val}"))
    }

    /// Move an unresolved dispute into review. Returns rows written.
    pub fn mark_in_review(conn: &mut SqliteConnection, dispute_id: &str) -> Result<usize> {
        diesel::update(
            disputes::table
                .filter(disputes::id.eq(dispute_id))
                .filter(disputes::status.eq(DisputeStatus::Open.as_str())),
        )
        .set(disputes::status.eq(DisputeStatus::InReview.as_str()))
        .execute(conn)
        .context(format!("Failed to mark dispute {dispute_id} in review"))
    }

    /// Record the verdict on an unresolved dispute. Returns rows written;
    /// zero means the dispute was already resolved by a concurrent admin.
    pub fn mark_resolved(
        conn: &mut SqliteConnection,
        dispute_id: &str,
        verdict: &str,
        now: NaiveDateTime,
    ) -> Result<usize> {
        diesel::update(
            disputes::table
                .filter(disputes::id.eq(dispute_id))
                .filter(disputes::status.ne(DisputeStatus::Resolved.as_str())),
        )
        .set((
            disputes::status.eq(DisputeStatus::Resolved.as_str()),
            disputes::verdict.eq(verdict),
            disputes::resolved_at.eq(now),
        ))
        .execute(conn)
        .context(format!("Failed to resolve dispute {dispute_id}"))
    }

    /// Reconstruct the ledger dispute this row represents; evidence
    /// descriptors are loaded separately and passed in.
    pub fn to_ledger(&self, evidence: Vec<EvidenceFile>) -> Result<Dispute> {
        let category = DisputeCategory::from_str(&self.category).with_context(|| {
            format!("Dispute {} has unknown category '{}'", self.id, self.category)
        })?;
        let resolution_status = DisputeStatus::from_str(&self.status)
            .with_context(|| format!("Dispute {} has unknown status '{}'", self.id, self.status))?;
        let desired_resolution = match self.desired_resolution.as_deref() {
            Some(s) => Some(DesiredResolution::from_str(s).with_context(|| {
                format!("Dispute {} has unknown desired_resolution '{s}'", self.id)
            })?),
            None => None,
        };

        Ok(Dispute {
            id: self.id.clone(),
            transaction_id: self.payment_id.clone(),
            category,
            description: self.description.clone(),
            desired_resolution,
            evidence,
            created_at: self.created_at.and_utc(),
            resolution_status,
            resolved_at: self.resolved_at.map(|t| t.and_utc()),
        })
    }
}

impl NewDispute {
    pub fn from_ledger(dispute: &Dispute) -> Self {
        Self {
            id: dispute.id.clone(),
            payment_id: dispute.transaction_id.clone(),
            category: dispute.category.as_str().to_string(),
            description: dispute.description.clone(),
            desired_resolution: dispute.desired_resolution.map(|r| r.as_str().to_string()),
            status: dispute.resolution_status.as_str().to_string(),
            evidence_count: dispute.evidence.len() as i32,
            created_at: dispute.created_at.naive_utc(),
        }
    }
}
