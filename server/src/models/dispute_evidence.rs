//! Evidence metadata rows for disputes
//!
//! Only descriptors are stored (name, type, size); the file bytes live in
//! external storage behind the upload service.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledger::EvidenceFile;

use crate::schema::dispute_evidence;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = dispute_evidence)]
pub struct DisputeEvidence {
    pub id: String,
    pub dispute_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub position: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = dispute_evidence)]
pub struct NewDisputeEvidence {
    pub id: String,
    pub dispute_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub position: i32,
    pub created_at: NaiveDateTime,
}

impl DisputeEvidence {
    /// Insert all descriptors for a dispute, preserving attachment order.
    pub fn insert_all(
        conn: &mut SqliteConnection,
        dispute_id: &str,
        files: &[EvidenceFile],
        now: NaiveDateTime,
    ) -> Result<usize> {
        let rows: Vec<NewDisputeEvidence> = files
            .iter()
            .enumerate()
            .map(|(position, file)| NewDisputeEvidence {
                id: Uuid::new_v4().to_string(),
                dispute_id: dispute_id.to_string(),
                file_name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                file_size: file.size_bytes,
                position: position as i32,
                created_at: now,
            })
            .collect();

        diesel::insert_into(dispute_evidence::table)
            .values(&rows)
            .execute(conn)
            .context(format!("Failed to insert evidence for dispute {dispute_id}"))
    }

    /// Load descriptors for a dispute in attachment order.
    pub fn find_by_dispute(
        conn: &mut SqliteConnection,
        dispute_id_val: &str,
    ) -> Result<Vec<DisputeEvidence>> {
        dispute_evidence::table
            .filter(dispute_evidence::dispute_id.eq(dispute_id_val))
            .order(dispute_evidence::position.asc())
            .load(conn)
            .context(format!("Failed to load evidence for dispute {dispute_id_val}"))
    }

    pub fn to_ledger(&self) -> EvidenceFile {
        EvidenceFile {
            name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.file_size,
        }
    }
}
