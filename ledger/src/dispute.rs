//! Dispute records and the dispute interlock on escrowed payments
//!
//! Opening a dispute moves a held payment to `Disputed`, which cancels the
//! pending auto-release implicitly: the release poll only selects `Held`
//! rows, so no timer needs cancelling. Resolution either reinstates the hold
//! or settles the payment with a verdict.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::status::EscrowStatus;
use crate::transaction::EscrowTransaction;

/// Maximum number of evidence files attached to one dispute.
pub const MAX_EVIDENCE_FILES: usize = 5;

/// Maximum size of a single evidence file (5 MiB).
pub const MAX_EVIDENCE_FILE_SIZE: i64 = 5 * 1024 * 1024;

/// Media kinds accepted as dispute evidence.
pub const ALLOWED_EVIDENCE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "text/plain",
];

/// Why the client is disputing the shoot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeCategory {
    Quality,
    Incomplete,
    Noshow,
    Late,
    Communication,
    Other,
}

impl DisputeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeCategory::Quality => "quality",
            DisputeCategory::Incomplete => "incomplete",
            DisputeCategory::Noshow => "noshow",
            DisputeCategory::Late => "late",
            DisputeCategory::Communication => "communication",
            DisputeCategory::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "quality" => Some(DisputeCategory::Quality),
            "incomplete" => Some(DisputeCategory::Incomplete),
            "noshow" => Some(DisputeCategory::Noshow),
            "late" => Some(DisputeCategory::Late),
            "communication" => Some(DisputeCategory::Communication),
            "other" => Some(DisputeCategory::Other),
            _ => None,
        }
    }
}

/// Outcome the client asked for when filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredResolution {
    FullRefund,
    PartialRefund,
    RedoWork,
    Mediation,
}

impl DesiredResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredResolution::FullRefund => "full_refund",
            DesiredResolution::PartialRefund => "partial_refund",
            DesiredResolution::RedoWork => "redo_work",
            DesiredResolution::Mediation => "mediation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "full_refund" => Some(DesiredResolution::FullRefund),
            "partial_refund" => Some(DesiredResolution::PartialRefund),
            "redo_work" => Some(DesiredResolution::RedoWork),
            "mediation" => Some(DesiredResolution::Mediation),
            _ => None,
        }
    }
}

/// Review state of a dispute. `Open` and `InReview` both count as an open
/// dispute for the one-open-dispute-per-payment invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    InReview,
    Resolved,
}

impl DisputeStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, DisputeStatus::Resolved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Open => "open",
            DisputeStatus::InReview => "in_review",
            DisputeStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(DisputeStatus::Open),
            "in_review" => Some(DisputeStatus::InReview),
            "resolved" => Some(DisputeStatus::Resolved),
            _ => None,
        }
    }
}

/// Metadata for one attached evidence file. The bytes live elsewhere; the
/// ledger only validates and records the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

impl EvidenceFile {
    pub fn is_allowed_mime_type(mime_type: &str) -> bool {
        ALLOWED_EVIDENCE_MIME_TYPES.contains(&mime_type)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::validation("evidence file name is empty"));
        }
        if !Self::is_allowed_mime_type(&self.mime_type) {
            return Err(LedgerError::validation(format!(
                "unsupported evidence type '{}'",
                self.mime_type
            )));
        }
        if self.size_bytes <= 0 || self.size_bytes > MAX_EVIDENCE_FILE_SIZE {
            return Err(LedgerError::validation(format!(
                "evidence file '{}' size {} outside 1..={} bytes",
                self.name, self.size_bytes, MAX_EVIDENCE_FILE_SIZE
            )));
        }
        Ok(())
    }
}

/// Client-supplied input for opening a dispute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeRequest {
    pub category: DisputeCategory,
    pub description: String,
    pub desired_resolution: Option<DesiredResolution>,
    pub evidence: Vec<EvidenceFile>,
}

/// One dispute raised against an escrowed payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: String,
    pub transaction_id: String,
    pub category: DisputeCategory,
    pub description: String,
    pub desired_resolution: Option<DesiredResolution>,
    pub evidence: Vec<EvidenceFile>,
    pub created_at: DateTime<Utc>,
    pub resolution_status: DisputeStatus,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Dispute {
    /// Move an open dispute into review. Idempotent on `InReview`.
    pub fn begin_review(&self) -> Result<Self, LedgerError> {
        if self.resolution_status == DisputeStatus::Resolved {
            return Err(LedgerError::validation(format!(
                "dispute {} is already resolved",
                self.id
            )));
        }
        let mut next = self.clone();
        next.resolution_status = DisputeStatus::InReview;
        Ok(next)
    }
}

/// Admin decision closing a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Continue the hold; the countdown restarts or resumes per policy.
    ReinstateHold,
    /// Pay the photographer.
    Release,
    /// Refund the client this amount (full or partial).
    Refund(i64),
}

/// How a reinstated hold recomputes its release deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReinstatePolicy {
    /// A fresh full hold period starting at resolution time.
    #[default]
    Restart,
    /// Credit the time that was left when the dispute opened.
    Resume,
}

/// Dispute id format used across the API: `DIS-` followed by the creation
/// timestamp in milliseconds, base36, uppercase.
pub fn dispute_id_at(now: DateTime<Utc>) -> String {
    format!("DIS-{}", to_base36_upper(now.timestamp_millis()))
}

fn to_base36_upper(mut n: i64) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

impl EscrowTransaction {
    /// Open a dispute on a held payment.
    ///
    /// Moves the payment to `Disputed`, which makes the pending auto-release
    /// inert. Fails with `InvalidTransition` when the payment already
    /// progressed (including an already-open dispute) and with `Validation`
    /// for a missing description or evidence outside the limits.
    pub fn open_dispute(
        &self,
        request: DisputeRequest,
        now: DateTime<Utc>,
    ) -> Result<(Self, Dispute), LedgerError> {
        if self.status != EscrowStatus::Held {
            return Err(LedgerError::InvalidTransition {
                operation: "open_dispute",
                status: self.status.as_str(),
            });
        }
        if request.description.trim().is_empty() {
            return Err(LedgerError::validation("dispute description is required"));
        }
        if request.evidence.len() > MAX_EVIDENCE_FILES {
            return Err(LedgerError::validation(format!(
                "at most {MAX_EVIDENCE_FILES} evidence files allowed, got {}",
                request.evidence.len()
            )));
        }
        for file in &request.evidence {
            file.validate()?;
        }

        let dispute = Dispute {
            id: dispute_id_at(now),
            transaction_id: self.id.clone(),
            category: request.category,
            description: request.description,
            desired_resolution: request.desired_resolution,
            evidence: request.evidence,
            created_at: now,
            resolution_status: DisputeStatus::Open,
            resolved_at: None,
        };

        let mut next = self.clone();
        next.status = EscrowStatus::Disputed;
        next.dispute_id = Some(dispute.id.clone());
        next.disputed_at = Some(now);

        Ok((next, dispute))
    }

    /// Resolve the open dispute on this payment with `verdict`.
    ///
    /// `ReinstateHold` returns the payment to `Held` with a release deadline
    /// recomputed per `policy` and clears the dispute reference; `Release`
    /// and `Refund` settle the payment, keeping the dispute reference for
    /// the audit trail.
    pub fn resolve_dispute(
        &self,
        dispute: &Dispute,
        verdict: Verdict,
        policy: ReinstatePolicy,
        now: DateTime<Utc>,
    ) -> Result<(Self, Dispute), LedgerError> {
        if self.status != EscrowStatus::Disputed {
            return Err(LedgerError::InvalidTransition {
                operation: "resolve_dispute",
                status: self.status.as_str(),
            });
        }
        if !dispute.resolution_status.is_open() {
            return Err(LedgerError::validation(format!(
                "dispute {} is already resolved",
                dispute.id
            )));
        }
        if self.dispute_id.as_deref() != Some(dispute.id.as_str()) {
            return Err(LedgerError::validation(format!(
                "dispute {} does not belong to payment {}",
                dispute.id, self.id
            )));
        }

        let next_tx = match verdict {
            Verdict::ReinstateHold => {
                let remaining = match policy {
                    ReinstatePolicy::Restart => Duration::seconds(self.hold_period_secs),
                    ReinstatePolicy::Resume => {
                        // release_at was frozen at dispute time; the credit is
                        // whatever was left on the clock at that moment.
                        let disputed_at = self.disputed_at.unwrap_or(now);
                        let left = self.release_at - disputed_at;
                        if left > Duration::zero() {
                            left
                        } else {
                            Duration::zero()
                        }
                    }
                };
                let mut next = self.clone();
                next.status = EscrowStatus::Held;
                next.release_at = now + remaining;
                next.dispute_id = None;
                next.disputed_at = None;
                next
            }
            Verdict::Release => {
                let mut next = self.clone();
                next.status = EscrowStatus::Released;
                next
            }
            Verdict::Refund(amount) => self.refund(amount)?,
        };

        let mut resolved = dispute.clone();
        resolved.resolution_status = DisputeStatus::Resolved;
        resolved.resolved_at = Some(now);

        Ok((next_tx, resolved))
    }
}
