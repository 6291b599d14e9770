//! Dispute API handlers

use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use ledger::{DisputeRequest, Verdict};

use crate::handlers::error_codes;
use crate::logging::sanitize::sanitize_id;
use crate::models::dispute::DisputeRow;
use crate::models::dispute_evidence::DisputeEvidence;
use crate::services::escrow::EscrowService;
use crate::validation::{parse_category, parse_desired_resolution, validate_evidence};

/// Evidence descriptor as sent by the dispute form.
#[derive(Debug, Clone, Deserialize)]
pub struct EvidenceFilePayload {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: i64,
}

/// Request body for opening a dispute.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDisputeRequest {
    #[validate(length(min = 1, max = 100, message = "booking_id must be 1-100 characters"))]
    pub booking_id: String,

    #[validate(length(min = 1, max = 100, message = "client_id must be 1-100 characters"))]
    pub client_id: String,

    #[validate(length(min = 1, max = 100, message = "photographer_id must be 1-100 characters"))]
    pub photographer_id: String,

    /// Dispute category (quality, incomplete, noshow, late, communication,
    /// other).
    #[validate(length(min = 1, message = "reason is required"))]
    pub reason: String,

    #[validate(length(min = 1, max = 5000, message = "description must be 1-5000 characters"))]
    pub description: String,

    pub desired_resolution: Option<String>,

    /// Number of evidence files; must match the descriptor list.
    pub evidence_count: usize,

    #[serde(default)]
    pub evidence_files: Vec<EvidenceFilePayload>,
}

/// API view of a dispute row with its evidence descriptors.
#[derive(Debug, Serialize)]
pub struct DisputeResponse {
    pub id: String,
    pub payment_id: String,
    pub category: String,
    pub description: String,
    pub desired_resolution: Option<String>,
    pub status: String,
    pub verdict: Option<String>,
    pub evidence: Vec<EvidenceView>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EvidenceView {
    pub name: String,
    pub mime_type: String,
    pub size: i64,
}

impl DisputeResponse {
    pub fn from_row(dispute: &DisputeRow, evidence: &[DisputeEvidence]) -> Self {
        Self {
            id: dispute.id.clone(),
            payment_id: dispute.payment_id.clone(),
            category: dispute.category.clone(),
            description: dispute.description.clone(),
            desired_resolution: dispute.desired_resolution.clone(),
            status: dispute.status.clone(),
            verdict: dispute.verdict.clone(),
            evidence: evidence
                .iter()
                .map(|e| EvidenceView {
                    name: e.file_name.clone(),
                    mime_type: e.mime_type.clone(),
                    size: e.file_size,
                })
                .collect(),
            created_at: dispute.created_at.and_utc().to_rfc3339(),
            resolved_at: dispute.resolved_at.map(|t| t.and_utc().to_rfc3339()),
        }
    }
}

/// Open a dispute on a held payment.
///
/// Suspends the automatic release: the payment moves to `disputed` and the
/// release poll no longer selects it.
///
/// # Endpoint
/// POST /disputes/create
pub async fn create_dispute(
    service: web::Data<EscrowService>,
    payload: web::Json<CreateDisputeRequest>,
) -> impl Responder {
    if let Err(e) = payload.validate() {
        return error_codes::validation_failed(&format!("Validation failed: {e}"));
    }

    let category = match parse_category(&payload.reason) {
        Ok(c) => c,
        Err(e) => return error_codes::validation_failed(&e),
    };
    let desired_resolution =
        match parse_desired_resolution(payload.desired_resolution.as_deref()) {
            Ok(r) => r,
            Err(e) => return error_codes::validation_failed(&e),
        };

    if payload.evidence_count != payload.evidence_files.len() {
        return error_codes::validation_failed(&format!(
            "evidence_count {} does not match {} evidence_files",
            payload.evidence_count,
            payload.evidence_files.len()
        ));
    }

    let raw_files: Vec<(String, String, i64)> = payload
        .evidence_files
        .iter()
        .map(|f| (f.name.clone(), f.mime_type.clone(), f.size))
        .collect();
    let evidence = match validate_evidence(&raw_files) {
        Ok(files) => files,
        Err(e) => return error_codes::validation_failed(&e),
    };

    let request = DisputeRequest {
        category,
        description: payload.description.clone(),
        desired_resolution,
        evidence,
    };

    info!(
        booking_id = %sanitize_id(&payload.booking_id),
        category = %payload.reason,
        evidence_count = payload.evidence_count,
        "Dispute submission received"
    );

    match service.open_dispute(&payload.booking_id, request).await {
        Ok((payment, dispute)) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "dispute_id": dispute.id,
            "payment_id": payment.id,
            "payment_status": payment.status,
        })),
        Err(e) => error_codes::from_service_error(&e),
    }
}

/// Dispute snapshot with evidence descriptors.
///
/// # Endpoint
/// GET /disputes/{id}
pub async fn get_dispute(
    service: web::Data<EscrowService>,
    path: web::Path<String>,
) -> impl Responder {
    let dispute_id = path.into_inner();
    match service.get_dispute(&dispute_id).await {
        Ok((dispute, evidence)) => {
            HttpResponse::Ok().json(DisputeResponse::from_row(&dispute, &evidence))
        }
        Err(e) => error_codes::from_service_error(&e),
    }
}

/// Move an open dispute into review.
///
/// # Endpoint
/// POST /disputes/{id}/review
pub async fn begin_review(
    service: web::Data<EscrowService>,
    path: web::Path<String>,
) -> impl Responder {
    let dispute_id = path.into_inner();
    match service.begin_dispute_review(&dispute_id).await {
        Ok(dispute) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "dispute_id": dispute.id,
            "dispute_status": dispute.status,
        })),
        Err(e) => error_codes::from_service_error(&e),
    }
}

/// Request body for resolving a dispute.
#[derive(Debug, Deserialize, Validate)]
pub struct ResolveDisputeRequest {
    /// "reinstate_hold", "release", or "refund".
    #[validate(length(min = 1, message = "verdict is required"))]
    pub verdict: String,

    /// Required when verdict is "refund".
    pub refund_amount: Option<i64>,
}

/// Resolve an open dispute with an admin verdict.
///
/// # Endpoint
/// POST /disputes/{id}/resolve
pub async fn resolve_dispute(
    service: web::Data<EscrowService>,
    path: web::Path<String>,
    payload: web::Json<ResolveDisputeRequest>,
) -> impl Responder {
    if let Err(e) = payload.validate() {
        return error_codes::validation_failed(&format!("Validation failed: {e}"));
    }

    let verdict = match payload.verdict.as_str() {
        "reinstate_hold" => Verdict::ReinstateHold,
        "release" => Verdict::Release,
        "refund" => match payload.refund_amount {
            Some(amount) => Verdict::Refund(amount),
            None => {
                return error_codes::validation_failed(
                    "refund_amount is required for a refund verdict",
                )
            }
        },
        other => {
            return error_codes::validation_failed(&format!(
                "unknown verdict '{other}' (expected reinstate_hold, release, or refund)"
            ))
        }
    };

    let dispute_id = path.into_inner();

    info!(
        dispute_id = %dispute_id,
        verdict = %payload.verdict,
        "Dispute resolution requested"
    );

    match service.resolve_dispute(&dispute_id, verdict).await {
        Ok((payment, dispute)) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "dispute_id": dispute.id,
            "dispute_status": dispute.status,
            "verdict": dispute.verdict,
            "payment_status": payment.status,
            "refund_amount": payment.refund_amount,
        })),
        Err(e) => error_codes::from_service_error(&e),
    }
}
