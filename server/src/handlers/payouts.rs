//! Payout administration handlers
//!
//! The payout layer mirrors the escrow's optimistic-transition pattern on a
//! smaller graph: pending payouts are processed or rejected by an admin,
//! each one-way.

use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::handlers::error_codes;
use crate::logging::sanitize::sanitize_id;
use crate::models::payout::Payout;
use crate::services::escrow::EscrowService;

/// API view of a payout row.
#[derive(Debug, Serialize)]
pub struct PayoutResponse {
    pub id: String,
    pub payment_id: String,
    pub photographer_id: String,
    pub amount: i64,
    pub status: String,
    pub reject_reason: Option<String>,
    pub created_at: String,
    pub processed_at: Option<String>,
}

impl PayoutResponse {
    pub fn from_row(payout: &Payout) -> Self {
        Self {
            id: payout.id.clone(),
            payment_id: payout.payment_id.clone(),
            photographer_id: payout.photographer_id.clone(),
            amount: payout.amount,
            status: payout.status.clone(),
            reject_reason: payout.reject_reason.clone(),
            created_at: payout.created_at.and_utc().to_rfc3339(),
            processed_at: payout.processed_at.map(|t| t.and_utc().to_rfc3339()),
        }
    }
}

/// Mark a pending payout as processed.
///
/// # Endpoint
/// POST /payments/admin/process/{payout_id}
pub async fn process_payout(
    service: web::Data<EscrowService>,
    path: web::Path<String>,
) -> impl Responder {
    let payout_id = path.into_inner();

    info!(
        payout_id = %sanitize_id(&payout_id),
        "Admin payout processing requested"
    );

    match service.process_payout(&payout_id).await {
        Ok(payout) => HttpResponse::Ok().json(PayoutResponse::from_row(&payout)),
        Err(e) => error_codes::from_service_error(&e),
    }
}

/// Request body for rejecting a payout.
#[derive(Debug, Deserialize)]
pub struct RejectPayoutRequest {
    pub reason: Option<String>,
}

/// Reject a pending payout.
///
/// # Endpoint
/// POST /payments/admin/reject/{payout_id}
pub async fn reject_payout(
    service: web::Data<EscrowService>,
    path: web::Path<String>,
    payload: web::Json<RejectPayoutRequest>,
) -> impl Responder {
    let payout_id = path.into_inner();
    let reason = payload
        .reason
        .clone()
        .unwrap_or_else(|| "rejected by admin".to_string());

    info!(
        payout_id = %sanitize_id(&payout_id),
        "Admin payout rejection requested"
    );

    match service.reject_payout(&payout_id, reason).await {
        Ok(payout) => HttpResponse::Ok().json(PayoutResponse::from_row(&payout)),
        Err(e) => error_codes::from_service_error(&e),
    }
}

/// Payout snapshot.
///
/// # Endpoint
/// GET /payments/admin/payouts/{payout_id}
pub async fn get_payout(
    service: web::Data<EscrowService>,
    path: web::Path<String>,
) -> impl Responder {
    let payout_id = path.into_inner();
    match service.get_payout(&payout_id).await {
        Ok(payout) => HttpResponse::Ok().json(PayoutResponse::from_row(&payout)),
        Err(e) => error_codes::from_service_error(&e),
    }
}
