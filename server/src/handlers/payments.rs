//! Payment API handlers

use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::config::{get_default_hold_period_secs, get_default_platform_fee_bps};
use crate::handlers::error_codes;
use crate::logging::sanitize::sanitize_id;
use crate::models::payment::Payment;
use crate::services::escrow::{CreatePayment, EscrowService, ReleaseTrigger};

/// Request body for creating a hold when a booking payment is captured.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, max = 100, message = "booking_id must be 1-100 characters"))]
    pub booking_id: String,

    #[validate(length(min = 1, max = 100, message = "client_id must be 1-100 characters"))]
    pub client_id: String,

    #[validate(length(min = 1, max = 100, message = "photographer_id must be 1-100 characters"))]
    pub photographer_id: String,

    /// Amount in the smallest currency unit.
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,

    /// Platform commission in basis points; platform default when omitted.
    pub platform_fee_bps: Option<u32>,

    /// Hold duration in seconds; platform default when omitted.
    pub hold_period_secs: Option<i64>,
}

/// API view of a payment row.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub booking_id: String,
    pub client_id: String,
    pub photographer_id: String,
    pub amount: i64,
    pub platform_fee_bps: i32,
    pub status: String,
    pub created_at: String,
    pub release_at: String,
    pub hold_period_secs: i64,
    pub refund_amount: Option<i64>,
    pub dispute_id: Option<String>,
}

impl PaymentResponse {
    pub fn from_row(payment: &Payment) -> Self {
        Self {
            id: payment.id.clone(),
            booking_id: payment.booking_id.clone(),
            client_id: payment.client_id.clone(),
            photographer_id: payment.photographer_id.clone(),
            amount: payment.amount,
            platform_fee_bps: payment.platform_fee_bps,
            status: payment.status.clone(),
            created_at: payment.created_at.and_utc().to_rfc3339(),
            release_at: payment.release_at.and_utc().to_rfc3339(),
            hold_period_secs: payment.hold_period_secs,
            refund_amount: payment.refund_amount,
            dispute_id: payment.dispute_id.clone(),
        }
    }
}

/// Create a new escrow hold.
///
/// # Endpoint
/// POST /payments/create
pub async fn create_payment(
    service: web::Data<EscrowService>,
    payload: web::Json<CreatePaymentRequest>,
) -> impl Responder {
    if let Err(e) = payload.validate() {
        return error_codes::validation_failed(&format!("Validation failed: {e}"));
    }

    let input = CreatePayment {
        booking_id: payload.booking_id.clone(),
        client_id: payload.client_id.clone(),
        photographer_id: payload.photographer_id.clone(),
        amount: payload.amount,
        platform_fee_bps: payload
            .platform_fee_bps
            .unwrap_or_else(get_default_platform_fee_bps),
        hold_period_secs: payload
            .hold_period_secs
            .unwrap_or_else(get_default_hold_period_secs),
    };

    match service.create_payment(input).await {
        Ok(payment) => HttpResponse::Created().json(PaymentResponse::from_row(&payment)),
        Err(e) => error_codes::from_service_error(&e),
    }
}

/// Current payment snapshot.
///
/// # Endpoint
/// GET /payments/{id}
pub async fn get_payment(
    service: web::Data<EscrowService>,
    path: web::Path<String>,
) -> impl Responder {
    let payment_id = path.into_inner();
    match service.get_payment(&payment_id).await {
        Ok(payment) => HttpResponse::Ok().json(PaymentResponse::from_row(&payment)),
        Err(e) => error_codes::from_service_error(&e),
    }
}

/// Countdown/progress view for display polling.
///
/// Recomputed from the stored snapshot and the current wall clock on every
/// request; the interactive UI polls this once per second.
///
/// # Endpoint
/// GET /payments/{id}/countdown
pub async fn get_countdown(
    service: web::Data<EscrowService>,
    path: web::Path<String>,
) -> impl Responder {
    let payment_id = path.into_inner();
    match service.get_countdown(&payment_id, Utc::now()).await {
        Ok(countdown) => HttpResponse::Ok().json(countdown),
        Err(e) => error_codes::from_service_error(&e),
    }
}

/// Confirm and release a held payment to the photographer.
///
/// # Endpoint
/// POST /payments/{id}/release
pub async fn release_payment(
    service: web::Data<EscrowService>,
    path: web::Path<String>,
) -> impl Responder {
    let payment_id = path.into_inner();

    info!(
        payment_id = %sanitize_id(&payment_id),
        "Manual release requested"
    );

    match service
        .release_payment(&payment_id, ReleaseTrigger::Manual)
        .await
    {
        Ok(payment) => HttpResponse::Ok().json(PaymentResponse::from_row(&payment)),
        Err(e) => error_codes::from_service_error(&e),
    }
}

/// Request body for a refund.
#[derive(Debug, Deserialize, Validate)]
pub struct RefundRequest {
    /// Amount to refund in the smallest currency unit; equal to the held
    /// amount for a full refund.
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
}

/// Refund a held or disputed payment to the client.
///
/// # Endpoint
/// POST /payments/{id}/refund
pub async fn refund_payment(
    service: web::Data<EscrowService>,
    path: web::Path<String>,
    payload: web::Json<RefundRequest>,
) -> impl Responder {
    if let Err(e) = payload.validate() {
        return error_codes::validation_failed(&format!("Validation failed: {e}"));
    }

    let payment_id = path.into_inner();

    info!(
        payment_id = %sanitize_id(&payment_id),
        "Refund requested"
    );

    match service.refund_payment(&payment_id, payload.amount).await {
        Ok(payment) => HttpResponse::Ok().json(PaymentResponse::from_row(&payment)),
        Err(e) => error_codes::from_service_error(&e),
    }
}
