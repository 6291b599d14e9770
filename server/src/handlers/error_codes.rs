//! Standardized API error codes
//!
//! Each error code maps to a user-facing message and a stable identifier the
//! front end keys its recovery flows on.
//!
//! # Error Code Categories
//! - PAY-xxx: payment state errors
//! - DIS-xxx: dispute errors
//! - PO-xxx: payout errors

use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

use ledger::LedgerError;

use crate::services::ServiceError;

/// Error response with standardized error code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Operation success (always false for errors)
    pub success: bool,
    /// Error code (e.g., "PAY-002")
    pub error_code: String,
    /// Human-readable error message
    pub error: String,
    /// Optional additional details for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            success: false,
            error_code: code.to_string(),
            error: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: &str) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

// =============================================================================
// PAYMENT ERRORS (PAY-xxx)
// =============================================================================

/// PAY-001: Payment not found
pub fn payment_not_found(what: &str) -> HttpResponse {
    HttpResponse::NotFound().json(
        ErrorResponse::new("PAY-001", "Payment not found.").with_details(what),
    )
}

/// PAY-002: Payment not in a compatible status for the operation
pub fn invalid_payment_state(details: &str) -> HttpResponse {
    HttpResponse::Conflict().json(
        ErrorResponse::new(
            "PAY-002",
            "This payment is not in the right state for that action.",
        )
        .with_details(details),
    )
}

/// PAY-003: Request failed validation
pub fn validation_failed(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse::new("PAY-003", message))
}

/// PAY-004: Concurrent update conflict
pub fn concurrency_conflict(details: &str) -> HttpResponse {
    HttpResponse::Conflict().json(
        ErrorResponse::new(
            "PAY-004",
            "The payment was updated by another request. Refresh and retry.",
        )
        .with_details(details),
    )
}

// =============================================================================
// DISPUTE ERRORS (DIS-xxx)
// =============================================================================

/// DIS-001: Dispute cannot be opened because the payment already progressed
///
/// The common double-submit race on the dispute form gets a specific message
/// rather than a generic failure.
pub fn payment_already_progressed(status: &str) -> HttpResponse {
    HttpResponse::Conflict().json(
        ErrorResponse::new(
            "DIS-001",
            "This payment has already progressed or is already under dispute.",
        )
        .with_details(&format!("current status: {status}")),
    )
}

/// DIS-002: Dispute not found
pub fn dispute_not_found(dispute_id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(
        ErrorResponse::new("DIS-002", "Dispute not found.")
            .with_details(&format!("dispute_id: {dispute_id}")),
    )
}

// =============================================================================
// PAYOUT ERRORS (PO-xxx)
// =============================================================================

/// PO-001: Payout not found
pub fn payout_not_found(payout_id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(
        ErrorResponse::new("PO-001", "Payout not found.")
            .with_details(&format!("payout_id: {payout_id}")),
    )
}

/// PO-002: Payout already settled
pub fn payout_already_settled(status: &str) -> HttpResponse {
    HttpResponse::Conflict().json(
        ErrorResponse::new("PO-002", "This payout has already been settled.")
            .with_details(&format!("current status: {status}")),
    )
}

// =============================================================================
// MAPPING
// =============================================================================

/// Map a ledger error to its HTTP response.
///
/// 400 for validation, 404 for missing records, 409 for incompatible status
/// and optimistic-lock conflicts.
pub fn from_ledger_error(err: &LedgerError) -> HttpResponse {
    match err {
        LedgerError::Validation(msg) => validation_failed(msg),
        LedgerError::InvalidTransition { operation, status } => match *operation {
            "open_dispute" => payment_already_progressed(status),
            "process" | "reject" => payout_already_settled(status),
            _ => invalid_payment_state(&err.to_string()),
        },
        LedgerError::NotFound(what) => {
            if what.starts_with("dispute") {
                dispute_not_found(what)
            } else if what.starts_with("payout") {
                payout_not_found(what)
            } else {
                payment_not_found(what)
            }
        }
        LedgerError::ConcurrencyConflict(what) => concurrency_conflict(what),
    }
}

/// Map a service error to its HTTP response; infrastructure failures become
/// an opaque 500.
pub fn from_service_error(err: &ServiceError) -> HttpResponse {
    match err {
        ServiceError::Ledger(e) => from_ledger_error(e),
        ServiceError::Internal(e) => {
            tracing::error!("Internal error serving request: {e:#}");
            HttpResponse::InternalServerError()
                .json(ErrorResponse::new("SRV-001", "Internal server error."))
        }
    }
}
