//! End-to-end escrow flow tests
//!
//! Exercise the service layer against a real (temporary) SQLite database:
//! hold creation, manual and automatic release, the dispute interlock, and
//! payout administration. No network and no real payment rails; fixtures
//! stand in for the booking system.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use ledger::{
    DisputeCategory, DisputeRequest, EscrowStatus, LedgerError, PayoutStatus, ReinstatePolicy,
    Verdict,
};
use server::config::MonitorConfig;
use server::db::{create_pool, run_migrations, DbPool};
use server::models::payment::Payment;
use server::models::payout::Payout;
use server::services::escrow::{CreatePayment, EscrowService, ReleaseTrigger};
use server::services::{ReleaseMonitor, ServiceError};

const DAY_SECS: i64 = 86_400;

fn test_pool() -> DbPool {
    let db_path = std::env::temp_dir().join(format!("bookyourshoot-test-{}.db", Uuid::new_v4()));
    let pool = create_pool(db_path.to_str().expect("utf-8 temp path")).expect("create pool");
    let mut conn = pool.get().expect("get connection");
    run_migrations(&mut conn).expect("run migrations");
    pool
}

fn test_service(pool: &DbPool) -> EscrowService {
    EscrowService::new(pool.clone(), ReinstatePolicy::Restart)
}

fn booking_hold(booking_id: &str, amount: i64) -> CreatePayment {
    CreatePayment {
        booking_id: booking_id.to_string(),
        client_id: "CL-100".to_string(),
        photographer_id: "PH-200".to_string(),
        amount,
        platform_fee_bps: 1_000,
        hold_period_secs: 7 * DAY_SECS,
    }
}

fn blurry_photos() -> DisputeRequest {
    DisputeRequest {
        category: DisputeCategory::Quality,
        description: "photos blurry".to_string(),
        desired_resolution: None,
        evidence: vec![],
    }
}

/// Backdate a payment's release deadline so the poll sees it as due.
fn backdate_release(pool: &DbPool, payment_id: &str, days: i64) {
    use server::schema::payments;
    let mut conn = pool.get().expect("get connection");
    let past = (Utc::now() - Duration::days(days)).naive_utc();
    diesel::update(payments::table.filter(payments::id.eq(payment_id)))
        .set(payments::release_at.eq(past))
        .execute(&mut conn)
        .expect("backdate release_at");
}

fn assert_invalid_transition(err: ServiceError) {
    match err {
        ServiceError::Ledger(LedgerError::InvalidTransition { .. }) => {}
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

#[tokio::test]
async fn create_then_read_back() {
    let pool = test_pool();
    let service = test_service(&pool);

    let payment = service
        .create_payment(booking_hold("BK-1", 45_000))
        .await
        .expect("create payment");

    assert_eq!(payment.status, "held");
    assert_eq!(payment.amount, 45_000);
    assert_eq!(
        payment.release_at,
        payment.created_at + Duration::seconds(7 * DAY_SECS)
    );

    let fetched = service.get_payment(&payment.id).await.expect("get payment");
    assert_eq!(fetched.id, payment.id);

    let countdown = service
        .get_countdown(&payment.id, Utc::now())
        .await
        .expect("get countdown");
    let view = countdown.as_counting().expect("held payment counts down");
    assert!(!view.expired);
    assert!(view.days_left >= 6);
}

#[tokio::test]
async fn missing_payment_is_not_found() {
    let pool = test_pool();
    let service = test_service(&pool);

    match service.get_payment("pay-nope").await {
        Err(ServiceError::Ledger(LedgerError::NotFound(_))) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn manual_release_queues_net_payout_once() {
    let pool = test_pool();
    let service = test_service(&pool);

    let payment = service
        .create_payment(booking_hold("BK-2", 45_000))
        .await
        .expect("create payment");

    let released = service
        .release_payment(&payment.id, ReleaseTrigger::Manual)
        .await
        .expect("release");
    assert_eq!(released.status, "released");

    // 10% platform fee withheld from the payout.
    let mut conn = pool.get().expect("get connection");
    let payouts = Payout::find_by_payment(&mut conn, &payment.id).expect("load payouts");
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].amount, 40_500);
    assert_eq!(payouts[0].status, "pending");

    // One-way: a second release is the documented conflict.
    let err = service
        .release_payment(&payment.id, ReleaseTrigger::Manual)
        .await
        .expect_err("second release must fail");
    assert_invalid_transition(err);
}

#[tokio::test]
async fn poll_releases_only_due_holds() {
    let pool = test_pool();
    let service = test_service(&pool);
    let monitor = ReleaseMonitor::new(pool.clone(), service.clone(), MonitorConfig::default());

    let due = service
        .create_payment(booking_hold("BK-3", 10_000))
        .await
        .expect("create due payment");
    let not_due = service
        .create_payment(booking_hold("BK-4", 10_000))
        .await
        .expect("create fresh payment");

    backdate_release(&pool, &due.id, 1);

    let released = monitor.poll_once().await.expect("poll");
    assert_eq!(released, 1);

    assert_eq!(service.get_payment(&due.id).await.unwrap().status, "released");
    assert_eq!(service.get_payment(&not_due.id).await.unwrap().status, "held");

    // Steady state: nothing left to release.
    assert_eq!(monitor.poll_once().await.expect("second poll"), 0);
}

#[tokio::test]
async fn dispute_suspends_auto_release() {
    let pool = test_pool();
    let service = test_service(&pool);
    let monitor = ReleaseMonitor::new(pool.clone(), service.clone(), MonitorConfig::default());

    let payment = service
        .create_payment(booking_hold("BK-5", 18_000))
        .await
        .expect("create payment");

    let (disputed, dispute) = service
        .open_dispute("BK-5", blurry_photos())
        .await
        .expect("open dispute");
    assert_eq!(disputed.status, "disputed");
    assert!(dispute.id.starts_with("DIS-"));
    assert_eq!(disputed.dispute_id.as_deref(), Some(dispute.id.as_str()));

    // Deadline long past, but the disputed row is invisible to the poll.
    backdate_release(&pool, &payment.id, 30);
    assert_eq!(monitor.poll_once().await.expect("poll"), 0);
    assert_eq!(
        service.get_payment(&payment.id).await.unwrap().status,
        "disputed"
    );

    // The double-submitted dispute form gets the specific conflict.
    let err = service
        .open_dispute("BK-5", blurry_photos())
        .await
        .expect_err("second dispute must fail");
    match err {
        ServiceError::Ledger(LedgerError::InvalidTransition {
            operation: "open_dispute",
            ..
        }) => {}
        other => panic!("expected open_dispute conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn dispute_review_step_before_resolution() {
    let pool = test_pool();
    let service = test_service(&pool);

    service
        .create_payment(booking_hold("BK-R", 18_000))
        .await
        .expect("create payment");
    let (_, dispute) = service
        .open_dispute("BK-R", blurry_photos())
        .await
        .expect("open dispute");

    let reviewing = service
        .begin_dispute_review(&dispute.id)
        .await
        .expect("begin review");
    assert_eq!(reviewing.status, "in_review");

    // Idempotent while under review.
    let again = service
        .begin_dispute_review(&dispute.id)
        .await
        .expect("review again");
    assert_eq!(again.status, "in_review");

    // A dispute under review still resolves.
    let (settled, _) = service
        .resolve_dispute(&dispute.id, Verdict::Release)
        .await
        .expect("resolve from review");
    assert_eq!(settled.status, "released");

    // But not once it is resolved.
    let err = service
        .begin_dispute_review(&dispute.id)
        .await
        .expect_err("review after resolution must fail");
    assert_invalid_transition(err);
}

#[tokio::test]
async fn dispute_resolved_with_partial_refund_pays_out_remainder() {
    let pool = test_pool();
    let service = test_service(&pool);

    let payment = service
        .create_payment(booking_hold("BK-6", 18_000))
        .await
        .expect("create payment");
    let (_, dispute) = service
        .open_dispute("BK-6", blurry_photos())
        .await
        .expect("open dispute");

    let (settled, resolved) = service
        .resolve_dispute(&dispute.id, Verdict::Refund(9_000))
        .await
        .expect("resolve dispute");

    assert_eq!(settled.status, "partially_refunded");
    assert_eq!(settled.refund_amount, Some(9_000));
    assert_eq!(resolved.status, "resolved");
    assert_eq!(resolved.verdict.as_deref(), Some("refund"));

    // Photographer keeps 9_000 minus the 10% fee on it.
    let mut conn = pool.get().expect("get connection");
    let payouts = Payout::find_by_payment(&mut conn, &payment.id).expect("load payouts");
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].amount, 8_100);

    // Resolved disputes cannot be resolved again.
    let err = service
        .resolve_dispute(&dispute.id, Verdict::Release)
        .await
        .expect_err("second resolution must fail");
    match err {
        ServiceError::Ledger(LedgerError::InvalidTransition { .. })
        | ServiceError::Ledger(LedgerError::Validation(_)) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn dispute_resolved_by_reinstating_hold_restarts_countdown() {
    let pool = test_pool();
    let service = test_service(&pool);
    let monitor = ReleaseMonitor::new(pool.clone(), service.clone(), MonitorConfig::default());

    let payment = service
        .create_payment(booking_hold("BK-7", 30_000))
        .await
        .expect("create payment");
    let (_, dispute) = service
        .open_dispute("BK-7", blurry_photos())
        .await
        .expect("open dispute");

    let before = Utc::now();
    let (held_again, _) = service
        .resolve_dispute(&dispute.id, Verdict::ReinstateHold)
        .await
        .expect("reinstate");

    assert_eq!(held_again.status, "held");
    assert_eq!(held_again.dispute_id, None);
    // Restart policy: a full fresh hold period from resolution time.
    let new_deadline = held_again.release_at.and_utc();
    assert!(new_deadline >= before + Duration::seconds(7 * DAY_SECS) - Duration::seconds(5));

    // Fresh hold, nothing due.
    assert_eq!(monitor.poll_once().await.expect("poll"), 0);

    // No payout for a reinstated hold.
    let mut conn = pool.get().expect("get connection");
    let payouts = Payout::find_by_payment(&mut conn, &payment.id).expect("load payouts");
    assert!(payouts.is_empty());
}

#[tokio::test]
async fn full_refund_after_dispute() {
    let pool = test_pool();
    let service = test_service(&pool);

    let payment = service
        .create_payment(booking_hold("BK-8", 18_000))
        .await
        .expect("create payment");
    let (_, dispute) = service
        .open_dispute("BK-8", blurry_photos())
        .await
        .expect("open dispute");

    let (settled, _) = service
        .resolve_dispute(&dispute.id, Verdict::Refund(18_000))
        .await
        .expect("resolve with full refund");
    assert_eq!(settled.status, "refunded");
    assert_eq!(settled.refund_amount, Some(18_000));

    // Everything went back to the client: no payout row.
    let mut conn = pool.get().expect("get connection");
    let payouts = Payout::find_by_payment(&mut conn, &payment.id).expect("load payouts");
    assert!(payouts.is_empty());
}

#[tokio::test]
async fn direct_refund_while_held() {
    let pool = test_pool();
    let service = test_service(&pool);

    let payment = service
        .create_payment(booking_hold("BK-9", 20_000))
        .await
        .expect("create payment");

    let refunded = service
        .refund_payment(&payment.id, 20_000)
        .await
        .expect("refund");
    assert_eq!(refunded.status, "refunded");

    // Refund amount above the hold is a validation error.
    let another = service
        .create_payment(booking_hold("BK-10", 5_000))
        .await
        .expect("create payment");
    match service.refund_payment(&another.id, 6_000).await {
        Err(ServiceError::Ledger(LedgerError::Validation(_))) => {}
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn payout_admin_transitions_are_one_way() {
    let pool = test_pool();
    let service = test_service(&pool);

    let payment = service
        .create_payment(booking_hold("BK-11", 45_000))
        .await
        .expect("create payment");
    service
        .release_payment(&payment.id, ReleaseTrigger::Manual)
        .await
        .expect("release");

    let mut conn = pool.get().expect("get connection");
    let payout_id = Payout::find_by_payment(&mut conn, &payment.id).expect("load payouts")[0]
        .id
        .clone();
    drop(conn);

    let processed = service.process_payout(&payout_id).await.expect("process");
    assert_eq!(processed.status, "processed");
    assert!(processed.processed_at.is_some());

    let err = service
        .process_payout(&payout_id)
        .await
        .expect_err("second process must fail");
    assert_invalid_transition(err);

    let err = service
        .reject_payout(&payout_id, "too late".to_string())
        .await
        .expect_err("reject after process must fail");
    assert_invalid_transition(err);

    assert_eq!(
        PayoutStatus::from_str(&service.get_payout(&payout_id).await.unwrap().status),
        Some(PayoutStatus::Processed)
    );
}

#[tokio::test]
async fn stale_snapshot_write_reports_current_status() {
    let pool = test_pool();
    let service = test_service(&pool);

    let payment = service
        .create_payment(booking_hold("BK-12", 10_000))
        .await
        .expect("create payment");

    // Simulate a racing writer: flip the row out from under a stale CAS.
    let mut conn = pool.get().expect("get connection");
    let snapshot = Payment::find_by_id(&mut conn, &payment.id)
        .expect("query")
        .expect("exists")
        .to_snapshot()
        .expect("snapshot");
    let released = snapshot.release().expect("release");
    let rows = Payment::apply_transition(
        &mut conn,
        EscrowStatus::Held,
        &released,
        Utc::now().naive_utc(),
    )
    .expect("first CAS");
    assert_eq!(rows, 1);

    // The same expected-status write now matches zero rows.
    let rows = Payment::apply_transition(
        &mut conn,
        EscrowStatus::Held,
        &released,
        Utc::now().naive_utc(),
    )
    .expect("second CAS");
    assert_eq!(rows, 0);
    drop(conn);

    // And the service reports the real current state to the caller.
    let err = service
        .refund_payment(&payment.id, 1_000)
        .await
        .expect_err("refund of released payment must fail");
    assert_invalid_transition(err);
}
