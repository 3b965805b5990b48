mod common;

use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use common::*;
use ticket_ledger::db::models::booking_status;
use ticket_ledger::error::LedgerError;
use ticket_ledger::ports::HmacGateway;
use ticket_ledger::services::VerificationRequest;
use uuid::Uuid;

fn verification(
    showtime_id: Uuid,
    seat_ids: Vec<Uuid>,
    order_id: &str,
    signature: &str,
) -> VerificationRequest {
    VerificationRequest {
        external_order_id: order_id.to_string(),
        external_payment_id: format!("pay_{}", Uuid::new_v4().simple()),
        signature: signature.to_string(),
        showtime_id,
        seat_ids,
        seat_labels: None,
        total_amount: BigDecimal::from(450),
        customer: customer(),
    }
}

#[tokio::test]
async fn verified_payment_creates_confirmed_booking_and_success_attempt() {
    let Some(pool) = test_pool().await else { return };
    let core = core(pool.clone());

    let (showtime_id, seats) = seed_showtime(&pool, Utc::now() + Duration::days(1), 10).await;
    let order_id = format!("order_test_{}", Uuid::new_v4().simple());
    let request = verification(showtime_id, seats[0..3].to_vec(), &order_id, "sig");

    let booking = core
        .payments
        .verify_and_book("user-1", request)
        .await
        .expect("test-mode verification should succeed");

    assert_eq!(booking.status, booking_status::CONFIRMED);
    assert_eq!(booking.payment_method.as_deref(), Some("RAZORPAY"));
    assert!(booking.payment_id.is_some());
    assert_eq!(available_seats(&pool, showtime_id).await, 7);
    assert_seat_invariant(&pool, showtime_id).await;

    let (status,): (String,) = sqlx::query_as(
        "SELECT status FROM payment_attempts WHERE external_order_id = $1",
    )
    .bind(&order_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "SUCCESS");
}

#[tokio::test]
async fn replayed_callback_returns_same_booking_without_double_decrement() {
    let Some(pool) = test_pool().await else { return };
    let core = core(pool.clone());

    let (showtime_id, seats) = seed_showtime(&pool, Utc::now() + Duration::days(1), 10).await;
    let order_id = format!("order_test_{}", Uuid::new_v4().simple());
    let request = verification(showtime_id, seats[0..3].to_vec(), &order_id, "sig");

    let first = core
        .payments
        .verify_and_book("user-1", request.clone())
        .await
        .unwrap();
    let second = core
        .payments
        .verify_and_book("user-1", request)
        .await
        .expect("replay must be a successful no-op");

    assert_eq!(first.id, second.id);
    assert_eq!(available_seats(&pool, showtime_id).await, 7);

    let (attempts,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM payment_attempts WHERE external_order_id = $1",
    )
    .bind(&order_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn genuine_signature_passes_verification() {
    let Some(pool) = test_pool().await else { return };
    let core = core(pool.clone());

    let (showtime_id, seats) = seed_showtime(&pool, Utc::now() + Duration::days(1), 5).await;
    let gateway = HmacGateway::new(TEST_KEY_ID.to_string(), TEST_KEY_SECRET.to_string());

    let order_id = format!("order_live_{}", Uuid::new_v4().simple());
    let payment_id = format!("pay_{}", Uuid::new_v4().simple());
    let signature = gateway.sign(&order_id, &payment_id).unwrap();

    let mut request = verification(showtime_id, vec![seats[0]], &order_id, &signature);
    request.external_payment_id = payment_id;

    let booking = core.payments.verify_and_book("user-1", request).await;
    assert!(booking.is_ok(), "valid signature must be accepted");
}

#[tokio::test]
async fn forged_signature_is_rejected_without_mutation() {
    let Some(pool) = test_pool().await else { return };
    let core = core(pool.clone());

    let (showtime_id, seats) = seed_showtime(&pool, Utc::now() + Duration::days(1), 5).await;
    let order_id = format!("order_live_{}", Uuid::new_v4().simple());
    let request = verification(showtime_id, vec![seats[0]], &order_id, "deadbeef");

    let result = core.payments.verify_and_book("user-1", request).await;
    assert!(matches!(result, Err(LedgerError::InvalidSignature)));

    assert_eq!(available_seats(&pool, showtime_id).await, 5);
    assert_eq!(booking_count_for_showtime(&pool, showtime_id).await, 0);
}

#[tokio::test]
async fn seat_conflict_rolls_back_booking_and_attempt_together() {
    let Some(pool) = test_pool().await else { return };
    let core = core(pool.clone());

    let (showtime_id, seats) = seed_showtime(&pool, Utc::now() + Duration::days(1), 5).await;

    // First customer takes the seat through the test-mode pipeline.
    let winner = format!("order_test_{}", Uuid::new_v4().simple());
    core.payments
        .verify_and_book("user-1", verification(showtime_id, vec![seats[0]], &winner, "sig"))
        .await
        .unwrap();

    let loser = format!("order_test_{}", Uuid::new_v4().simple());
    let result = core
        .payments
        .verify_and_book("user-2", verification(showtime_id, vec![seats[0]], &loser, "sig"))
        .await;
    assert!(matches!(result, Err(LedgerError::SeatUnavailable(_))));

    // Nothing from the losing callback may survive the rollback.
    let (attempts,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM payment_attempts WHERE external_order_id = $1",
    )
    .bind(&loser)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(attempts, 0);
    assert_eq!(available_seats(&pool, showtime_id).await, 4);
}

#[tokio::test]
async fn failure_record_creates_cancelled_shell_without_reserving_seats() {
    let Some(pool) = test_pool().await else { return };
    let core = core(pool.clone());

    let (showtime_id, seats) = seed_showtime(&pool, Utc::now() + Duration::days(1), 5).await;
    let order_id = format!("order_test_{}", Uuid::new_v4().simple());

    core.payments
        .record_failure("user-1", verification(showtime_id, seats[0..2].to_vec(), &order_id, "sig"))
        .await
        .expect("failure recording should succeed");

    assert_eq!(available_seats(&pool, showtime_id).await, 5);
    assert_seat_invariant(&pool, showtime_id).await;

    let (status, attempt_status): (String, String) = sqlx::query_as(
        r#"
        SELECT b.status, p.status
        FROM payment_attempts p JOIN bookings b ON b.id = p.booking_id
        WHERE p.external_order_id = $1
        "#,
    )
    .bind(&order_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "CANCELLED");
    assert_eq!(attempt_status, "FAILED");
}

#[tokio::test]
async fn failure_record_is_skipped_when_showtime_cannot_be_resolved() {
    let Some(pool) = test_pool().await else { return };
    let core = core(pool.clone());

    let unknown_showtime = Uuid::new_v4();
    let order_id = format!("order_test_{}", Uuid::new_v4().simple());

    core.payments
        .record_failure(
            "user-1",
            verification(unknown_showtime, vec![Uuid::new_v4()], &order_id, "sig"),
        )
        .await
        .expect("unresolvable showtime must be swallowed on the audit path");

    let (attempts,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM payment_attempts WHERE external_order_id = $1",
    )
    .bind(&order_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(attempts, 0);
}

#[tokio::test]
async fn booking_on_unresolvable_showtime_fails_loudly() {
    let Some(pool) = test_pool().await else { return };
    let core = core(pool.clone());

    let unknown_showtime = Uuid::new_v4();
    let order_id = format!("order_test_{}", Uuid::new_v4().simple());
    let result = core
        .payments
        .verify_and_book(
            "user-1",
            verification(unknown_showtime, vec![Uuid::new_v4()], &order_id, "sig"),
        )
        .await;

    // Both remote paths are unreachable in tests.
    assert!(matches!(result, Err(LedgerError::UpstreamUnavailable(_))));
}

#[tokio::test]
async fn create_order_mints_a_gateway_handle() {
    let Some(pool) = test_pool().await else { return };
    let core = core(pool.clone());

    let handle = core
        .payments
        .create_order(&BigDecimal::from(450), "INR")
        .await
        .unwrap();
    assert!(handle.order_id.starts_with("order_"));
    assert_eq!(handle.key_id, TEST_KEY_ID);
}
