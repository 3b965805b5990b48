#![allow(dead_code)]

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use ticket_ledger::db::models::CustomerInfo;
use ticket_ledger::ports::{HmacGateway, LogNotifier, StaticSettings};
use ticket_ledger::remote::ShowtimeClient;
use ticket_ledger::TicketCore;
use uuid::Uuid;

pub const TEST_KEY_ID: &str = "key_test";
pub const TEST_KEY_SECRET: &str = "secret_test";

/// Connect to the test database, or skip the test when DATABASE_URL is not
/// configured in the environment.
pub async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping DB-backed test");
        return None;
    };
    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to test DB");
    let migrator = Migrator::new(Path::new("./migrations"))
        .await
        .expect("Failed to load migrations");
    migrator
        .run(&pool)
        .await
        .expect("Failed to run migrations on test DB");
    Some(pool)
}

pub fn core(pool: PgPool) -> TicketCore {
    core_with(pool, StaticSettings::default(), unreachable_urls())
}

pub fn core_with(pool: PgPool, settings: StaticSettings, urls: (String, String)) -> TicketCore {
    TicketCore::with_ports(
        pool,
        ShowtimeClient::new(urls.0, urls.1),
        Arc::new(HmacGateway::new(
            TEST_KEY_ID.to_string(),
            TEST_KEY_SECRET.to_string(),
        )),
        Arc::new(settings),
        Arc::new(LogNotifier),
    )
}

/// Endpoints no test server listens on, for tests that must stay local.
pub fn unreachable_urls() -> (String, String) {
    (
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1".to_string(),
    )
}

/// Insert a showtime with `total_seats` free seats. Returns the showtime id
/// and the seat ids in row order.
pub async fn seed_showtime(
    pool: &PgPool,
    start_time: DateTime<Utc>,
    total_seats: i32,
) -> (Uuid, Vec<Uuid>) {
    let showtime_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO showtimes (
            id, movie_id, theater_id, screen_id, start_time,
            ticket_price, total_seats, available_seats, status
        ) VALUES ($1, $2, $3, NULL, $4, $5, $6, $6, 'ACTIVE')
        "#,
    )
    .bind(showtime_id)
    .bind(Uuid::new_v4())
    .bind(Uuid::new_v4())
    .bind(start_time)
    .bind(BigDecimal::from(150))
    .bind(total_seats)
    .execute(pool)
    .await
    .expect("Failed to seed showtime");

    let mut seat_ids = Vec::with_capacity(total_seats as usize);
    for number in 1..=total_seats {
        let seat_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO seats (id, showtime_id, seat_row, number, price, seat_type)
            VALUES ($1, $2, 'A', $3, $4, 'REGULAR')
            "#,
        )
        .bind(seat_id)
        .bind(showtime_id)
        .bind(number)
        .bind(BigDecimal::from(150))
        .execute(pool)
        .await
        .expect("Failed to seed seat");
        seat_ids.push(seat_id);
    }

    (showtime_id, seat_ids)
}

pub async fn available_seats(pool: &PgPool, showtime_id: Uuid) -> i32 {
    let (available,): (i32,) =
        sqlx::query_as("SELECT available_seats FROM showtimes WHERE id = $1")
            .bind(showtime_id)
            .fetch_one(pool)
            .await
            .expect("Failed to read available_seats");
    available
}

pub async fn booked_seat_count(pool: &PgPool, showtime_id: Uuid) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM seats WHERE showtime_id = $1 AND booked")
            .bind(showtime_id)
            .fetch_one(pool)
            .await
            .expect("Failed to count booked seats");
    count
}

/// The availability invariant: available == total - booked.
pub async fn assert_seat_invariant(pool: &PgPool, showtime_id: Uuid) {
    let (total,): (i32,) = sqlx::query_as("SELECT total_seats FROM showtimes WHERE id = $1")
        .bind(showtime_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read total_seats");
    let booked = booked_seat_count(pool, showtime_id).await as i32;
    let available = available_seats(pool, showtime_id).await;
    assert_eq!(
        available,
        total - booked,
        "available_seats must equal total minus booked"
    );
}

pub async fn booking_count_for_showtime(pool: &PgPool, showtime_id: Uuid) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE showtime_id = $1")
            .bind(showtime_id)
            .fetch_one(pool)
            .await
            .expect("Failed to count bookings");
    count
}

pub fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Asha Rao".to_string(),
        email: "asha@example.com".to_string(),
        phone: "9999900000".to_string(),
    }
}
