use crate::db::models::{Booking, Movie, PaymentAttempt, Seat, Showtime, Theater};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Result, Transaction as SqlxTransaction};
use uuid::Uuid;

// --- Showtime queries ---

pub async fn get_showtime(pool: &PgPool, id: Uuid) -> Result<Option<Showtime>> {
    sqlx::query_as::<_, Showtime>("SELECT * FROM showtimes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_showtime_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Showtime>> {
    sqlx::query_as::<_, Showtime>("SELECT * FROM showtimes WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn insert_showtime(
    executor: &mut SqlxTransaction<'_, Postgres>,
    showtime: &Showtime,
) -> Result<Showtime> {
    sqlx::query_as::<_, Showtime>(
        r#"
        INSERT INTO showtimes (
            id, movie_id, theater_id, screen_id, start_time,
            ticket_price, total_seats, available_seats, status
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE SET
            screen_id = EXCLUDED.screen_id,
            start_time = EXCLUDED.start_time,
            ticket_price = EXCLUDED.ticket_price,
            status = EXCLUDED.status
        RETURNING *
        "#,
    )
    .bind(showtime.id)
    .bind(showtime.movie_id)
    .bind(showtime.theater_id)
    .bind(&showtime.screen_id)
    .bind(showtime.start_time)
    .bind(&showtime.ticket_price)
    .bind(showtime.total_seats)
    .bind(showtime.available_seats)
    .bind(&showtime.status)
    .fetch_one(&mut **executor)
    .await
}

/// Decrement the availability counter, floored at zero.
pub async fn decrement_available_seats(
    executor: &mut SqlxTransaction<'_, Postgres>,
    showtime_id: Uuid,
    count: i32,
) -> Result<()> {
    sqlx::query("UPDATE showtimes SET available_seats = GREATEST(available_seats - $2, 0) WHERE id = $1")
        .bind(showtime_id)
        .bind(count)
        .execute(&mut **executor)
        .await?;
    Ok(())
}

pub async fn increment_available_seats(
    executor: &mut SqlxTransaction<'_, Postgres>,
    showtime_id: Uuid,
    count: i32,
) -> Result<()> {
    sqlx::query("UPDATE showtimes SET available_seats = available_seats + $2 WHERE id = $1")
        .bind(showtime_id)
        .bind(count)
        .execute(&mut **executor)
        .await?;
    Ok(())
}

// --- Seat queries ---

/// Lock the requested seat rows for the duration of the transaction.
/// Reservation decisions must only be made against rows locked here.
/// Locks are taken in id order so overlapping lockers cannot deadlock.
pub async fn seats_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    showtime_id: Uuid,
    seat_ids: &[Uuid],
) -> Result<Vec<Seat>> {
    sqlx::query_as::<_, Seat>(
        "SELECT * FROM seats WHERE showtime_id = $1 AND id = ANY($2) ORDER BY id FOR UPDATE",
    )
    .bind(showtime_id)
    .bind(seat_ids)
    .fetch_all(&mut **executor)
    .await
}

pub async fn mark_seats_booked(
    executor: &mut SqlxTransaction<'_, Postgres>,
    showtime_id: Uuid,
    seat_ids: &[Uuid],
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE seats
        SET booked = TRUE, held = FALSE, hold_expiry = NULL, holding_session_id = NULL
        WHERE showtime_id = $1 AND id = ANY($2)
        "#,
    )
    .bind(showtime_id)
    .bind(seat_ids)
    .execute(&mut **executor)
    .await?;
    Ok(())
}

/// Free seats that are currently booked. Returns how many rows actually
/// flipped, so the caller can keep the availability counter honest when a
/// release is replayed against already-free seats.
pub async fn free_booked_seats(
    executor: &mut SqlxTransaction<'_, Postgres>,
    showtime_id: Uuid,
    seat_ids: &[Uuid],
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE seats
        SET booked = FALSE, held = FALSE, hold_expiry = NULL, holding_session_id = NULL
        WHERE showtime_id = $1 AND id = ANY($2) AND booked = TRUE
        "#,
    )
    .bind(showtime_id)
    .bind(seat_ids)
    .execute(&mut **executor)
    .await?;
    Ok(result.rows_affected())
}

// --- Booking queries ---

pub async fn insert_booking(
    executor: &mut SqlxTransaction<'_, Postgres>,
    booking: &Booking,
) -> Result<Booking> {
    sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (
            id, user_id, showtime_id, seat_ids, seat_labels, total_amount,
            ticket_price_snapshot, screen_name, customer_name, customer_email,
            customer_phone, payment_method, status, ticket_number, qr_code,
            payment_id, cancellation_reason, cancellation_requested_at,
            refund_amount, refund_date, booking_date
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
            $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
        )
        RETURNING *
        "#,
    )
    .bind(booking.id)
    .bind(&booking.user_id)
    .bind(booking.showtime_id)
    .bind(&booking.seat_ids)
    .bind(&booking.seat_labels)
    .bind(&booking.total_amount)
    .bind(&booking.ticket_price_snapshot)
    .bind(&booking.screen_name)
    .bind(&booking.customer_name)
    .bind(&booking.customer_email)
    .bind(&booking.customer_phone)
    .bind(&booking.payment_method)
    .bind(&booking.status)
    .bind(&booking.ticket_number)
    .bind(&booking.qr_code)
    .bind(booking.payment_id)
    .bind(&booking.cancellation_reason)
    .bind(booking.cancellation_requested_at)
    .bind(&booking.refund_amount)
    .bind(booking.refund_date)
    .bind(booking.booking_date)
    .fetch_one(&mut **executor)
    .await
}

pub async fn get_booking(pool: &PgPool, id: Uuid) -> Result<Option<Booking>> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_booking_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Booking>> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn list_bookings_by_user(pool: &PgPool, user_id: &str) -> Result<Vec<Booking>> {
    sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE user_id = $1 ORDER BY booking_date DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_bookings_by_status(pool: &PgPool, status: &str) -> Result<Vec<Booking>> {
    sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE status = $1 ORDER BY booking_date DESC",
    )
    .bind(status)
    .fetch_all(pool)
    .await
}

pub async fn list_all_bookings(pool: &PgPool) -> Result<Vec<Booking>> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY booking_date DESC")
        .fetch_all(pool)
        .await
}

pub async fn mark_cancellation_requested(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    reason: &str,
    requested_at: DateTime<Utc>,
) -> Result<Booking> {
    sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET status = 'CANCELLATION_PENDING', cancellation_reason = $2,
            cancellation_requested_at = $3
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(reason)
    .bind(requested_at)
    .fetch_one(&mut **executor)
    .await
}

pub async fn mark_cancelled(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    reason: Option<&str>,
    refund_amount: &BigDecimal,
    refund_date: DateTime<Utc>,
) -> Result<Booking> {
    sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET status = 'CANCELLED',
            cancellation_reason = COALESCE($2, cancellation_reason),
            refund_amount = $3, refund_date = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(reason)
    .bind(refund_amount)
    .bind(refund_date)
    .fetch_one(&mut **executor)
    .await
}

pub async fn set_booking_status(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    status: &str,
) -> Result<Booking> {
    sqlx::query_as::<_, Booking>("UPDATE bookings SET status = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(status)
        .fetch_one(&mut **executor)
        .await
}

/// Replace the seat list. Labels are cleared since they describe the old seats.
pub async fn update_booking_seats(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    seat_ids: &[Uuid],
) -> Result<Booking> {
    sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET seat_ids = $2, seat_labels = NULL WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(seat_ids)
    .fetch_one(&mut **executor)
    .await
}

pub async fn delete_booking(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<()> {
    sqlx::query("DELETE FROM payment_attempts WHERE booking_id = $1")
        .bind(id)
        .execute(&mut **executor)
        .await?;
    sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(&mut **executor)
        .await?;
    Ok(())
}

// --- Payment attempt queries ---

pub async fn find_successful_attempt(
    pool: &PgPool,
    external_order_id: &str,
) -> Result<Option<PaymentAttempt>> {
    sqlx::query_as::<_, PaymentAttempt>(
        "SELECT * FROM payment_attempts WHERE external_order_id = $1 AND status = 'SUCCESS'",
    )
    .bind(external_order_id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_payment_attempt(
    executor: &mut SqlxTransaction<'_, Postgres>,
    attempt: &PaymentAttempt,
) -> Result<PaymentAttempt> {
    sqlx::query_as::<_, PaymentAttempt>(
        r#"
        INSERT INTO payment_attempts (
            id, booking_id, external_order_id, external_payment_id,
            signature, amount, status, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(attempt.id)
    .bind(attempt.booking_id)
    .bind(&attempt.external_order_id)
    .bind(&attempt.external_payment_id)
    .bind(&attempt.signature)
    .bind(&attempt.amount)
    .bind(&attempt.status)
    .bind(attempt.created_at)
    .fetch_one(&mut **executor)
    .await
}

// --- Movie / theater / screen queries ---

pub async fn get_movie(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Movie>> {
    sqlx::query_as::<_, Movie>("SELECT * FROM movies WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn insert_movie(
    executor: &mut SqlxTransaction<'_, Postgres>,
    movie: &Movie,
) -> Result<Movie> {
    sqlx::query_as::<_, Movie>(
        r#"
        INSERT INTO movies (id, title, language, duration_minutes, poster_url, release_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title
        RETURNING *
        "#,
    )
    .bind(movie.id)
    .bind(&movie.title)
    .bind(&movie.language)
    .bind(movie.duration_minutes)
    .bind(&movie.poster_url)
    .bind(movie.release_date)
    .fetch_one(&mut **executor)
    .await
}

pub async fn get_theater(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Theater>> {
    sqlx::query_as::<_, Theater>("SELECT * FROM theaters WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn insert_theater(
    executor: &mut SqlxTransaction<'_, Postgres>,
    theater: &Theater,
) -> Result<Theater> {
    sqlx::query_as::<_, Theater>(
        r#"
        INSERT INTO theaters (id, name, location, address, total_screens)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
        RETURNING *
        "#,
    )
    .bind(theater.id)
    .bind(&theater.name)
    .bind(&theater.location)
    .bind(&theater.address)
    .bind(theater.total_screens)
    .fetch_one(&mut **executor)
    .await
}

pub async fn get_screen_name(
    executor: &mut SqlxTransaction<'_, Postgres>,
    screen_id: &str,
) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT name FROM screens WHERE id = $1")
        .bind(screen_id)
        .fetch_optional(&mut **executor)
        .await?;
    Ok(row.map(|(name,)| name))
}

// --- Settings queries ---

pub async fn get_setting(pool: &PgPool, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(value,)| value))
}
