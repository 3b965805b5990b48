use crate::db::models::{booking_status, Booking, CustomerInfo};
use crate::db::queries;
use crate::error::LedgerError;
use crate::ports::{NotificationPort, SettingsPort};
use crate::services::seat_inventory::SeatInventory;
use bigdecimal::BigDecimal;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub showtime_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub seat_labels: Option<Vec<String>>,
    pub total_amount: BigDecimal,
    pub customer: CustomerInfo,
}

/// Refund policy: fixed 10% cancellation fee, computed in decimal so the
/// result is exact.
pub fn refund_for(total: &BigDecimal) -> BigDecimal {
    total * BigDecimal::from(9) / BigDecimal::from(10)
}

/// Owns the booking lifecycle: CONFIRMED -> CANCELLATION_PENDING ->
/// CANCELLED, with a direct administrative CONFIRMED -> CANCELLED edge.
/// Seat commitment and the booking row always share one transaction.
#[derive(Clone)]
pub struct BookingLedger {
    pool: PgPool,
    inventory: SeatInventory,
    settings: Arc<dyn SettingsPort>,
    notifier: Arc<dyn NotificationPort>,
}

impl BookingLedger {
    pub fn new(
        pool: PgPool,
        inventory: SeatInventory,
        settings: Arc<dyn SettingsPort>,
        notifier: Arc<dyn NotificationPort>,
    ) -> Self {
        Self {
            pool,
            inventory,
            settings,
            notifier,
        }
    }

    pub async fn create_booking(
        &self,
        user_id: &str,
        request: CreateBookingRequest,
    ) -> Result<Booking, LedgerError> {
        if request.seat_ids.is_empty() {
            return Err(LedgerError::InvalidState("No seats selected".to_string()));
        }
        if let Some(labels) = &request.seat_labels {
            if labels.len() != request.seat_ids.len() {
                return Err(LedgerError::InvalidState(
                    "Seat labels do not match selected seats".to_string(),
                ));
            }
        }

        let max_seats = self.settings.max_seats_per_booking().await;
        if request.seat_ids.len() > max_seats as usize {
            return Err(LedgerError::CapacityExceeded { max: max_seats });
        }

        let mut tx = self.pool.begin().await?;

        let showtime = queries::get_showtime_for_update(&mut tx, request.showtime_id)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("Showtime not found: {}", request.showtime_id))
            })?;
        if showtime.start_time < Utc::now() {
            return Err(LedgerError::PastShowtime);
        }

        self.inventory
            .reserve_seats(&mut tx, showtime.id, &request.seat_ids)
            .await?;

        let screen_name = screen_display_name(&mut tx, showtime.screen_id.as_deref()).await?;

        let mut booking = Booking::new(
            user_id.to_string(),
            showtime.id,
            request.seat_ids,
            request.seat_labels,
            request.total_amount,
            request.customer,
            Some("ONLINE".to_string()),
        );
        booking.ticket_price_snapshot = Some(showtime.ticket_price.clone());
        booking.screen_name = Some(screen_name);

        let saved = queries::insert_booking(&mut tx, &booking).await?;
        tx.commit().await?;

        tracing::info!(
            "Booking {} confirmed for showtime {} ({} seats)",
            saved.ticket_number,
            saved.showtime_id,
            saved.seat_ids.len()
        );

        if self.settings.email_notifications_enabled().await {
            if let Err(e) = self.notifier.send_booking_confirmation(&saved).await {
                tracing::error!("Failed to send booking confirmation: {}", e);
            }
        }

        Ok(saved)
    }

    /// A customer asks to cancel. Seats stay committed until an administrator
    /// decides via `cancel_booking`.
    pub async fn request_cancellation(
        &self,
        booking_id: Uuid,
        reason: &str,
    ) -> Result<Booking, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;

        if booking.status != booking_status::CONFIRMED {
            return Err(LedgerError::InvalidState(
                "Only confirmed bookings can request cancellation".to_string(),
            ));
        }

        let showtime = queries::get_showtime(&self.pool, booking.showtime_id)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("Showtime not found: {}", booking.showtime_id))
            })?;

        let required_hours = self.settings.cancellation_window_hours().await;
        let hours_until_show = (showtime.start_time - Utc::now()).num_hours();
        if hours_until_show < required_hours {
            return Err(LedgerError::CancellationWindowViolation { required_hours });
        }

        let updated =
            queries::mark_cancellation_requested(&mut tx, booking_id, reason, Utc::now()).await?;
        tx.commit().await?;

        if self.settings.email_notifications_enabled().await {
            if let Err(e) = self
                .notifier
                .send_cancellation_request_alert(&updated, reason)
                .await
            {
                tracing::error!("Failed to send cancellation request alert: {}", e);
            }
        }

        Ok(updated)
    }

    /// Administrative cancel, allowed from any non-terminal state. Releases
    /// the booking's seats and stamps the 90% refund.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Booking, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;

        if booking.status == booking_status::CANCELLED {
            return Err(LedgerError::InvalidState(
                "Booking is already cancelled".to_string(),
            ));
        }

        self.inventory
            .release_seats(&mut tx, booking.showtime_id, &booking.seat_ids)
            .await?;

        let refund = refund_for(&booking.total_amount);
        let reason = reason.filter(|r| !r.is_empty());
        let updated =
            queries::mark_cancelled(&mut tx, booking_id, reason, &refund, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(
            "Booking {} cancelled, refunding {}",
            updated.ticket_number,
            refund
        );

        if self.settings.email_notifications_enabled().await {
            if let Err(e) = self.notifier.send_cancellation_confirmation(&updated).await {
                tracing::error!("Failed to send cancellation confirmation: {}", e);
            }
        }

        Ok(updated)
    }

    /// Administrative cleanup. Frees the seats and removes the record,
    /// bypassing the state machine.
    pub async fn delete_booking(&self, booking_id: Uuid) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;

        self.inventory
            .release_seats(&mut tx, booking.showtime_id, &booking.seat_ids)
            .await?;
        queries::delete_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        tracing::info!("Booking {} deleted", booking_id);
        Ok(())
    }

    /// Swap the booking onto a new seat set. The old seats remain committed
    /// unless the whole reassignment succeeds.
    pub async fn resign_booking(
        &self,
        booking_id: Uuid,
        new_seat_ids: &[Uuid],
    ) -> Result<Booking, LedgerError> {
        if new_seat_ids.is_empty() {
            return Err(LedgerError::InvalidState("No seats selected".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;

        if booking.status == booking_status::CANCELLED {
            return Err(LedgerError::InvalidState(
                "Cannot reassign seats for cancelled booking".to_string(),
            ));
        }

        self.inventory
            .reassign_seats(&mut tx, booking.showtime_id, &booking.seat_ids, new_seat_ids)
            .await?;

        let updated = queries::update_booking_seats(&mut tx, booking_id, new_seat_ids).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Entry-gate check-in. Re-asserts CONFIRMED; a cancelled ticket is
    /// always rejected.
    pub async fn scan(&self, booking_id: Uuid) -> Result<Booking, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let booking = fetch_booking(&mut tx, booking_id).await?;

        if booking.status == booking_status::CANCELLED {
            return Err(LedgerError::InvalidState(
                "Cannot scan cancelled booking".to_string(),
            ));
        }

        let updated =
            queries::set_booking_status(&mut tx, booking_id, booking_status::CONFIRMED).await?;
        tx.commit().await?;

        Ok(updated)
    }

    pub async fn booking(&self, booking_id: Uuid) -> Result<Booking, LedgerError> {
        queries::get_booking(&self.pool, booking_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Booking not found: {}", booking_id)))
    }

    pub async fn user_bookings(&self, user_id: &str) -> Result<Vec<Booking>, LedgerError> {
        Ok(queries::list_bookings_by_user(&self.pool, user_id).await?)
    }

    pub async fn cancellation_requests(&self) -> Result<Vec<Booking>, LedgerError> {
        Ok(queries::list_bookings_by_status(&self.pool, booking_status::CANCELLATION_PENDING)
            .await?)
    }

    pub async fn all_bookings(&self) -> Result<Vec<Booking>, LedgerError> {
        Ok(queries::list_all_bookings(&self.pool).await?)
    }
}

async fn fetch_booking(
    tx: &mut SqlxTransaction<'_, Postgres>,
    booking_id: Uuid,
) -> Result<Booking, LedgerError> {
    queries::get_booking_for_update(tx, booking_id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("Booking not found: {}", booking_id)))
}

pub(crate) async fn screen_display_name(
    tx: &mut SqlxTransaction<'_, Postgres>,
    screen_id: Option<&str>,
) -> Result<String, LedgerError> {
    let Some(screen_id) = screen_id.filter(|s| !s.is_empty()) else {
        return Ok("Screen".to_string());
    };
    let name = queries::get_screen_name(tx, screen_id)
        .await?
        .unwrap_or_else(|| screen_id.to_string());
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn refund_is_ninety_percent_exact() {
        let total = BigDecimal::from(450);
        assert_eq!(refund_for(&total), BigDecimal::from(405));
    }

    #[test]
    fn refund_keeps_decimal_precision() {
        let total = BigDecimal::from_str("333.33").unwrap();
        assert_eq!(refund_for(&total), BigDecimal::from_str("299.997").unwrap());
    }

    #[test]
    fn refund_of_zero_is_zero() {
        assert_eq!(refund_for(&BigDecimal::from(0)), BigDecimal::from(0));
    }
}
