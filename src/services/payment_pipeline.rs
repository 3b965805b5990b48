use crate::db::models::{booking_status, payment_status, Booking, CustomerInfo, PaymentAttempt};
use crate::db::queries;
use crate::error::LedgerError;
use crate::ports::{NotificationPort, OrderHandle, PaymentGatewayPort, SettingsPort};
use crate::services::booking_ledger::screen_display_name;
use crate::services::seat_inventory::SeatInventory;
use crate::services::showtime_resolver::ShowtimeResolver;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Payment callback fields plus the booking the customer was paying for.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub external_order_id: String,
    pub external_payment_id: String,
    pub signature: String,
    pub showtime_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub seat_labels: Option<Vec<String>>,
    pub total_amount: BigDecimal,
    pub customer: CustomerInfo,
}

/// Sentinel prefixes that mark an integration-test callback; signature
/// verification is skipped for these.
pub fn is_test_mode(order_id: &str, signature: &str) -> bool {
    signature.starts_with("test_")
        || order_id.starts_with("order_test")
        || order_id.starts_with("order_Mock")
}

/// Drives an external payment callback to a confirmed booking, idempotently.
/// The external order id is the idempotency key: a callback whose order
/// already has a SUCCESS attempt on file returns the existing booking without
/// touching inventory.
#[derive(Clone)]
pub struct PaymentPipeline {
    pool: PgPool,
    inventory: SeatInventory,
    resolver: ShowtimeResolver,
    gateway: Arc<dyn PaymentGatewayPort>,
    settings: Arc<dyn SettingsPort>,
    notifier: Arc<dyn NotificationPort>,
}

impl PaymentPipeline {
    pub fn new(
        pool: PgPool,
        inventory: SeatInventory,
        resolver: ShowtimeResolver,
        gateway: Arc<dyn PaymentGatewayPort>,
        settings: Arc<dyn SettingsPort>,
        notifier: Arc<dyn NotificationPort>,
    ) -> Self {
        Self {
            pool,
            inventory,
            resolver,
            gateway,
            settings,
            notifier,
        }
    }

    /// Pass-through to the gateway; no local state beyond the log line.
    pub async fn create_order(
        &self,
        amount: &BigDecimal,
        currency: &str,
    ) -> Result<OrderHandle, LedgerError> {
        let handle = self.gateway.create_remote_order(amount, currency).await?;
        tracing::info!(
            "Created payment order {} for {} {}",
            handle.order_id,
            amount,
            currency
        );
        Ok(handle)
    }

    pub async fn verify_and_book(
        &self,
        user_id: &str,
        request: VerificationRequest,
    ) -> Result<Booking, LedgerError> {
        // Idempotency lookup comes first: a replayed callback for an order
        // that already succeeded is a successful no-op.
        if let Some(attempt) =
            queries::find_successful_attempt(&self.pool, &request.external_order_id).await?
        {
            tracing::info!(
                "Payment for order {} already processed, returning booking {}",
                request.external_order_id,
                attempt.booking_id
            );
            return queries::get_booking(&self.pool, attempt.booking_id)
                .await?
                .ok_or_else(|| {
                    LedgerError::NotFound(format!("Booking not found: {}", attempt.booking_id))
                });
        }

        if is_test_mode(&request.external_order_id, &request.signature) {
            tracing::info!(
                "Test mode: skipping signature verification for order {}",
                request.external_order_id
            );
        } else if !self.gateway.verify_signature(
            &request.external_order_id,
            &request.external_payment_id,
            &request.signature,
        ) {
            tracing::warn!(
                "Invalid payment signature for order {}",
                request.external_order_id
            );
            return Err(LedgerError::InvalidSignature);
        }

        if request.seat_ids.is_empty() {
            return Err(LedgerError::InvalidState("No seats selected".to_string()));
        }

        // Strict path: an unresolvable showtime fails the booking.
        let resolved = self.resolver.resolve(request.showtime_id).await?;
        let showtime_id = resolved.showtime().id;

        let mut tx = self.pool.begin().await?;
        let showtime = queries::get_showtime_for_update(&mut tx, showtime_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Showtime not found: {}", showtime_id)))?;

        self.inventory
            .reserve_seats(&mut tx, showtime.id, &request.seat_ids)
            .await?;

        let screen_name = screen_display_name(&mut tx, showtime.screen_id.as_deref()).await?;

        let mut booking = Booking::new(
            user_id.to_string(),
            showtime.id,
            request.seat_ids.clone(),
            request.seat_labels.clone(),
            request.total_amount.clone(),
            request.customer.clone(),
            Some(self.gateway.label().to_string()),
        );
        booking.ticket_price_snapshot = Some(showtime.ticket_price.clone());
        booking.screen_name = Some(screen_name);

        let attempt = PaymentAttempt::new(
            booking.id,
            request.external_order_id.clone(),
            Some(request.external_payment_id.clone()),
            Some(request.signature.clone()),
            request.total_amount.clone(),
            payment_status::SUCCESS,
        );
        booking.payment_id = Some(attempt.id);

        let saved = queries::insert_booking(&mut tx, &booking).await?;
        queries::insert_payment_attempt(&mut tx, &attempt).await?;
        tx.commit().await?;

        tracing::info!(
            "Payment verified for order {}, booking {} confirmed",
            request.external_order_id,
            saved.ticket_number
        );

        if self.settings.email_notifications_enabled().await {
            if let Err(e) = self.notifier.send_booking_confirmation(&saved).await {
                tracing::error!("Failed to send booking confirmation: {}", e);
            }
        }

        Ok(saved)
    }

    /// Audit-only path for a failed payment: a CANCELLED booking shell plus a
    /// FAILED attempt. Never reserves seats. If the showtime cannot be
    /// resolved the record is skipped, not raised.
    pub async fn record_failure(
        &self,
        user_id: &str,
        request: VerificationRequest,
    ) -> Result<(), LedgerError> {
        let resolved = match self.resolver.resolve(request.showtime_id).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(
                    "Skipping failure record for order {}: showtime unresolved ({})",
                    request.external_order_id,
                    e
                );
                return Ok(());
            }
        };
        let showtime = resolved.into_showtime();

        let mut tx = self.pool.begin().await?;

        let mut booking = Booking::new(
            user_id.to_string(),
            showtime.id,
            request.seat_ids,
            request.seat_labels,
            request.total_amount.clone(),
            request.customer,
            Some(self.gateway.label().to_string()),
        );
        booking.status = booking_status::CANCELLED.to_string();

        let attempt = PaymentAttempt::new(
            booking.id,
            request.external_order_id.clone(),
            Some(request.external_payment_id),
            None,
            request.total_amount,
            payment_status::FAILED,
        );

        queries::insert_booking(&mut tx, &booking).await?;
        queries::insert_payment_attempt(&mut tx, &attempt).await?;
        tx.commit().await?;

        tracing::info!(
            "Recorded failed payment attempt for order {}",
            request.external_order_id
        );
        Ok(())
    }
}
