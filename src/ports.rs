//! Boundary traits for collaborators the core consults but never drives:
//! runtime settings, outbound notifications, and the payment gateway.

use crate::db::models::Booking;
use crate::db::queries;
use crate::error::LedgerError;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sqlx::PgPool;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_MAX_SEATS_PER_BOOKING: i32 = 10;
pub const DEFAULT_CANCELLATION_WINDOW_HOURS: i64 = 24;

#[async_trait]
pub trait SettingsPort: Send + Sync {
    async fn max_seats_per_booking(&self) -> i32;
    async fn cancellation_window_hours(&self) -> i64;
    async fn email_notifications_enabled(&self) -> bool;
    async fn site_notification_address(&self) -> String;
}

#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send_booking_confirmation(&self, booking: &Booking) -> anyhow::Result<()>;
    async fn send_cancellation_confirmation(&self, booking: &Booking) -> anyhow::Result<()>;
    async fn send_cancellation_request_alert(
        &self,
        booking: &Booking,
        reason: &str,
    ) -> anyhow::Result<()>;
}

/// Handle to an order created at the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHandle {
    pub order_id: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub key_id: String,
}

#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    /// Tag recorded as the booking's payment method.
    fn label(&self) -> &'static str;

    async fn create_remote_order(
        &self,
        amount: &BigDecimal,
        currency: &str,
    ) -> Result<OrderHandle, LedgerError>;

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// Settings backed by the key/value settings table, with fixed fallbacks when
/// a key is missing or the read fails. Settings reads must never take a
/// booking down with them.
#[derive(Clone)]
pub struct PgSettings {
    pool: PgPool,
}

impl PgSettings {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn get(&self, key: &str) -> Option<String> {
        match queries::get_setting(&self.pool, key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to read setting {}: {}", key, e);
                None
            }
        }
    }
}

#[async_trait]
impl SettingsPort for PgSettings {
    async fn max_seats_per_booking(&self) -> i32 {
        self.get("max_seats_per_booking")
            .await
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_SEATS_PER_BOOKING)
    }

    async fn cancellation_window_hours(&self) -> i64 {
        self.get("cancellation_window_hours")
            .await
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CANCELLATION_WINDOW_HOURS)
    }

    async fn email_notifications_enabled(&self) -> bool {
        self.get("email_notifications_enabled")
            .await
            .and_then(|v| v.parse().ok())
            .unwrap_or(true)
    }

    async fn site_notification_address(&self) -> String {
        self.get("site_notification_address")
            .await
            .unwrap_or_else(|| "admin@revticket.local".to_string())
    }
}

/// Fixed settings for tests and single-tenant deployments.
#[derive(Debug, Clone)]
pub struct StaticSettings {
    pub max_seats_per_booking: i32,
    pub cancellation_window_hours: i64,
    pub email_notifications_enabled: bool,
    pub site_notification_address: String,
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self {
            max_seats_per_booking: DEFAULT_MAX_SEATS_PER_BOOKING,
            cancellation_window_hours: DEFAULT_CANCELLATION_WINDOW_HOURS,
            email_notifications_enabled: true,
            site_notification_address: "admin@revticket.local".to_string(),
        }
    }
}

#[async_trait]
impl SettingsPort for StaticSettings {
    async fn max_seats_per_booking(&self) -> i32 {
        self.max_seats_per_booking
    }

    async fn cancellation_window_hours(&self) -> i64 {
        self.cancellation_window_hours
    }

    async fn email_notifications_enabled(&self) -> bool {
        self.email_notifications_enabled
    }

    async fn site_notification_address(&self) -> String {
        self.site_notification_address.clone()
    }
}

/// Notifier that only logs. Real delivery lives in another service; this
/// keeps the fire-and-forget call sites honest in tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn send_booking_confirmation(&self, booking: &Booking) -> anyhow::Result<()> {
        tracing::info!(
            "Booking confirmation for {} ({})",
            booking.ticket_number,
            booking.customer_email
        );
        Ok(())
    }

    async fn send_cancellation_confirmation(&self, booking: &Booking) -> anyhow::Result<()> {
        tracing::info!(
            "Cancellation confirmation for {} ({})",
            booking.ticket_number,
            booking.customer_email
        );
        Ok(())
    }

    async fn send_cancellation_request_alert(
        &self,
        booking: &Booking,
        reason: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(
            "Cancellation requested for {}: {}",
            booking.ticket_number,
            reason
        );
        Ok(())
    }
}

/// Gateway boundary that verifies callback signatures with HMAC-SHA256 over
/// `order_id|payment_id`, hex-encoded, using constant-time comparison.
#[derive(Clone)]
pub struct HmacGateway {
    key_id: String,
    key_secret: String,
}

impl HmacGateway {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self { key_id, key_secret }
    }

    /// Hex signature the gateway is expected to send for this order/payment.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Result<String, LedgerError> {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|_| LedgerError::Gateway("invalid signing secret".to_string()))?;
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl PaymentGatewayPort for HmacGateway {
    fn label(&self) -> &'static str {
        "RAZORPAY"
    }

    async fn create_remote_order(
        &self,
        amount: &BigDecimal,
        currency: &str,
    ) -> Result<OrderHandle, LedgerError> {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(14)
            .collect();
        Ok(OrderHandle {
            order_id: format!("order_{}", suffix),
            amount: amount.clone(),
            currency: currency.to_string(),
            key_id: self.key_id.clone(),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.key_secret.as_bytes()) else {
            return false;
        };
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> HmacGateway {
        HmacGateway::new("key_test".to_string(), "s3cret".to_string())
    }

    #[test]
    fn accepts_signature_it_minted() {
        let gateway = gateway();
        let signature = gateway.sign("order_abc", "pay_def").unwrap();
        assert!(gateway.verify_signature("order_abc", "pay_def", &signature));
    }

    #[test]
    fn rejects_signature_for_other_order() {
        let gateway = gateway();
        let signature = gateway.sign("order_abc", "pay_def").unwrap();
        assert!(!gateway.verify_signature("order_xyz", "pay_def", &signature));
    }

    #[test]
    fn rejects_non_hex_signature() {
        assert!(!gateway().verify_signature("order_abc", "pay_def", "not-hex!"));
    }

    #[tokio::test]
    async fn order_handle_carries_key_id() {
        let handle = gateway()
            .create_remote_order(&BigDecimal::from(500), "INR")
            .await
            .unwrap();
        assert!(handle.order_id.starts_with("order_"));
        assert_eq!(handle.key_id, "key_test");
        assert_eq!(handle.currency, "INR");
    }

    #[tokio::test]
    async fn static_settings_defaults_match_policy() {
        let settings = StaticSettings::default();
        assert_eq!(settings.max_seats_per_booking().await, 10);
        assert_eq!(settings.cancellation_window_hours().await, 24);
        assert!(settings.email_notifications_enabled().await);
    }
}
