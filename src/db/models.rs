use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Booking lifecycle states. CANCELLED is terminal.
pub mod booking_status {
    pub const CONFIRMED: &str = "CONFIRMED";
    pub const CANCELLATION_PENDING: &str = "CANCELLATION_PENDING";
    pub const CANCELLED: &str = "CANCELLED";
}

pub mod payment_status {
    pub const SUCCESS: &str = "SUCCESS";
    pub const FAILED: &str = "FAILED";
}

pub mod show_status {
    pub const ACTIVE: &str = "ACTIVE";
    pub const COMPLETED: &str = "COMPLETED";
    pub const CANCELLED: &str = "CANCELLED";
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Showtime {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    pub screen_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub ticket_price: BigDecimal,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub showtime_id: Uuid,
    pub seat_row: String,
    pub number: i32,
    pub price: BigDecimal,
    pub seat_type: String,
    pub booked: bool,
    pub held: bool,
    pub hold_expiry: Option<DateTime<Utc>>,
    pub holding_session_id: Option<String>,
}

impl Seat {
    /// Display label, e.g. "A12".
    pub fn label(&self) -> String {
        format!("{}{}", self.seat_row, self.number)
    }

    /// A seat is free when it is not booked and any hold on it has lapsed.
    /// Hold expiry is evaluated lazily at read time; there is no sweeper.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        if self.booked {
            return false;
        }
        if self.held {
            return self.hold_expiry.map_or(false, |expiry| expiry <= now);
        }
        true
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub showtime_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub seat_labels: Option<Vec<String>>,
    pub total_amount: BigDecimal,
    pub ticket_price_snapshot: Option<BigDecimal>,
    pub screen_name: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub payment_method: Option<String>,
    pub status: String,
    pub ticket_number: String,
    pub qr_code: String,
    pub payment_id: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub cancellation_requested_at: Option<DateTime<Utc>>,
    pub refund_amount: Option<BigDecimal>,
    pub refund_date: Option<DateTime<Utc>>,
    pub booking_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Booking {
    pub fn new(
        user_id: String,
        showtime_id: Uuid,
        seat_ids: Vec<Uuid>,
        seat_labels: Option<Vec<String>>,
        total_amount: BigDecimal,
        customer: CustomerInfo,
        payment_method: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            showtime_id,
            seat_ids,
            seat_labels,
            total_amount,
            ticket_price_snapshot: None,
            screen_name: None,
            customer_name: customer.name,
            customer_email: customer.email,
            customer_phone: customer.phone,
            payment_method,
            status: booking_status::CONFIRMED.to_string(),
            ticket_number: generate_ticket_number(),
            qr_code: format!("QR_{}", Uuid::new_v4()),
            payment_id: None,
            cancellation_reason: None,
            cancellation_requested_at: None,
            refund_amount: None,
            refund_date: None,
            booking_date: Utc::now(),
        }
    }
}

/// Ticket numbers look like "TKT3F9A01BC".
fn generate_ticket_number() -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    format!("TKT{}", suffix.to_uppercase())
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub external_order_id: String,
    pub external_payment_id: Option<String>,
    pub signature: Option<String>,
    pub amount: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn new(
        booking_id: Uuid,
        external_order_id: String,
        external_payment_id: Option<String>,
        signature: Option<String>,
        amount: BigDecimal,
        status: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            external_order_id,
            external_payment_id,
            signature,
            amount,
            status: status.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub language: Option<String>,
    pub duration_minutes: i32,
    pub poster_url: Option<String>,
    pub release_date: NaiveDate,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Theater {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub address: String,
    pub total_screens: Option<i32>,
}
