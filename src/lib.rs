pub mod config;
pub mod db;
pub mod error;
pub mod ports;
pub mod remote;
pub mod services;

use crate::config::Config;
use crate::ports::{
    HmacGateway, LogNotifier, NotificationPort, PaymentGatewayPort, PgSettings, SettingsPort,
};
use crate::remote::ShowtimeClient;
use crate::services::{BookingLedger, PaymentPipeline, SeatInventory, ShowtimeResolver};
use std::sync::Arc;

/// Wired-up core: the booking ledger, the payment pipeline, and the
/// showtime resolver sharing one pool and one set of collaborator ports.
#[derive(Clone)]
pub struct TicketCore {
    pub bookings: BookingLedger,
    pub payments: PaymentPipeline,
    pub showtimes: ShowtimeResolver,
}

impl TicketCore {
    /// Production wiring: settings from the database, log-only notifier,
    /// HMAC gateway, remote showtime client from config.
    pub fn new(pool: sqlx::PgPool, config: &Config) -> Self {
        let settings: Arc<dyn SettingsPort> = Arc::new(PgSettings::new(pool.clone()));
        let notifier: Arc<dyn NotificationPort> = Arc::new(LogNotifier);
        let gateway: Arc<dyn PaymentGatewayPort> = Arc::new(HmacGateway::new(
            config.payment_key_id.clone(),
            config.payment_key_secret.clone(),
        ));
        let client = ShowtimeClient::new(
            config.showtime_service_url.clone(),
            config.gateway_url.clone(),
        );
        Self::with_ports(pool, client, gateway, settings, notifier)
    }

    pub fn with_ports(
        pool: sqlx::PgPool,
        client: ShowtimeClient,
        gateway: Arc<dyn PaymentGatewayPort>,
        settings: Arc<dyn SettingsPort>,
        notifier: Arc<dyn NotificationPort>,
    ) -> Self {
        let inventory = SeatInventory::new();
        let showtimes = ShowtimeResolver::new(pool.clone(), client);
        let bookings = BookingLedger::new(
            pool.clone(),
            inventory.clone(),
            settings.clone(),
            notifier.clone(),
        );
        let payments = PaymentPipeline::new(
            pool,
            inventory,
            showtimes.clone(),
            gateway,
            settings,
            notifier,
        );
        Self {
            bookings,
            payments,
            showtimes,
        }
    }
}
