pub mod booking_ledger;
pub mod payment_pipeline;
pub mod seat_inventory;
pub mod showtime_resolver;

pub use booking_ledger::{BookingLedger, CreateBookingRequest};
pub use payment_pipeline::{PaymentPipeline, VerificationRequest};
pub use seat_inventory::SeatInventory;
pub use showtime_resolver::{Resolved, ShowtimeResolver};
