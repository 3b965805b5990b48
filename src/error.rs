use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Seat is no longer available: {0}")]
    SeatUnavailable(String),

    #[error("Maximum {max} seats can be booked at once")]
    CapacityExceeded { max: i32 },

    #[error("Cannot book tickets for past showtimes")]
    PastShowtime,

    #[error("Cancellation not allowed. Must cancel at least {required_hours} hours before showtime")]
    CancellationWindowViolation { required_hours: i64 },

    #[error("Invalid payment signature")]
    InvalidSignature,

    #[error("Showtime authority unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_error_names_the_limit() {
        let error = LedgerError::CapacityExceeded { max: 10 };
        assert_eq!(error.to_string(), "Maximum 10 seats can be booked at once");
    }

    #[test]
    fn window_error_names_the_threshold() {
        let error = LedgerError::CancellationWindowViolation { required_hours: 24 };
        assert!(error.to_string().contains("24 hours"));
    }

    #[test]
    fn seat_unavailable_names_the_seat() {
        let error = LedgerError::SeatUnavailable("A12".to_string());
        assert_eq!(error.to_string(), "Seat is no longer available: A12");
    }

    #[test]
    fn database_error_wraps_sqlx() {
        let error = LedgerError::from(sqlx::Error::RowNotFound);
        assert!(matches!(error, LedgerError::Database(_)));
    }
}
