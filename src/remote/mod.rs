pub mod showtime_client;

pub use showtime_client::{FetchError, MovieSummary, ShowtimeClient, ShowtimeSummary, TheaterSummary};
