use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Showtime not found: {0}")]
    NotFound(Uuid),
    #[error("Showtime fetch failed: {0}")]
    Unavailable(String),
}

/// Showtime summary as served by the showtime authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeSummary {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    pub screen: Option<String>,
    pub show_date_time: DateTime<Utc>,
    pub ticket_price: BigDecimal,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: Option<String>,
    pub movie: Option<MovieSummary>,
    pub theater: Option<TheaterSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSummary {
    pub title: Option<String>,
    pub language: Option<String>,
    pub duration: Option<i32>,
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TheaterSummary {
    pub name: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub total_screens: Option<i32>,
}

/// HTTP client for the remote showtime authority. The service-discovery
/// endpoint is tried first behind a circuit breaker; the API gateway is the
/// fallback path.
#[derive(Clone)]
pub struct ShowtimeClient {
    client: Client,
    service_url: String,
    gateway_url: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl ShowtimeClient {
    pub fn new(service_url: String, gateway_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(Duration::from_secs(30), Duration::from_secs(60));
        let policy = failure_policy::consecutive_failures(3, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        ShowtimeClient {
            client,
            service_url,
            gateway_url,
            circuit_breaker,
        }
    }

    /// Fetch a showtime summary, trying service discovery first and the
    /// gateway second. `NotFound` is returned only when an endpoint actually
    /// answered 404; transport failures on both paths are `Unavailable`.
    pub async fn fetch_summary(&self, showtime_id: Uuid) -> Result<ShowtimeSummary, FetchError> {
        let mut saw_not_found = false;
        let mut failures = Vec::new();

        let primary = self.fetch_from_service(showtime_id).await;
        match primary {
            Ok(summary) => return Ok(summary),
            Err(FailsafeError::Rejected) => {
                tracing::warn!(
                    "Showtime service circuit breaker open, falling back to gateway for {}",
                    showtime_id
                );
                failures.push("showtime-service circuit breaker open".to_string());
            }
            Err(FailsafeError::Inner(FetchError::NotFound(_))) => {
                tracing::warn!("Showtime {} not found via service discovery", showtime_id);
                saw_not_found = true;
            }
            Err(FailsafeError::Inner(FetchError::Unavailable(reason))) => {
                tracing::warn!(
                    "Service discovery failed for showtime {}: {}",
                    showtime_id,
                    reason
                );
                failures.push(reason);
            }
        }

        match self.fetch_from(&self.gateway_url, showtime_id).await {
            Ok(summary) => {
                tracing::info!("Fetched showtime {} via gateway fallback", showtime_id);
                Ok(summary)
            }
            Err(FetchError::NotFound(id)) => Err(FetchError::NotFound(id)),
            Err(FetchError::Unavailable(reason)) => {
                tracing::warn!(
                    "Gateway fallback failed for showtime {}: {}",
                    showtime_id,
                    reason
                );
                if saw_not_found {
                    Err(FetchError::NotFound(showtime_id))
                } else {
                    failures.push(reason);
                    Err(FetchError::Unavailable(failures.join("; ")))
                }
            }
        }
    }

    async fn fetch_from_service(
        &self,
        showtime_id: Uuid,
    ) -> Result<ShowtimeSummary, FailsafeError<FetchError>> {
        let fut = self.fetch_from(&self.service_url, showtime_id);
        self.circuit_breaker.call(fut).await
    }

    async fn fetch_from(
        &self,
        base_url: &str,
        showtime_id: Uuid,
    ) -> Result<ShowtimeSummary, FetchError> {
        let url = format!(
            "{}/api/showtimes/{}",
            base_url.trim_end_matches('/'),
            showtime_id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;

        if response.status() == 404 {
            return Err(FetchError::NotFound(showtime_id));
        }
        if !response.status().is_success() {
            return Err(FetchError::Unavailable(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        response
            .json::<ShowtimeSummary>()
            .await
            .map_err(|e| FetchError::Unavailable(format!("invalid summary payload: {}", e)))
    }
}
