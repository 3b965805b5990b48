use crate::db::models::{show_status, Movie, Showtime, Theater};
use crate::db::queries;
use crate::error::LedgerError;
use crate::remote::{FetchError, ShowtimeClient, ShowtimeSummary};
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use uuid::Uuid;

/// How a showtime was obtained, so callers can tell a cache hit from a
/// degraded remote synthesis.
#[derive(Debug, Clone)]
pub enum Resolved {
    Local(Showtime),
    FetchedAndCached(Showtime),
}

impl Resolved {
    pub fn showtime(&self) -> &Showtime {
        match self {
            Resolved::Local(s) | Resolved::FetchedAndCached(s) => s,
        }
    }

    pub fn into_showtime(self) -> Showtime {
        match self {
            Resolved::Local(s) | Resolved::FetchedAndCached(s) => s,
        }
    }
}

/// Read-through resolver for showtimes owned by the remote showtime service.
/// Local storage is authoritative once populated; on a miss the summary is
/// fetched (service discovery, then gateway), mapped, and persisted together
/// with stand-in movie/theater records so the next resolution is local.
#[derive(Clone)]
pub struct ShowtimeResolver {
    pool: PgPool,
    client: ShowtimeClient,
}

impl ShowtimeResolver {
    pub fn new(pool: PgPool, client: ShowtimeClient) -> Self {
        Self { pool, client }
    }

    pub async fn resolve(&self, showtime_id: Uuid) -> Result<Resolved, LedgerError> {
        if let Some(showtime) = queries::get_showtime(&self.pool, showtime_id).await? {
            return Ok(Resolved::Local(showtime));
        }

        tracing::info!("Showtime {} not cached locally, fetching", showtime_id);
        let summary = self
            .client
            .fetch_summary(showtime_id)
            .await
            .map_err(|e| match e {
                FetchError::NotFound(id) => {
                    LedgerError::NotFound(format!("Showtime not found: {}", id))
                }
                FetchError::Unavailable(reason) => LedgerError::UpstreamUnavailable(reason),
            })?;

        let showtime = self.cache_summary(summary).await?;
        tracing::info!("Cached remote showtime {} locally", showtime.id);
        Ok(Resolved::FetchedAndCached(showtime))
    }

    /// Map the summary into local records and persist them write-through.
    /// Referenced movie/theater rows are synthesized from the embedded
    /// sub-objects, or as "Unknown" stand-ins when those are absent too.
    async fn cache_summary(&self, summary: ShowtimeSummary) -> Result<Showtime, LedgerError> {
        let mut tx = self.pool.begin().await?;

        ensure_movie(&mut tx, &summary).await?;
        ensure_theater(&mut tx, &summary).await?;

        let status = match summary.status.as_deref() {
            Some(s @ (show_status::ACTIVE | show_status::COMPLETED | show_status::CANCELLED)) => {
                s.to_string()
            }
            Some(other) => {
                tracing::warn!("Invalid showtime status {:?}, defaulting to ACTIVE", other);
                show_status::ACTIVE.to_string()
            }
            None => show_status::ACTIVE.to_string(),
        };

        let showtime = Showtime {
            id: summary.id,
            movie_id: summary.movie_id,
            theater_id: summary.theater_id,
            screen_id: summary.screen,
            start_time: summary.show_date_time,
            ticket_price: summary.ticket_price,
            total_seats: summary.total_seats,
            available_seats: summary.available_seats,
            status,
        };

        let saved = queries::insert_showtime(&mut tx, &showtime).await?;
        tx.commit().await?;
        Ok(saved)
    }
}

async fn ensure_movie(
    tx: &mut SqlxTransaction<'_, Postgres>,
    summary: &ShowtimeSummary,
) -> Result<(), LedgerError> {
    if queries::get_movie(tx, summary.movie_id).await?.is_some() {
        return Ok(());
    }

    let movie = match &summary.movie {
        Some(m) => Movie {
            id: summary.movie_id,
            title: m.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            language: m.language.clone(),
            duration_minutes: m.duration.unwrap_or(120),
            poster_url: m.poster_url.clone(),
            release_date: Utc::now().date_naive(),
        },
        None => {
            tracing::warn!(
                "Creating minimal movie stand-in without details: {}",
                summary.movie_id
            );
            Movie {
                id: summary.movie_id,
                title: "Unknown Movie".to_string(),
                language: None,
                duration_minutes: 120,
                poster_url: None,
                release_date: Utc::now().date_naive(),
            }
        }
    };

    queries::insert_movie(tx, &movie).await?;
    Ok(())
}

async fn ensure_theater(
    tx: &mut SqlxTransaction<'_, Postgres>,
    summary: &ShowtimeSummary,
) -> Result<(), LedgerError> {
    if queries::get_theater(tx, summary.theater_id).await?.is_some() {
        return Ok(());
    }

    let theater = match &summary.theater {
        Some(t) => Theater {
            id: summary.theater_id,
            name: t.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            location: t.location.clone().unwrap_or_else(|| "Unknown".to_string()),
            address: t.address.clone().unwrap_or_else(|| "Unknown".to_string()),
            total_screens: t.total_screens,
        },
        None => {
            tracing::warn!(
                "Creating minimal theater stand-in without details: {}",
                summary.theater_id
            );
            Theater {
                id: summary.theater_id,
                name: "Unknown Theater".to_string(),
                location: "Unknown".to_string(),
                address: "Unknown".to_string(),
                total_screens: None,
            }
        }
    };

    queries::insert_theater(tx, &theater).await?;
    Ok(())
}
