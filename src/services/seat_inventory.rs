use crate::db::queries;
use crate::error::LedgerError;
use chrono::Utc;
use sqlx::{Postgres, Transaction as SqlxTransaction};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Owns per-seat occupancy and the showtime availability counter.
///
/// Every operation runs against a transaction opened by the caller so seat
/// mutations commit or roll back together with the booking write that caused
/// them. Seat rows are locked with FOR UPDATE before any availability
/// decision; the check and the mark are never split across transactions.
#[derive(Debug, Clone, Default)]
pub struct SeatInventory;

impl SeatInventory {
    pub fn new() -> Self {
        Self
    }

    /// Reserve the whole batch or nothing. Fails with `NotFound` for ids
    /// outside the showtime's seat set and `SeatUnavailable` for the first
    /// seat that is booked or under a live hold. Expired holds count as free.
    pub async fn reserve_seats(
        &self,
        tx: &mut SqlxTransaction<'_, Postgres>,
        showtime_id: Uuid,
        seat_ids: &[Uuid],
    ) -> Result<(), LedgerError> {
        reject_duplicates(seat_ids)?;

        let now = Utc::now();
        let rows = queries::seats_for_update(tx, showtime_id, seat_ids).await?;
        let by_id: HashMap<Uuid, _> = rows.iter().map(|s| (s.id, s)).collect();

        for seat_id in seat_ids {
            let seat = by_id
                .get(seat_id)
                .ok_or_else(|| LedgerError::NotFound(format!("Seat not found: {}", seat_id)))?;
            if !seat.is_available(now) {
                return Err(LedgerError::SeatUnavailable(seat.label()));
            }
        }

        queries::mark_seats_booked(tx, showtime_id, seat_ids).await?;
        queries::decrement_available_seats(tx, showtime_id, seat_ids.len() as i32).await?;

        tracing::info!(
            "Reserved {} seat(s) for showtime {}",
            seat_ids.len(),
            showtime_id
        );
        Ok(())
    }

    /// Free seats and give their count back to the availability counter.
    /// Replaying a release against already-free seats is a no-op; the counter
    /// only moves by the number of seats that actually flipped.
    pub async fn release_seats(
        &self,
        tx: &mut SqlxTransaction<'_, Postgres>,
        showtime_id: Uuid,
        seat_ids: &[Uuid],
    ) -> Result<(), LedgerError> {
        let freed = queries::free_booked_seats(tx, showtime_id, seat_ids).await?;
        if freed > 0 {
            queries::increment_available_seats(tx, showtime_id, freed as i32).await?;
        }
        tracing::info!("Released {} seat(s) for showtime {}", freed, showtime_id);
        Ok(())
    }

    /// Swap a booking's seats. Every new seat outside the old set must be
    /// free; the first conflict fails the whole operation before anything is
    /// mutated. Seats present in both sets stay booked throughout.
    pub async fn reassign_seats(
        &self,
        tx: &mut SqlxTransaction<'_, Postgres>,
        showtime_id: Uuid,
        old_seat_ids: &[Uuid],
        new_seat_ids: &[Uuid],
    ) -> Result<(), LedgerError> {
        reject_duplicates(new_seat_ids)?;

        let mut locked: Vec<Uuid> = old_seat_ids.to_vec();
        for id in new_seat_ids {
            if !locked.contains(id) {
                locked.push(*id);
            }
        }

        let now = Utc::now();
        let rows = queries::seats_for_update(tx, showtime_id, &locked).await?;
        let by_id: HashMap<Uuid, _> = rows.iter().map(|s| (s.id, s)).collect();
        let old_set: HashSet<Uuid> = old_seat_ids.iter().copied().collect();

        for seat_id in new_seat_ids {
            let seat = by_id
                .get(seat_id)
                .ok_or_else(|| LedgerError::NotFound(format!("Seat not found: {}", seat_id)))?;
            if !old_set.contains(seat_id) && !seat.is_available(now) {
                return Err(LedgerError::SeatUnavailable(seat.label()));
            }
        }

        let freed = queries::free_booked_seats(tx, showtime_id, old_seat_ids).await?;
        queries::mark_seats_booked(tx, showtime_id, new_seat_ids).await?;

        let delta = new_seat_ids.len() as i32 - freed as i32;
        if delta > 0 {
            queries::decrement_available_seats(tx, showtime_id, delta).await?;
        } else if delta < 0 {
            queries::increment_available_seats(tx, showtime_id, -delta).await?;
        }

        tracing::info!(
            "Reassigned showtime {} seats: {} -> {}",
            showtime_id,
            old_seat_ids.len(),
            new_seat_ids.len()
        );
        Ok(())
    }
}

fn reject_duplicates(seat_ids: &[Uuid]) -> Result<(), LedgerError> {
    let mut seen = HashSet::with_capacity(seat_ids.len());
    for id in seat_ids {
        if !seen.insert(*id) {
            return Err(LedgerError::InvalidState(format!(
                "Duplicate seat in request: {}",
                id
            )));
        }
    }
    Ok(())
}
